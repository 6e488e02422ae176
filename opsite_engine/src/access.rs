//! Access Filter
//!
//! Decides, from extracted metadata alone, whether an entity may be
//! projected at all in the current pass.

use crate::config::AccessMode;
use crate::domain::{ContentMeta, Status, Visibility};

/// `Public` admits only published, public entities. `Drafts` admits
/// everything that is not archived.
pub fn admits(meta: &ContentMeta, mode: AccessMode) -> bool {
    match mode {
        AccessMode::Public => {
            meta.status == Status::Published && meta.visibility == Visibility::Public
        }
        AccessMode::Drafts => meta.status != Status::Archived,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RootRef;
    use crate::metadata::default_meta;

    fn meta(status: Status, visibility: Visibility) -> ContentMeta {
        let mut m = default_meta(&RootRef::parse("page:about").unwrap());
        m.status = status;
        m.visibility = visibility;
        m
    }

    #[test]
    fn test_public_mode() {
        assert!(admits(&meta(Status::Published, Visibility::Public), AccessMode::Public));
        assert!(!admits(&meta(Status::Published, Visibility::Private), AccessMode::Public));
        assert!(!admits(&meta(Status::Draft, Visibility::Public), AccessMode::Public));
        assert!(!admits(&meta(Status::Archived, Visibility::Public), AccessMode::Public));
    }

    #[test]
    fn test_drafts_mode_only_drops_archived() {
        assert!(admits(&meta(Status::Draft, Visibility::Private), AccessMode::Drafts));
        assert!(admits(&meta(Status::Published, Visibility::Private), AccessMode::Drafts));
        assert!(!admits(&meta(Status::Archived, Visibility::Public), AccessMode::Drafts));
    }
}
