//! Replay Orchestrator
//!
//! Top-level entry points. Scopes the event list to one entity, extracts
//! metadata, applies the access filter, then delegates to the
//! kind-specific fold. Pure: no state survives between calls.
//!
//! Precondition: events arrive in ascending timestamp order. They are not
//! re-sorted; out-of-order input yields a different projection.

use tracing::debug;

use crate::access::admits;
use crate::config::ReplayConfig;
use crate::domain::{
    ContentMeta, MetaOverride, ProjectedBlog, ProjectedExperiment, ProjectedPage, ProjectedWiki,
    Projection, SiteIndex,
};
use crate::error::{EngineError, EngineResult};
use crate::events::{ChildType, Operation, RootRef, RootType};
use crate::experiment::fold_experiment;
use crate::metadata::extract_meta;
use crate::page::fold_page;
use crate::revisions::{fold_blog, fold_wiki};
use crate::site_index;

/// Stateless replay front-end carrying one pass's configuration.
#[derive(Debug, Clone, Default)]
pub struct Replayer {
    config: ReplayConfig,
}

impl Replayer {
    pub fn new(config: ReplayConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Project any entity, dispatching on its root type.
    ///
    /// `Ok(None)` means the access filter rejected the entity.
    pub fn replay(
        &self,
        root: &RootRef,
        events: &[Operation],
        external: Option<&MetaOverride>,
    ) -> Option<Projection> {
        let (meta, scoped) = self.admit(root, events, external)?;
        let projection = match root.kind {
            RootType::Page => Projection::Page(fold_page(meta, &scoped)),
            RootType::Wiki => {
                Projection::Wiki(fold_wiki(meta, &scoped, self.config.conflict_window_ms))
            }
            RootType::Blog => Projection::Blog(fold_blog(meta, &scoped)),
            RootType::Exp => Projection::Experiment(fold_experiment(meta, &scoped)),
        };
        Some(projection)
    }

    /// Like [`Replayer::replay`], addressed by the textual root.
    pub fn replay_str(
        &self,
        root: &str,
        events: &[Operation],
        external: Option<&MetaOverride>,
    ) -> EngineResult<Option<Projection>> {
        let root = RootRef::parse(root).ok_or_else(|| EngineError::InvalidRoot(root.to_string()))?;
        Ok(self.replay(&root, events, external))
    }

    pub fn replay_page(
        &self,
        root: &RootRef,
        events: &[Operation],
        external: Option<&MetaOverride>,
    ) -> EngineResult<Option<ProjectedPage>> {
        ensure_kind(root, RootType::Page)?;
        Ok(self
            .admit(root, events, external)
            .map(|(meta, scoped)| fold_page(meta, &scoped)))
    }

    pub fn replay_wiki(
        &self,
        root: &RootRef,
        events: &[Operation],
        external: Option<&MetaOverride>,
    ) -> EngineResult<Option<ProjectedWiki>> {
        ensure_kind(root, RootType::Wiki)?;
        let window = self.config.conflict_window_ms;
        Ok(self
            .admit(root, events, external)
            .map(|(meta, scoped)| fold_wiki(meta, &scoped, window)))
    }

    pub fn replay_blog(
        &self,
        root: &RootRef,
        events: &[Operation],
        external: Option<&MetaOverride>,
    ) -> EngineResult<Option<ProjectedBlog>> {
        ensure_kind(root, RootType::Blog)?;
        Ok(self
            .admit(root, events, external)
            .map(|(meta, scoped)| fold_blog(meta, &scoped)))
    }

    pub fn replay_experiment(
        &self,
        root: &RootRef,
        events: &[Operation],
        external: Option<&MetaOverride>,
    ) -> EngineResult<Option<ProjectedExperiment>> {
        ensure_kind(root, RootType::Exp)?;
        Ok(self
            .admit(root, events, external)
            .map(|(meta, scoped)| fold_experiment(meta, &scoped)))
    }

    /// Global catalog from the `index` child stream.
    pub fn replay_index(&self, events: &[Operation]) -> SiteIndex {
        site_index::replay_index(events)
    }

    /// Scope, extract metadata, filter. `None` when the entity is hidden
    /// from this pass.
    fn admit<'a>(
        &self,
        root: &RootRef,
        events: &'a [Operation],
        external: Option<&MetaOverride>,
    ) -> Option<(ContentMeta, Vec<&'a Operation>)> {
        let scoped: Vec<&Operation> = events
            .iter()
            .filter(|ev| ev.target.root == *root && ev.target.child_kind() != Some(ChildType::Index))
            .collect();
        let meta = extract_meta(root, &scoped, external);
        if !admits(&meta, self.config.mode) {
            debug!(
                entity = %root,
                status = ?meta.status,
                visibility = ?meta.visibility,
                mode = ?self.config.mode,
                "entity hidden by access filter"
            );
            return None;
        }
        Some((meta, scoped))
    }
}

fn ensure_kind(root: &RootRef, expected: RootType) -> EngineResult<()> {
    if root.kind == expected {
        Ok(())
    } else {
        Err(EngineError::mismatch(expected, root))
    }
}

/// One-shot replay of a single entity.
pub fn replay_entity(
    root: &RootRef,
    events: &[Operation],
    external: Option<&MetaOverride>,
    config: &ReplayConfig,
) -> Option<Projection> {
    Replayer::new(config.clone()).replay(root, events, external)
}
