//! Projection Invariant Checks
//!
//! Non-panicking. Each check returns the first violation found. Used by
//! the runtime before a build is snapshotted and by tests after replay.

use std::collections::BTreeSet;

use crate::domain::{
    ProjectedExperiment, ProjectedPage, ProjectedWiki, Projection, Revision, SiteIndex,
};
use crate::error::InvariantViolation;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn validate_projection(projection: &Projection) -> Result<(), InvariantViolation> {
    match projection {
        Projection::Page(p) => check_page(p),
        Projection::Wiki(w) => check_wiki(w),
        Projection::Blog(b) => check_revisions(&b.meta.id, &b.revisions, b.current_revision.as_deref()),
        Projection::Experiment(e) => check_experiment(e),
    }
}

pub fn validate_index(index: &SiteIndex) -> Result<(), InvariantViolation> {
    let ids: BTreeSet<&str> = index.entries.iter().map(|e| e.id.as_str()).collect();
    for entry in &index.nav {
        if !ids.contains(entry.id.as_str()) {
            return Err(InvariantViolation::NavEntryMissing(entry.id.clone()));
        }
        if !entry.is_navigable() {
            return Err(InvariantViolation::NavEntryNotNavigable(entry.id.clone()));
        }
    }
    for (slug, id) in &index.slug_map {
        if !ids.contains(id.as_str()) {
            return Err(InvariantViolation::DanglingSlug {
                slug: slug.clone(),
                id: id.clone(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Individual checks (private)
// ---------------------------------------------------------------------------

fn check_page(page: &ProjectedPage) -> Result<(), InvariantViolation> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    for id in &page.block_order {
        let block = page
            .blocks
            .get(id)
            .ok_or_else(|| InvariantViolation::OrderedBlockMissing(id.clone()))?;
        if block.deleted {
            return Err(InvariantViolation::OrderedBlockDeleted(id.clone()));
        }
        if !seen.insert(id.as_str()) {
            return Err(InvariantViolation::DuplicateOrderedBlock(id.clone()));
        }
    }
    Ok(())
}

fn check_revisions(
    entity: &str,
    revisions: &[Revision],
    current: Option<&str>,
) -> Result<(), InvariantViolation> {
    for pair in revisions.windows(2) {
        if pair[0].ts_ms > pair[1].ts_ms {
            return Err(InvariantViolation::RevisionsUnsorted {
                entity: entity.to_string(),
                revision: pair[1].id.clone(),
            });
        }
    }
    let expected = revisions.last().map(|r| r.id.as_str());
    if expected != current {
        return Err(InvariantViolation::CurrentRevisionMismatch {
            entity: entity.to_string(),
            expected: expected.map(str::to_string),
            found: current.map(str::to_string),
        });
    }
    Ok(())
}

fn check_wiki(wiki: &ProjectedWiki) -> Result<(), InvariantViolation> {
    check_revisions(&wiki.meta.id, &wiki.revisions, wiki.current_revision.as_deref())?;
    if !wiki.has_conflict && !wiki.conflict_candidates.is_empty() {
        return Err(InvariantViolation::CandidatesWithoutConflict(
            wiki.meta.id.clone(),
        ));
    }
    for candidate in &wiki.conflict_candidates {
        if !wiki.revisions.iter().any(|r| &r.id == candidate) {
            return Err(InvariantViolation::ConflictCandidateMissing(
                candidate.clone(),
            ));
        }
    }
    Ok(())
}

fn check_experiment(exp: &ProjectedExperiment) -> Result<(), InvariantViolation> {
    match exp.entries.iter().find(|e| e.deleted) {
        Some(entry) => Err(InvariantViolation::DeletedEntryExposed(entry.id.clone())),
        None => Ok(()),
    }
}
