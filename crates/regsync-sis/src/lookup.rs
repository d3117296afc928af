//! External resolution seams.
//!
//! Term/campus codes and CRN-to-course lookups vary by institution. The
//! source system instantiated providers dynamically from configured
//! class names; here they are plain traits selected at construction,
//! with default implementations always available.

use std::collections::HashMap;

use async_trait::async_trait;

use regsync_core::{CampusId, CourseId, Crn, TermId};

use crate::error::SisResult;

/// Resolves an academic session to the SIS's term and campus codes.
#[async_trait]
pub trait ExternalTermResolver: Send + Sync {
    /// Resolve a session name to (term, campus).
    async fn resolve(&self, session: &str) -> SisResult<(TermId, CampusId)>;
}

/// Default resolver: one fixed term/campus pair, ignoring the session.
///
/// Suitable for deployments that synchronize a single term at a time.
#[derive(Debug, Clone)]
pub struct DefaultTermResolver {
    term: TermId,
    campus: CampusId,
}

impl DefaultTermResolver {
    /// Create a resolver for a fixed term and campus.
    #[must_use]
    pub fn new(term: TermId, campus: CampusId) -> Self {
        Self { term, campus }
    }
}

#[async_trait]
impl ExternalTermResolver for DefaultTermResolver {
    async fn resolve(&self, _session: &str) -> SisResult<(TermId, CampusId)> {
        Ok((self.term.clone(), self.campus.clone()))
    }
}

/// Resolves a CRN to the course it belongs to.
#[async_trait]
pub trait ExternalClassLookup: Send + Sync {
    /// Look up the course a CRN belongs to; `None` when unknown.
    async fn course_for_crn(&self, term: &TermId, crn: &Crn) -> SisResult<Option<CourseId>>;
}

/// Default lookup backed by a static CRN table.
///
/// An empty table answers `None` for everything, which callers treat as
/// "identity unknown, fall back to what the SIS reports".
#[derive(Debug, Clone, Default)]
pub struct DefaultClassLookup {
    table: HashMap<Crn, CourseId>,
}

impl DefaultClassLookup {
    /// Create an empty lookup.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a lookup from a CRN table.
    #[must_use]
    pub fn with_table(table: HashMap<Crn, CourseId>) -> Self {
        Self { table }
    }
}

#[async_trait]
impl ExternalClassLookup for DefaultClassLookup {
    async fn course_for_crn(&self, _term: &TermId, crn: &Crn) -> SisResult<Option<CourseId>> {
        Ok(self.table.get(crn).cloned())
    }
}
