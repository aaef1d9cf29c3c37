//! Caller-owned memoization for schema documents.
//!
//! The client itself never caches. A `SchemaCache` is owned by the caller,
//! consulted explicitly, and invalidated explicitly, so stale entries are
//! a visible decision at the call site rather than hidden client state.

use std::collections::HashMap;

use super::types::SchemaDocument;

/// Index of schema documents by registry id and, when known, by
/// subject and version.
#[derive(Debug, Clone, Default)]
pub struct SchemaCache {
    by_id: HashMap<u32, SchemaDocument>,
    by_subject_version: HashMap<(String, u32), u32>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a document under its id, and under its subject and version
    /// when the document carries both.
    pub fn insert(&mut self, document: SchemaDocument) {
        if let (Some(subject), Some(version)) = (&document.subject, document.version) {
            self.by_subject_version
                .insert((subject.clone(), version), document.id);
        }
        self.by_id.insert(document.id, document);
    }

    pub fn get_by_id(&self, id: u32) -> Option<&SchemaDocument> {
        self.by_id.get(&id)
    }

    pub fn get_by_subject_version(&self, subject: &str, version: u32) -> Option<&SchemaDocument> {
        let id = self
            .by_subject_version
            .get(&(subject.to_string(), version))?;
        self.by_id.get(id)
    }

    /// Drops one document by id, along with its subject/version index
    /// entries.
    pub fn invalidate_id(&mut self, id: u32) {
        self.by_id.remove(&id);
        self.by_subject_version.retain(|_, cached| *cached != id);
    }

    /// Drops every version cached for a subject.
    pub fn invalidate_subject(&mut self, subject: &str) {
        let ids: Vec<u32> = self
            .by_subject_version
            .iter()
            .filter(|((cached_subject, _), _)| cached_subject == subject)
            .map(|(_, id)| *id)
            .collect();
        self.by_subject_version
            .retain(|(cached_subject, _), _| cached_subject != subject);
        for id in ids {
            self.by_id.remove(&id);
        }
    }

    pub fn clear(&mut self) {
        self.by_id.clear();
        self.by_subject_version.clear();
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}
