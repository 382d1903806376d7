/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

//! Index schemas, the document table and the search contexts the execution
//! layer opens against them.
//!
//! The inverted index proper and the score computation are collaborators of
//! the execution layer; what lives here is the surface they expose to it: a
//! schema, document metadata, per-document sorting vectors, and a match
//! enumeration returning `(doc_id, score)` pairs.

mod registry;

pub use registry::{IndexDropped, IndexRegistry};

use std::sync::Arc;

use field::FieldSpec;
use rlookup::FieldSource;
use sorting_vector::RSSortingVector;
use value::RSValue;

pub type DocId = u64;

/// Host-owned document metadata: the document key and an optional opaque
/// payload attached at indexing time.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMetadata {
    key: Arc<str>,
    payload: Option<Arc<[u8]>>,
}

impl DocumentMetadata {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }
}

/// One indexed document: metadata, stored field values, the sorting vector
/// built from the sortable schema fields, and the relevance score assigned
/// by the external scorer.
#[derive(Debug, Clone)]
pub struct Document {
    doc_id: DocId,
    metadata: Arc<DocumentMetadata>,
    fields: Vec<(Arc<str>, RSValue)>,
    score: f64,
    sorting_vector: RSSortingVector,
}

impl Document {
    pub const fn doc_id(&self) -> DocId {
        self.doc_id
    }

    pub fn metadata(&self) -> &Arc<DocumentMetadata> {
        &self.metadata
    }

    pub const fn score(&self) -> f64 {
        self.score
    }

    pub fn sorting_vector(&self) -> &RSSortingVector {
        &self.sorting_vector
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &RSValue)> {
        self.fields.iter().map(|(name, val)| (&**name, val))
    }
}

impl FieldSource for Document {
    fn field_value(&self, name: &str) -> Option<RSValue> {
        self.fields
            .iter()
            .find(|(n, _)| &**n == name)
            .map(|(_, v)| v.clone())
    }
}

/// An index: schema plus document table.
#[derive(Debug, Default)]
pub struct IndexSpec {
    name: Arc<str>,
    fields: Vec<FieldSpec>,
    num_sortables: u16,
    docs: Vec<Document>,
}

impl IndexSpec {
    /// Create an index with the given schema. Sortable fields are assigned
    /// consecutive sorting-vector slots in schema order.
    pub fn new(name: impl Into<Arc<str>>, mut fields: Vec<FieldSpec>) -> Self {
        let mut num_sortables = 0;
        for fs in &mut fields {
            if fs.is_sortable() {
                fs.set_sort_idx(num_sortables);
                num_sortables += 1;
            }
        }

        Self {
            name: name.into(),
            fields,
            num_sortables,
            docs: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub fn field_spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|fs| fs.name() == name)
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn num_docs(&self) -> usize {
        self.docs.len()
    }

    /// Index a document. The score is whatever the external scorer computed
    /// for it; the sorting vector is built here from the sortable fields.
    pub fn add_document(
        &mut self,
        key: impl Into<Arc<str>>,
        score: f64,
        payload: Option<Vec<u8>>,
        fields: Vec<(&str, RSValue)>,
    ) -> DocId {
        let mut sv = RSSortingVector::new(self.num_sortables as usize);
        for (name, val) in &fields {
            let Some(fs) = self.field_spec(name) else {
                continue;
            };
            let Some(idx) = fs.sort_idx() else {
                continue;
            };
            let idx = idx as usize;
            match val {
                RSValue::Num(n) => sv.try_insert_num(idx, *n),
                RSValue::String(s) => sv.try_insert_string_normalize(idx, s),
                RSValue::HostString(s) => sv.try_insert_string_normalize(idx, &**s),
                RSValue::Null => sv.try_insert_null(idx),
            }
            .expect("sort_idx within the vector by construction");
        }

        let doc_id = self.docs.len() as DocId + 1;
        self.docs.push(Document {
            doc_id,
            metadata: Arc::new(DocumentMetadata {
                key: key.into(),
                payload: payload.map(Into::into),
            }),
            fields: fields
                .into_iter()
                .map(|(name, val)| (Arc::from(name), val))
                .collect(),
            score,
            sorting_vector: sv,
        });
        doc_id
    }

    pub fn document(&self, doc_id: DocId) -> Option<&Document> {
        // Doc ids are 1-based positions in the table.
        self.docs.get(doc_id.checked_sub(1)? as usize)
    }

    /// Enumerate the documents matching `query` in doc-id order, with their
    /// scores. `*` matches everything; otherwise every whitespace-separated
    /// term must occur as a token of some fulltext field.
    ///
    /// This is the seam where a real inverted index would be consulted.
    pub fn matching_docs(&self, query: &str) -> Vec<(DocId, f64)> {
        if query == "*" {
            return self.docs.iter().map(|d| (d.doc_id, d.score)).collect();
        }

        let terms: Vec<String> = query
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();

        self.docs
            .iter()
            .filter(|doc| terms.iter().all(|term| doc_has_term(doc, term)))
            .map(|d| (d.doc_id, d.score))
            .collect()
    }
}

fn doc_has_term(doc: &Document, term: &str) -> bool {
    doc.fields.iter().any(|(_, val)| {
        val.as_str()
            .is_some_and(|s| s.split_whitespace().any(|tok| tok.to_lowercase() == term))
    })
}

/// A short-lived handle onto an opened index, owned by a single command
/// invocation.
#[derive(Debug, Clone)]
pub struct SearchCtx {
    spec: Arc<IndexSpec>,
}

impl SearchCtx {
    /// Open the named index. Returns `None` if it does not exist.
    pub fn open(registry: &IndexRegistry, name: &str) -> Option<Self> {
        Some(Self {
            spec: registry.get(name)?,
        })
    }

    pub fn spec(&self) -> &Arc<IndexSpec> {
        &self.spec
    }
}

/// The long-lived context a cursor holds between reads.
///
/// The host may migrate, evict or invalidate keys while a cursor is paused,
/// so the index handle is released on suspension and re-acquired through
/// [`ConcurrentSearchCtx::reopen_keys`] before the pipeline resumes.
#[derive(Debug)]
pub struct ConcurrentSearchCtx {
    registry: Arc<IndexRegistry>,
    index: Arc<str>,
    spec: Option<Arc<IndexSpec>>,
}

impl ConcurrentSearchCtx {
    pub fn new(registry: Arc<IndexRegistry>, index: Arc<str>) -> Self {
        Self {
            registry,
            index,
            spec: None,
        }
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    /// Re-acquire the index handle. Mandatory between cursor reads.
    pub fn reopen_keys(&mut self) -> Result<&Arc<IndexSpec>, IndexDropped> {
        self.spec = Some(
            self.registry
                .get(&self.index)
                .ok_or_else(|| IndexDropped(Arc::clone(&self.index)))?,
        );
        Ok(self.spec.as_ref().expect("just assigned"))
    }

    /// Release the index handle at a suspension point.
    pub fn close_keys(&mut self) {
        self.spec = None;
    }
}
