/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

use std::sync::Arc;

use enumflags2::{BitFlags, bitflags};
use index_spec::{DocId, DocumentMetadata};
use rlookup::RLookupRow;

#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SearchResultFlag {
    ExpiredDoc = 1,
}

pub type SearchResultFlags = BitFlags<SearchResultFlag>;

/// SearchResult - the object all the processing chain is working on.
/// It holds what the index scan brought - id, score, metadata - and the
/// row of fields loaded by the chain.
#[derive(Debug, Default)]
pub struct SearchResult {
    doc_id: DocId,
    score: f64,
    document_metadata: Option<Arc<DocumentMetadata>>,

    /// Row data. Use the RLookup accessors to read and write it.
    row_data: RLookupRow,

    flags: SearchResultFlags,
}

impl SearchResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the search result, removing all values from the row.
    /// This has no effect on the allocated capacity of the lookup row.
    pub fn clear(&mut self) {
        self.score = 0.0;
        self.document_metadata = None;
        self.row_data.wipe();
        self.flags = SearchResultFlags::empty();
    }

    pub const fn doc_id(&self) -> DocId {
        self.doc_id
    }

    pub const fn set_doc_id(&mut self, doc_id: DocId) {
        self.doc_id = doc_id;
    }

    pub const fn score(&self) -> f64 {
        self.score
    }

    pub const fn set_score(&mut self, score: f64) {
        self.score = score;
    }

    pub fn document_metadata(&self) -> Option<&Arc<DocumentMetadata>> {
        self.document_metadata.as_ref()
    }

    pub fn set_document_metadata(&mut self, document_metadata: Option<Arc<DocumentMetadata>>) {
        self.document_metadata = document_metadata;
    }

    pub const fn row_data(&self) -> &RLookupRow {
        &self.row_data
    }

    pub const fn row_data_mut(&mut self) -> &mut RLookupRow {
        &mut self.row_data
    }

    pub const fn flags(&self) -> SearchResultFlags {
        self.flags
    }

    pub const fn set_flags(&mut self, flags: SearchResultFlags) {
        self.flags = flags;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rlookup::{RLookup, RLookupKeyFlags};
    use value::RSValue;

    #[test]
    fn clear_wipes_row_and_scalars() {
        let mut lookup = RLookup::new();
        let key = lookup.get_key_write("f", RLookupKeyFlags::empty()).clone();

        let mut res = SearchResult::new();
        res.set_doc_id(7);
        res.set_score(0.5);
        res.row_data_mut().write_key(&key, RSValue::num(1.0));

        res.clear();
        assert_eq!(res.score(), 0.0);
        assert!(res.document_metadata().is_none());
        assert_eq!(res.row_data().num(), 0);
        // The doc id survives a clear; the next pipeline pull overwrites it.
        assert_eq!(res.doc_id(), 7);
    }
}
