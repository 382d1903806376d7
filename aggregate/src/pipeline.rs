/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

//! Pipeline construction: instantiate the processors in dependency order.
//! The tail processor appended last is what the executor drives.

use std::sync::Arc;

use index_spec::{DocId, IndexSpec};
use query_error::{QueryError, QueryErrorCode};
use result_processor::{
    Context, Error, ResultProcessor,
    pager::Pager,
    sorter::{SortField, Sorter},
};
use rlookup::{RLookup, load_row};
use search_result::SearchResult;

use crate::request::AREQ;
use crate::{RequestFlag, SearchConfig};

/// The deepest stage: walks the index's match enumeration and materializes
/// one [`SearchResult`] per document. Every document encountered here is
/// counted into the chain's `total_results`, independent of what downstream
/// stages discard.
struct DocumentEnumerator {
    spec: Arc<IndexSpec>,
    hits: std::vec::IntoIter<(DocId, f64)>,
}

impl ResultProcessor for DocumentEnumerator {
    fn next(&mut self, mut cx: Context<'_>, out: &mut SearchResult) -> Result<Option<()>, Error> {
        loop {
            let Some((doc_id, score)) = self.hits.next() else {
                return Ok(None);
            };
            // A document can vanish between snapshot and read; skip it.
            let Some(doc) = self.spec.document(doc_id) else {
                continue;
            };

            out.set_doc_id(doc_id);
            out.set_score(score);
            out.set_document_metadata(Some(Arc::clone(doc.metadata())));
            out.row_data_mut()
                .set_sorting_vector(doc.sorting_vector().clone());
            cx.parent_mut().inc_total_results();
            return Ok(Some(()));
        }
    }
}

/// Populates the row with the document-sourced lookup keys.
struct Loader {
    spec: Arc<IndexSpec>,
    lookup: RLookup,
}

impl ResultProcessor for Loader {
    fn next(&mut self, mut cx: Context<'_>, out: &mut SearchResult) -> Result<Option<()>, Error> {
        let Some(mut upstream) = cx.upstream() else {
            return Ok(None);
        };
        if upstream.next(out)?.is_none() {
            return Ok(None);
        }

        if let Some(doc) = self.spec.document(out.doc_id()) {
            load_row(&self.lookup, doc, out.row_data_mut());
        }
        Ok(Some(()))
    }
}

impl AREQ {
    /// Build the result-processor chain for this request. After a
    /// successful build the tail processor is valid and `next`-callable.
    pub fn build_pipeline(&mut self, config: &SearchConfig) -> Result<(), QueryError> {
        let spec = Arc::clone(self.spec().ok_or_else(|| {
            QueryError::with_error(
                QueryErrorCode::Generic,
                "pipeline built before the context was applied",
            )
        })?);

        let hits = spec.matching_docs(self.query());
        self.qiter.append(DocumentEnumerator {
            spec: Arc::clone(&spec),
            hits: hits.into_iter(),
        });

        if self.plan().lookup().keys().any(|key| {
            key.flags().contains(rlookup::RLookupKeyFlag::DocSrc)
                && !key.flags().contains(rlookup::RLookupKeyFlag::SvSrc)
        }) {
            self.qiter.append(Loader {
                spec,
                lookup: self.plan().lookup().clone(),
            });
        }

        let is_search = self.req_flags().contains(RequestFlag::IsSearch);
        let (offset, limit, window) = match self.plan().arrange_step() {
            Some(astp) => (astp.offset, astp.limit, astp.window()),
            None => (0, None, None),
        };

        let sort_fields: Vec<SortField> = self
            .plan()
            .arrange_step()
            .map(|astp| {
                astp.sortkeys_lk
                    .iter()
                    .zip(&astp.sort_by)
                    .map(|(key, sort)| SortField {
                        key: key.clone(),
                        ascending: sort.ascending,
                    })
                    .collect()
            })
            .unwrap_or_default();

        if !sort_fields.is_empty() {
            self.qiter.append(Sorter::by_fields(sort_fields, window));
        } else if is_search {
            // Search results always come back best-first.
            self.qiter.append(Sorter::by_score(window));
        }

        let limit = limit.unwrap_or(if is_search {
            config.default_search_limit
        } else {
            usize::MAX
        });
        if offset > 0 || limit != usize::MAX {
            self.qiter.append(Pager::new(offset, limit));
        }

        Ok(())
    }
}
