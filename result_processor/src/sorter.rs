/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

use std::cmp::Ordering;
use std::mem;

use rlookup::RLookupKey;
use search_result::SearchResult;
use value::RSValue;

use crate::{Context, Error, ResultProcessor};

/// One sort criterion: the resolved lookup key and its direction.
#[derive(Clone, Debug)]
pub struct SortField {
    pub key: RLookupKey,
    pub ascending: bool,
}

/// What the sorter orders by.
#[derive(Clone, Debug)]
pub enum SortCriteria {
    /// Relevance score, descending. The default for search requests.
    Score,
    /// The given row fields, in order of significance.
    Fields(Vec<SortField>),
}

enum SorterState {
    Accumulating(Vec<SearchResult>),
    Yielding(std::vec::IntoIter<SearchResult>),
}

/// Accumulates the whole upstream stream, sorts it, then replays it.
///
/// `max` bounds how many results survive the sort; a pagination window of
/// `offset + num` is enough to serve the downstream pager.
pub struct Sorter {
    criteria: SortCriteria,
    max: Option<usize>,
    state: SorterState,
}

impl Sorter {
    pub fn new(criteria: SortCriteria, max: Option<usize>) -> Self {
        Self {
            criteria,
            max,
            state: SorterState::Accumulating(Vec::new()),
        }
    }

    pub fn by_score(max: Option<usize>) -> Self {
        Self::new(SortCriteria::Score, max)
    }

    pub fn by_fields(fields: Vec<SortField>, max: Option<usize>) -> Self {
        Self::new(SortCriteria::Fields(fields), max)
    }

    fn compare(criteria: &SortCriteria, a: &SearchResult, b: &SearchResult) -> Ordering {
        match criteria {
            SortCriteria::Score => b
                .score()
                .partial_cmp(&a.score())
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.doc_id().cmp(&b.doc_id())),
            SortCriteria::Fields(fields) => {
                for field in fields {
                    let null = RSValue::Null;
                    let va = a.row_data().get_item(&field.key).unwrap_or(&null);
                    let vb = b.row_data().get_item(&field.key).unwrap_or(&null);
                    let ord = if field.ascending {
                        va.sort_cmp(vb)
                    } else {
                        vb.sort_cmp(va)
                    };
                    if ord != Ordering::Equal {
                        return ord;
                    }
                }
                a.doc_id().cmp(&b.doc_id())
            }
        }
    }
}

impl ResultProcessor for Sorter {
    fn next(&mut self, mut cx: Context<'_>, out: &mut SearchResult) -> Result<Option<()>, Error> {
        loop {
            match &mut self.state {
                SorterState::Accumulating(buf) => {
                    if let Some(mut upstream) = cx.upstream() {
                        let mut res = SearchResult::new();
                        // A Paused yield leaves the buffer in place; the
                        // next call resumes accumulation where it stopped.
                        while upstream.next(&mut res)?.is_some() {
                            buf.push(mem::take(&mut res));
                        }
                    }

                    let mut buf = mem::take(buf);
                    buf.sort_by(|a, b| Self::compare(&self.criteria, a, b));
                    if let Some(max) = self.max {
                        buf.truncate(max);
                    }
                    self.state = SorterState::Yielding(buf.into_iter());
                }
                SorterState::Yielding(iter) => {
                    return Ok(iter.next().map(|res| {
                        *out = res;
                    }));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{QueryIterator, test_utils};
    use pretty_assertions::assert_eq;
    use rlookup::{RLookup, RLookupKeyFlags};

    fn drain(qiter: &mut QueryIterator) -> Vec<u64> {
        let mut out = SearchResult::new();
        let mut ids = Vec::new();
        while let Ok(Some(())) = qiter.next(&mut out) {
            ids.push(out.doc_id());
            out.clear();
        }
        ids
    }

    #[test]
    fn sorts_by_score_descending() {
        let results = [(1u64, 0.5), (2, 1.5), (3, 1.0)].map(|(id, score)| {
            let mut r = SearchResult::new();
            r.set_doc_id(id);
            r.set_score(score);
            r
        });

        let mut qiter = QueryIterator::new();
        qiter.append(test_utils::from_iter(results));
        qiter.append(Sorter::by_score(None));

        assert_eq!(drain(&mut qiter), [2, 3, 1]);
    }

    #[test]
    fn sorts_by_field_ascending_with_missing_values_last() {
        let mut lookup = RLookup::new();
        let key = lookup.get_key_write("n", RLookupKeyFlags::empty()).clone();

        let results: Vec<SearchResult> = [(1u64, Some(3.0)), (2, Some(1.0)), (3, None)]
            .into_iter()
            .map(|(id, num)| {
                let mut r = SearchResult::new();
                r.set_doc_id(id);
                if let Some(num) = num {
                    r.row_data_mut().write_key(&key, RSValue::num(num));
                }
                r
            })
            .collect();

        let mut qiter = QueryIterator::new();
        qiter.append(test_utils::from_iter(results));
        qiter.append(Sorter::by_fields(
            vec![SortField {
                key,
                ascending: true,
            }],
            None,
        ));

        assert_eq!(drain(&mut qiter), [2, 1, 3]);
    }

    #[test]
    fn max_bounds_the_output() {
        let results = (1u64..=10).map(|id| {
            let mut r = SearchResult::new();
            r.set_doc_id(id);
            r.set_score(id as f64);
            r
        });

        let mut qiter = QueryIterator::new();
        qiter.append(test_utils::from_iter(results));
        qiter.append(Sorter::by_score(Some(3)));

        assert_eq!(drain(&mut qiter), [10, 9, 8]);
    }
}
