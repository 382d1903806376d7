/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

use search_result::SearchResult;

use crate::{Context, Error, ResultProcessor};

/// Create a ResultProcessor from an `Iterator` for testing purposes.
///
/// It plays the role of the deepest stage and therefore bumps the chain's
/// `total_results` for every result it yields.
pub fn from_iter<I>(i: I) -> IterResultProcessor<I::IntoIter>
where
    I: IntoIterator<Item = SearchResult>,
{
    IterResultProcessor {
        iter: i.into_iter(),
    }
}

/// ResultProcessor that yields items from an inner `Iterator`.
#[derive(Debug)]
pub struct IterResultProcessor<I> {
    iter: I,
}

impl<I> ResultProcessor for IterResultProcessor<I>
where
    I: Iterator<Item = SearchResult>,
{
    fn next(&mut self, mut cx: Context<'_>, out: &mut SearchResult) -> Result<Option<()>, Error> {
        if let Some(res) = self.iter.next() {
            *out = res;
            cx.parent_mut().inc_total_results();
            Ok(Some(()))
        } else {
            Ok(None)
        }
    }
}

/// A result processor that returns the provided result once, then EOF.
pub struct ResultRP {
    res: Option<Result<Option<()>, Error>>,
}

impl ResultRP {
    pub fn new_err(error: Error) -> Self {
        Self {
            res: Some(Err(error)),
        }
    }

    pub fn new_ok_some() -> Self {
        Self {
            res: Some(Ok(Some(()))),
        }
    }

    pub fn new_ok_none() -> Self {
        Self {
            res: Some(Ok(None)),
        }
    }
}

impl ResultProcessor for ResultRP {
    fn next(&mut self, _cx: Context<'_>, _out: &mut SearchResult) -> Result<Option<()>, Error> {
        self.res.take().unwrap_or(Ok(None))
    }
}
