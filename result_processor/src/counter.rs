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

/// Swallows the upstream stream, counting it, and emits a single empty
/// result. Used by plans that only want totals, no rows.
#[derive(Debug, Default)]
pub struct Counter {
    count: usize,
    done: bool,
}

impl Counter {
    pub const fn new() -> Self {
        Self {
            count: 0,
            done: false,
        }
    }

    pub const fn count(&self) -> usize {
        self.count
    }
}

impl ResultProcessor for Counter {
    fn next(&mut self, mut cx: Context<'_>, out: &mut SearchResult) -> Result<Option<()>, Error> {
        if self.done {
            return Ok(None);
        }

        if let Some(mut upstream) = cx.upstream() {
            while upstream.next(out)?.is_some() {
                self.count += 1;
                out.clear();
            }
        }

        self.done = true;
        Ok(Some(()))
    }
}
