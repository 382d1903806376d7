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

/// Skips `offset` results, then passes through at most `limit` of them.
#[derive(Debug)]
pub struct Pager {
    offset: usize,
    limit: usize,
    skipped: usize,
    returned: usize,
}

impl Pager {
    pub const fn new(offset: usize, limit: usize) -> Self {
        Self {
            offset,
            limit,
            skipped: 0,
            returned: 0,
        }
    }
}

impl ResultProcessor for Pager {
    fn next(&mut self, mut cx: Context<'_>, out: &mut SearchResult) -> Result<Option<()>, Error> {
        let Some(mut upstream) = cx.upstream() else {
            return Ok(None);
        };

        while self.skipped < self.offset {
            if upstream.next(out)?.is_none() {
                return Ok(None);
            }
            self.skipped += 1;
            out.clear();
        }

        if self.returned >= self.limit {
            return Ok(None);
        }

        match upstream.next(out)? {
            Some(()) => {
                self.returned += 1;
                Ok(Some(()))
            }
            None => Ok(None),
        }
    }
}
