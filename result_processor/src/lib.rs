/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

//! The result-processor chain: a pull-based stream of [`SearchResult`]s.
//!
//! A pipeline is a linear sequence of stages. Stage N pulls from stage N-1
//! through its [`Context`] and transforms the result. The chain is built
//! once per request and never re-composed mid-execution; the
//! [`QueryIterator`] owns the stages and drives the tail.

pub mod counter;
pub mod pager;
pub mod sorter;
pub mod test_utils;

use query_error::QueryError;
use search_result::SearchResult;
use thiserror::Error;

/// Errors that can be returned by a [`ResultProcessor`].
#[derive(Debug, Error)]
pub enum Error {
    /// Execution yielded cooperatively (e.g. a host key has been
    /// temporarily released); the chain is resumable.
    #[error("execution paused")]
    Paused,
    /// Execution halted because of timeout.
    #[error("timeout limit was reached")]
    TimedOut,
    /// Aborted because of an error; the payload has more information.
    #[error("{0}")]
    Error(QueryError),
}

/// This is the main trait result processors need to implement.
pub trait ResultProcessor {
    /// Pull the next [`SearchResult`] from this result processor into the
    /// provided `out` location.
    ///
    /// Returns `Ok(Some(()))` if a search result was successfully pulled
    /// from the processor and `Ok(None)` to indicate the end of search
    /// results has been reached. The caller takes ownership of the buffers
    /// inside `out` and must clear them before reuse.
    ///
    /// # Errors
    ///
    /// Returns `Err(_)` for exceptional cases; [`Error::Paused`] is a
    /// resumable yield, everything else terminates the stream.
    fn next(&mut self, cx: Context<'_>, out: &mut SearchResult) -> Result<Option<()>, Error>;
}

/// Chain-wide state shared by all stages of one pipeline.
#[derive(Debug, Default)]
pub struct QueryProcessingCtx {
    total_results: usize,
}

impl QueryProcessingCtx {
    /// The count of documents encountered by the deepest stage, independent
    /// of how many results are emitted downstream.
    pub const fn total_results(&self) -> usize {
        self.total_results
    }

    /// Record one more document encountered. Called by the deepest stage.
    pub const fn inc_total_results(&mut self) {
        self.total_results += 1;
    }
}

/// Gives a result processor access to its surroundings: the owning chain's
/// shared state and the upstream result processors.
pub struct Context<'a> {
    parent: &'a mut QueryProcessingCtx,
    upstream: &'a mut [Box<dyn ResultProcessor + Send>],
}

impl Context<'_> {
    /// The chain-wide shared state.
    pub fn parent_mut(&mut self) -> &mut QueryProcessingCtx {
        self.parent
    }

    /// The previous result processor in the pipeline, if any.
    pub fn upstream(&mut self) -> Option<Upstream<'_>> {
        let (last, rest) = self.upstream.split_last_mut()?;
        Some(Upstream {
            parent: &mut *self.parent,
            last,
            rest,
        })
    }
}

/// The previous result processor in the pipeline.
pub struct Upstream<'a> {
    parent: &'a mut QueryProcessingCtx,
    last: &'a mut Box<dyn ResultProcessor + Send>,
    rest: &'a mut [Box<dyn ResultProcessor + Send>],
}

impl Upstream<'_> {
    /// Pull the next [`SearchResult`] from this result processor into the
    /// provided `out` location.
    pub fn next(&mut self, out: &mut SearchResult) -> Result<Option<()>, Error> {
        let cx = Context {
            parent: &mut *self.parent,
            upstream: &mut *self.rest,
        };
        self.last.next(cx, out)
    }
}

/// The owning collection of linked result processors plus the chain-wide
/// state. Its `next` drives the tail processor.
#[derive(Default)]
pub struct QueryIterator {
    parent: QueryProcessingCtx,
    procs: Vec<Box<dyn ResultProcessor + Send>>,
}

impl QueryIterator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new result processor at the end of the chain. It will pull
    /// from the previously appended processor.
    pub fn append<P>(&mut self, result_processor: P)
    where
        P: ResultProcessor + Send + 'static,
    {
        self.procs.push(Box::new(result_processor));
    }

    /// Pull the next result from the end of the chain.
    pub fn next(&mut self, out: &mut SearchResult) -> Result<Option<()>, Error> {
        let Some((last, rest)) = self.procs.split_last_mut() else {
            return Ok(None);
        };
        last.next(
            Context {
                parent: &mut self.parent,
                upstream: rest,
            },
            out,
        )
    }

    pub const fn total_results(&self) -> usize {
        self.parent.total_results()
    }

    pub fn len(&self) -> usize {
        self.procs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.procs.is_empty()
    }
}
