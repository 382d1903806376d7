/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

//! Query execution and cursors for the search commands.
//!
//! A command handler builds an [`AREQ`], applies the search context, builds
//! the result-processor pipeline, and then either executes it to completion
//! in one reply or parks it behind a cursor for incremental retrieval.

mod exec;
mod explain;
mod plan;
mod pipeline;
mod request;

pub use exec::SearchModule;
pub use plan::{AggregatePlan, ArrangeStep, SortBy};
pub use request::AREQ;

use std::time::Duration;

use enumflags2::{BitFlags, bitflags};

/// Flags a request is built with; a subset controls the reply layout.
#[bitflags]
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum RequestFlag {
    /// Document-oriented search command (as opposed to an aggregation).
    IsSearch = 0x01,
    /// The client asked for incremental retrieval through a cursor.
    IsCursor = 0x02,
    /// Emit the relevance score of each result.
    SendScores = 0x04,
    /// Emit the document payload of each result.
    SendPayloads = 0x08,
    /// Emit the primary sort key of each result.
    SendSortKeys = 0x10,
    /// Do not emit the field name/value block.
    SendNoFields = 0x20,
    /// Emit only the total; no rows at all.
    NoRows = 0x40,
}

pub type RequestFlags = BitFlags<RequestFlag>;

/// Flags describing where execution currently stands.
#[bitflags]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum StateFlag {
    /// The pipeline reached its end; no further `next` call occurs.
    IterDone = 0x01,
    /// A pipeline stage failed.
    Error = 0x02,
}

pub type StateFlags = BitFlags<StateFlag>;

/// Module-wide execution settings, handed to the handlers at startup.
#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    /// Chunk size used by cursor reads that specify no COUNT.
    pub cursor_read_size: usize,
    /// Idle window for cursors reserved without MAXIDLE, and the upper
    /// bound a requested MAXIDLE is clamped to.
    pub cursor_max_idle: Duration,
    /// How many cursors one index may have open at a time.
    pub max_cursors_per_index: usize,
    /// Result window for search commands that specify no LIMIT.
    pub default_search_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            cursor_read_size: 1000,
            cursor_max_idle: Duration::from_secs(300),
            max_cursors_per_index: 128,
            default_search_limit: 10,
        }
    }
}
