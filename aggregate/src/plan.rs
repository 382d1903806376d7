/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

//! The compiled plan the pipeline is built from.
//!
//! Query parsing proper is the planner's business; what is kept here is the
//! execution-relevant skeleton: the lookup scope results are serialized
//! from, the fields marked for loading, and the arrange step (sorting and
//! pagination) the serializer consults for the primary sort key.

use std::sync::Arc;

use rlookup::{RLookup, RLookupKey};

/// One SORTBY criterion as written in the request.
#[derive(Debug, Clone)]
pub struct SortBy {
    pub field: Arc<str>,
    pub ascending: bool,
}

/// Plan node describing sorting and pagination.
#[derive(Debug, Default)]
pub struct ArrangeStep {
    /// Sort criteria as compiled from the arguments.
    pub sort_by: Vec<SortBy>,
    /// The ordered lookup keys defining the sort, resolved against the
    /// schema at apply-context time. The first is the primary sort key
    /// used for serialization.
    pub sortkeys_lk: Vec<RLookupKey>,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl ArrangeStep {
    /// The key whose value is emitted as the result's sort key.
    pub fn primary_sort_key(&self) -> Option<&RLookupKey> {
        self.sortkeys_lk.first()
    }

    /// How many sorted results the pipeline needs to retain to serve the
    /// pagination window.
    pub fn window(&self) -> Option<usize> {
        self.limit.map(|limit| self.offset + limit)
    }
}

/// The compiled plan of one request.
#[derive(Debug, Default)]
pub struct AggregatePlan {
    lookup: RLookup,
    /// Fields the request explicitly marked for loading from documents.
    pub load_fields: Vec<Arc<str>>,
    arrange: Option<ArrangeStep>,
}

impl AggregatePlan {
    /// The final lookup scope; field serialization iterates its keys in
    /// insertion order.
    pub fn lookup(&self) -> &RLookup {
        &self.lookup
    }

    pub fn lookup_mut(&mut self) -> &mut RLookup {
        &mut self.lookup
    }

    pub fn arrange_step(&self) -> Option<&ArrangeStep> {
        self.arrange.as_ref()
    }

    pub fn arrange_step_mut(&mut self) -> Option<&mut ArrangeStep> {
        self.arrange.as_mut()
    }

    /// The arrange step, created on first use.
    pub fn ensure_arrange_step(&mut self) -> &mut ArrangeStep {
        self.arrange.get_or_insert_default()
    }
}
