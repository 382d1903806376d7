/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

use std::{
    collections::HashMap,
    fmt::Display,
    sync::{Arc, RwLock},
};

use crate::IndexSpec;

/// The index referenced by a long-lived context no longer exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDropped(pub Arc<str>);

impl Display for IndexDropped {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: no such index", self.0)
    }
}

impl std::error::Error for IndexDropped {}

/// The process-wide name → index map. Handlers receive a shared handle at
/// startup instead of reaching for a global.
#[derive(Debug, Default)]
pub struct IndexRegistry {
    specs: RwLock<HashMap<Arc<str>, Arc<IndexSpec>>>,
}

impl IndexRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) an index.
    pub fn declare(&self, spec: IndexSpec) {
        let mut specs = self.specs.write().expect("index registry poisoned");
        specs.insert(spec.name_arc(), Arc::new(spec));
    }

    pub fn get(&self, name: &str) -> Option<Arc<IndexSpec>> {
        let specs = self.specs.read().expect("index registry poisoned");
        specs.get(name).cloned()
    }

    /// Drop an index. Cursors over it will fail their next reopen.
    pub fn remove(&self, name: &str) -> bool {
        let mut specs = self.specs.write().expect("index registry poisoned");
        specs.remove(name).is_some()
    }
}
