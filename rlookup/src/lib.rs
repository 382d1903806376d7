/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

//! Schema resolution for result rows.
//!
//! An [`RLookup`] maps field names to typed slots ([`RLookupKey`]) in an
//! [`RLookupRow`]. Registering a key once avoids repeated string
//! comparisons on the hot path; the registry also keeps insertion order,
//! which is the order fields are serialized in.

mod key;
mod load;
mod row;

pub use key::{RLookupKey, RLookupKeyFlag, RLookupKeyFlags, TRANSIENT_FLAGS};
pub use load::{FieldSource, load_row};
pub use row::RLookupRow;

/// An ordered registry of [`RLookupKey`]s for one pipeline scope.
#[derive(Clone, Debug, Default)]
pub struct RLookup {
    keys: Vec<RLookupKey>,
}

impl RLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a key previously registered under `name`.
    pub fn get_key_read(&self, name: &str) -> Option<&RLookupKey> {
        self.keys.iter().find(|k| k.name() == name)
    }

    /// Find or create the key for `name`. A fresh key gets the next free
    /// row slot; an existing key absorbs `flags` only when
    /// [`RLookupKeyFlag::Override`] is among them.
    pub fn get_key_write(&mut self, name: &str, flags: RLookupKeyFlags) -> &RLookupKey {
        if let Some(pos) = self.keys.iter().position(|k| k.name() == name) {
            if flags.contains(RLookupKeyFlag::Override) {
                self.keys[pos].add_flags(flags);
            }
            return &self.keys[pos];
        }

        let dstidx = u16::try_from(self.keys.len()).expect("more than u16::MAX lookup keys");
        self.keys.push(RLookupKey::new(name.into(), dstidx, flags));
        self.keys.last().expect("just pushed")
    }

    /// Mutable access to the key for `name`, if registered.
    pub fn get_key_mut(&mut self, name: &str) -> Option<&mut RLookupKey> {
        self.keys.iter_mut().find(|k| k.name() == name)
    }

    /// The keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &RLookupKey> {
        self.keys.iter()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}
