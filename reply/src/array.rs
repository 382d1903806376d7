/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

use crate::replier::Replier;

/// Builder for a postponed-length array.
///
/// Created via [`Replier::array`] (or nested through
/// [`ArrayBuilder::array`]); the length is committed when the builder is
/// dropped. Elements added through the builder land in the innermost open
/// array, so nested fixed-size arrays compose naturally.
///
/// # Panics
///
/// Dropping the builder while a nested postponed-length array is still open
/// panics; close inner builders first.
pub struct ArrayBuilder<'a> {
    pub(crate) replier: &'a mut Replier,
    pub(crate) depth: usize,
}

impl ArrayBuilder<'_> {
    /// Add a 64-bit signed integer to the array.
    pub fn long_long(&mut self, value: i64) {
        self.replier.long_long(value);
    }

    /// Add a double-precision floating point number to the array.
    pub fn double(&mut self, value: f64) {
        self.replier.double(value);
    }

    /// Add a simple string to the array.
    pub fn simple_string(&mut self, s: &str) {
        self.replier.simple_string(s);
    }

    /// Add a bulk string to the array.
    pub fn bulk_string(&mut self, s: impl AsRef<[u8]>) {
        self.replier.bulk_string(s);
    }

    /// Add a null to the array.
    pub fn null(&mut self) {
        self.replier.null();
    }

    /// Add an empty array to the array.
    pub fn empty_array(&mut self) {
        self.replier.empty_array();
    }

    /// Start a nested postponed-length array.
    ///
    /// The nested array counts as 1 element in the parent array.
    pub fn array(&mut self) -> ArrayBuilder<'_> {
        self.replier.array()
    }

    /// Start a nested fixed-size array; it closes itself after `len`
    /// elements.
    pub fn fixed_array(&mut self, len: usize) {
        self.replier.fixed_array(len);
    }
}

impl Drop for ArrayBuilder<'_> {
    fn drop(&mut self) {
        self.replier.finalize_array(self.depth);
    }
}
