/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

use crate::array::ArrayBuilder;
use crate::value::ReplyValue;

/// An array being built (with postponed or fixed length).
pub(crate) struct ContainerBuilder {
    pub(crate) elements: Vec<ReplyValue>,
    /// `None` = postponed length (committed when the [`ArrayBuilder`] is
    /// dropped); `Some(n)` = fixed length, finalized automatically once `n`
    /// elements have been added.
    pub(crate) expected_len: Option<usize>,
}

/// Buffers a stream of reply elements, tracking array nesting.
///
/// Scalar emitters append to the innermost open array, or to the top-level
/// reply list when no array is open. [`Replier::take`] hands the completed
/// top-level values to the host framing layer (or to test assertions).
#[derive(Default)]
pub struct Replier {
    builder_stack: Vec<ContainerBuilder>,
    completed: Vec<ReplyValue>,
}

impl Replier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a value to the current context (either an open array or the
    /// completed list), cascading auto-finalization of fixed-size arrays.
    pub(crate) fn push_value(&mut self, value: ReplyValue) {
        let Some(builder) = self.builder_stack.last_mut() else {
            self.completed.push(value);
            return;
        };
        builder.elements.push(value);

        self.finalize_current_if_needed();
    }

    /// Finalize the current builder if it is fixed-length and complete.
    fn finalize_current_if_needed(&mut self) {
        let Some(builder) = self.builder_stack.last() else {
            return;
        };
        let is_complete = builder
            .expected_len
            .is_some_and(|len| builder.elements.len() >= len);
        if !is_complete {
            return;
        }

        let builder = self.builder_stack.pop().expect("checked non-empty above");
        self.push_value(ReplyValue::Array(builder.elements));
    }

    /// Reply with a 64-bit signed integer.
    pub fn long_long(&mut self, value: i64) {
        self.push_value(ReplyValue::LongLong(value));
    }

    /// Reply with a double-precision floating point number.
    pub fn double(&mut self, value: f64) {
        self.push_value(ReplyValue::Double(value));
    }

    /// Reply with a simple string.
    pub fn simple_string(&mut self, s: &str) {
        self.push_value(ReplyValue::SimpleString(s.to_owned()));
    }

    /// Reply with a bulk string.
    pub fn bulk_string(&mut self, s: impl AsRef<[u8]>) {
        self.push_value(ReplyValue::BulkString(s.as_ref().to_vec()));
    }

    /// Reply with a null.
    pub fn null(&mut self) {
        self.push_value(ReplyValue::Null);
    }

    /// Reply with an error.
    pub fn error(&mut self, message: &str) {
        self.push_value(ReplyValue::Error(message.to_owned()));
    }

    /// Reply with an empty array.
    pub fn empty_array(&mut self) {
        self.push_value(ReplyValue::Array(Vec::new()));
    }

    /// Start building an array with automatic length tracking.
    ///
    /// The array is committed when the returned [`ArrayBuilder`] is dropped.
    pub fn array(&mut self) -> ArrayBuilder<'_> {
        self.builder_stack.push(ContainerBuilder {
            elements: Vec::new(),
            expected_len: None,
        });
        let depth = self.builder_stack.len();
        ArrayBuilder {
            replier: self,
            depth,
        }
    }

    /// Declare a fixed-size array (length known upfront). The array closes
    /// by itself once `len` elements have been emitted.
    pub fn fixed_array(&mut self, len: usize) {
        if len == 0 {
            self.push_value(ReplyValue::Array(Vec::new()));
            return;
        }
        self.builder_stack.push(ContainerBuilder {
            elements: Vec::new(),
            expected_len: Some(len),
        });
    }

    pub(crate) fn finalize_array(&mut self, depth: usize) {
        assert_eq!(
            self.builder_stack.len(),
            depth,
            "array closed while a nested array is still open"
        );
        let builder = self
            .builder_stack
            .pop()
            .expect("finalize_array with no open array");
        debug_assert!(
            builder.expected_len.is_none(),
            "fixed-size arrays finalize themselves"
        );
        self.push_value(ReplyValue::Array(builder.elements));
    }

    /// Take the completed top-level replies.
    ///
    /// # Panics
    ///
    /// Panics if an array is still open.
    pub fn take(&mut self) -> Vec<ReplyValue> {
        assert!(
            self.builder_stack.is_empty(),
            "take() while an array is still open"
        );
        std::mem::take(&mut self.completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn scalars_land_at_top_level() {
        let mut replier = Replier::new();
        replier.long_long(42);
        replier.simple_string("OK");
        assert_eq!(
            replier.take(),
            vec![
                ReplyValue::LongLong(42),
                ReplyValue::SimpleString("OK".to_owned())
            ]
        );
    }

    #[test]
    fn fixed_array_auto_finalizes() {
        let mut replier = Replier::new();
        replier.fixed_array(2);
        replier.long_long(1);
        replier.long_long(2);
        replier.double(0.5);

        assert_eq!(
            replier.take(),
            vec![
                ReplyValue::Array(vec![ReplyValue::LongLong(1), ReplyValue::LongLong(2)]),
                ReplyValue::Double(0.5),
            ]
        );
    }

    #[test]
    fn fixed_array_of_len_zero_is_immediate() {
        let mut replier = Replier::new();
        replier.fixed_array(0);
        assert_eq!(replier.take(), vec![ReplyValue::Array(Vec::new())]);
    }

    #[test]
    fn nested_fixed_array_counts_as_one_parent_element() {
        let mut replier = Replier::new();
        replier.fixed_array(2);
        replier.fixed_array(1);
        replier.long_long(7);
        replier.null();

        assert_eq!(
            replier.take(),
            vec![ReplyValue::Array(vec![
                ReplyValue::Array(vec![ReplyValue::LongLong(7)]),
                ReplyValue::Null,
            ])]
        );
    }

    #[test]
    #[should_panic(expected = "take() while an array is still open")]
    fn take_with_open_array_panics() {
        let mut replier = Replier::new();
        replier.fixed_array(2);
        replier.long_long(1);
        let _ = replier.take();
    }
}
