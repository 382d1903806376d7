/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

//! Reply abstraction for building protocol responses.
//!
//! This crate provides ergonomic wrappers for composing multi-bulk replies,
//! eliminating manual length tracking for arrays. The host binding has no
//! deferred-length primitive here, so elements are buffered into a
//! [`ReplyValue`] tree and the length is committed when the builder closes;
//! the public surface stays the same as with a native postponed-length API.
//!
//! # Example
//!
//! ```
//! use reply::Replier;
//!
//! let mut replier = Replier::new();
//! let mut arr = replier.array();
//! arr.long_long(2);
//! arr.double(1.5);
//! // Length is automatically committed when `arr` is dropped.
//! drop(arr);
//! let replies = replier.take();
//! ```

mod array;
mod replier;
mod value;

pub use array::ArrayBuilder;
pub use replier::Replier;
pub use value::ReplyValue;
