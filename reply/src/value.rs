/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

/// One element of a multi-bulk reply.
#[derive(Clone, Debug, PartialEq)]
pub enum ReplyValue {
    /// A 64-bit signed integer reply.
    LongLong(i64),
    /// A double-precision floating point reply.
    Double(f64),
    /// A simple (status) string reply.
    SimpleString(String),
    /// A bulk string reply carrying arbitrary bytes.
    BulkString(Vec<u8>),
    /// A null reply.
    Null,
    /// An error reply.
    Error(String),
    /// An array reply containing zero or more values.
    Array(Vec<ReplyValue>),
}

impl ReplyValue {
    /// Convenience constructor for bulk strings in tests and fixtures.
    pub fn bulk(s: impl AsRef<[u8]>) -> Self {
        Self::BulkString(s.as_ref().to_vec())
    }
}
