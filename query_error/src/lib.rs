/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

//! Error reporting for query compilation and execution.
//!
//! A [`QueryError`] accumulates the *first* failure observed while a request
//! is built or driven. Later attempts to record an error are ignored so the
//! original cause is what reaches the client.

use std::fmt::{Debug, Display};
use strum::FromRepr;

#[derive(Clone, Copy, Debug, Default, FromRepr, PartialEq, Eq)]
#[repr(u8)]
pub enum QueryErrorCode {
    #[default]
    Ok = 0,
    /// Generic failure evaluating the query.
    Generic,
    /// The query string could not be parsed.
    Syntax,
    /// The query/aggregation arguments could not be parsed.
    ParseArgs,
    /// The named index does not exist.
    NoIndex,
    /// A referenced property is neither loaded nor produced by the pipeline.
    NoPropKey,
    /// The cursor registry refused to allocate a cursor.
    CursorAlloc,
    /// The requested cursor id is unknown to the registry.
    CursorNotFound,
    /// The cursor id argument was not a valid integer.
    BadCursorId,
    /// The COUNT argument was not a valid integer.
    BadCount,
    /// The execution time limit was reached.
    TimedOut,
    /// A pipeline stage failed at runtime.
    Runtime,
}

impl QueryErrorCode {
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }

    pub const fn to_str(self) -> &'static str {
        match self {
            Self::Ok => "Success (not an error)",
            Self::Generic => "QUERY_GENERIC: Generic error evaluating the query",
            Self::Syntax => "QUERY_SYNTAX: Parsing/Syntax error for query string",
            Self::ParseArgs => "QUERY_PARSE_ARGS: Error parsing query/aggregation arguments",
            Self::NoIndex => "QUERY_INDEX_NOT_FOUND: Index not found",
            Self::NoPropKey => "QUERY_PROP_NOT_FOUND: Property not loaded nor in pipeline",
            Self::CursorAlloc => "QUERY_CURSOR_ALLOC_FAILED: Could not allocate a cursor",
            Self::CursorNotFound => "QUERY_CURSOR_NOT_FOUND: Cursor not found",
            Self::BadCursorId => "QUERY_CURSOR_ID_BAD: Bad cursor ID",
            Self::BadCount => "QUERY_COUNT_BAD: Bad value for COUNT",
            Self::TimedOut => "QUERY_TIMEOUT: Timeout limit was reached",
            Self::Runtime => "QUERY_RUNTIME: Query pipeline failed during execution",
        }
    }
}

impl Display for QueryErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.to_str())
    }
}

/// The first error recorded during a request's lifetime.
///
/// The public message is what gets replied to the client; the private
/// message may carry internal detail that only ends up in logs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueryError {
    code: QueryErrorCode,
    public_message: Option<String>,
    private_message: Option<String>,
}

impl QueryError {
    pub const fn is_ok(&self) -> bool {
        self.code.is_ok()
    }

    pub const fn code(&self) -> QueryErrorCode {
        self.code
    }

    /// Record an error code without a message. A no-op if an error is
    /// already recorded.
    pub const fn set_code(&mut self, code: QueryErrorCode) {
        if !self.is_ok() {
            return;
        }

        self.code = code;
    }

    pub fn public_message(&self) -> Option<&str> {
        self.public_message.as_deref()
    }

    pub fn private_message(&self) -> Option<&str> {
        self.private_message.as_deref()
    }

    pub fn set_private_message(&mut self, private_message: Option<String>) {
        self.private_message = private_message;
    }

    /// Record an error code with a message. A no-op if an error is already
    /// recorded.
    pub fn set_error(&mut self, code: QueryErrorCode, message: impl Into<String>) {
        if !self.is_ok() {
            return;
        }

        let message = message.into();
        self.code = code;
        self.public_message = Some(message.clone());
        self.private_message = Some(message);
    }

    /// Build a `QueryError` holding `code` and `message` in one step.
    pub fn with_error(code: QueryErrorCode, message: impl Into<String>) -> Self {
        let mut err = Self::default();
        err.set_error(code, message);
        err
    }

    /// The text replied to the client for this error.
    pub fn reply_text(&self) -> &str {
        self.public_message
            .as_deref()
            .unwrap_or_else(|| self.code.to_str())
    }

    /// Clears the error code and messages.
    pub fn clear(&mut self) {
        self.code = QueryErrorCode::default();
        self.private_message = None;
        self.public_message = None;
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(f, "{}", self.reply_text())
    }
}

impl std::error::Error for QueryError {}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_is_ok() {
        let err = QueryError::default();
        assert!(err.is_ok());
        assert_eq!(err.code(), QueryErrorCode::Ok);
        assert_eq!(err.public_message(), None);
    }

    #[test]
    fn first_error_sticks() {
        let mut err = QueryError::default();
        err.set_error(QueryErrorCode::NoIndex, "idx: no such index");
        err.set_error(QueryErrorCode::Syntax, "should be ignored");

        assert_eq!(err.code(), QueryErrorCode::NoIndex);
        assert_eq!(err.reply_text(), "idx: no such index");
    }

    #[test]
    fn clear_resets_code_and_messages() {
        let mut err = QueryError::with_error(QueryErrorCode::BadCount, "Bad value for COUNT");
        err.clear();

        assert!(err.is_ok());
        assert_eq!(err.public_message(), None);
        assert_eq!(err.private_message(), None);
    }

    #[test]
    fn reply_text_falls_back_to_code() {
        let mut err = QueryError::default();
        err.set_code(QueryErrorCode::TimedOut);
        assert_eq!(err.reply_text(), QueryErrorCode::TimedOut.to_str());
    }
}
