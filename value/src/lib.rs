/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

//! The dynamic value type flowing through result rows, sorting vectors and
//! sort keys.

use std::cmp::Ordering;
use std::sync::Arc;

/// A value stored in a result row or sorting vector.
///
/// `HostString` references a string owned by the host key-value server;
/// it is reference-counted so rows can share it without copying.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum RSValue {
    #[default]
    Null,
    Num(f64),
    String(String),
    HostString(Arc<str>),
}

impl RSValue {
    pub fn num(v: f64) -> Self {
        Self::Num(v)
    }

    pub fn string(s: impl Into<String>) -> Self {
        Self::String(s.into())
    }

    pub fn host_string(s: impl Into<Arc<str>>) -> Self {
        Self::HostString(s.into())
    }

    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The number held by this value, if it is a number.
    pub const fn as_num(&self) -> Option<f64> {
        match self {
            Self::Num(v) => Some(*v),
            _ => None,
        }
    }

    /// The string slice held by this value, if it is any string kind.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::HostString(s) => Some(s),
            _ => None,
        }
    }

    /// Total order used by the sorter: numbers first (NaN below every other
    /// number), then strings by byte order, nulls last.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Num(a), Self::Num(b)) => cmp_f64(*a, *b),
            (a, b) => match (a.as_str(), b.as_str()) {
                (Some(a), Some(b)) => a.cmp(b),
                _ => self.type_rank().cmp(&other.type_rank()),
            },
        }
    }

    const fn type_rank(&self) -> u8 {
        match self {
            Self::Num(_) => 0,
            Self::String(_) | Self::HostString(_) => 1,
            Self::Null => 2,
        }
    }
}

fn cmp_f64(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or_else(|| {
        // At least one NaN. NaN sorts below any proper number.
        match (a.is_nan(), b.is_nan()) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => Ordering::Equal,
        }
    })
}

impl From<f64> for RSValue {
    fn from(v: f64) -> Self {
        Self::Num(v)
    }
}

impl From<&str> for RSValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for RSValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}
