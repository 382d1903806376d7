/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

//! Loading document field values into a row.

use value::RSValue;

use crate::{RLookup, RLookupKeyFlag, RLookupRow};

/// Anything that can hand out field values by name. Implemented by the
/// document types of the index layer.
pub trait FieldSource {
    fn field_value(&self, name: &str) -> Option<RSValue>;
}

/// Populate `row` with the document-sourced keys of `lookup`.
///
/// Keys whose value lives in the sorting vector are skipped; the row
/// resolves those through [`RLookupKey::svidx`](crate::RLookupKey::svidx)
/// at read time.
pub fn load_row(lookup: &RLookup, src: &impl FieldSource, row: &mut RLookupRow) {
    for key in lookup.keys() {
        if !key.flags().contains(RLookupKeyFlag::DocSrc) {
            continue;
        }
        if key.flags().contains(RLookupKeyFlag::SvSrc) {
            continue;
        }
        if let Some(val) = src.field_value(key.name()) {
            row.write_key(key, val);
        }
    }
}
