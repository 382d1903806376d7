/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

//! Human-readable rendering of a parsed request against the index schema.

use std::fmt::Write;

use rlookup::RLookupKeyFlag;

use crate::request::AREQ;

impl AREQ {
    /// Render the parsed query and plan as indented text, the way the
    /// explain command replies it.
    pub(crate) fn dump_explain(&self) -> String {
        let mut out = String::new();

        if self.query() == "*" {
            out.push_str("WILDCARD\n");
        } else {
            let terms: Vec<&str> = self.query().split_whitespace().collect();
            if terms.len() == 1 {
                let _ = writeln!(out, "TERM {{ {} }}", terms[0]);
            } else {
                out.push_str("INTERSECT {\n");
                for term in terms {
                    let _ = writeln!(out, "  TERM {{ {term} }}");
                }
                out.push_str("}\n");
            }
        }

        if let Some(astp) = self.plan().arrange_step() {
            for (sort, key) in astp.sort_by.iter().zip(&astp.sortkeys_lk) {
                let source = if key.flags().contains(RLookupKeyFlag::SvSrc) {
                    "sort-vector"
                } else {
                    "row"
                };
                let _ = writeln!(
                    out,
                    "SORTBY {{ {} {} ({source}) }}",
                    sort.field,
                    if sort.ascending { "ASC" } else { "DESC" },
                );
            }
            if let Some(limit) = astp.limit {
                let _ = writeln!(out, "LIMIT {{ {} {} }}", astp.offset, limit);
            }
        }

        if !self.plan().load_fields.is_empty() {
            let fields: Vec<&str> = self.plan().load_fields.iter().map(|f| &**f).collect();
            let _ = writeln!(out, "LOAD {{ {} }}", fields.join(" "));
        }

        out
    }
}
