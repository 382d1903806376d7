/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

use std::sync::Arc;
use std::time::Duration;

use index_spec::{ConcurrentSearchCtx, IndexSpec, SearchCtx};
use query_error::{QueryError, QueryErrorCode};
use result_processor::QueryIterator;
use rlookup::{RLookupKey, RLookupKeyFlag, RLookupKeyFlags};
use search_result::SearchResult;

use crate::plan::{AggregatePlan, SortBy};
use crate::{RequestFlag, RequestFlags, StateFlag, StateFlags};

/// The per-command execution object.
///
/// Owns the compiled plan, the pipeline, the request and state flags, the
/// applied search context and the cursor configuration. Ownership is
/// exclusive: a command handler holds it, or exactly one cursor does.
pub struct AREQ {
    req_flags: RequestFlags,
    state_flags: StateFlags,
    query: String,
    plan: AggregatePlan,
    pub(crate) cursor_chunk_size: usize,
    pub(crate) cursor_max_idle: Option<Duration>,
    sctx: Option<SearchCtx>,
    conc: Option<ConcurrentSearchCtx>,
    pub(crate) qiter: QueryIterator,
    pub(crate) last_error: Option<QueryError>,
}

impl AREQ {
    pub fn new() -> Self {
        Self {
            req_flags: RequestFlags::empty(),
            state_flags: StateFlags::empty(),
            query: String::new(),
            plan: AggregatePlan::default(),
            cursor_chunk_size: 0,
            cursor_max_idle: None,
            sctx: None,
            conc: None,
            qiter: QueryIterator::new(),
            last_error: None,
        }
    }

    pub const fn req_flags(&self) -> RequestFlags {
        self.req_flags
    }

    pub(crate) fn add_req_flags(&mut self, flags: impl Into<RequestFlags>) {
        self.req_flags |= flags.into();
    }

    pub const fn state_flags(&self) -> StateFlags {
        self.state_flags
    }

    pub(crate) fn add_state_flags(&mut self, flags: impl Into<StateFlags>) {
        self.state_flags |= flags.into();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn plan(&self) -> &AggregatePlan {
        &self.plan
    }

    pub(crate) fn spec(&self) -> Option<&Arc<IndexSpec>> {
        self.sctx.as_ref().map(SearchCtx::spec)
    }

    pub(crate) fn set_concurrent_ctx(&mut self, conc: ConcurrentSearchCtx) {
        self.conc = Some(conc);
    }

    /// Re-acquire host resources released at the previous suspension point.
    /// Mandatory between cursor reads.
    pub(crate) fn reopen_keys(&mut self) -> Result<(), QueryError> {
        match &mut self.conc {
            Some(conc) => conc.reopen_keys().map(drop).map_err(|err| {
                QueryError::with_error(QueryErrorCode::NoIndex, err.to_string())
            }),
            None => Ok(()),
        }
    }

    /// Release host resources at a suspension point.
    pub(crate) fn close_keys(&mut self) {
        if let Some(conc) = &mut self.conc {
            conc.close_keys();
        }
    }

    /// Pull the next result from the pipeline's tail processor.
    pub(crate) fn pipeline_next(
        &mut self,
        out: &mut SearchResult,
    ) -> Result<Option<()>, result_processor::Error> {
        debug_assert!(
            !self.state_flags.contains(StateFlag::IterDone),
            "next called after the pipeline was marked done"
        );
        self.qiter.next(out)
    }

    pub(crate) fn total_results(&self) -> usize {
        self.qiter.total_results()
    }

    /// Compile arguments 2..N of the command into the plan. This covers
    /// the execution-relevant vocabulary; the full query string is handed
    /// to the index as-is.
    pub fn compile(&mut self, args: &[&str]) -> Result<(), QueryError> {
        let Some((query, rest)) = args.split_first() else {
            return Err(QueryError::with_error(
                QueryErrorCode::ParseArgs,
                "No query string provided",
            ));
        };
        self.query = (*query).to_owned();

        let mut it = rest.iter().peekable();
        while let Some(arg) = it.next() {
            match arg.to_ascii_uppercase().as_str() {
                "NOCONTENT" => self.req_flags |= RequestFlag::SendNoFields,
                "WITHSCORES" => self.req_flags |= RequestFlag::SendScores,
                "WITHPAYLOADS" => self.req_flags |= RequestFlag::SendPayloads,
                "WITHSORTKEYS" => self.req_flags |= RequestFlag::SendSortKeys,
                "WITHCURSOR" => self.req_flags |= RequestFlag::IsCursor,
                "NOROWS" => self.req_flags |= RequestFlag::NoRows,
                "COUNT" => {
                    if !self.req_flags.contains(RequestFlag::IsCursor) {
                        return Err(QueryError::with_error(
                            QueryErrorCode::ParseArgs,
                            "COUNT is only valid together with WITHCURSOR",
                        ));
                    }
                    self.cursor_chunk_size = parse_num(&mut it, "COUNT")?;
                }
                "MAXIDLE" => {
                    if !self.req_flags.contains(RequestFlag::IsCursor) {
                        return Err(QueryError::with_error(
                            QueryErrorCode::ParseArgs,
                            "MAXIDLE is only valid together with WITHCURSOR",
                        ));
                    }
                    let millis: u64 = parse_num(&mut it, "MAXIDLE")? as u64;
                    self.cursor_max_idle = Some(Duration::from_millis(millis));
                }
                "LIMIT" => {
                    let offset = parse_num(&mut it, "LIMIT")?;
                    let num = parse_num(&mut it, "LIMIT")?;
                    let arrange = self.plan.ensure_arrange_step();
                    arrange.offset = offset;
                    arrange.limit = Some(num);
                }
                "SORTBY" => {
                    let Some(field) = it.next() else {
                        return Err(bad_arguments("SORTBY"));
                    };
                    let ascending = match it.peek().map(|dir| dir.to_ascii_uppercase()) {
                        Some(dir) if dir == "ASC" => {
                            it.next();
                            true
                        }
                        Some(dir) if dir == "DESC" => {
                            it.next();
                            false
                        }
                        _ => true,
                    };
                    self.plan.ensure_arrange_step().sort_by.push(SortBy {
                        field: Arc::from(*field),
                        ascending,
                    });
                }
                "LOAD" => {
                    let count: usize = parse_num(&mut it, "LOAD")?;
                    for _ in 0..count {
                        let Some(field) = it.next() else {
                            return Err(bad_arguments("LOAD"));
                        };
                        self.plan.load_fields.push(Arc::from(*field));
                    }
                }
                unknown => {
                    return Err(QueryError::with_error(
                        QueryErrorCode::ParseArgs,
                        format!("Unknown argument `{unknown}`"),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Resolve lookup keys against the schema, fix up sort key pointers and
    /// validate field references.
    pub fn apply_context(&mut self, sctx: SearchCtx) -> Result<(), QueryError> {
        let spec = Arc::clone(sctx.spec());

        // A search request serializes the whole document unless told not
        // to, so every schema field gets a key in the final scope.
        if self.req_flags.contains(RequestFlag::IsSearch)
            && self.plan.load_fields.is_empty()
            && !self.req_flags.contains(RequestFlag::SendNoFields)
        {
            for fs in spec.fields() {
                resolve_key(&mut self.plan, &spec, fs.name(), RLookupKeyFlags::empty());
            }
        }

        let load_fields = self.plan.load_fields.clone();
        for name in &load_fields {
            let key = resolve_key(
                &mut self.plan,
                &spec,
                name,
                RLookupKeyFlag::ExplicitReturn.into(),
            );
            if !key.flags().contains(RLookupKeyFlag::SchemaSrc) {
                // Not in the schema: load it straight from the document.
                let key = self
                    .plan
                    .lookup_mut()
                    .get_key_mut(name)
                    .expect("key registered above");
                key.add_flags(RLookupKeyFlag::DocSrc.into());
            }
        }

        let sort_by = self
            .plan
            .arrange_step()
            .map(|astp| astp.sort_by.clone())
            .unwrap_or_default();
        let mut sortkeys = Vec::with_capacity(sort_by.len());
        for sort in &sort_by {
            let key = resolve_key(&mut self.plan, &spec, &sort.field, RLookupKeyFlags::empty());
            if key.flags().is_empty() {
                return Err(QueryError::with_error(
                    QueryErrorCode::NoPropKey,
                    format!("{}: Property not loaded nor in pipeline", sort.field),
                ));
            }
            sortkeys.push(key);
        }
        if let Some(astp) = self.plan.arrange_step_mut() {
            astp.sortkeys_lk = sortkeys;
        }

        self.sctx = Some(sctx);
        Ok(())
    }
}

impl Default for AREQ {
    fn default() -> Self {
        Self::new()
    }
}

/// Find-or-create `name` in the plan's final scope and absorb its schema
/// information. Returns a clone of the resolved key.
fn resolve_key(
    plan: &mut AggregatePlan,
    spec: &IndexSpec,
    name: &str,
    flags: RLookupKeyFlags,
) -> RLookupKey {
    plan.lookup_mut().get_key_write(name, flags);
    if let Some(fs) = spec.field_spec(name) {
        plan.lookup_mut()
            .get_key_mut(name)
            .expect("key registered above")
            .update_from_field_spec(fs);
    }
    plan.lookup()
        .get_key_read(name)
        .expect("key registered above")
        .clone()
}

fn parse_num<'a>(
    it: &mut std::iter::Peekable<std::slice::Iter<'_, &'a str>>,
    keyword: &str,
) -> Result<usize, QueryError> {
    it.next()
        .and_then(|arg| arg.parse().ok())
        .ok_or_else(|| bad_arguments(keyword))
}

fn bad_arguments(keyword: &str) -> QueryError {
    QueryError::with_error(
        QueryErrorCode::ParseArgs,
        format!("Bad arguments for {keyword}"),
    )
}
