/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

//! Command execution: reply serialization, the chunk protocol, and the
//! cursor command family.

use std::sync::Arc;

use cursor::{CursorGuard, CursorRegistry, CursorsConfig};
use index_spec::{ConcurrentSearchCtx, IndexRegistry, SearchCtx};
use query_error::{QueryError, QueryErrorCode};
use reply::{ArrayBuilder, Replier};
use result_processor::Error as RPError;
use rlookup::RLookupKeyFlag;
use search_result::SearchResult;
use value::RSValue;

use crate::request::AREQ;
use crate::{RequestFlag, SearchConfig, StateFlag};

#[derive(Clone, Copy, PartialEq, Eq)]
enum CommandType {
    Aggregate,
    Search,
    Explain,
}

/// Get the sorting key of the result. This will be the primary sort key of
/// the arrange step. Returns `None` if there is no sorting key.
fn get_sort_key<'a>(req: &AREQ, r: &'a SearchResult) -> Option<&'a RSValue> {
    let astp = req.plan().arrange_step()?;
    let kk = astp.primary_sort_key()?;
    if kk.flags().contains(RLookupKeyFlag::SvSrc) {
        r.row_data().sorting_vector().get(kk.svidx() as usize)
    } else {
        r.row_data().get_item(kk)
    }
}

/// Wire encoding of a numeric sort key: `#` plus the value with 17
/// significant digits, so clients can parse it back exactly.
fn format_sort_key_num(value: f64) -> String {
    if !value.is_finite() {
        return format!("#{value}");
    }
    let formatted = format!("{value:.17e}");
    let (mantissa, exp) = formatted
        .split_once('e')
        .expect("exponential float formatting always contains an e");
    let exp: i32 = exp.parse().expect("exponent is an integer");
    let sign = if exp < 0 { '-' } else { '+' };
    format!("#{mantissa}e{sign}{:02}", exp.abs())
}

fn reply_value(arr: &mut ArrayBuilder<'_>, value: &RSValue) {
    match value {
        RSValue::Num(num) => arr.double(*num),
        RSValue::String(s) => arr.bulk_string(s),
        RSValue::HostString(s) => arr.bulk_string(&**s),
        RSValue::Null => arr.null(),
    }
}

/// Serialize one result into the open reply array. Returns the number of
/// sections written; the deferred-length array remains the source of truth
/// for the wire length.
fn serialize_result(req: &AREQ, arr: &mut ArrayBuilder<'_>, r: &SearchResult) -> usize {
    let options = req.req_flags();
    let dmd = r.document_metadata();
    let mut count = 0;

    if let Some(dmd) = dmd
        && options.contains(RequestFlag::IsSearch)
    {
        arr.bulk_string(dmd.key());
        count += 1;
    }

    if options.contains(RequestFlag::SendScores) {
        arr.double(r.score());
        count += 1;
    }

    if options.contains(RequestFlag::SendPayloads) {
        count += 1;
        match dmd.and_then(|dmd| dmd.payload()) {
            Some(payload) => arr.bulk_string(payload),
            None => arr.null(),
        }
    }

    if options.contains(RequestFlag::SendSortKeys) {
        count += 1;
        match get_sort_key(req, r) {
            Some(RSValue::Num(num)) => arr.bulk_string(format_sort_key_num(*num)),
            Some(RSValue::String(s)) => arr.bulk_string(format!("${s}")),
            Some(RSValue::HostString(s)) => arr.bulk_string(format!("${s}")),
            // NIL, or any other type:
            _ => arr.null(),
        }
    }

    if !options.contains(RequestFlag::SendNoFields) {
        count += 1;
        let mut fields = arr.array();
        for kk in req.plan().lookup().keys() {
            if kk.is_hidden() {
                continue;
            }
            fields.simple_string(kk.name());
            match r.row_data().get_item(kk) {
                Some(v) => reply_value(&mut fields, v),
                None => fields.null(),
            }
        }
    }

    count
}

/// Sends a chunk of at most `limit` rows as one deferred-length array:
/// the running total first, then each serialized result.
///
/// On EOF or failure the request is marked done; a runtime error
/// additionally raises the error state flag and is kept for the caller
/// (the already-written elements stand, no error frame is injected). A
/// `Paused` yield propagates without marking the iteration done.
pub(crate) fn send_chunk(req: &mut AREQ, replier: &mut Replier, limit: usize) {
    let norows = req.req_flags().contains(RequestFlag::NoRows);
    let mut r = SearchResult::new();
    let mut nrows = 0usize;

    let mut arr = replier.array();

    let mut rc = req.pipeline_next(&mut r);
    arr.long_long(req.total_results() as i64);
    if let Ok(Some(())) = rc {
        if nrows < limit {
            nrows += 1;
            if !norows {
                serialize_result(req, &mut arr, &r);
            }
        }
        r.clear();

        while nrows < limit {
            rc = req.pipeline_next(&mut r);
            if !matches!(rc, Ok(Some(()))) {
                break;
            }
            if !norows {
                serialize_result(req, &mut arr, &r);
            }
            r.clear();
            nrows += 1;
        }
    }
    drop(arr);

    match rc {
        Ok(Some(())) => {} // limit reached mid-stream; the cursor resumes here
        Ok(None) => req.add_state_flags(StateFlag::IterDone),
        Err(RPError::Paused) => {} // resumable; not done
        Err(RPError::TimedOut) => {
            tracing::warn!("query timed out mid-chunk");
            req.last_error = Some(QueryError::with_error(
                QueryErrorCode::TimedOut,
                QueryErrorCode::TimedOut.to_str(),
            ));
            req.add_state_flags(StateFlag::IterDone);
        }
        Err(RPError::Error(err)) => {
            tracing::warn!(error = %err, "query pipeline failed");
            req.last_error = Some(err);
            req.add_state_flags(StateFlag::IterDone | StateFlag::Error);
        }
    }
}

impl AREQ {
    /// Execute to completion and free the request.
    pub fn execute(mut self, replier: &mut Replier) {
        send_chunk(&mut self, replier, usize::MAX);
    }
}

/// Stream one chunk from a leased cursor and either pause it again (reply
/// element: the cursor id) or dispose it (reply element: `0`).
fn run_cursor(
    mut cursor: CursorGuard<AREQ>,
    replier: &mut Replier,
    num: usize,
    config: &SearchConfig,
) {
    let id = cursor.id();
    let state_flags = {
        let req = cursor.exec_state_mut();
        let num = if num != 0 {
            num
        } else if req.cursor_chunk_size != 0 {
            req.cursor_chunk_size
        } else {
            config.cursor_read_size
        };
        // The chunk size sticks for subsequent READs without a COUNT.
        req.cursor_chunk_size = num;

        replier.fixed_array(2);
        send_chunk(req, replier, num);
        req.state_flags()
    };

    if state_flags.contains(StateFlag::Error) {
        let err = cursor.exec_state_mut().last_error.take();
        tracing::debug!(cursor_id = id, error = ?err, "cursor disposed after pipeline error");
        replier.long_long(0);
        cursor.dispose();
        return;
    }

    if state_flags.contains(StateFlag::IterDone) {
        replier.long_long(0);
        cursor.dispose();
    } else {
        replier.long_long(id as i64);
        cursor.exec_state_mut().close_keys();
        cursor.pause();
    }
}

/// The command surface of the search extension. Holds the process-scoped
/// registries; handlers receive it at startup instead of touching globals.
pub struct SearchModule {
    indexes: Arc<IndexRegistry>,
    cursors: Arc<CursorRegistry<AREQ>>,
    config: SearchConfig,
}

impl SearchModule {
    pub fn new(indexes: Arc<IndexRegistry>, config: SearchConfig) -> Self {
        Self {
            indexes,
            cursors: Arc::new(CursorRegistry::new(CursorsConfig {
                default_max_idle: config.cursor_max_idle,
                max_idle_limit: config.cursor_max_idle,
                default_cap: config.max_cursors_per_index,
            })),
            config,
        }
    }

    pub fn indexes(&self) -> &Arc<IndexRegistry> {
        &self.indexes
    }

    pub fn cursors(&self) -> &Arc<CursorRegistry<AREQ>> {
        &self.cursors
    }

    /// `FT.SEARCH <index> <query> [args...]`
    pub fn search_command(&self, argv: &[&str], replier: &mut Replier) {
        self.exec_command_common(argv, replier, CommandType::Search);
    }

    /// `FT.AGGREGATE <index> <query> [args...]`
    pub fn aggregate_command(&self, argv: &[&str], replier: &mut Replier) {
        self.exec_command_common(argv, replier, CommandType::Aggregate);
    }

    fn exec_command_common(&self, argv: &[&str], replier: &mut Replier, ty: CommandType) {
        // Index name is argv[1], the query is argv[2].
        if argv.len() < 3 {
            reply_wrong_arity(replier, argv);
            return;
        }

        let req = match self.build_request(argv, ty) {
            Ok(req) => req,
            Err(err) => {
                replier.error(err.reply_text());
                return;
            }
        };

        if req.req_flags().contains(RequestFlag::IsCursor) {
            if let Err(err) = self.start_cursor(req, replier) {
                replier.error(err.reply_text());
            }
        } else {
            // execute() frees the request when it returns.
            req.execute(replier);
        }
    }

    fn build_request(&self, argv: &[&str], ty: CommandType) -> Result<AREQ, QueryError> {
        let index_name = argv[1];
        let mut req = AREQ::new();

        if ty == CommandType::Search {
            req.add_req_flags(RequestFlag::IsSearch);
        }

        req.compile(&argv[2..])?;

        // Cursor execution outlives this command invocation, so bind a
        // long-lived context to the same database selection now.
        if req.req_flags().contains(RequestFlag::IsCursor) {
            req.set_concurrent_ctx(ConcurrentSearchCtx::new(
                Arc::clone(&self.indexes),
                Arc::from(index_name),
            ));
        }

        let sctx = SearchCtx::open(&self.indexes, index_name).ok_or_else(|| {
            QueryError::with_error(
                QueryErrorCode::NoIndex,
                format!("{index_name}: no such index"),
            )
        })?;

        req.apply_context(sctx)?;

        if ty != CommandType::Explain {
            req.build_pipeline(&self.config)?;
        }

        Ok(req)
    }

    fn start_cursor(&self, req: AREQ, replier: &mut Replier) -> Result<(), QueryError> {
        let index = req
            .spec()
            .map(|spec| spec.name_arc())
            .expect("context applied during build");
        let max_idle = req.cursor_max_idle;

        match self.cursors.reserve(index, max_idle, req) {
            Ok(guard) => {
                run_cursor(guard, replier, 0, &self.config);
                Ok(())
            }
            // The refused request was consumed and freed by the registry.
            Err(err) => Err(QueryError::with_error(
                QueryErrorCode::CursorAlloc,
                err.to_string(),
            )),
        }
    }

    fn cursor_read(&self, replier: &mut Replier, cid: u64, count: usize) {
        let mut cursor = match self.cursors.take_for_execution(cid) {
            Ok(cursor) => cursor,
            Err(_) => {
                replier.error("Cursor not found");
                return;
            }
        };

        // The host may have migrated or evicted keys while the cursor was
        // paused; re-acquire them before resuming the pipeline.
        if let Err(err) = cursor.exec_state_mut().reopen_keys() {
            replier.error(err.reply_text());
            cursor.dispose();
            return;
        }

        run_cursor(cursor, replier, count, &self.config);
    }

    /// `FT.CURSOR READ <index> <cid> [COUNT <n>]`
    /// `FT.CURSOR DEL <index> <cid>`
    /// `FT.CURSOR GC <index> <cid>`
    pub fn cursor_command(&self, argv: &[&str], replier: &mut Replier) {
        if argv.len() < 4 {
            reply_wrong_arity(replier, argv);
            return;
        }

        // argv[1] - subcommand
        // argv[2] - index
        // argv[3] - cursor ID
        let Ok(cid) = argv[3].parse::<i64>() else {
            replier.error("Bad cursor ID");
            return;
        };
        let cid = cid as u64;

        let cmdc = argv[1].chars().next().map(|c| c.to_ascii_uppercase());

        match cmdc {
            Some('R') => {
                let mut count = 0;
                if argv.len() > 5 {
                    // e.g. 'COUNT <n>'
                    if !argv[4].eq_ignore_ascii_case("COUNT") {
                        replier.error("Bad value for COUNT");
                        return;
                    }
                    match argv[5].parse::<usize>() {
                        Ok(n) => count = n,
                        Err(_) => {
                            replier.error("Bad value for COUNT");
                            return;
                        }
                    }
                }
                self.cursor_read(replier, cid, count);
            }
            Some('D') => match self.cursors.purge(cid) {
                Ok(()) => replier.simple_string("OK"),
                Err(_) => replier.error("Cursor does not exist"),
            },
            Some('G') => {
                let reclaimed = self.cursors.collect_idle();
                replier.long_long(reclaimed as i64);
            }
            _ => {
                tracing::debug!(subcommand = argv[1], "unknown cursor subcommand");
                replier.error("Unknown subcommand");
            }
        }
    }

    /// Build a request and render the parsed query against the index
    /// schema instead of executing it. The request is freed on return.
    pub fn explain(&self, argv: &[&str]) -> Result<String, QueryError> {
        if argv.len() < 3 {
            return Err(QueryError::with_error(
                QueryErrorCode::ParseArgs,
                "wrong number of arguments",
            ));
        }
        let req = self.build_request(argv, CommandType::Explain)?;
        Ok(req.dump_explain())
    }
}

fn reply_wrong_arity(replier: &mut Replier, argv: &[&str]) {
    let cmd = argv.first().copied().unwrap_or("");
    replier.error(&format!(
        "ERR wrong number of arguments for '{}' command",
        cmd.to_lowercase()
    ));
}
