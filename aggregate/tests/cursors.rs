/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

//! Cursor lifecycle driven through the command surface.

use std::sync::Arc;
use std::time::Duration;

use aggregate::{SearchConfig, SearchModule};
use field::{FieldOption, FieldSpec, FieldType};
use index_spec::{IndexRegistry, IndexSpec};
use pretty_assertions::assert_eq;
use reply::{Replier, ReplyValue};
use value::RSValue;

/// Five documents with a hidden sortable rank, so chunk rows are exactly
/// `["name", <value>]` and the running total is stable across chunks.
fn five_doc_module(config: SearchConfig) -> SearchModule {
    let mut spec = IndexSpec::new(
        "idx",
        vec![
            FieldSpec::new("name", FieldType::Fulltext),
            FieldSpec::new("rank", FieldType::Numeric)
                .with_options(FieldOption::Sortable | FieldOption::Hidden),
        ],
    );
    for i in 1..=5 {
        spec.add_document(
            format!("d{i}"),
            1.0,
            None,
            vec![
                ("name", RSValue::string(format!("r{i}"))),
                ("rank", RSValue::num(i as f64)),
            ],
        );
    }

    let registry = Arc::new(IndexRegistry::new());
    registry.declare(spec);
    SearchModule::new(registry, config)
}

fn run(module: &SearchModule, argv: &[&str]) -> Vec<ReplyValue> {
    let mut replier = Replier::new();
    match argv[0] {
        "FT.AGGREGATE" => module.aggregate_command(argv, &mut replier),
        "FT.CURSOR" => module.cursor_command(argv, &mut replier),
        other => panic!("unknown command {other}"),
    }
    replier.take()
}

fn row(i: usize) -> ReplyValue {
    ReplyValue::Array(vec![
        ReplyValue::SimpleString("name".to_owned()),
        ReplyValue::bulk(format!("r{i}")),
    ])
}

/// Splits the `[<chunk>, <cid>]` outer reply.
fn open_cursor_reply(replies: Vec<ReplyValue>) -> (Vec<ReplyValue>, i64) {
    assert_eq!(replies.len(), 1, "cursor replies are a single outer array");
    let ReplyValue::Array(outer) = replies.into_iter().next().unwrap() else {
        panic!("expected an outer array");
    };
    assert_eq!(outer.len(), 2);
    let mut outer = outer.into_iter();
    let ReplyValue::Array(chunk) = outer.next().unwrap() else {
        panic!("expected a chunk array");
    };
    let ReplyValue::LongLong(cid) = outer.next().unwrap() else {
        panic!("expected a cursor id");
    };
    (chunk, cid)
}

const AGG_WITH_CURSOR: [&str; 9] = [
    "FT.AGGREGATE",
    "idx",
    "*",
    "SORTBY",
    "rank",
    "WITHCURSOR",
    "COUNT",
    "2",
    "LOAD",
];

fn start_cursor(module: &SearchModule) -> (Vec<ReplyValue>, i64) {
    let mut argv = AGG_WITH_CURSOR.to_vec();
    argv.extend(["1", "name"]);
    open_cursor_reply(run(module, &argv))
}

#[test]
fn cursor_pagination_runs_to_a_terminal_zero() {
    let module = five_doc_module(SearchConfig::default());

    // First chunk comes with the reservation reply.
    let (chunk, cid) = start_cursor(&module);
    assert_eq!(
        chunk,
        vec![ReplyValue::LongLong(5), row(1), row(2)],
        "first chunk: total plus two rows"
    );
    assert_ne!(cid, 0);

    // Second chunk via CURSOR READ re-leases the same cursor.
    let cid_s = cid.to_string();
    let (chunk, next) = open_cursor_reply(run(
        &module,
        &["FT.CURSOR", "READ", "idx", &cid_s, "COUNT", "2"],
    ));
    assert_eq!(chunk, vec![ReplyValue::LongLong(5), row(3), row(4)]);
    assert_eq!(next, cid, "a paused cursor keeps its id");

    // The final chunk is short and terminal.
    let (chunk, next) = open_cursor_reply(run(
        &module,
        &["FT.CURSOR", "READ", "idx", &cid_s, "COUNT", "2"],
    ));
    assert_eq!(chunk, vec![ReplyValue::LongLong(5), row(5)]);
    assert_eq!(next, 0);

    // The cursor was disposed before the reply returned.
    assert_eq!(
        run(&module, &["FT.CURSOR", "DEL", "idx", &cid_s]),
        vec![ReplyValue::Error("Cursor does not exist".to_owned())]
    );
    assert_eq!(module.cursors().count("idx"), 0);
}

#[test]
fn cursor_count_sticks_for_later_reads() {
    let module = five_doc_module(SearchConfig::default());
    let (_, cid) = start_cursor(&module);
    let cid_s = cid.to_string();

    // No COUNT on this read: the reservation's COUNT 2 is reused.
    let (chunk, next) = open_cursor_reply(run(&module, &["FT.CURSOR", "READ", "idx", &cid_s]));
    assert_eq!(chunk.len(), 3, "total plus two rows");
    assert_eq!(next, cid);

    run(&module, &["FT.CURSOR", "DEL", "idx", &cid_s]);
}

#[test]
fn cursor_finishing_on_the_first_chunk_is_disposed_immediately() {
    let module = five_doc_module(SearchConfig::default());

    let replies = run(
        &module,
        &[
            "FT.AGGREGATE",
            "idx",
            "*",
            "SORTBY",
            "rank",
            "WITHCURSOR",
            "COUNT",
            "9",
        ],
    );
    let (chunk, cid) = open_cursor_reply(replies);
    assert_eq!(chunk.len(), 6, "total plus all five rows");
    assert_eq!(cid, 0);
    assert_eq!(module.cursors().count("idx"), 0);
}

/// With a per-index cap of 1 and one active cursor, a second WITHCURSOR
/// request fails at build and the count stays at 1.
#[test]
fn cursor_cap_refuses_a_second_reservation() {
    let module = five_doc_module(SearchConfig {
        max_cursors_per_index: 1,
        ..SearchConfig::default()
    });

    let (_, cid) = start_cursor(&module);
    assert_ne!(cid, 0);
    assert_eq!(module.cursors().count("idx"), 1);

    let mut argv = AGG_WITH_CURSOR.to_vec();
    argv.extend(["1", "name"]);
    let replies = run(&module, &argv);
    assert!(
        matches!(&replies[..], [ReplyValue::Error(_)]),
        "expected an error reply, got {replies:?}"
    );
    assert_eq!(module.cursors().count("idx"), 1);
}

/// A cursor left paused past its MAXIDLE window is reclaimed by GC, after
/// which its id is gone.
#[test]
fn idle_cursor_is_garbage_collected() {
    let module = five_doc_module(SearchConfig::default());

    let mut argv = AGG_WITH_CURSOR.to_vec();
    argv.extend(["1", "name", "MAXIDLE", "25"]);
    let (_, cid) = open_cursor_reply(run(&module, &argv));
    assert_ne!(cid, 0);

    std::thread::sleep(Duration::from_millis(40));

    assert_eq!(
        run(&module, &["FT.CURSOR", "GC", "idx", "0"]),
        vec![ReplyValue::LongLong(1)]
    );
    // Idempotent: an immediate second pass reclaims nothing.
    assert_eq!(
        run(&module, &["FT.CURSOR", "GC", "idx", "0"]),
        vec![ReplyValue::LongLong(0)]
    );

    let cid_s = cid.to_string();
    assert_eq!(
        run(&module, &["FT.CURSOR", "READ", "idx", &cid_s]),
        vec![ReplyValue::Error("Cursor not found".to_owned())]
    );
}

#[test]
fn del_disposes_a_paused_cursor() {
    let module = five_doc_module(SearchConfig::default());
    let (_, cid) = start_cursor(&module);
    let cid_s = cid.to_string();

    assert_eq!(
        run(&module, &["FT.CURSOR", "DEL", "idx", &cid_s]),
        vec![ReplyValue::SimpleString("OK".to_owned())]
    );
    assert_eq!(module.cursors().count("idx"), 0);
    // A second DEL is a reported miss, otherwise a no-op.
    assert_eq!(
        run(&module, &["FT.CURSOR", "DEL", "idx", &cid_s]),
        vec![ReplyValue::Error("Cursor does not exist".to_owned())]
    );
}

#[test]
fn cursor_read_after_index_drop_fails_and_disposes() {
    let module = five_doc_module(SearchConfig::default());
    let (_, cid) = start_cursor(&module);
    let cid_s = cid.to_string();

    module.indexes().remove("idx");

    let replies = run(&module, &["FT.CURSOR", "READ", "idx", &cid_s]);
    assert_eq!(
        replies,
        vec![ReplyValue::Error("idx: no such index".to_owned())]
    );
    assert_eq!(module.cursors().count("idx"), 0);
}

#[test]
fn cursor_argument_errors() {
    let module = five_doc_module(SearchConfig::default());

    assert_eq!(
        run(&module, &["FT.CURSOR", "READ", "idx", "notanumber"]),
        vec![ReplyValue::Error("Bad cursor ID".to_owned())]
    );
    assert_eq!(
        run(&module, &["FT.CURSOR", "READ", "idx", "1", "COUNT", "x"]),
        vec![ReplyValue::Error("Bad value for COUNT".to_owned())]
    );
    // The keyword must be the literal COUNT; nothing else is accepted.
    assert_eq!(
        run(&module, &["FT.CURSOR", "READ", "idx", "1", "BATCH", "2"]),
        vec![ReplyValue::Error("Bad value for COUNT".to_owned())]
    );
    assert_eq!(
        run(&module, &["FT.CURSOR", "FLUSH", "idx", "1"]),
        vec![ReplyValue::Error("Unknown subcommand".to_owned())]
    );
    assert_eq!(
        run(&module, &["FT.CURSOR", "READ", "idx"]),
        vec![ReplyValue::Error(
            "ERR wrong number of arguments for 'ft.cursor' command".to_owned()
        )]
    );
    // An unknown id on READ reports a miss rather than an empty chunk.
    assert_eq!(
        run(&module, &["FT.CURSOR", "READ", "idx", "424242"]),
        vec![ReplyValue::Error("Cursor not found".to_owned())]
    );
}
