/*
 * Copyright (c) 2006-Present, Redis Ltd.
 * All rights reserved.
 *
 * Licensed under your choice of the Redis Source Available License 2.0
 * (RSALv2); or (b) the Server Side Public License v1 (SSPLv1); or (c) the
 * GNU Affero General Public License v3 (AGPLv3).
*/

//! End-to-end replies of the search and aggregate commands.

use std::sync::Arc;

use aggregate::{SearchConfig, SearchModule};
use field::{FieldOption, FieldSpec, FieldType};
use index_spec::{IndexRegistry, IndexSpec};
use pretty_assertions::assert_eq;
use reply::{Replier, ReplyValue};
use value::RSValue;

fn module_with(spec: IndexSpec) -> SearchModule {
    let registry = Arc::new(IndexRegistry::new());
    registry.declare(spec);
    SearchModule::new(registry, SearchConfig::default())
}

fn run(module: &SearchModule, argv: &[&str]) -> Vec<ReplyValue> {
    let mut replier = Replier::new();
    match argv[0] {
        "FT.SEARCH" => module.search_command(argv, &mut replier),
        "FT.AGGREGATE" => module.aggregate_command(argv, &mut replier),
        "FT.CURSOR" => module.cursor_command(argv, &mut replier),
        other => panic!("unknown command {other}"),
    }
    replier.take()
}

/// Two matching documents, scores only: `2, "d1", 1.5, "d2", 1.0`.
#[test]
fn simple_search_with_scores() {
    let mut spec = IndexSpec::new("idx", vec![FieldSpec::new("body", FieldType::Fulltext)]);
    spec.add_document("d1", 1.5, None, vec![("body", RSValue::string("hello"))]);
    spec.add_document("d2", 1.0, None, vec![("body", RSValue::string("hello"))]);
    let module = module_with(spec);

    let replies = run(
        &module,
        &["FT.SEARCH", "idx", "hello", "NOCONTENT", "WITHSCORES"],
    );

    assert_eq!(
        replies,
        vec![ReplyValue::Array(vec![
            ReplyValue::LongLong(2),
            ReplyValue::bulk("d1"),
            ReplyValue::Double(1.5),
            ReplyValue::bulk("d2"),
            ReplyValue::Double(1.0),
        ])]
    );
}

/// One aggregate row with a numeric primary sort key and one visible field:
/// `1, "#2.50000000000000000e+00", ["name", "alice"]`.
#[test]
fn aggregate_with_sort_key_encoding() {
    let mut spec = IndexSpec::new(
        "idx",
        vec![
            FieldSpec::new("name", FieldType::Fulltext),
            FieldSpec::new("rank", FieldType::Numeric)
                .with_options(FieldOption::Sortable | FieldOption::Hidden),
        ],
    );
    spec.add_document(
        "d1",
        1.0,
        None,
        vec![
            ("name", RSValue::string("alice")),
            ("rank", RSValue::num(2.5)),
        ],
    );
    let module = module_with(spec);

    let replies = run(
        &module,
        &[
            "FT.AGGREGATE",
            "idx",
            "*",
            "WITHSORTKEYS",
            "LOAD",
            "1",
            "name",
            "SORTBY",
            "rank",
        ],
    );

    assert_eq!(
        replies,
        vec![ReplyValue::Array(vec![
            ReplyValue::LongLong(1),
            ReplyValue::bulk("#2.50000000000000000e+00"),
            ReplyValue::Array(vec![
                ReplyValue::SimpleString("name".to_owned()),
                ReplyValue::bulk("alice"),
            ]),
        ])]
    );
}

/// A string sort key is emitted with a `$` prefix.
#[test]
fn string_sort_keys_get_a_dollar_prefix() {
    let mut spec = IndexSpec::new(
        "idx",
        vec![
            FieldSpec::new("name", FieldType::Fulltext)
                .with_options(FieldOption::Sortable | FieldOption::Hidden),
        ],
    );
    spec.add_document("d1", 1.0, None, vec![("name", RSValue::string("Bob"))]);
    let module = module_with(spec);

    let replies = run(
        &module,
        &[
            "FT.AGGREGATE",
            "idx",
            "*",
            "WITHSORTKEYS",
            "SORTBY",
            "name",
        ],
    );

    // The sorting vector normalizes strings, so the key comes back folded.
    assert_eq!(
        replies,
        vec![ReplyValue::Array(vec![
            ReplyValue::LongLong(1),
            ReplyValue::bulk("$bob"),
            ReplyValue::Array(vec![]),
        ])]
    );
}

/// Hidden lookup keys are skipped: the field block is exactly
/// `["a", <val>]`, not length 4.
#[test]
fn hidden_fields_are_not_serialized() {
    let mut spec = IndexSpec::new(
        "idx",
        vec![
            FieldSpec::new("a", FieldType::Fulltext),
            FieldSpec::new("b", FieldType::Fulltext).with_options(FieldOption::Hidden),
        ],
    );
    spec.add_document(
        "d1",
        1.0,
        None,
        vec![
            ("a", RSValue::string("visible")),
            ("b", RSValue::string("secret")),
        ],
    );
    let module = module_with(spec);

    let replies = run(&module, &["FT.SEARCH", "idx", "*"]);

    assert_eq!(
        replies,
        vec![ReplyValue::Array(vec![
            ReplyValue::LongLong(1),
            ReplyValue::bulk("d1"),
            ReplyValue::Array(vec![
                ReplyValue::SimpleString("a".to_owned()),
                ReplyValue::bulk("visible"),
            ]),
        ])]
    );
}

#[test]
fn payloads_reply_bulk_or_null() {
    let mut spec = IndexSpec::new("idx", vec![FieldSpec::new("body", FieldType::Fulltext)]);
    spec.add_document(
        "with",
        2.0,
        Some(b"blob".to_vec()),
        vec![("body", RSValue::string("x"))],
    );
    spec.add_document("without", 1.0, None, vec![("body", RSValue::string("x"))]);
    let module = module_with(spec);

    let replies = run(
        &module,
        &["FT.SEARCH", "idx", "x", "NOCONTENT", "WITHPAYLOADS"],
    );

    assert_eq!(
        replies,
        vec![ReplyValue::Array(vec![
            ReplyValue::LongLong(2),
            ReplyValue::bulk("with"),
            ReplyValue::bulk("blob"),
            ReplyValue::bulk("without"),
            ReplyValue::Null,
        ])]
    );
}

#[test]
fn missing_fields_serialize_as_null() {
    let mut spec = IndexSpec::new(
        "idx",
        vec![
            FieldSpec::new("a", FieldType::Fulltext),
            FieldSpec::new("b", FieldType::Fulltext),
        ],
    );
    spec.add_document("d1", 1.0, None, vec![("a", RSValue::string("only a"))]);
    let module = module_with(spec);

    let replies = run(&module, &["FT.SEARCH", "idx", "*"]);

    assert_eq!(
        replies,
        vec![ReplyValue::Array(vec![
            ReplyValue::LongLong(1),
            ReplyValue::bulk("d1"),
            ReplyValue::Array(vec![
                ReplyValue::SimpleString("a".to_owned()),
                ReplyValue::bulk("only a"),
                ReplyValue::SimpleString("b".to_owned()),
                ReplyValue::Null,
            ]),
        ])]
    );
}

#[test]
fn no_matches_reply_is_just_the_total() {
    let mut spec = IndexSpec::new("idx", vec![FieldSpec::new("body", FieldType::Fulltext)]);
    spec.add_document("d1", 1.0, None, vec![("body", RSValue::string("hello"))]);
    let module = module_with(spec);

    let replies = run(&module, &["FT.SEARCH", "idx", "nosuchterm"]);
    assert_eq!(replies, vec![ReplyValue::Array(vec![ReplyValue::LongLong(0)])]);
}

#[test]
fn unknown_index_is_an_error_reply() {
    let module = module_with(IndexSpec::new("idx", vec![]));
    let replies = run(&module, &["FT.SEARCH", "missing", "*"]);

    assert_eq!(
        replies,
        vec![ReplyValue::Error("missing: no such index".to_owned())]
    );
}

#[test]
fn wrong_arity_does_not_build_a_request() {
    let module = module_with(IndexSpec::new("idx", vec![]));
    let replies = run(&module, &["FT.SEARCH", "idx"]);

    assert_eq!(
        replies,
        vec![ReplyValue::Error(
            "ERR wrong number of arguments for 'ft.search' command".to_owned()
        )]
    );
}

#[test]
fn bad_argument_is_an_error_reply() {
    let module = module_with(IndexSpec::new("idx", vec![]));
    let replies = run(&module, &["FT.SEARCH", "idx", "*", "WIBBLE"]);

    assert_eq!(
        replies,
        vec![ReplyValue::Error("Unknown argument `WIBBLE`".to_owned())]
    );
}

#[test]
fn explain_renders_without_executing() {
    let mut spec = IndexSpec::new("idx", vec![FieldSpec::new("body", FieldType::Fulltext)]);
    spec.add_document("d1", 1.0, None, vec![("body", RSValue::string("hello"))]);
    let module = module_with(spec);

    let out = module.explain(&["FT.EXPLAIN", "idx", "hello world"]).unwrap();
    assert!(out.contains("TERM { hello }"));
    assert!(out.contains("TERM { world }"));
}
