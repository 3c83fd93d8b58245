//! Integration tests for the five entry points (spec §6.1/§8).
//!
//! Uses `is_internal: true` throughout except where a test specifically
//! checks span output, since internal mode drops `start`/`end` and makes
//! the expected JSON much shorter to write by hand.

use pretty_assertions::assert_eq;
use serde_json::{json, Value};

use hogql_parser::{
    parse_expr, parse_full_template_string, parse_order_expr, parse_program, parse_select,
    parse_string_literal_text,
};

fn parse(json_text: &str) -> Value {
    serde_json::from_str(json_text).expect("entry point did not return valid JSON")
}

#[test]
fn expr_arithmetic() {
    let got = parse(&parse_expr("1 + 2", true));
    assert_eq!(
        got,
        json!({
            "node": "ArithmeticOperation",
            "left": {"node": "Constant", "value": 1},
            "right": {"node": "Constant", "value": 2},
            "op": "+",
        })
    );
}

#[test]
fn expr_not_and_flattens_to_exprs_list() {
    let got = parse(&parse_expr("not (a and b)", true));
    assert_eq!(
        got,
        json!({
            "node": "Not",
            "expr": {
                "node": "And",
                "exprs": [
                    {"node": "Field", "chain": ["a"]},
                    {"node": "Field", "chain": ["b"]},
                ],
            },
        })
    );
}

#[test]
fn and_is_flat_regardless_of_parenthesization() {
    let left_assoc = parse(&parse_expr("(a and b) and c", true));
    let right_assoc = parse(&parse_expr("a and (b and c)", true));
    let unparenthesized = parse(&parse_expr("a and b and c", true));
    assert_eq!(left_assoc, right_assoc);
    assert_eq!(left_assoc, unparenthesized);
    assert_eq!(
        left_assoc["exprs"].as_array().map(|a| a.len()),
        Some(3),
        "a and b and c must flatten to a single 3-element And, not nest"
    );
}

#[test]
fn expr_null_coalesce_becomes_if_null_call() {
    let got = parse(&parse_expr("a ?? b", true));
    assert_eq!(
        got,
        json!({
            "node": "Call",
            "name": "ifNull",
            "args": [
                {"node": "Field", "chain": ["a"]},
                {"node": "Field", "chain": ["b"]},
            ],
        })
    );
}

#[test]
fn expr_array_access() {
    let got = parse(&parse_expr("arr[1]", true));
    assert_eq!(
        got,
        json!({
            "node": "ArrayAccess",
            "array": {"node": "Field", "chain": ["arr"]},
            "property": {"node": "Constant", "value": 1},
        })
    );
}

#[test]
fn select_with_limit_and_offset() {
    let got = parse(&parse_select("SELECT a FROM t LIMIT 10 OFFSET 5", true));
    assert_eq!(got["node"], "SelectQuery");
    assert_eq!(got["select"], json!([{"node": "Field", "chain": ["a"]}]));
    assert_eq!(got["limit"], json!({"node": "Constant", "value": 10}));
    assert_eq!(got["offset"], json!({"node": "Constant", "value": 5}));
    let select_from = &got["select_from"];
    assert_eq!(select_from["node"], "JoinExpr");
    assert_eq!(select_from["table"], json!({"node": "Field", "chain": ["t"]}));
    assert!(select_from.get("next_join").is_none());
}

#[test]
fn select_limit_comma_form_reverses_offset_and_length() {
    let comma_form = parse(&parse_select("SELECT a FROM t LIMIT 5, 10", true));
    assert_eq!(comma_form["offset"], json!({"node": "Constant", "value": 5}));
    assert_eq!(comma_form["limit"], json!({"node": "Constant", "value": 10}));
}

#[test]
fn select_union_all_builds_select_set_query() {
    let got = parse(&parse_select("SELECT 1 UNION ALL SELECT 2", true));
    assert_eq!(got["node"], "SelectSetQuery");
    assert_eq!(got["initial_select_query"]["select"], json!([{"node": "Constant", "value": 1}]));
    let subsequent = got["subsequent_select_queries"].as_array().expect("array");
    assert_eq!(subsequent.len(), 1);
    assert_eq!(subsequent[0]["set_operator"], "UNION ALL");
    assert_eq!(subsequent[0]["select_query"]["select"], json!([{"node": "Constant", "value": 2}]));
}

#[test]
fn select_set_with_no_tail_folds_to_bare_query() {
    let got = parse(&parse_select("SELECT 1", true));
    assert_eq!(got["node"], "SelectQuery");
}

#[test]
fn select_joins_thread_through_next_join() {
    let got = parse(&parse_select(
        "SELECT a FROM t1 JOIN t2 ON t1.id = t2.id JOIN t3 ON t2.id = t3.id",
        true,
    ));
    let from = &got["select_from"];
    assert_eq!(from["table"], json!({"node": "Field", "chain": ["t1"]}));
    let next = &from["next_join"];
    assert_eq!(next["join_type"], "JOIN");
    assert_eq!(next["table"], json!({"node": "Field", "chain": ["t2"]}));
    let next2 = &next["next_join"];
    assert_eq!(next2["table"], json!({"node": "Field", "chain": ["t3"]}));
    assert!(next2.get("next_join").is_none());
}

#[test]
fn select_with_cte() {
    let got = parse(&parse_select("WITH cte AS (SELECT 1) SELECT * FROM cte", true));
    let ctes = got["ctes"].as_object().expect("ctes object");
    assert_eq!(ctes.len(), 1);
    assert_eq!(ctes["cte"]["name"], "cte");
    assert_eq!(ctes["cte"]["cte_type"], "subquery");
}

#[test]
fn select_with_duplicate_cte_name_last_one_wins() {
    let got = parse(&parse_select(
        "WITH cte AS (SELECT 1), cte AS (SELECT 2) SELECT * FROM cte",
        true,
    ));
    let ctes = got["ctes"].as_object().expect("ctes object");
    assert_eq!(ctes.len(), 1);
    assert_eq!(ctes["cte"]["expr"]["select"], json!([{"node": "Constant", "value": 2}]));
}

#[test]
fn order_expr_defaults_to_ascending() {
    let got = parse(&parse_order_expr("a", true));
    assert_eq!(
        got,
        json!({"node": "OrderExpr", "expr": {"node": "Field", "chain": ["a"]}, "order": "ASC"})
    );
}

#[test]
fn order_expr_descending() {
    let got = parse(&parse_order_expr("a desc", true));
    assert_eq!(got["order"], "DESC");
}

#[test]
fn program_with_declaration_and_function() {
    let got = parse(&parse_program("let x := 1; fn f() { return x; }", true));
    assert_eq!(got["node"], "Program");
    let decls = got["declarations"].as_array().expect("declarations array");
    assert_eq!(decls.len(), 2);
    assert_eq!(decls[0]["node"], "VariableDeclaration");
    assert_eq!(decls[0]["name"], "x");
    assert_eq!(decls[0]["expr"], json!({"node": "Constant", "value": 1}));
    assert_eq!(decls[1]["node"], "Function");
    assert_eq!(decls[1]["name"], "f");
    assert_eq!(decls[1]["params"], json!([]));
    let body_decls = decls[1]["body"]["declarations"].as_array().expect("body declarations");
    assert_eq!(body_decls[0]["node"], "ReturnStatement");
    assert_eq!(body_decls[0]["expr"], json!({"node": "Field", "chain": ["x"]}));
}

#[test]
fn program_empty_input_yields_empty_program() {
    let got = parse(&parse_program("", true));
    assert_eq!(got, json!({"node": "Program", "declarations": []}));
}

#[test]
fn for_loop_keeps_optional_clauses_distinct() {
    let got = parse(&parse_program("for (let i := 0; i < 10; i := i + 1) { x := i; }", true));
    let stmt = &got["declarations"][0];
    assert_eq!(stmt["node"], "ForStatement");
    assert_eq!(stmt["initializer"]["node"], "VariableDeclaration");
    assert_eq!(stmt["condition"]["node"], "CompareOperation");
    assert_eq!(stmt["increment"]["node"], "VariableAssignment");
}

#[test]
fn try_catch_collects_multiple_catch_blocks() {
    let got = parse(&parse_program(
        "try { x(); } catch (e: TypeError) { y(); } catch { z(); } finally { w(); }",
        true,
    ));
    let stmt = &got["declarations"][0];
    assert_eq!(stmt["node"], "TryCatchStatement");
    let catches = stmt["catches"].as_array().expect("catches array");
    assert_eq!(catches.len(), 2);
    // CatchEntry is a positional [var, type, block] array, not an object.
    assert_eq!(catches[0][0], "e");
    assert_eq!(catches[0][1], "TypeError");
    assert_eq!(catches[1][0], Value::Null);
    assert_eq!(catches[1][1], Value::Null);
    assert!(stmt.get("finally_stmt").is_some());
}

#[test]
fn full_template_string_with_multiple_segments_concatenates() {
    let got = parse(&parse_full_template_string("hello {name}!", true));
    assert_eq!(got["node"], "Call");
    assert_eq!(got["name"], "concat");
    let args = got["args"].as_array().expect("args array");
    assert_eq!(args.len(), 3);
    assert_eq!(args[0], json!({"node": "Constant", "value": "hello "}));
    assert_eq!(args[1], json!({"node": "Field", "chain": ["name"]}));
    assert_eq!(args[2], json!({"node": "Constant", "value": "!"}));
}

#[test]
fn full_template_string_single_segment_passes_through() {
    let got = parse(&parse_full_template_string("{x}", true));
    assert_eq!(got, json!({"node": "Field", "chain": ["x"]}));
}

#[test]
fn full_template_string_empty_is_empty_constant() {
    let got = parse(&parse_full_template_string("", true));
    assert_eq!(got, json!({"node": "Constant", "value": ""}));
}

#[test]
fn string_literal_text_decoder_is_idempotent_for_common_escapes() {
    for s in ["hello", "it's", "line\nbreak", "tab\there"] {
        let quoted = format!("'{}'", s.replace('\'', "''"));
        let decoded: String = serde_json::from_str(&parse_string_literal_text(&quoted)).unwrap();
        assert_eq!(decoded, s);
    }
}

#[test]
fn non_internal_mode_attaches_line_column_positions() {
    let got = parse(&parse_expr("a + b", false));
    let start = &got["start"];
    assert!(start.get("line").is_some());
    assert!(start.get("column").is_some());
    assert!(start.get("offset").is_some());
}

#[test]
fn reserved_keyword_as_alias_is_a_syntax_error() {
    let got = parse(&parse_expr("true as alias", true));
    assert_eq!(got["error"], true);
    assert_eq!(got["type"], "SyntaxError");
}

#[test]
fn array_join_without_from_is_a_syntax_error() {
    let got = parse(&parse_select("SELECT * ARRAY JOIN a", true));
    assert_eq!(got["error"], true);
    assert_eq!(got["type"], "SyntaxError");
}

#[test]
fn cast_is_not_implemented() {
    let got = parse(&parse_expr("CAST(1 AS Int32)", true));
    assert_eq!(got["error"], true);
    assert_eq!(got["type"], "NotImplementedError");
}

#[test]
fn call_with_subquery_argument_becomes_a_call() {
    let got = parse(&parse_expr("foo(SELECT 1)", true));
    assert_eq!(got["node"], "Call");
    assert_eq!(got["name"], "foo");
    assert_eq!(got["args"][0]["node"], "SelectQuery");
}

#[test]
fn join_on_with_multiple_expressions_is_not_implemented() {
    let got = parse(&parse_select("SELECT 1 FROM a JOIN b ON a.x = b.x, a.y = b.y", true));
    assert_eq!(got["error"], true);
    assert_eq!(got["type"], "NotImplementedError");
}

#[test]
fn interval_unit_normalizes_to_camel_case_regardless_of_source_case() {
    let got = parse(&parse_expr("INTERVAL 1 day", true));
    assert_eq!(got["node"], "Call");
    assert_eq!(got["name"], "toIntervalDay");
}

#[test]
fn function_name_case_is_preserved() {
    let got = parse(&parse_expr("toDateTime(x)", true));
    assert_eq!(got["name"], "toDateTime");
}

#[test]
fn window_function_name_case_is_preserved() {
    let got = parse(&parse_expr("rowNumber() OVER (ORDER BY x)", true));
    assert_eq!(got["node"], "WindowFunction");
    assert_eq!(got["name"], "rowNumber");
}
