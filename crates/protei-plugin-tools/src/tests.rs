//! Unit tests for the builtin tools.

use std::io::Cursor;

use rstest::rstest;
use serde_json::{Value, json};

use super::*;

#[rstest]
#[case::text(json!({"text": "hi"}), json!("hi"))]
#[case::missing(json!({}), json!(""))]
#[case::null(json!({"text": null}), json!(""))]
#[case::number(json!({"text": 12}), json!("12"))]
#[case::args_not_object(json!("loose"), json!(""))]
fn echo_returns_text(#[case] args: Value, #[case] expected: Value) {
    assert_eq!(ToolsHandler.invoke(TOOL_ECHO, &args).expect("echo"), expected);
}

#[rstest]
#[case::integers(json!({"a": 2, "b": 3}), json!(5))]
#[case::negative(json!({"a": -2, "b": 3}), json!(1))]
#[case::missing_defaults_to_zero(json!({"a": 4}), json!(4))]
#[case::numeric_strings(json!({"a": "2", "b": " 3 "}), json!(5))]
#[case::floats(json!({"a": 1.5, "b": 2.25}), json!(3.75))]
#[case::mixed(json!({"a": 1, "b": 0.5}), json!(1.5))]
#[case::float_string(json!({"a": "0.5", "b": 0.25}), json!(0.75))]
fn math_add_sums_operands(#[case] args: Value, #[case] expected: Value) {
    assert_eq!(
        ToolsHandler.invoke(TOOL_MATH_ADD, &args).expect("math.add"),
        expected
    );
}

#[test]
fn integer_sum_stays_integral() {
    let sum = ToolsHandler
        .invoke(TOOL_MATH_ADD, &json!({"a": 2, "b": 3}))
        .expect("math.add");
    assert!(sum.is_i64(), "expected integer result, got {sum}");
}

#[rstest]
#[case::word(json!({"a": "two", "b": 3}), "argument 'a' is not a number")]
#[case::array(json!({"a": 1, "b": [3]}), "argument 'b' is not a number")]
#[case::overflow(json!({"a": i64::MAX, "b": 1}), "integer overflow")]
fn math_add_rejects_bad_operands(#[case] args: Value, #[case] expected: &str) {
    let error = ToolsHandler
        .invoke(TOOL_MATH_ADD, &args)
        .expect_err("invalid operands");
    assert!(
        error.message().contains(expected),
        "unexpected message: {}",
        error.message()
    );
}

#[test]
fn unknown_tool_is_reported() {
    let error = ToolsHandler
        .invoke("math.sub", &json!({}))
        .expect_err("unknown tool");
    assert_eq!(error.message(), "Unknown tool: math.sub");
}

#[test]
fn meta_declares_both_tools() {
    let meta = ToolsHandler.meta();
    assert_eq!(meta.name(), PLUGIN_NAME);
    assert_eq!(meta.language(), "rust");
    assert!(meta.supports(TOOL_ECHO));
    assert!(meta.supports(TOOL_MATH_ADD));
}

#[test]
fn run_without_serve_flag_reads_nothing() {
    let mut reader = Cursor::new(String::from("{\"id\":1,\"method\":\"get_meta\"}\n"));
    let mut writer = Vec::new();
    run(Vec::<String>::new(), &mut reader, &mut writer, &ToolsHandler).expect("run");
    assert!(writer.is_empty());
}

#[test]
fn run_with_serve_flag_answers_requests() {
    let mut reader = Cursor::new(String::from(concat!(
        "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"invoke\",",
        "\"params\":{\"tool\":\"math.add\",\"args\":{\"a\":2,\"b\":3}}}\n",
        "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"shutdown\",\"params\":{}}\n",
    )));
    let mut writer = Vec::new();
    run(["--serve"], &mut reader, &mut writer, &ToolsHandler).expect("run");
    let output = String::from_utf8(writer).expect("utf-8");
    assert_eq!(
        output,
        concat!(
            "{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":5}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"result\":true}\n",
        )
    );
}

#[cfg(unix)]
#[test]
fn run_accepts_non_utf8_arguments() {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;

    let args = [OsString::from_vec(vec![0xff, 0xfe]), OsString::from("--serve")];
    let mut reader = Cursor::new(String::from(
        "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"shutdown\",\"params\":{}}\n",
    ));
    let mut writer = Vec::new();
    run(args, &mut reader, &mut writer, &ToolsHandler).expect("run");
    assert_eq!(
        String::from_utf8(writer).expect("utf-8"),
        "{\"jsonrpc\":\"2.0\",\"id\":1,\"result\":true}\n"
    );
}
