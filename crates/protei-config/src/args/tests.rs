//! Unit tests for flag parsing.

use clap::Parser;
use rstest::rstest;

use super::*;

#[derive(Debug, Parser)]
struct Harness {
    #[command(flatten)]
    config: ConfigArgs,
}

fn parse(args: &[&str]) -> ConfigArgs {
    let argv = std::iter::once("protei").chain(args.iter().copied());
    Harness::try_parse_from(argv).expect("flags parse").config
}

#[rstest]
fn explicit_flags_are_read() {
    let config = parse(&[
        "--config-path",
        "roster.yaml",
        "--log-filter",
        "debug",
        "--log-format",
        "JSON",
        "--builtin-command",
        "/opt/tools --serve",
    ]);
    assert_eq!(config.config_path(), Some(Path::new("roster.yaml")));
    assert_eq!(config.log_filter, "debug");
    assert_eq!(config.log_format, LogFormat::Json);
    assert_eq!(
        config.builtin_command(),
        Some(vec![String::from("/opt/tools"), String::from("--serve")])
    );
}

#[rstest]
fn unknown_log_format_is_rejected() {
    let argv = ["protei", "--log-format", "yaml"];
    assert!(Harness::try_parse_from(argv).is_err());
}

#[rstest]
#[case::absent(None, None)]
#[case::blank(Some("   "), None)]
#[case::single(Some("tools"), Some(vec![String::from("tools")]))]
fn builtin_command_splits_on_whitespace(
    #[case] raw: Option<&str>,
    #[case] expected: Option<Vec<String>>,
) {
    let config = ConfigArgs {
        builtin_command: raw.map(str::to_owned),
        ..ConfigArgs::default()
    };
    assert_eq!(config.builtin_command(), expected);
}

#[rstest]
fn defaults_match_constants() {
    let config = ConfigArgs::default();
    assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    assert_eq!(config.log_format, LogFormat::Compact);
    assert!(config.config_path().is_none());
}

#[rstest]
fn roster_without_path_is_default() {
    let roster = ConfigArgs::default().roster().expect("default roster");
    assert_eq!(roster.len(), 1);
}

#[rstest]
#[case::json(LogFormat::Json, "json")]
#[case::compact(LogFormat::Compact, "compact")]
fn log_format_names_parse_back(#[case] format: LogFormat, #[case] name: &str) {
    assert_eq!(format.to_string(), name);
    assert_eq!(name.to_uppercase().parse::<LogFormat>(), Ok(format));
}
