use std::path::PathBuf;

use rawline::config::{ConfigFlags, load_config_flags, parse_flag_tokens};

#[test]
fn test_config_file_parsing_ignores_comments_and_blank_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".rawlinerc");
    let content = r#"
# comment
--no-history

--prompt "rawline> "

--log-file=rawline.log
"#;
    std::fs::write(&path, content).unwrap();

    let flags = load_config_flags(&path).unwrap();
    assert!(flags.no_history);
    assert_eq!(flags.prompt.as_deref(), Some("rawline> "));
    assert_eq!(flags.log_file, Some(PathBuf::from("rawline.log")));
}

#[test]
fn test_config_values_keep_inner_spaces() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".rawlinerc");
    std::fs::write(&path, "--prompt say something:\n--history my history.txt\n").unwrap();

    let flags = load_config_flags(&path).unwrap();
    assert_eq!(flags.prompt.as_deref(), Some("say something:"));
    assert_eq!(flags.history, Some(PathBuf::from("my history.txt")));
}

#[test]
fn test_cli_flags_override_file_flags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".rawlinerc");
    let content = "--no-history\n--history-size 20\n--log-file file.log\n";
    std::fs::write(&path, content).unwrap();

    let file_flags = load_config_flags(&path).unwrap();
    let cli_args = vec![
        "rawline".to_string(),
        "--history-size".to_string(),
        "40".to_string(),
        "--poll-ms=30".to_string(),
    ];
    let cli_flags = parse_flag_tokens(&cli_args);

    let effective = file_flags.union(&cli_flags);
    assert!(effective.no_history, "file flags should remain enabled");
    assert_eq!(effective.poll_ms, Some(30), "cli flags should be applied");
    assert_eq!(effective.history_size, Some(40), "cli should override size");
    assert_eq!(
        effective.log_file,
        Some(PathBuf::from("file.log")),
        "file config should be preserved when CLI does not override"
    );
}

#[test]
fn test_config_union_merges_booleans() {
    let file = ConfigFlags {
        no_history: true,
        ..ConfigFlags::default()
    };
    let merged = file.union(&ConfigFlags::default());
    assert!(merged.no_history);
    assert!(ConfigFlags::default().union(&file).no_history);
}
