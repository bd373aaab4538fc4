//! Integration Test: Sleep Prohibition
//!
//! Nothing waits by sleeping. Production code waits on channels, the
//! response body or the cancel signal; integration tests wait on session
//! events or bound a wait with `tokio::time::timeout`.

use architectural_enforcement::{
    code_part, integration_test_dirs, is_test_code, production_dirs, rust_files, SourceFile,
};

fn sleep_calls(file: &SourceFile, skip_tests: bool) -> Vec<String> {
    file.lines
        .iter()
        .enumerate()
        .filter(|(_, line)| {
            let code = code_part(line);
            code.contains("::sleep(") || code.contains(".sleep(")
        })
        .filter(|(idx, _)| !(skip_tests && is_test_code(&file.lines, *idx)))
        .map(|(idx, _)| file.violation(idx, "sleep"))
        .collect()
}

fn report(violations: &[String], context: &str) {
    if violations.is_empty() {
        return;
    }
    eprintln!("\nSleep calls found in {context}:\n");
    for violation in violations {
        eprintln!("  {violation}");
    }
    eprintln!("\nWait on the event that matters instead (channel, body, cancel signal).");
    panic!("Found {} sleep violation(s) in {context}", violations.len());
}

#[test]
fn test_no_sleep_in_production_code() {
    let violations: Vec<String> = production_dirs()
        .iter()
        .flat_map(|dir| rust_files(dir))
        .flat_map(|file| sleep_calls(&file, true))
        .collect();

    report(&violations, "production code");
}

#[test]
fn test_no_sleep_in_integration_tests() {
    let violations: Vec<String> = integration_test_dirs()
        .iter()
        .flat_map(|dir| rust_files(dir))
        .flat_map(|file| sleep_calls(&file, false))
        .collect();

    report(&violations, "integration tests");
}

#[test]
fn test_detector_ignores_comments() {
    let file = SourceFile {
        path: "sample.rs".into(),
        lines: vec![
            "// tokio::time::sleep(d).await is not allowed".to_string(),
            "fn f() { std::thread::sleep(d); }".to_string(),
        ],
    };

    let found = sleep_calls(&file, true);
    assert_eq!(found.len(), 1);
    assert!(found[0].starts_with("sample.rs:2"));
}
