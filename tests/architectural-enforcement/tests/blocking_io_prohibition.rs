//! Integration Test: Blocking I/O Prohibition
//!
//! Async production code must not block the runtime. Use `tokio::fs`,
//! `tokio::net` and `tokio::io`, not their `std` counterparts.
//!
//! Blocking calls are tolerated in plain `fn`s (config loading before the
//! runtime matters) and in test code.

use architectural_enforcement::{
    code_part, is_in_async_fn, is_test_code, production_dirs, rust_files, SourceFile,
};

/// Patterns that block and what to report for them
const FORBIDDEN: &[(&str, &str)] = &[
    ("std::fs::", "Blocking file I/O"),
    ("std::net::", "Blocking network I/O"),
    ("std::process::Command", "Blocking process I/O"),
    ("reqwest::blocking", "Blocking HTTP client"),
    ("std::io::stdin()", "Blocking stdin"),
    ("std::io::stdout()", "Blocking stdout"),
    ("std::thread::sleep", "Blocking sleep"),
];

#[test]
fn test_no_blocking_io_in_async_production_code() {
    let violations: Vec<String> = production_dirs()
        .iter()
        .flat_map(|dir| rust_files(dir))
        .flat_map(|file| find_violations(&file))
        .collect();

    if !violations.is_empty() {
        eprintln!("\nBlocking I/O found in async production code:\n");
        for violation in &violations {
            eprintln!("  {violation}");
        }
        eprintln!("\nUse tokio::fs, tokio::net, tokio::io or move the call out of async code.");

        panic!("Found {} blocking I/O violation(s)", violations.len());
    }
}

#[test]
fn test_http_transport_uses_async_client() {
    let files = production_dirs()
        .iter()
        .flat_map(|dir| rust_files(dir))
        .collect::<Vec<_>>();

    assert!(
        files.iter().any(|f| f.path.ends_with("backend/http.rs")),
        "HTTP transport source not found"
    );
    for file in &files {
        assert!(
            !file.lines.iter().any(|l| code_part(l).contains("reqwest::blocking")),
            "{} uses the blocking reqwest client",
            file.path.display()
        );
    }
}

fn find_violations(file: &SourceFile) -> Vec<String> {
    let mut violations = Vec::new();
    for (idx, line) in file.lines.iter().enumerate() {
        let code = code_part(line);
        let Some((_, what)) = FORBIDDEN.iter().find(|(pattern, _)| code.contains(pattern)) else {
            continue;
        };
        if is_test_code(&file.lines, idx) || !is_in_async_fn(&file.lines, idx) {
            continue;
        }
        violations.push(file.violation(idx, what));
    }
    violations
}

#[test]
fn test_detector_flags_blocking_read_in_async_fn() {
    let file = SourceFile {
        path: "sample.rs".into(),
        lines: vec![
            "pub async fn load() {".to_string(),
            "    let s = std::fs::read_to_string(\"x\");".to_string(),
            "}".to_string(),
            "pub fn load_sync() {".to_string(),
            "    let s = std::fs::read_to_string(\"x\");".to_string(),
            "}".to_string(),
        ],
    };

    let violations = find_violations(&file);
    assert_eq!(violations.len(), 1);
    assert!(violations[0].starts_with("sample.rs:2 - Blocking file I/O"));
}
