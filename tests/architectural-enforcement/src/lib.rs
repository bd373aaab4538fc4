//! Architectural Enforcement
//!
//! Source scanners shared by the enforcement tests in `tests/`:
//! - no sleeping in production code or integration tests
//! - no blocking I/O inside async production code
//!
//! The scanners are line based. They find the function enclosing a line by
//! scanning backwards for a `fn` signature, and treat everything after a
//! `#[cfg(test)]` marker as test code.

use std::fs;
use std::path::{Path, PathBuf};

/// Root of the workspace
pub fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
}

/// Source directories of shipped code
pub fn production_dirs() -> Vec<PathBuf> {
    let root = workspace_root();
    vec![root.join("relay/core/src"), root.join("relay/cli/src")]
}

/// Integration test directories
pub fn integration_test_dirs() -> Vec<PathBuf> {
    vec![workspace_root().join("relay/core/tests")]
}

/// A scanned source file
pub struct SourceFile {
    /// File path
    pub path: PathBuf,
    /// File contents, one entry per line
    pub lines: Vec<String>,
}

impl SourceFile {
    /// Format a finding on the given line
    pub fn violation(&self, idx: usize, what: &str) -> String {
        format!(
            "{}:{} - {}: {}",
            self.path.display(),
            idx + 1,
            what,
            self.lines[idx].trim()
        )
    }
}

/// Every `.rs` file under `dir`; a missing directory yields nothing
pub fn rust_files(dir: &Path) -> Vec<SourceFile> {
    if !dir.exists() {
        return Vec::new();
    }

    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .filter_map(|e| {
            let content = fs::read_to_string(e.path()).ok()?;
            Some(SourceFile {
                path: e.path().to_path_buf(),
                lines: content.lines().map(str::to_string).collect(),
            })
        })
        .collect()
}

/// The part of a line before any `//` comment
pub fn code_part(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// Kind of function signature found on a line
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FnKind {
    /// `async fn`
    Async,
    /// Plain `fn`
    Sync,
}

/// Recognize a function signature, with any visibility or qualifiers
pub fn fn_signature(line: &str) -> Option<FnKind> {
    let mut rest = code_part(line).trim();

    if let Some(after) = rest.strip_prefix("pub") {
        rest = match after.trim_start().strip_prefix('(') {
            Some(scoped) => scoped.split_once(')').map_or("", |(_, tail)| tail),
            None => after,
        }
        .trim_start();
    }

    let mut is_async = false;
    loop {
        if let Some(after) = rest.strip_prefix("async ") {
            is_async = true;
            rest = after.trim_start();
        } else if let Some(after) = rest
            .strip_prefix("const ")
            .or_else(|| rest.strip_prefix("unsafe "))
        {
            rest = after.trim_start();
        } else {
            break;
        }
    }

    rest.starts_with("fn ")
        .then_some(if is_async { FnKind::Async } else { FnKind::Sync })
}

/// Nearest function signature at or above `idx`
pub fn enclosing_fn(lines: &[String], idx: usize) -> Option<(usize, FnKind)> {
    (0..=idx)
        .rev()
        .find_map(|i| fn_signature(&lines[i]).map(|kind| (i, kind)))
}

/// Whether the line belongs to test code
pub fn is_test_code(lines: &[String], idx: usize) -> bool {
    if lines[..=idx]
        .iter()
        .any(|l| l.trim().starts_with("#[cfg(test)]"))
    {
        return true;
    }

    let Some((fn_idx, _)) = enclosing_fn(lines, idx) else {
        return false;
    };
    lines[..fn_idx]
        .iter()
        .rev()
        .map(|l| l.trim())
        .take_while(|l| l.starts_with("#[") || l.starts_with("///"))
        .any(|l| l.starts_with("#[test]") || l.starts_with("#[tokio::test"))
}

/// Whether the line sits in an async function body
pub fn is_in_async_fn(lines: &[String], idx: usize) -> bool {
    matches!(enclosing_fn(lines, idx), Some((_, FnKind::Async)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &[&str]) -> Vec<String> {
        src.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_fn_signatures() {
        assert_eq!(fn_signature("fn main() {"), Some(FnKind::Sync));
        assert_eq!(fn_signature("    pub fn load() -> X {"), Some(FnKind::Sync));
        assert_eq!(
            fn_signature("pub(crate) async fn run(&mut self) {"),
            Some(FnKind::Async)
        );
        assert_eq!(fn_signature("async unsafe fn raw() {"), Some(FnKind::Async));
        assert_eq!(fn_signature("let f = |x| x;"), None);
        assert_eq!(fn_signature("// fn commented() {"), None);
    }

    #[test]
    fn test_async_body_detection() {
        let src = lines(&[
            "async fn bad() {",
            "    let s = std::fs::read_to_string(\"f\");",
            "}",
            "pub fn fine() {",
            "    let s = std::fs::read_to_string(\"f\");",
            "}",
        ]);

        assert!(is_in_async_fn(&src, 1));
        assert!(!is_in_async_fn(&src, 4));
    }

    #[test]
    fn test_test_code_detection() {
        let src = lines(&[
            "fn prod() {}",
            "#[tokio::test]",
            "async fn test_x() {",
            "    work();",
            "}",
            "#[cfg(test)]",
            "mod tests {",
            "    fn helper() {}",
            "}",
        ]);

        assert!(!is_test_code(&src, 0));
        assert!(is_test_code(&src, 3));
        assert!(is_test_code(&src, 7));
    }

    #[test]
    fn test_workspace_dirs_exist() {
        for dir in production_dirs() {
            assert!(dir.exists(), "missing {}", dir.display());
        }
    }
}
