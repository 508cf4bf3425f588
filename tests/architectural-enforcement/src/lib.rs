//! Architectural Enforcement
//!
//! Source scanners shared by the integration tests in `tests/`:
//! - No sleep() calls in production code outside retry backoff
//! - No `unwrap()`/`expect()` in production code
//! - No async runtime in the client library
//!
//! Production code is everything above a file's first `#[cfg(test)]`.

use std::fs;
use std::path::{Path, PathBuf};

/// One offending line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// File containing the line
    pub path: PathBuf,
    /// 1-based line number
    pub line: usize,
    /// The trimmed source line
    pub text: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} - {}", self.path.display(), self.line, self.text)
    }
}

/// Absolute path of a directory relative to the workspace root
#[must_use]
pub fn workspace_path(relative: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .join(relative)
}

/// Every `.rs` file below `dir`
#[must_use]
pub fn rust_files(dir: &Path) -> Vec<PathBuf> {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("rs"))
        .map(walkdir::DirEntry::into_path)
        .collect()
}

/// Production lines of a source file, comments stripped, with 1-based numbers
#[must_use]
pub fn production_lines(source: &str) -> Vec<(usize, &str)> {
    let mut lines = Vec::new();
    for (idx, line) in source.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("#[cfg(test)]") {
            break;
        }
        if trimmed.starts_with("//") {
            continue;
        }
        let code = line.split("//").next().unwrap_or(line);
        lines.push((idx + 1, code));
    }
    lines
}

/// Scan every production line under `dir`, keeping those `offends` flags
///
/// `offends` receives the file path, the whole file split into lines, and
/// the 0-based index of the candidate line.
pub fn scan<F>(dir: &Path, offends: F) -> Vec<Violation>
where
    F: Fn(&Path, &[&str], usize) -> bool,
{
    let mut violations = Vec::new();
    for path in rust_files(dir) {
        let Ok(content) = fs::read_to_string(&path) else {
            continue;
        };
        let all: Vec<&str> = content.lines().collect();
        for (number, code) in production_lines(&content) {
            if offends(path.as_path(), all.as_slice(), number - 1) && !code.trim().is_empty() {
                violations.push(Violation {
                    path: path.clone(),
                    line: number,
                    text: all[number - 1].trim().to_string(),
                });
            }
        }
    }
    violations
}

/// Code part of a line, without any trailing comment
#[must_use]
pub fn code_of(line: &str) -> &str {
    line.split("//").next().unwrap_or(line)
}

/// Whether a sleep on `idx` sits inside retry backoff
#[must_use]
pub fn is_backoff_context(lines: &[&str], idx: usize) -> bool {
    let range = idx.saturating_sub(15)..std::cmp::min(idx + 5, lines.len());
    lines[range].iter().any(|line| {
        let line = line.to_lowercase();
        line.contains("retry") || line.contains("backoff") || line.contains("attempt")
    })
}

/// Panic with a readable report when `violations` is not empty
pub fn report(rule: &str, violations: &[Violation]) {
    if violations.is_empty() {
        return;
    }
    eprintln!("\n❌ {rule}\n");
    for violation in violations {
        eprintln!("  ❌ {violation}");
    }
    panic!(
        "\nFound {} violation(s) of: {rule}\nFix these before merging!",
        violations.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_lines_stop_at_test_module() {
        let source = "fn a() {}\n// note\n#[cfg(test)]\nmod tests { fn b() { x.unwrap(); } }";
        let lines = production_lines(source);
        assert_eq!(lines, vec![(1, "fn a() {}")]);
    }

    #[test]
    fn test_trailing_comment_is_not_code() {
        assert_eq!(code_of("let x = 1; // .unwrap()"), "let x = 1; ");
    }

    #[test]
    fn test_backoff_detection() {
        let code = [
            "Err(e) if attempt < self.retry_count => {",
            "    attempt += 1;",
            "    thread::sleep(self.retry_interval);",
            "}",
        ];
        assert!(is_backoff_context(&code, 2));
    }

    #[test]
    fn test_plain_sleep_is_not_backoff() {
        let code = ["fn poll() {", "    thread::sleep(Duration::from_millis(10));", "}"];
        assert!(!is_backoff_context(&code, 1));
    }
}
