//! Integration Test: Panic Prohibition
//!
//! **Policy**: Library code propagates errors. `unwrap()` and `expect()`
//! are reserved for tests; a worker or stream thread must never die on a
//! recoverable error.

use architectural_enforcement::{code_of, report, scan, workspace_path, Violation};

fn panicking_calls(dir: &str) -> Vec<Violation> {
    scan(&workspace_path(dir), |_, lines, idx| {
        let code = code_of(lines[idx]);
        code.contains(".unwrap()") || code.contains(".expect(")
    })
}

#[test]
fn test_no_unwrap_in_core() {
    report(
        "unwrap()/expect() in chirp-core production code",
        &panicking_calls("chirp/core/src"),
    );
}

#[test]
fn test_no_unwrap_in_firehose() {
    report(
        "unwrap()/expect() in chirp-firehose production code",
        &panicking_calls("chirp/firehose/src"),
    );
}
