//! Integration Test: Async Runtime Prohibition
//!
//! **Policy**: chirp-core is blocking. Concurrency comes from the dispatcher
//! pool and one thread per stream; no async runtime may creep in through
//! source or manifest.

use std::fs;

use architectural_enforcement::{code_of, report, scan, workspace_path};

const FORBIDDEN: [&str; 4] = ["tokio", "async fn", ".await", "async move"];

#[test]
fn test_no_async_in_core_source() {
    let violations = scan(&workspace_path("chirp/core/src"), |_, lines, idx| {
        let code = code_of(lines[idx]);
        FORBIDDEN.iter().any(|needle| code.contains(needle))
    });
    report("async code in chirp-core", &violations);
}

#[test]
fn test_no_runtime_dependency_in_core_manifest() {
    let manifest = fs::read_to_string(workspace_path("chirp/core/Cargo.toml"))
        .expect("chirp-core manifest is readable");
    let offending: Vec<&str> = manifest
        .lines()
        .map(code_of)
        .filter(|line| {
            let name = line.split('=').next().unwrap_or("").trim();
            ["tokio", "async-std", "futures", "async-trait"].contains(&name)
        })
        .collect();
    assert!(
        offending.is_empty(),
        "chirp-core must stay blocking, found: {offending:?}"
    );
}
