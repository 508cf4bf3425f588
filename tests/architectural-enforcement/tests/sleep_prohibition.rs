//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code MUST NOT call sleep. Threads wait on a
//! condition variable, a channel, or a blocking read instead.
//! **Exceptions**: the fixed interval between transport retries.

use architectural_enforcement::{code_of, is_backoff_context, report, scan, workspace_path};

fn sleeps_outside_backoff(dir: &str) -> Vec<architectural_enforcement::Violation> {
    scan(&workspace_path(dir), |_, lines, idx| {
        let code = code_of(lines[idx]);
        (code.contains("::sleep(") || code.contains(".sleep("))
            && !is_backoff_context(lines, idx)
    })
}

#[test]
fn test_no_sleep_in_core() {
    report(
        "sleep() in chirp-core production code",
        &sleeps_outside_backoff("chirp/core/src"),
    );
}

#[test]
fn test_no_sleep_in_firehose() {
    report(
        "sleep() in chirp-firehose production code",
        &sleeps_outside_backoff("chirp/firehose/src"),
    );
}
