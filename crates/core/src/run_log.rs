//! Job log assembly.

use std::time::Duration;

/// Merge captured engine output into the text stored in a job's `log`
/// column.
///
/// Shape: `duration_ms=<n>`, a `--- stdout ---` block, a `--- stderr ---`
/// block, newline-joined and trimmed.
pub fn merge_logs(stdout: &str, stderr: &str, elapsed: Duration) -> String {
    [
        format!("duration_ms={}", elapsed.as_millis()),
        "--- stdout ---".to_string(),
        stdout.to_string(),
        "--- stderr ---".to_string(),
        stderr.to_string(),
    ]
    .join("\n")
    .trim()
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_in_fixed_order() {
        let log = merge_logs("sim ok\n", "warn: gps drift\n", Duration::from_millis(1234));
        assert_eq!(
            log,
            "duration_ms=1234\n--- stdout ---\nsim ok\n\n--- stderr ---\nwarn: gps drift"
        );
    }

    #[test]
    fn empty_streams_are_trimmed() {
        let log = merge_logs("", "", Duration::from_millis(7));
        assert_eq!(log, "duration_ms=7\n--- stdout ---\n\n--- stderr ---");
    }
}
