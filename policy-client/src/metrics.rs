use metrics::{counter, describe_counter};

pub const QUOTA_CHECKS: &str = "quota_checks";
const RESULT_LABEL: &str = "result";

/// Registers the description of the counters this crate emits. Call once
/// after installing a recorder.
pub fn describe_metrics() {
    describe_counter!(QUOTA_CHECKS, "Quota checks by outcome");
}

pub(crate) fn incr_quota_checks(result: &'static str) {
    counter!(QUOTA_CHECKS, RESULT_LABEL => result).increment(1)
}
