//! Metrics for the farming client
//!
//! Recorded through the `metrics` facade. Nothing is exported unless the
//! embedding application installs a recorder.

use metrics::{describe_counter, describe_gauge};

/// Metric names as constants
pub mod names {
    // Build metrics
    pub const SHARDS_GENERATED: &str = "shardfarm_shards_generated_total";
    pub const SHARDS_REUSED: &str = "shardfarm_shards_reused_total";
    pub const SETTLED_HEIGHT: &str = "shardfarm_settled_height";
    pub const CHECKPOINTS: &str = "shardfarm_checkpoints_total";

    // Authority metrics
    pub const PINGS: &str = "shardfarm_pings_total";
    pub const RETRIES: &str = "shardfarm_retries_total";
}

/// Initialize metric descriptions
pub fn init_metrics() {
    describe_counter!(
        names::SHARDS_GENERATED,
        "Shards generated and written to the store"
    );
    describe_counter!(
        names::SHARDS_REUSED,
        "Existing shards kept during a resumed build"
    );
    describe_gauge!(
        names::SETTLED_HEIGHT,
        "Largest height with every shard below it complete"
    );
    describe_counter!(
        names::CHECKPOINTS,
        "Heights delivered to the checkpoint sink"
    );

    describe_counter!(names::PINGS, "Successful keep-alive pings");
    describe_counter!(
        names::RETRIES,
        "Retried calls to the remote authority, by operation"
    );
}
