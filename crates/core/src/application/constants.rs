// Launcher constants (no magic values in adapters)
use std::time::Duration;

/// Grace period between SIGTERM and SIGKILL when resetting (5 seconds)
pub const TERM_GRACE_PERIOD_MS: i64 = 5000;

/// Poll interval while waiting for signalled processes to exit
pub const REAP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Exit code reported when the launcher fails before the child exits
pub const LAUNCHER_FAILURE_EXIT_CODE: i32 = 1;
