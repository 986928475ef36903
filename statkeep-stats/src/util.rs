//! Small shared helpers.

use chrono::Utc;

/// Current time as the unix-seconds value entities persist.
pub fn timestamp() -> i64 {
    Utc::now().timestamp()
}
