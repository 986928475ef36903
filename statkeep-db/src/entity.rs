//! The synchronization contract every tracked-statistic record implements.

use crate::connection::Database;
use crate::query::SqlValue;

/// Identifier under which a statistic row is stored, a player's
/// persistent id in the common case.
pub type OwnerKey = i64;

/// Fetch-on-load, push-on-save synchronization for one statistic record.
///
/// Implementations must keep the three operations in agreement about
/// column names: `fetch_data` reads, and `push_data` writes, exactly the
/// columns that `values` projects. The shared encodings are booleans as
/// integers 0/1 and timestamps as unix-seconds.
pub trait StatEntity {
    /// Hydrate from the store. When no row exists for `owner` yet, insert
    /// the current projection as the first-seen row instead of leaving
    /// the record unhydrated; when one does, copy its fields into memory.
    fn fetch_data(&mut self, db: &Database, owner: OwnerKey);

    /// Overwrite the persisted row with the current projection. `false`
    /// means the row is not confirmed written; the store may be away.
    fn push_data(&self, db: &Database, owner: OwnerKey) -> bool;

    /// Pure column → value projection of the in-memory state. Two calls
    /// with no intervening mutation return the same mapping.
    fn values(&self, owner: OwnerKey) -> Vec<(&'static str, SqlValue)>;
}
