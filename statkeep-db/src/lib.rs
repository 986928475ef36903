//! Persistence engine for game-server runtime statistics.
//!
//! Owns the single live connection to the statistics database, brings
//! the schema up to date through an ordered sequence of patch scripts,
//! and gives tracked statistic records a narrow keyed-CRUD surface.
//! When the store goes away, operations degrade to boolean and
//! empty-sequence results while reconnection is attempted; losing the
//! store is never fatal to the host process.

pub mod connection;
pub mod entity;
pub mod patcher;
pub mod query;
pub mod result;
pub mod settings;

pub use connection::{ConnectError, ConnectionState, Database, ExecError, Health};
pub use entity::{OwnerKey, StatEntity};
pub use patcher::{
    PatchError, PatchSet, PatchSummary, SCHEMA_VERSION_KEY, apply_named, apply_pending,
    schema_version,
};
pub use query::{Query, SqlValue};
pub use result::{QueryResult, RowError};
pub use settings::{DbSettings, LIVENESS_TIMEOUT, ReconnectPolicy, SettingsError};
