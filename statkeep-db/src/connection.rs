//! Connection lifecycle and raw statement execution.
//!
//! One [`Database`] owns the single live handle to the statistics store.
//! Writes commit an explicit transaction per statement; any execution
//! failure after the handle was established degrades to a boolean/empty
//! result plus a reconnect attempt, never to a crash of the host process.
//! The [`Health`] snapshot is the side channel that lets callers tell a
//! failed read from a genuinely empty one.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use rusqlite::types::ValueRef;
use rusqlite::{Connection, params_from_iter};
use thiserror::Error;

use crate::query::SqlValue;
use crate::result::QueryResult;
use crate::settings::{DbSettings, LIVENESS_TIMEOUT};

#[derive(Debug, Error)]
#[error("Could not open statistics database '{path}': {source}")]
pub struct ConnectError {
    pub path: String,
    #[source]
    pub source: rusqlite::Error,
}

/// Failure on the non-degrading execution paths (`try_query`,
/// `try_execute`, `execute_script`).
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("No live connection to the statistics database")]
    Disconnected,
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// Where the manager currently stands with the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No live handle; every operation degrades until a reconnect succeeds.
    Disconnected,
    Connected,
    /// A reconnect is in flight on some caller's stack.
    Reconnecting,
}

/// Point-in-time view of connection health.
///
/// `last_error` reflects the most recent failed statement or connect
/// attempt and clears on the next successful statement, so a caller that
/// just received an empty result can check whether it meant "no rows".
#[derive(Debug, Clone)]
pub struct Health {
    pub state: ConnectionState,
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
}

impl Health {
    pub fn connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

struct Inner {
    handle: Option<Connection>,
    state: ConnectionState,
    consecutive_failures: u32,
    retry_after: Option<Instant>,
    last_error: Option<String>,
}

/// The single live connection to the statistics store.
///
/// Owned by the composing application and passed by reference to query
/// builders, the patch engine, and entities; there is no process-global
/// instance. Statements are serialized on the handle internally, but the
/// engine does not otherwise coordinate writers: one logical writer per
/// owner key at a time is the caller's responsibility.
pub struct Database {
    settings: DbSettings,
    inner: Mutex<Inner>,
}

impl Database {
    /// Open the handle described by `settings`.
    ///
    /// A failure here is the hard [`ConnectError`] path; the host decides
    /// whether to abort startup or continue via [`Database::degraded`].
    pub fn connect(settings: DbSettings) -> Result<Self, ConnectError> {
        let handle = open_handle(&settings)?;
        log::info!(
            "Connected to statistics database at '{}'",
            settings.path.display()
        );
        Ok(Self {
            settings,
            inner: Mutex::new(Inner {
                handle: Some(handle),
                state: ConnectionState::Connected,
                consecutive_failures: 0,
                retry_after: None,
                last_error: None,
            }),
        })
    }

    /// Construct a manager with no live handle, for hosts that keep
    /// running in store-less mode after a failed initial connect.
    /// Every operation degrades until a later reconnect succeeds.
    pub fn degraded(settings: DbSettings) -> Self {
        log::warn!(
            "Statistics database starting degraded; writes will not persist until '{}' becomes reachable",
            settings.path.display()
        );
        Self {
            settings,
            inner: Mutex::new(Inner {
                handle: None,
                state: ConnectionState::Disconnected,
                consecutive_failures: 0,
                retry_after: None,
                last_error: None,
            }),
        }
    }

    pub fn settings(&self) -> &DbSettings {
        &self.settings
    }

    pub fn health(&self) -> Health {
        let inner = self.lock();
        Health {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            last_error: inner.last_error.clone(),
        }
    }

    /// Run a write statement inside its own committed transaction.
    ///
    /// Returns whether at least one row changed. `false` covers both
    /// "statement applied, nothing matched" and "statement not confirmed
    /// applied" after a failure; [`Database::health`] tells them apart.
    pub fn execute_update(&self, sql: &str, params: &[SqlValue]) -> bool {
        let mut inner = self.lock();
        let result = inner
            .handle
            .as_ref()
            .map(|conn| run_update(conn, sql, params));
        match result {
            Some(Ok(changed)) => {
                note_success(&mut inner);
                changed > 0
            }
            Some(Err(e)) => {
                self.log_statement_failure(sql, &e);
                inner.last_error = Some(e.to_string());
                self.reconnect_locked(&mut inner);
                false
            }
            None => {
                self.reconnect_locked(&mut inner);
                false
            }
        }
    }

    /// Run a read statement and materialize every row.
    ///
    /// On failure this logs, attempts a reconnect, and returns an empty
    /// vec, the same value a zero-row result produces. Callers that need
    /// the distinction check [`Database::health`] or use
    /// [`Database::try_query`].
    pub fn execute_query(&self, sql: &str, params: &[SqlValue]) -> Vec<QueryResult> {
        let mut inner = self.lock();
        let result = inner
            .handle
            .as_ref()
            .map(|conn| run_query(conn, sql, params));
        match result {
            Some(Ok(rows)) => {
                note_success(&mut inner);
                rows
            }
            Some(Err(e)) => {
                self.log_statement_failure(sql, &e);
                inner.last_error = Some(e.to_string());
                self.reconnect_locked(&mut inner);
                Vec::new()
            }
            None => {
                self.reconnect_locked(&mut inner);
                Vec::new()
            }
        }
    }

    /// Read path without the degrade-to-empty behavior: errors propagate
    /// and no reconnect is attempted. Used where a failure must abort
    /// instead of being smoothed over (the patch engine's version reads).
    pub fn try_query(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<QueryResult>, ExecError> {
        let mut inner = self.lock();
        let conn = inner.handle.as_ref().ok_or(ExecError::Disconnected)?;
        let rows = run_query(conn, sql, params)?;
        note_success(&mut inner);
        Ok(rows)
    }

    /// Write path without the degrade-to-false behavior.
    pub fn try_execute(&self, sql: &str, params: &[SqlValue]) -> Result<usize, ExecError> {
        let mut inner = self.lock();
        let conn = inner.handle.as_ref().ok_or(ExecError::Disconnected)?;
        let changed = run_update(conn, sql, params)?;
        note_success(&mut inner);
        Ok(changed)
    }

    /// Execute a pre-written SQL script (one or more statements, in file
    /// order) against the raw handle.
    ///
    /// No enclosing transaction is opened: a script that fails midway
    /// stays partially applied, which is the script author's concern.
    /// Errors propagate, since a schema-patch failure must surface
    /// instead of degrading.
    pub fn execute_script(&self, sql: &str) -> Result<(), ExecError> {
        let mut inner = self.lock();
        let conn = inner.handle.as_ref().ok_or(ExecError::Disconnected)?;
        conn.execute_batch(sql)?;
        note_success(&mut inner);
        Ok(())
    }

    /// Re-establish the connection after a failed statement.
    ///
    /// A handle that still answers a liveness probe is left alone; the
    /// original failure is then a malformed-statement symptom, and the
    /// call reports healthy. Otherwise a fresh connect replaces the
    /// handle, subject to the reconnect policy's cool-down: while the
    /// cool-down from previous failed attempts is running, no connect is
    /// attempted at all.
    pub fn reconnect(&self) -> bool {
        let mut inner = self.lock();
        self.reconnect_locked(&mut inner)
    }

    /// Release the handle. The manager is consumed; re-initialization
    /// means constructing a fresh [`Database`].
    pub fn close(self) {
        let inner = self
            .inner
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(conn) = inner.handle {
            if let Err((_conn, e)) = conn.close() {
                log::warn!("Error closing the statistics database: {e}");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn log_statement_failure(&self, sql: &str, error: &rusqlite::Error) {
        log::warn!("Error executing statement against the statistics database: {error}");
        log::warn!("  statement: {sql}");
        if self.settings.debug {
            log::debug!("Statement failure detail: {error:?}");
        }
    }

    fn reconnect_locked(&self, inner: &mut Inner) -> bool {
        if let Some(conn) = inner.handle.as_ref() {
            if probe(conn) {
                log::warn!("Connection is still live; malformed statement suspected");
                inner.state = ConnectionState::Connected;
                return true;
            }
        }

        inner.state = ConnectionState::Reconnecting;
        if let Some(at) = inner.retry_after {
            let now = Instant::now();
            if now < at {
                log::debug!(
                    "Reconnect suppressed for another {:?}",
                    at.duration_since(now)
                );
                inner.state = ConnectionState::Disconnected;
                return false;
            }
        }

        log::warn!("Attempting to reconnect to the statistics database");
        match open_handle(&self.settings) {
            Ok(conn) => {
                inner.handle = Some(conn);
                inner.state = ConnectionState::Connected;
                inner.consecutive_failures = 0;
                inner.retry_after = None;
                log::info!("Connection re-established");
                true
            }
            Err(e) => {
                inner.consecutive_failures += 1;
                let wait = self.settings.reconnect.cooldown(inner.consecutive_failures);
                inner.retry_after = Some(Instant::now() + wait);
                inner.last_error = Some(e.to_string());
                inner.state = ConnectionState::Disconnected;
                log::error!(
                    "Failed to reconnect to the statistics database; data will not persist (next attempt in {wait:?})"
                );
                if self.settings.debug {
                    log::debug!("Reconnect failure detail: {e:?}");
                }
                false
            }
        }
    }
}

fn open_handle(settings: &DbSettings) -> Result<Connection, ConnectError> {
    let wrap = |source| ConnectError {
        path: settings.path.display().to_string(),
        source,
    };
    let conn = Connection::open(&settings.path).map_err(wrap)?;
    conn.busy_timeout(LIVENESS_TIMEOUT).map_err(wrap)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
        .map_err(wrap)?;
    Ok(conn)
}

/// Bounded-time check that the handle still answers at all.
fn probe(conn: &Connection) -> bool {
    conn.query_row("SELECT 1", [], |row| row.get::<_, i32>(0))
        .is_ok()
}

fn note_success(inner: &mut Inner) {
    inner.state = ConnectionState::Connected;
    inner.consecutive_failures = 0;
    inner.retry_after = None;
    inner.last_error = None;
}

fn run_update(conn: &Connection, sql: &str, params: &[SqlValue]) -> rusqlite::Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let changed = tx.execute(sql, params_from_iter(params.iter()))?;
    tx.commit()?;
    Ok(changed)
}

fn run_query(
    conn: &Connection,
    sql: &str,
    params: &[SqlValue],
) -> rusqlite::Result<Vec<QueryResult>> {
    let mut stmt = conn.prepare(sql)?;
    let names: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(str::to_owned)
        .collect();
    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut columns = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            let value = match row.get_ref(i)? {
                ValueRef::Null => None,
                ValueRef::Integer(v) => Some(v.to_string()),
                ValueRef::Real(v) => Some(v.to_string()),
                ValueRef::Text(t) => Some(String::from_utf8_lossy(t).into_owned()),
                // Blobs are not part of any statistics schema; a blob
                // cell reads as absent rather than as garbage text.
                ValueRef::Blob(_) => None,
            };
            columns.insert(name.clone(), value);
        }
        out.push(QueryResult::new(columns));
    }
    Ok(out)
}
