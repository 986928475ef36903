//! Ordered schema patching.
//!
//! A [`PatchSet`] is the explicit manifest of available patch scripts:
//! a monotonically numbered sequence plus named one-off maintenance
//! scripts. [`apply_pending`] walks the numbered sequence from the
//! recorded schema version, applying each missing patch exactly once and
//! recording the new version after each success, so a restart resumes
//! where the last run stopped. Scripts drive the connection's raw script
//! path directly; they are pre-written SQL, not built queries.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use thiserror::Error;

use crate::connection::{Database, ExecError};
use crate::query::SqlValue;
use crate::result::RowError;

/// Key under which the current schema version lives in the settings table.
pub const SCHEMA_VERSION_KEY: &str = "schema_version";

const SETTINGS_TABLE: &str = "settings";

#[derive(Debug, Error)]
pub enum PatchError {
    /// A numbered script failed mid-execution. The recorded version stays
    /// at the last success; a rerun re-attempts this same patch. Whatever
    /// the script applied before failing stays applied.
    #[error("Schema patch {version} failed: {source}")]
    Script {
        version: u32,
        #[source]
        source: ExecError,
    },
    #[error("Maintenance patch '{id}' failed: {source}")]
    Named {
        id: String,
        #[source]
        source: ExecError,
    },
    #[error("Could not read the recorded schema version: {source}")]
    VersionRead {
        #[source]
        source: ExecError,
    },
    #[error("Recorded schema version is unreadable: {0}")]
    VersionCorrupt(#[from] RowError),
    #[error("Could not record schema version {version}: {source}")]
    VersionWrite {
        version: u32,
        #[source]
        source: ExecError,
    },
}

/// The manifest of patch scripts supplied by the embedding application.
#[derive(Debug, Clone, Default)]
pub struct PatchSet {
    numbered: BTreeMap<u32, Cow<'static, str>>,
    named: HashMap<String, Cow<'static, str>>,
}

impl PatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The scripts shipped with this crate: the schema history of the
    /// statistics tables, plus the `offline_reset` maintenance script.
    pub fn bundled() -> Self {
        Self::new()
            .with_patch(1, include_str!("../sql/1.sql"))
            .with_patch(2, include_str!("../sql/2.sql"))
            .with_patch(3, include_str!("../sql/3.sql"))
            .with_named("offline_reset", include_str!("../sql/offline_reset.sql"))
    }

    pub fn with_patch(mut self, version: u32, sql: impl Into<Cow<'static, str>>) -> Self {
        self.numbered.insert(version, sql.into());
        self
    }

    pub fn with_named(
        mut self,
        id: impl Into<String>,
        sql: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.named.insert(id.into(), sql.into());
        self
    }

    fn get(&self, version: u32) -> Option<&str> {
        self.numbered.get(&version).map(Cow::as_ref)
    }

    fn get_named(&self, id: &str) -> Option<&str> {
        self.named.get(id).map(Cow::as_ref)
    }

    /// Highest version reachable from `from` through contiguous
    /// successors. A gap terminates the walk even if later numbers exist.
    fn last_reachable(&self, from: u32) -> u32 {
        let mut version = from;
        while self.numbered.contains_key(&(version + 1)) {
            version += 1;
        }
        version
    }
}

/// What one patch run did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchSummary {
    pub from: u32,
    pub to: u32,
    pub applied: u32,
}

/// Bring the schema from its recorded version to the latest reachable
/// one. `force` restarts the walk at version 0, reapplying every script;
/// the bundled scripts are written to tolerate that.
///
/// Blocking: runs on the caller's thread. The host must not generate
/// statistic traffic until this returns.
pub fn apply_pending(
    db: &Database,
    patches: &PatchSet,
    force: bool,
) -> Result<PatchSummary, PatchError> {
    let from = if force { 0 } else { schema_version(db)? };
    let target = patches.last_reachable(from);
    if target <= from {
        log::info!("Statistics schema is up to date (version {from})");
        return Ok(PatchSummary {
            from,
            to: from,
            applied: 0,
        });
    }

    log::info!("Patching statistics schema from version {from} to {target}");
    let mut version = from;
    while let Some(script) = patches.get(version + 1) {
        version += 1;
        log::info!("Applying schema patch {version} / {target}");
        db.execute_script(script)
            .map_err(|source| PatchError::Script { version, source })?;
        record_version(db, version)?;
    }

    Ok(PatchSummary {
        from,
        to: version,
        applied: version - from,
    })
}

/// Apply one named maintenance script, outside the monotonic sequence.
/// The recorded schema version is untouched. Returns `false` when no
/// script with that id exists in the manifest.
pub fn apply_named(db: &Database, patches: &PatchSet, id: &str) -> Result<bool, PatchError> {
    let Some(script) = patches.get_named(id) else {
        log::warn!("No maintenance patch named '{id}' in the manifest");
        return Ok(false);
    };
    log::info!("Applying maintenance patch '{id}'");
    db.execute_script(script).map_err(|source| PatchError::Named {
        id: id.to_owned(),
        source,
    })?;
    Ok(true)
}

/// The recorded schema version, read from the store itself. A store that
/// has never been patched (no settings table, or no version row) reads as
/// version 0. Read failures on a live connection abort rather than
/// silently restarting the walk from 0.
pub fn schema_version(db: &Database) -> Result<u32, PatchError> {
    let rows = db
        .try_query(
            "SELECT EXISTS(\
             SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1\
             ) AS present",
            &[SqlValue::from(SETTINGS_TABLE)],
        )
        .map_err(|source| PatchError::VersionRead { source })?;
    let present = rows
        .first()
        .and_then(|row| row.get_bool("present").ok())
        .unwrap_or(false);
    if !present {
        return Ok(0);
    }

    let rows = db
        .try_query(
            "SELECT value FROM settings WHERE key = ?1",
            &[SqlValue::from(SCHEMA_VERSION_KEY)],
        )
        .map_err(|source| PatchError::VersionRead { source })?;
    match rows.first() {
        None => Ok(0),
        Some(row) => {
            let version = row.get_long("value")?;
            Ok(version.max(0) as u32)
        }
    }
}

fn record_version(db: &Database, version: u32) -> Result<(), PatchError> {
    db.try_execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        &[
            SqlValue::from(SCHEMA_VERSION_KEY),
            SqlValue::from(version.to_string()),
        ],
    )
    .map_err(|source| PatchError::VersionWrite { version, source })?;
    Ok(())
}
