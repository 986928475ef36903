//! Intake gating and patch orchestration for the statistics pipeline.
//!
//! The [`Tracker`] sits between the game-event hooks and the persistence
//! engine: it holds the shared [`Database`], and its paused flag is the
//! gate producers check before generating fetch/push traffic. Schema
//! patching runs either on the caller's thread at startup or on a worker
//! thread with intake paused for the duration.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use statkeep_db::{Database, PatchError, PatchSet, PatchSummary, apply_named, apply_pending};

pub struct Tracker {
    db: Arc<Database>,
    patches: Arc<PatchSet>,
    paused: Arc<AtomicBool>,
}

impl Tracker {
    /// Wrap a connected (or degraded) database. Intake starts paused;
    /// it opens once the startup patch run succeeds.
    pub fn new(db: Database, patches: PatchSet) -> Self {
        Self {
            db: Arc::new(db),
            patches: Arc::new(patches),
            paused: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Producers check this before generating any fetch/push traffic.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    /// Startup path: bring the schema up to date before any statistic
    /// traffic. Intake opens on success and stays paused on failure,
    /// leaving the host to decide whether to resume degraded.
    pub fn patch_blocking(&self, force: bool) -> Result<PatchSummary, PatchError> {
        let result = apply_pending(&self.db, &self.patches, force);
        if result.is_ok() {
            self.set_paused(false);
        }
        result
    }

    /// Maintenance path: the same walk on a worker thread. Intake is
    /// paused for the duration and resumes whatever happens; on failure
    /// the error comes back through the join handle and is logged, but
    /// the pipeline is never left wedged.
    pub fn patch_background(&self, force: bool) -> JoinHandle<Result<PatchSummary, PatchError>> {
        let db = Arc::clone(&self.db);
        let patches = Arc::clone(&self.patches);
        let paused = Arc::clone(&self.paused);
        paused.store(true, Ordering::SeqCst);
        thread::spawn(move || {
            let _resume = ResumeGuard(paused);
            let result = apply_pending(&db, &patches, force);
            if let Err(e) = &result {
                log::error!("Background patch run failed: {e}");
            }
            result
        })
    }

    /// Run one named maintenance script from the manifest.
    pub fn run_named_patch(&self, id: &str) -> Result<bool, PatchError> {
        apply_named(&self.db, &self.patches, id)
    }
}

/// Re-opens intake when dropped, including on a panicking unwind.
struct ResumeGuard(Arc<AtomicBool>);

impl Drop for ResumeGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
