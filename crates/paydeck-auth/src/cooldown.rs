//! Verification-code cooldown ledger
//!
//! A small persisted list of phone → cooldown records that throttles
//! verification-code requests client-side, before any network call is made.
//! The ledger is persisted as a whole on every change; all mutations run
//! under one Mutex so concurrent records for different phones cannot lose
//! each other's entries.
//!
//! Expiry is decided by wall clock on every read: `now - issued_at >=
//! cooldown_seconds` means the entry is gone, whether or not its removal
//! timer ever fired. The timers only keep the persisted ledger compact —
//! after a process restart none of them exist, and correctness is unchanged.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// One phone's active cooldown. At most one entry per phone exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CooldownEntry {
    pub phone: String,
    pub cooldown_seconds: u64,
    /// Unix timestamp in milliseconds at issuance.
    pub issued_at: u64,
}

impl CooldownEntry {
    fn expires_at(&self) -> u64 {
        self.issued_at + self.cooldown_seconds * 1000
    }

    fn is_expired(&self, now: u64) -> bool {
        now >= self.expires_at()
    }

    /// Whole seconds until expiry, rounded up.
    fn remaining_secs(&self, now: u64) -> u64 {
        self.expires_at().saturating_sub(now).div_ceil(1000)
    }
}

struct LedgerState {
    entries: Vec<CooldownEntry>,
    /// Removal timers keyed by phone. Aborted when the entry is replaced or
    /// the ledger is wiped, so a stale timer never removes a newer entry.
    timers: HashMap<String, JoinHandle<()>>,
}

struct LedgerInner {
    path: PathBuf,
    state: Mutex<LedgerState>,
}

/// Persisted phone → cooldown ledger. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CooldownLedger {
    inner: Arc<LedgerInner>,
}

impl CooldownLedger {
    /// Load the ledger from the given file path.
    ///
    /// A missing file is an empty ledger; a malformed file is recovered as
    /// empty (a corrupt throttle record must never block login). Entries
    /// that expired while the process was down are pruned immediately, and
    /// removal timers are re-armed for the survivors.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let entries: Vec<CooldownEntry> = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading cooldown ledger: {e}")))?;
            match serde_json::from_str(&contents) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "malformed cooldown ledger, starting empty");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let ledger = Self {
            inner: Arc::new(LedgerInner {
                path,
                state: Mutex::new(LedgerState {
                    entries,
                    timers: HashMap::new(),
                }),
            }),
        };

        let now = now_millis();
        {
            let mut state = ledger.inner.state.lock().await;
            state.entries.retain(|e| !e.is_expired(now));
            for entry in state.entries.clone() {
                let handle = ledger.schedule_removal(
                    entry.phone.clone(),
                    entry.issued_at,
                    entry.remaining_secs(now),
                );
                state.timers.insert(entry.phone, handle);
            }
            debug!(entries = state.entries.len(), "cooldown ledger loaded");
        }

        Ok(ledger)
    }

    /// Purely local guard: fails with the remaining wait when an unexpired
    /// entry exists for `phone`. Runs before any network call so a redundant
    /// code request never reaches the server.
    pub async fn try_issue(&self, phone: &str) -> Result<()> {
        let now = now_millis();
        let state = self.inner.state.lock().await;
        if let Some(entry) = state
            .entries
            .iter()
            .find(|e| e.phone == phone && !e.is_expired(now))
        {
            return Err(Error::AlreadyCoolingDown {
                remaining_secs: entry.remaining_secs(now),
            });
        }
        Ok(())
    }

    /// Record a fresh cooldown for `phone`, replacing any previous entry,
    /// and persist the whole ledger.
    pub async fn record(&self, phone: &str, cooldown_seconds: u64) -> Result<()> {
        self.record_at(phone, cooldown_seconds, now_millis()).await
    }

    /// Issuance time is a parameter so tests can back-date entries instead
    /// of sleeping through real cooldowns.
    async fn record_at(&self, phone: &str, cooldown_seconds: u64, issued_at: u64) -> Result<()> {
        let mut state = self.inner.state.lock().await;

        let now = now_millis();
        state.entries.retain(|e| !e.is_expired(now) && e.phone != phone);
        state.entries.push(CooldownEntry {
            phone: phone.to_string(),
            cooldown_seconds,
            issued_at,
        });
        persist(&self.inner.path, &state.entries).await?;

        if let Some(stale) = state.timers.remove(phone) {
            stale.abort();
        }
        let handle = self.schedule_removal(phone.to_string(), issued_at, cooldown_seconds);
        state.timers.insert(phone.to_string(), handle);

        debug!(phone, cooldown_seconds, "cooldown recorded");
        Ok(())
    }

    /// Wipe every entry and cancel all removal timers. Invoked on successful
    /// authentication — a fresh session no longer needs code throttling.
    pub async fn clear(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        for (_, timer) in state.timers.drain() {
            timer.abort();
        }
        state.entries.clear();
        persist(&self.inner.path, &state.entries).await?;
        debug!("cooldown ledger cleared");
        Ok(())
    }

    /// Snapshot of the unexpired entries.
    pub async fn entries(&self) -> Vec<CooldownEntry> {
        let now = now_millis();
        let state = self.inner.state.lock().await;
        state
            .entries
            .iter()
            .filter(|e| !e.is_expired(now))
            .cloned()
            .collect()
    }

    /// Arm a compaction timer for one entry. The timer matches on issuance
    /// time as well as phone: if the entry was replaced in the meantime the
    /// newer entry stays untouched.
    fn schedule_removal(&self, phone: String, issued_at: u64, delay_secs: u64) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(delay_secs)).await;
            let mut state = inner.state.lock().await;
            let before = state.entries.len();
            state
                .entries
                .retain(|e| !(e.phone == phone && e.issued_at == issued_at));
            if state.entries.len() != before {
                if let Err(e) = persist(&inner.path, &state.entries).await {
                    warn!(phone, error = %e, "failed to persist cooldown compaction");
                }
                state.timers.remove(&phone);
                debug!(phone, "expired cooldown compacted");
            }
        })
    }
}

/// Persist the full ledger atomically (temp file + rename).
async fn persist(path: &Path, entries: &[CooldownEntry]) -> Result<()> {
    let json = serde_json::to_string_pretty(entries)
        .map_err(|e| Error::Io(format!("serializing cooldown ledger: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("cooldown ledger path has no parent directory".into()))?;
    let tmp_path = dir.join(format!(".cooldowns.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp cooldown ledger: {e}")))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp cooldown ledger: {e}")))?;

    Ok(())
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
