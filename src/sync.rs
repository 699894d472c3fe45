//! Local-first persistence with best-effort remote mirroring.
//!
//! Every mutation rewrites the whole collection in the local store before
//! anything else happens. Mirroring to the remote backend runs in the
//! background, one pass at a time; a mutation that finds a pass in flight
//! skips its mirror and the next mutation re-submits the full collection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::db::LocalStore;
use crate::error::{AcademyError, Result};
use crate::models::{
    AcademySettings, AppState, CashTransaction, Collection, Listed, MatchSquad, Payment, Record,
    Student, Teacher, User, SETTINGS_ID,
};
use crate::remote::{RemoteError, RemoteStore};

/// What happened to the remote side of a mutation.
#[derive(Debug)]
pub enum RemoteMirror {
    /// The initial load has not finished; nothing was written anywhere.
    NotLoaded,
    /// No remote credentials configured.
    Disabled,
    /// The collection never leaves the machine.
    Unmapped,
    /// Another remote pass was in flight.
    Skipped,
    Spawned(JoinHandle<()>),
}

#[derive(Debug)]
pub struct SyncOutcome {
    pub persisted: bool,
    pub remote: RemoteMirror,
}

impl SyncOutcome {
    /// Wait for a spawned mirror pass, if any. Mirror failures are already
    /// logged by the pass itself.
    #[cfg(test)]
    pub async fn settle(self) {
        if let RemoteMirror::Spawned(handle) = self.remote {
            let _ = handle.await;
        }
    }
}

/// Held while a remote pass runs; released on drop.
struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl BusyGuard {
    fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

pub struct SyncCoordinator {
    local: Arc<dyn LocalStore>,
    remote: Option<Arc<dyn RemoteStore>>,
    loaded: AtomicBool,
    busy: Arc<AtomicBool>,
    /// One writer per collection at a time.
    locks: [Mutex<()>; Collection::COUNT],
}

fn encode<R: Record>(records: &[R]) -> Result<Vec<(String, Value)>> {
    records
        .iter()
        .map(|r| -> Result<(String, Value)> { Ok((r.id().to_string(), serde_json::to_value(r)?)) })
        .collect()
}

fn decode<R: Record>(values: Vec<Value>) -> Result<Vec<R>> {
    values
        .into_iter()
        .map(|v| serde_json::from_value(v).map_err(AcademyError::from))
        .collect()
}

async fn fetch<R: Record>(remote: &dyn RemoteStore) -> Result<Vec<R>> {
    let Some(table) = R::COLLECTION.remote_table() else {
        return Ok(Vec::new());
    };
    let rows = remote.fetch_all(table).await?;
    rows.into_iter()
        .map(|v| {
            serde_json::from_value(v).map_err(|e| {
                AcademyError::Remote(RemoteError::Parse(format!("{table}: {e}")))
            })
        })
        .collect()
}

impl SyncCoordinator {
    pub fn new(local: Arc<dyn LocalStore>, remote: Option<Arc<dyn RemoteStore>>) -> Self {
        Self {
            local,
            remote,
            loaded: AtomicBool::new(false),
            busy: Arc::new(AtomicBool::new(false)),
            locks: std::array::from_fn(|_| Mutex::new(())),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    #[cfg(test)]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn remote_enabled(&self) -> bool {
        self.remote.is_some()
    }

    /// Initial load from the local store. A store that cannot be opened or
    /// read leaves the session with empty defaults.
    pub fn load(&self) -> AppState {
        let state = match self.read_state() {
            Ok(state) => {
                info!(
                    students = state.students.len(),
                    payments = state.payments.len(),
                    "Loaded local state"
                );
                state
            }
            Err(e) => {
                warn!(error = %e, "Local store unavailable, starting with empty state");
                AppState::default()
            }
        };
        self.loaded.store(true, Ordering::Release);
        state
    }

    fn read_state(&self) -> Result<AppState> {
        self.local.init()?;
        let settings = decode::<AcademySettings>(
            self.local.get_all(Collection::Settings.store_name())?,
        )?
        .into_iter()
        .next()
        .unwrap_or_default();
        Ok(AppState {
            students: self.read::<Student>()?,
            teachers: self.read::<Teacher>()?,
            payments: self.read::<Payment>()?,
            cash_flow: self.read::<CashTransaction>()?,
            matches: self.read::<MatchSquad>()?,
            users: self.read::<User>()?,
            settings,
        })
    }

    fn read<R: Record>(&self) -> Result<Vec<R>> {
        decode(self.local.get_all(R::COLLECTION.store_name())?)
    }

    /// Persist a full collection snapshot locally, then mirror it remotely
    /// if possible. Returns once the local write is durable.
    pub async fn persist_and_sync<R: Record>(&self, snapshot: &[R]) -> Result<SyncOutcome> {
        if !self.is_loaded() {
            debug!(collection = R::COLLECTION.store_name(), "Skipping persist before initial load");
            return Ok(SyncOutcome {
                persisted: false,
                remote: RemoteMirror::NotLoaded,
            });
        }
        let records = encode(snapshot)?;
        self.write_local(R::COLLECTION, &records).await?;
        let remote = self.mirror(R::COLLECTION, records.into_iter().map(|(_, v)| v).collect());
        Ok(SyncOutcome {
            persisted: true,
            remote,
        })
    }

    /// The settings singleton is upserted under its sentinel id.
    pub async fn persist_settings(&self, settings: &AcademySettings) -> Result<SyncOutcome> {
        if !self.is_loaded() {
            return Ok(SyncOutcome {
                persisted: false,
                remote: RemoteMirror::NotLoaded,
            });
        }
        let mut settings = settings.clone();
        settings.id = SETTINGS_ID.to_string();
        let value = serde_json::to_value(&settings)?;
        {
            let _lock = self.locks[Collection::Settings.index()].lock().await;
            self.local
                .upsert(Collection::Settings.store_name(), SETTINGS_ID, &value)?;
        }
        let remote = self.mirror(Collection::Settings, vec![value]);
        Ok(SyncOutcome {
            persisted: true,
            remote,
        })
    }

    async fn write_local(&self, collection: Collection, records: &[(String, Value)]) -> Result<()> {
        let _lock = self.locks[collection.index()].lock().await;
        self.local.replace_all(collection.store_name(), records)?;
        debug!(collection = collection.store_name(), count = records.len(), "Persisted locally");
        Ok(())
    }

    fn mirror(&self, collection: Collection, records: Vec<Value>) -> RemoteMirror {
        let Some(remote) = &self.remote else {
            return RemoteMirror::Disabled;
        };
        let Some(table) = collection.remote_table() else {
            return RemoteMirror::Unmapped;
        };
        let Some(guard) = BusyGuard::try_acquire(&self.busy) else {
            debug!(collection = collection.store_name(), "Remote sync in flight, skipping mirror");
            return RemoteMirror::Skipped;
        };
        let remote = Arc::clone(remote);
        RemoteMirror::Spawned(tokio::spawn(async move {
            let _guard = guard;
            match remote.upsert(table, &records).await {
                Ok(()) => debug!(table, count = records.len(), "Mirrored to remote"),
                Err(e) => warn!(table, error = %e, "Remote mirror failed; local data is intact"),
            }
        }))
    }

    /// Replace local collections with the remote copy. Nothing is applied
    /// unless every fetch succeeds; an empty remote collection is left alone.
    pub async fn download_all(&self, state: &mut AppState) -> Result<Vec<(Collection, usize)>> {
        let remote = self.remote.as_ref().ok_or(AcademyError::RemoteDisabled)?;
        let _guard = BusyGuard::try_acquire(&self.busy).ok_or(AcademyError::SyncBusy)?;
        let remote: &dyn RemoteStore = &**remote;

        let (students, teachers, payments, cash_flow, matches, settings) = tokio::try_join!(
            fetch::<Student>(remote),
            fetch::<Teacher>(remote),
            fetch::<Payment>(remote),
            fetch::<CashTransaction>(remote),
            fetch::<MatchSquad>(remote),
            fetch::<AcademySettings>(remote),
        )?;

        let mut applied = Vec::new();
        self.apply_download(state, students, &mut applied).await?;
        self.apply_download(state, teachers, &mut applied).await?;
        self.apply_download(state, payments, &mut applied).await?;
        self.apply_download(state, cash_flow, &mut applied).await?;
        self.apply_download(state, matches, &mut applied).await?;
        if let Some(mut downloaded) = settings.into_iter().next() {
            downloaded.id = SETTINGS_ID.to_string();
            let value = serde_json::to_value(&downloaded)?;
            {
                let _lock = self.locks[Collection::Settings.index()].lock().await;
                self.local
                    .upsert(Collection::Settings.store_name(), SETTINGS_ID, &value)?;
            }
            state.settings = downloaded;
            applied.push((Collection::Settings, 1));
        }
        info!(collections = applied.len(), "Downloaded remote state");
        Ok(applied)
    }

    async fn apply_download<R: Listed>(
        &self,
        state: &mut AppState,
        rows: Vec<R>,
        applied: &mut Vec<(Collection, usize)>,
    ) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        self.write_local(R::COLLECTION, &encode(&rows)?).await?;
        applied.push((R::COLLECTION, rows.len()));
        *R::list_mut(state) = rows;
        Ok(())
    }

    /// Push every remote-mapped collection. Failures are returned.
    pub async fn upload_all(&self, state: &AppState) -> Result<Vec<(Collection, usize)>> {
        let remote = self.remote.as_ref().ok_or(AcademyError::RemoteDisabled)?;
        let _guard = BusyGuard::try_acquire(&self.busy).ok_or(AcademyError::SyncBusy)?;

        let mut settings = state.settings.clone();
        settings.id = SETTINGS_ID.to_string();
        let batches = [
            (Collection::Students, encode(&state.students)?),
            (Collection::Teachers, encode(&state.teachers)?),
            (Collection::Payments, encode(&state.payments)?),
            (Collection::CashFlow, encode(&state.cash_flow)?),
            (Collection::Matches, encode(&state.matches)?),
            (Collection::Users, encode(&state.users)?),
            (Collection::Settings, encode(std::slice::from_ref(&settings))?),
        ];

        let mut uploaded = Vec::new();
        for (collection, records) in batches {
            let Some(table) = collection.remote_table() else {
                continue;
            };
            let values: Vec<Value> = records.into_iter().map(|(_, v)| v).collect();
            remote.upsert(table, &values).await?;
            uploaded.push((collection, values.len()));
        }
        info!(collections = uploaded.len(), "Uploaded local state");
        Ok(uploaded)
    }
}
