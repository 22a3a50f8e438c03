use crate::errors::AppError;
use crate::models::{Lead, OrgId, OrgScope, ScoreRecord};
use crate::normalizer::normalize_snapshot;
use crate::snapshot_digest::SnapshotDigest;
use crate::store::RecordStore;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

// ============ View state ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No active organization on the request.
    MissingContext,
    /// The store could not be read.
    FetchFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorState {
    pub kind: ErrorKind,
    pub message: String,
    pub retry_available: bool,
}

/// One organization's normalized data, fixed for the lifetime of a load cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub org_id: OrgId,
    pub generation: u64,
    pub fetched_at: DateTime<Utc>,
    pub records: Vec<ScoreRecord>,
    pub leads: Vec<Lead>,
    pub digest: SnapshotDigest,
}

impl Snapshot {
    pub fn new(org_id: OrgId, generation: u64, records: Vec<ScoreRecord>, leads: Vec<Lead>) -> Self {
        let digest = SnapshotDigest::compute(&records, &leads);
        Self {
            org_id,
            generation,
            fetched_at: Utc::now(),
            records,
            leads,
            digest,
        }
    }
}

/// What a view shows: exactly one of loading, error or loaded data.
#[derive(Debug, Clone)]
pub enum ViewState {
    Loading,
    Error(ErrorState),
    Loaded(Arc<Snapshot>),
}

impl ViewState {
    pub fn missing_context() -> Self {
        ViewState::Error(ErrorState {
            kind: ErrorKind::MissingContext,
            message: "No active organization selected".to_string(),
            retry_available: false,
        })
    }

    pub fn fetch_failed(err: &AppError) -> Self {
        let (_, reason) = err.public_parts();
        ViewState::Error(ErrorState {
            kind: ErrorKind::FetchFailed,
            message: format!("Could not load lead data: {}", reason),
            retry_available: true,
        })
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ViewState::Loading => StatusCode::ACCEPTED,
            ViewState::Error(e) => match e.kind {
                ErrorKind::MissingContext => StatusCode::FORBIDDEN,
                ErrorKind::FetchFailed => StatusCode::BAD_GATEWAY,
            },
            ViewState::Loaded(_) => StatusCode::OK,
        }
    }

    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        match self {
            ViewState::Loaded(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    /// Renders the state, building the view from the snapshot when loaded.
    pub fn render<V, F>(&self, build: F) -> ViewResponse<V>
    where
        F: FnOnce(&Snapshot) -> V,
    {
        match self {
            ViewState::Loading => ViewResponse::Loading,
            ViewState::Error(error) => ViewResponse::Error {
                error: error.clone(),
            },
            ViewState::Loaded(snapshot) => ViewResponse::Loaded {
                generation: snapshot.generation,
                fetched_at: snapshot.fetched_at,
                digest: snapshot.digest.clone(),
                view: build(snapshot),
            },
        }
    }
}

/// Serialized form of a [`ViewState`].
#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ViewResponse<V> {
    Loading,
    Error {
        error: ErrorState,
    },
    Loaded {
        generation: u64,
        fetched_at: DateTime<Utc>,
        digest: SnapshotDigest,
        view: V,
    },
}

// ============ Coordination ============

struct Published {
    generation: u64,
    state: ViewState,
}

/// Per-organization load bookkeeping.
pub struct OrgSlot {
    issued: AtomicU64,
    published: RwLock<Published>,
}

impl OrgSlot {
    fn new() -> Self {
        Self {
            issued: AtomicU64::new(0),
            published: RwLock::new(Published {
                generation: 0,
                state: ViewState::Loading,
            }),
        }
    }

    async fn state(&self) -> ViewState {
        self.published.read().await.state.clone()
    }
}

/// Permission to publish the result of one load.
pub struct LoadTicket {
    org: OrgId,
    generation: u64,
    slot: Arc<OrgSlot>,
}

impl LoadTicket {
    pub fn org(&self) -> OrgId {
        self.org
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Publishes a finished load. Returns `false` when a newer load was
    /// issued in the meantime and the result was discarded.
    pub async fn publish(self, result: Result<Snapshot, AppError>) -> bool {
        let mut published = self.slot.published.write().await;

        let latest = self.slot.issued.load(Ordering::SeqCst);
        if self.generation != latest {
            tracing::info!(
                "Discarding stale load for org {} (generation {}, latest {})",
                self.org,
                self.generation,
                latest
            );
            return false;
        }

        published.state = match result {
            Ok(snapshot) => {
                if let ViewState::Loaded(previous) = &published.state {
                    if previous.digest == snapshot.digest {
                        tracing::debug!("Refresh for org {} unchanged", self.org);
                    }
                }
                tracing::info!(
                    "Loaded org {}: {} score record(s), {} lead(s) (generation {})",
                    self.org,
                    snapshot.records.len(),
                    snapshot.leads.len(),
                    self.generation
                );
                ViewState::Loaded(Arc::new(snapshot))
            }
            Err(err) => {
                err.log();
                ViewState::fetch_failed(&err)
            }
        };
        published.generation = self.generation;
        true
    }
}

/// Issues generations and holds the last published state per organization.
///
/// A finished load is published only while its generation is still the
/// latest one issued for that organization, so a slow fetch never overwrites
/// the result of a newer one.
#[derive(Clone)]
pub struct LoadCoordinator {
    slots: Cache<OrgId, Arc<OrgSlot>>,
}

impl LoadCoordinator {
    /// # Arguments
    ///
    /// * `idle` - Time without access after which an organization is evicted.
    /// * `max_orgs` - Maximum number of organizations kept.
    pub fn new(idle: Duration, max_orgs: u64) -> Self {
        let slots = Cache::builder()
            .max_capacity(max_orgs)
            .time_to_idle(idle)
            .build();
        Self { slots }
    }

    /// Starts a load for `org`, superseding every load issued before it.
    ///
    /// A loaded state keeps being shown until the new load publishes.
    pub async fn begin(&self, org: OrgId) -> LoadTicket {
        let slot = self
            .slots
            .get_with(org, async { Arc::new(OrgSlot::new()) })
            .await;

        let mut published = slot.published.write().await;
        let generation = slot.issued.fetch_add(1, Ordering::SeqCst) + 1;
        if !matches!(published.state, ViewState::Loaded(_)) {
            published.state = ViewState::Loading;
        }
        drop(published);

        tracing::debug!("Load issued for org {} (generation {})", org, generation);
        LoadTicket {
            org,
            generation,
            slot,
        }
    }

    /// Whether anything was ever loaded (or is loading) for `org`.
    pub async fn is_tracked(&self, org: OrgId) -> bool {
        self.slots.get(&org).await.is_some()
    }

    /// Current state without fetching. Untracked organizations read as loading.
    pub async fn current(&self, scope: OrgScope) -> ViewState {
        match scope {
            OrgScope::Missing => ViewState::missing_context(),
            OrgScope::Active(org) => match self.slots.get(&org).await {
                Some(slot) => slot.state().await,
                None => ViewState::Loading,
            },
        }
    }

    /// Fetches, normalizes and publishes one organization's data, then
    /// returns the state now visible for it.
    pub async fn load(&self, store: &RecordStore, scope: OrgScope) -> ViewState {
        let org = match scope {
            OrgScope::Missing => {
                tracing::debug!("Load requested without an active organization");
                return ViewState::missing_context();
            }
            OrgScope::Active(org) => org,
        };

        let ticket = self.begin(org).await;
        let result = fetch_snapshot(store, org, ticket.generation()).await;
        ticket.publish(result).await;
        self.current(scope).await
    }

    /// Returns the current state, loading first when `org` is not tracked.
    pub async fn ensure_loaded(&self, store: &RecordStore, scope: OrgScope) -> ViewState {
        match scope {
            OrgScope::Active(org) if !self.is_tracked(org).await => self.load(store, scope).await,
            _ => self.current(scope).await,
        }
    }
}

/// Reads both lists for `org` and normalizes them into a snapshot.
pub async fn fetch_snapshot(
    store: &RecordStore,
    org: OrgId,
    generation: u64,
) -> Result<Snapshot, AppError> {
    let (raw_scores, raw_leads) =
        tokio::try_join!(store.fetch_score_records(org), store.fetch_leads(org))?;
    let (records, leads) = normalize_snapshot(&raw_scores, &raw_leads, org);
    Ok(Snapshot::new(org, generation, records, leads))
}
