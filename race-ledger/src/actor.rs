//! Single-writer actor for the race ledger
//!
//! Every mutation (race processing, roster edits, catalog replacement, lock
//! changes) is sent to one tokio task and applied in mailbox order, so two
//! processing runs can never interleave their total recomputation. Reads do
//! not go through the actor; they use storage snapshots directly.
//!
//! ```text
//!  Ledger / race-admin
//!          │
//!          │ LedgerHandle (Clone)
//!          ▼
//!  mpsc::channel (bounded) ──► LedgerActor (single task)
//!                                   │
//!                                   ├─ RaceProcessor::process
//!                                   ├─ roster validation + put
//!                                   └─ Storage (WriteBatch commits)
//! ```

use crate::config::RosterConfig;
use crate::lock::RosterLock;
use crate::metrics::Metrics;
use crate::processor::{ProcessReceipt, RaceProcessor};
use crate::roster::{build_roster, validate_draft};
use crate::storage::SETTING_ROSTERS_LOCKED;
use crate::types::{Constructor, Driver, RaceSubmission, Roster, RosterDraft};
use crate::{Error, Result, Storage};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Message sent to the ledger actor
pub enum LedgerMessage {
    /// Process or reprocess a race
    ProcessRace {
        submission: RaceSubmission,
        response: oneshot::Sender<Result<ProcessReceipt>>,
    },

    /// Create or update a roster
    SaveRoster {
        lock: RosterLock,
        draft: RosterDraft,
        response: oneshot::Sender<Result<Roster>>,
    },

    /// Delete a roster and its score rows
    DeleteRoster {
        lock: RosterLock,
        roster_id: Uuid,
        response: oneshot::Sender<Result<usize>>,
    },

    /// Swap the driver and constructor catalog
    ReplaceCatalog {
        drivers: Vec<Driver>,
        constructors: Vec<Constructor>,
        response: oneshot::Sender<Result<()>>,
    },

    /// Engage or release the roster edit lock
    SetRostersLocked {
        locked: bool,
        response: oneshot::Sender<Result<()>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that applies ledger mutations
pub struct LedgerActor {
    storage: Arc<Storage>,
    processor: RaceProcessor,
    metrics: Arc<Metrics>,
    /// Authoritative edit lock, mirrors the `rosters_locked` setting
    lock: RosterLock,
    roster_rules: RosterConfig,
    mailbox: mpsc::Receiver<LedgerMessage>,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        storage: Arc<Storage>,
        processor: RaceProcessor,
        metrics: Arc<Metrics>,
        lock: RosterLock,
        roster_rules: RosterConfig,
        mailbox: mpsc::Receiver<LedgerMessage>,
    ) -> Self {
        Self {
            storage,
            processor,
            metrics,
            lock,
            roster_rules,
            mailbox,
        }
    }

    /// Run the actor event loop until shutdown or until every handle is gone
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Shutdown => break,
                msg => self.handle_message(msg),
            }
        }
        tracing::debug!("Ledger actor stopped");
    }

    fn handle_message(&mut self, msg: LedgerMessage) {
        match msg {
            LedgerMessage::ProcessRace {
                submission,
                response,
            } => {
                let _ = response.send(self.processor.process(submission));
            }

            LedgerMessage::SaveRoster {
                lock,
                draft,
                response,
            } => {
                let _ = response.send(self.save_roster(&lock, draft));
            }

            LedgerMessage::DeleteRoster {
                lock,
                roster_id,
                response,
            } => {
                let _ = response.send(self.delete_roster(&lock, roster_id));
            }

            LedgerMessage::ReplaceCatalog {
                drivers,
                constructors,
                response,
            } => {
                let _ = response.send(self.storage.replace_catalog(&drivers, &constructors));
            }

            LedgerMessage::SetRostersLocked { locked, response } => {
                let result = self.storage.put_flag(SETTING_ROSTERS_LOCKED, locked);
                if result.is_ok() {
                    self.lock.set(locked);
                    tracing::info!(locked, "Roster edit lock changed");
                }
                let _ = response.send(result);
            }

            LedgerMessage::Shutdown => {
                // Handled in run loop
            }
        }
    }

    /// Accept a caller's lock only if it is a clone of the ledger's own
    fn check_lock(&self, lock: &RosterLock) -> Result<()> {
        if !lock.shares_state(&self.lock) {
            return Err(Error::RostersLocked(
                "lock does not belong to this ledger".to_string(),
            ));
        }
        self.lock.ensure_unlocked()
    }

    fn save_roster(&self, lock: &RosterLock, draft: RosterDraft) -> Result<Roster> {
        self.check_lock(lock)?;

        let view = self.storage.view();
        let rosters = view.rosters()?;

        let existing = match draft.id {
            Some(id) => {
                let roster = rosters
                    .iter()
                    .find(|r| r.id == id && r.owner == draft.owner)
                    .ok_or(Error::RosterNotFound(id))?;
                Some(roster.clone())
            }
            None => {
                let owned = rosters.iter().filter(|r| r.owner == draft.owner).count();
                if owned >= self.roster_rules.max_per_owner {
                    return Err(Error::Validation(format!(
                        "An owner can have at most {} rosters",
                        self.roster_rules.max_per_owner
                    )));
                }
                None
            }
        };

        let spend = validate_draft(
            &draft,
            &view.drivers()?,
            &view.constructors()?,
            &self.roster_rules,
        )?;

        let roster = build_roster(draft, existing.as_ref(), Utc::now());
        self.storage.put_roster(&roster)?;

        let count = rosters.len() + usize::from(existing.is_none());
        self.metrics.set_rosters(count);
        tracing::info!(
            roster_id = %roster.id,
            owner = %roster.owner,
            %spend,
            created = existing.is_none(),
            "Roster saved"
        );

        Ok(roster)
    }

    fn delete_roster(&self, lock: &RosterLock, roster_id: Uuid) -> Result<usize> {
        self.check_lock(lock)?;

        let rows = self.storage.delete_roster(roster_id)?;
        self.metrics.set_rosters(self.storage.view().rosters()?.len());
        tracing::info!(%roster_id, rows, "Roster deleted");

        Ok(rows)
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<T>>) -> LedgerMessage,
    ) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(make(tx))
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Process or reprocess a race
    pub async fn process_race(&self, submission: RaceSubmission) -> Result<ProcessReceipt> {
        self.request(|response| LedgerMessage::ProcessRace {
            submission,
            response,
        })
        .await
    }

    /// Create or update a roster
    pub async fn save_roster(&self, lock: RosterLock, draft: RosterDraft) -> Result<Roster> {
        self.request(|response| LedgerMessage::SaveRoster {
            lock,
            draft,
            response,
        })
        .await
    }

    /// Delete a roster and its score rows
    pub async fn delete_roster(&self, lock: RosterLock, roster_id: Uuid) -> Result<usize> {
        self.request(|response| LedgerMessage::DeleteRoster {
            lock,
            roster_id,
            response,
        })
        .await
    }

    /// Swap the driver and constructor catalog
    pub async fn replace_catalog(
        &self,
        drivers: Vec<Driver>,
        constructors: Vec<Constructor>,
    ) -> Result<()> {
        self.request(|response| LedgerMessage::ReplaceCatalog {
            drivers,
            constructors,
            response,
        })
        .await
    }

    /// Engage or release the roster edit lock
    pub async fn set_rosters_locked(&self, locked: bool) -> Result<()> {
        self.request(|response| LedgerMessage::SetRostersLocked { locked, response })
            .await
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(LedgerMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(
    storage: Arc<Storage>,
    metrics: Arc<Metrics>,
    lock: RosterLock,
    roster_rules: RosterConfig,
    mailbox_capacity: usize,
) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(mailbox_capacity.max(1)); // Bounded channel for backpressure
    let processor = RaceProcessor::new(storage.clone(), metrics.clone());
    let actor = LedgerActor::new(storage, processor, metrics, lock, roster_rules, rx);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}
