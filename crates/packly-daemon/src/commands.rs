// Copyright (c) 2026 Joseph Verdicchio and Packly Contributors
// SPDX-License-Identifier: Apache-2.0

//! User-facing command surface.
//!
//! Each command returns `success`, `rejected` (with a stable public code) or
//! `error`. Batch openings return as soon as they are queued; their completion
//! handle is passed back alongside the outcome.

use std::sync::Arc;
use std::time::Duration;

use packly_core::clock::Clock;
use packly_core::ledger::{GambleOutcome, GambleResult};
use packly_core::{Channel, PacklyError};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::collaborators::Authorizer;
use crate::config::DaemonConfig;
use crate::delivery::{ClaimSource, SingleReveal};
use crate::dispatcher::{self, DispatchStats, JobOutcome, JobQueue};
use crate::entropy::Entropy;
use crate::fulfillment::{Collaborators, Fulfiller, FulfillmentError, JobRunner};
use crate::public_error::{public_message, PublicErrorCode};
use crate::store::{BatchLimits, EconomyStore};
use crate::telemetry::Telemetry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    DailyClaim,
    WeeklyClaim,
    SingleOpen,
    BatchOpen { count: u64 },
    WalletQuery,
    AdminCredit { target: String, amount: u64 },
    AdminDebit { target: String, amount: u64 },
    Gamble { amount: u64 },
    Metrics,
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::DailyClaim => "daily_claim",
            Self::WeeklyClaim => "weekly_claim",
            Self::SingleOpen => "single_open",
            Self::BatchOpen { .. } => "batch_open",
            Self::WalletQuery => "wallet_query",
            Self::AdminCredit { .. } => "admin_credit",
            Self::AdminDebit { .. } => "admin_debit",
            Self::Gamble { .. } => "gamble",
            Self::Metrics => "metrics",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRequest {
    pub user: String,
    /// Creation time of the caller's platform account, unix ms. Commands
    /// behind the age gate reject callers that omit it.
    #[serde(default)]
    pub account_created_ms: Option<u64>,
    #[serde(flatten)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CommandPayload {
    Claimed { reveal: SingleReveal },
    Queued { job_id: u64, count: u64, balance: u64 },
    Wallet { balance: u64 },
    Adjusted { target: String, amount: u64, balance: u64 },
    Gamble { result: GambleResult },
    Metrics { text: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CommandOutcome {
    Success { payload: CommandPayload },
    Rejected { code: &'static str, reason: String },
    Error { code: &'static str, message: String },
}

impl CommandOutcome {
    fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::Rejected { .. } => "rejected",
            Self::Error { .. } => "error",
        }
    }
}

#[derive(Debug)]
pub struct Handled {
    pub outcome: CommandOutcome,
    pub completion: Option<oneshot::Receiver<JobOutcome>>,
}

impl From<CommandOutcome> for Handled {
    fn from(outcome: CommandOutcome) -> Self {
        Self {
            outcome,
            completion: None,
        }
    }
}

pub struct PackService {
    store: Arc<EconomyStore>,
    fulfiller: Arc<Fulfiller>,
    authorizer: Arc<dyn Authorizer>,
    clock: Arc<dyn Clock>,
    entropy: Arc<Entropy>,
    telemetry: Telemetry,
    config: Arc<DaemonConfig>,
    queue: JobQueue,
    dispatcher: JoinHandle<DispatchStats>,
    sweeper: JoinHandle<()>,
}

impl PackService {
    /// Builds the store and starts the dispatcher; must run inside a tokio runtime.
    pub fn start(
        config: DaemonConfig,
        collaborators: Collaborators,
        authorizer: Arc<dyn Authorizer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let config = Arc::new(config);
        let store = EconomyStore::new(
            config.grants,
            config.daily_window,
            config.weekly_cooldown_ms,
        );
        let entropy = Arc::new(Entropy::new(config.rng_seed));
        let telemetry = Telemetry::new();
        let fulfiller = Arc::new(Fulfiller::new(
            collaborators,
            Arc::clone(&store),
            Arc::clone(&entropy),
            Arc::clone(&clock),
            telemetry.clone(),
            Arc::clone(&config),
        ));
        let (queue, dispatcher) = dispatcher::start(
            Arc::clone(&fulfiller) as Arc<dyn JobRunner>,
            config.max_concurrent_jobs,
            telemetry.clone(),
        );
        let sweeper = tokio::spawn(sweep_expired_state(
            Arc::clone(&store),
            Arc::clone(&clock),
            config.sweep_interval(),
        ));
        tracing::info!(target: "packly.lifecycle", max_concurrent_jobs = config.max_concurrent_jobs, "pack service started");
        Self {
            store,
            fulfiller,
            authorizer,
            clock,
            entropy,
            telemetry,
            config,
            queue,
            dispatcher,
            sweeper,
        }
    }

    pub fn store(&self) -> &Arc<EconomyStore> {
        &self.store
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Closes the queue, waits for queued and in-flight batches, and returns
    /// the dispatcher's totals.
    pub async fn shutdown(self) -> DispatchStats {
        let Self {
            queue,
            dispatcher,
            sweeper,
            ..
        } = self;
        sweeper.abort();
        drop(queue);
        match dispatcher.await {
            Ok(stats) => stats,
            Err(err) => {
                tracing::error!(target: "packly.lifecycle", error = %err, "dispatcher task failed");
                DispatchStats::default()
            }
        }
    }

    pub async fn handle(&self, request: CommandRequest) -> Handled {
        let CommandRequest {
            user,
            account_created_ms,
            command,
        } = request;
        let name = command.name();
        let handled: Handled = match command {
            Command::DailyClaim => self.daily_claim(&user, account_created_ms).await.into(),
            Command::WeeklyClaim => self.weekly_claim(&user, account_created_ms).await.into(),
            Command::SingleOpen => self.single_open(&user, account_created_ms).await.into(),
            Command::BatchOpen { count } => self.batch_open(&user, account_created_ms, count),
            Command::WalletQuery => self.wallet_query(&user).into(),
            Command::AdminCredit { target, amount } => {
                self.admin_credit(&user, &target, amount).into()
            }
            Command::AdminDebit { target, amount } => {
                self.admin_debit(&user, &target, amount).into()
            }
            Command::Gamble { amount } => {
                self.gamble(&user, account_created_ms, amount).await.into()
            }
            Command::Metrics => success(CommandPayload::Metrics {
                text: self.telemetry.render(),
            })
            .into(),
        };
        self.telemetry.record_command(name, handled.outcome.label());
        handled
    }

    /// An unknown creation time cannot prove the minimum age.
    fn check_account_age(&self, account_created_ms: Option<u64>) -> Result<(), PacklyError> {
        let too_new = PacklyError::AccountTooNew {
            min_age_days: self.config.min_account_age_days,
        };
        let created = account_created_ms.ok_or_else(|| too_new.clone())?;
        let age = self.clock.now_ms().saturating_sub(created);
        if age < self.config.min_account_age_ms() {
            return Err(too_new);
        }
        Ok(())
    }

    fn reject(&self, user: &str, err: &PacklyError) -> CommandOutcome {
        let code = PublicErrorCode::from(err).as_str();
        self.telemetry.record_reject(code);
        tracing::info!(target: "packly.claims", %user, code, error = %err, "command rejected");
        CommandOutcome::Rejected {
            code,
            reason: public_message(err),
        }
    }

    fn fulfillment_failed(&self, user: &str, err: FulfillmentError) -> CommandOutcome {
        match err {
            FulfillmentError::CatalogEmpty => self.reject(user, &PacklyError::CatalogEmpty),
            other => {
                tracing::error!(target: "packly.claims", %user, error = %other, "claim fulfillment failed");
                failure(PublicErrorCode::Internal, other.to_string())
            }
        }
    }

    async fn claim(
        &self,
        user: &str,
        channel: Channel,
        source: ClaimSource,
        remaining: Option<u32>,
    ) -> CommandOutcome {
        match self
            .fulfiller
            .claim_single(user, channel, source, remaining)
            .await
        {
            Ok(reveal) => {
                tracing::info!(
                    target: "packly.claims",
                    %user,
                    source = ?source,
                    item = %reveal.name,
                    rarity = %reveal.rarity,
                    special = ?reveal.special,
                    "reward claimed"
                );
                success(CommandPayload::Claimed { reveal })
            }
            Err(err) => self.fulfillment_failed(user, err),
        }
    }

    pub async fn daily_claim(&self, user: &str, account_created_ms: Option<u64>) -> CommandOutcome {
        if let Err(err) = self.check_account_age(account_created_ms) {
            return self.reject(user, &err);
        }
        let remaining = match self.store.consume_daily(user, self.clock.now_ms()) {
            Ok(remaining) => remaining,
            Err(err) => return self.reject(user, &err),
        };
        self.claim(user, Channel::Standard, ClaimSource::Daily, Some(remaining))
            .await
    }

    pub async fn weekly_claim(
        &self,
        user: &str,
        account_created_ms: Option<u64>,
    ) -> CommandOutcome {
        if let Err(err) = self.check_account_age(account_created_ms) {
            return self.reject(user, &err);
        }
        if let Err(err) = self.store.start_weekly(user, self.clock.now_ms()) {
            return self.reject(user, &err);
        }
        self.claim(user, Channel::Weekly, ClaimSource::Weekly, None)
            .await
    }

    pub async fn single_open(&self, user: &str, account_created_ms: Option<u64>) -> CommandOutcome {
        if let Err(err) = self.check_account_age(account_created_ms) {
            return self.reject(user, &err);
        }
        if let Err(err) = self.store.spend(user, 1) {
            return self.reject(user, &err);
        }
        self.claim(user, Channel::Standard, ClaimSource::SingleOpen, None)
            .await
    }

    pub fn batch_open(
        &self,
        user: &str,
        account_created_ms: Option<u64>,
        count: u64,
    ) -> Handled {
        if let Err(err) = self.check_account_age(account_created_ms) {
            return self.reject(user, &err).into();
        }
        let limits = BatchLimits {
            min_count: self.config.min_batch_count,
            max_count: self.config.max_batch_count,
        };
        let (guard, balance) = match self.store.admit_batch(user, count, limits) {
            Ok(admitted) => admitted,
            Err(err) => return self.reject(user, &err).into(),
        };
        match self.queue.submit(user, count, guard) {
            Ok((job_id, completion)) => {
                tracing::info!(target: "packly.claims", %user, job_id, count, balance, "batch queued");
                Handled {
                    outcome: success(CommandPayload::Queued {
                        job_id,
                        count,
                        balance,
                    }),
                    completion: Some(completion),
                }
            }
            Err(err) => {
                // Admission debited the packs but no job will run.
                let balance = self.store.credit(user, count);
                tracing::error!(target: "packly.claims", %user, count, balance, error = %err, "batch not queued; packs returned");
                failure(PublicErrorCode::Unavailable, err.to_string()).into()
            }
        }
    }

    pub fn wallet_query(&self, user: &str) -> CommandOutcome {
        success(CommandPayload::Wallet {
            balance: self.store.balance(user),
        })
    }

    pub fn admin_credit(&self, caller: &str, target: &str, amount: u64) -> CommandOutcome {
        if !self.authorizer.is_admin(caller) {
            return self.reject(caller, &PacklyError::Unauthorized);
        }
        let balance = self.store.credit(target, amount);
        self.telemetry.record_admin_credit(amount);
        tracing::info!(target: "packly.claims", %caller, %target, amount, balance, "packs credited");
        success(CommandPayload::Adjusted {
            target: target.to_string(),
            amount,
            balance,
        })
    }

    pub fn admin_debit(&self, caller: &str, target: &str, amount: u64) -> CommandOutcome {
        if !self.authorizer.is_admin(caller) {
            return self.reject(caller, &PacklyError::Unauthorized);
        }
        let balance = self.store.admin_debit(target, amount);
        self.telemetry.record_admin_debit(amount);
        tracing::info!(target: "packly.claims", %caller, %target, amount, balance, "packs removed");
        success(CommandPayload::Adjusted {
            target: target.to_string(),
            amount,
            balance,
        })
    }

    pub async fn gamble(
        &self,
        user: &str,
        account_created_ms: Option<u64>,
        stake: u64,
    ) -> CommandOutcome {
        if let Err(err) = self.check_account_age(account_created_ms) {
            return self.reject(user, &err);
        }
        if let Err(err) = self.store.stake_gamble(user, stake) {
            return self.reject(user, &err);
        }
        let suspense = self.config.gamble_suspense();
        if !suspense.is_zero() {
            tokio::time::sleep(suspense).await;
        }
        let outcome = self.entropy.with(|rng| GambleOutcome::roll(rng));
        let result = self.store.settle_gamble(user, stake, outcome);
        self.telemetry.record_gamble(match outcome {
            GambleOutcome::Win => "win",
            GambleOutcome::Lose => "lose",
        });
        tracing::info!(target: "packly.claims", %user, stake, outcome = ?outcome, balance = result.balance, "gamble settled");
        success(CommandPayload::Gamble { result })
    }
}

fn success(payload: CommandPayload) -> CommandOutcome {
    CommandOutcome::Success { payload }
}

fn failure(code: PublicErrorCode, message: String) -> CommandOutcome {
    CommandOutcome::Error {
        code: code.as_str(),
        message,
    }
}

async fn sweep_expired_state(store: Arc<EconomyStore>, clock: Arc<dyn Clock>, every: Duration) {
    let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let evicted = store.sweep_expired(clock.now_ms());
        if evicted > 0 {
            tracing::debug!(target: "packly.lifecycle", evicted, "expired claim state evicted");
        }
    }
}
