// Copyright (c) 2026 Joseph Verdicchio and Packly Contributors
// SPDX-License-Identifier: Apache-2.0

//! Reward fulfillment: drawing, special assignment, persistence and delivery.
//!
//! Batch jobs run here inside the dispatcher's supervised tasks; single claims
//! run inline from the command surface. Nothing is persisted until every draw
//! of a batch has succeeded.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use packly_core::catalog::{format_rarity, Bonuses, InstanceId, InstanceSpec, SpecialFilter};
use packly_core::clock::Clock;
use packly_core::sampler::{sample_reward, select_special_sequential, select_special_uniform};
use packly_core::Channel;
use serde::Serialize;
use thiserror::Error;

use crate::collaborators::{
    Catalog, CatalogError, DeliveryError, Persistence, PersistenceError, Presenter,
};
use crate::config::DaemonConfig;
use crate::delivery::{
    compact_summary, deliver_full_report, detailed_summary, full_report, reveal_batches,
    ChunkPolicy, ClaimSource, DeliveryMode, DeliveryTier, OpenedReward, SingleReveal,
};
use crate::entropy::Entropy;
use crate::store::EconomyStore;
use crate::telemetry::Telemetry;

pub const FAILURE_NOTICE: &str =
    "An error occurred while opening your packs. Please contact the bot operators.";

#[derive(Debug, Error)]
pub enum FulfillmentError {
    #[error("no eligible rewards in the catalog")]
    CatalogEmpty,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("presentation failed: {0}")]
    Presentation(#[from] DeliveryError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub user: String,
    pub count: u64,
    pub mode: DeliveryMode,
    pub instance_ids: Vec<InstanceId>,
    pub delivery: Option<DeliveryTier>,
}

/// Work the dispatcher runs for each admitted batch.
#[async_trait]
pub trait JobRunner: Send + Sync + 'static {
    async fn run(&self, user: &str, count: u64) -> Result<BatchReport, FulfillmentError>;
    async fn notify_failure(&self, user: &str, message: &str) -> Result<(), DeliveryError>;
}

#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn Catalog>,
    pub persistence: Arc<dyn Persistence>,
    pub presenter: Arc<dyn Presenter>,
}

pub struct Fulfiller {
    collaborators: Collaborators,
    store: Arc<EconomyStore>,
    entropy: Arc<Entropy>,
    clock: Arc<dyn Clock>,
    telemetry: Telemetry,
    config: Arc<DaemonConfig>,
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        tokio::time::sleep(duration).await;
    }
}

impl Fulfiller {
    pub fn new(
        collaborators: Collaborators,
        store: Arc<EconomyStore>,
        entropy: Arc<Entropy>,
        clock: Arc<dyn Clock>,
        telemetry: Telemetry,
        config: Arc<DaemonConfig>,
    ) -> Self {
        Self {
            collaborators,
            store,
            entropy,
            clock,
            telemetry,
            config,
        }
    }

    /// One reward from `channel`, persisted and revealed. Uses the sequential
    /// special path.
    pub async fn claim_single(
        &self,
        user: &str,
        channel: Channel,
        source: ClaimSource,
        remaining_uses: Option<u32>,
    ) -> Result<SingleReveal, FulfillmentError> {
        let items = self
            .collaborators
            .catalog
            .query_items(&channel.item_filter())
            .await?;
        let owned = self.collaborators.persistence.owned_item_ids(user).await?;
        let (item, bonuses) = self
            .entropy
            .with(|rng| {
                sample_reward(&items, channel, &owned, rng).map(|item| (item, Bonuses::roll(rng)))
            })
            .ok_or(FulfillmentError::CatalogEmpty)?;

        let specials = self
            .collaborators
            .catalog
            .query_specials(&SpecialFilter::eligible_at(self.clock.now_ms()))
            .await?;
        let special = self
            .entropy
            .with(|rng| select_special_sequential(&specials, rng).cloned());

        let instance_id = self
            .collaborators
            .persistence
            .create_instance(InstanceSpec {
                item_id: item.id,
                owner: user.to_string(),
                bonuses,
                special_id: special.as_ref().map(|s| s.id),
            })
            .await?;
        self.telemetry.record_packs_opened(channel.as_str(), 1);

        let reveal = SingleReveal {
            source,
            instance_id,
            name: item.display_name.clone(),
            rarity: format_rarity(item.rarity),
            card: item.card_name().to_string(),
            attack: item.attack,
            health: item.health,
            bonuses,
            special: special.as_ref().map(|s| s.name.clone()),
            special_emoji: special.and_then(|s| s.emoji),
            remaining_uses,
        };
        self.collaborators
            .presenter
            .reveal_single(user, &reveal)
            .await?;
        Ok(reveal)
    }

    /// Fulfills an admitted batch. Packs were debited at admission and are not
    /// returned when the catalog runs dry mid-batch.
    pub async fn fulfill_batch(
        &self,
        user: &str,
        count: u64,
    ) -> Result<BatchReport, FulfillmentError> {
        let presenter = &self.collaborators.presenter;
        presenter.announce_ready(user, count).await?;
        pause(self.config.ready_pause()).await;

        let channel = Channel::Standard;
        let filter = channel.item_filter();
        let owned = self.collaborators.persistence.owned_item_ids(user).await?;
        let mut drawn = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let items = self.collaborators.catalog.query_items(&filter).await?;
            let item = self
                .entropy
                .with(|rng| sample_reward(&items, channel, &owned, rng))
                .ok_or(FulfillmentError::CatalogEmpty)?;
            drawn.push(item);
        }

        let specials = self
            .collaborators
            .catalog
            .query_specials(&SpecialFilter::eligible_at(self.clock.now_ms()))
            .await?;
        let assigned: Vec<_> = self.entropy.with(|rng| {
            drawn
                .into_iter()
                .map(|item| {
                    let bonuses = Bonuses::roll(rng);
                    let special = select_special_uniform(&specials, rng).cloned();
                    (item, bonuses, special)
                })
                .collect()
        });

        let specs = assigned
            .iter()
            .map(|(item, bonuses, special)| InstanceSpec {
                item_id: item.id,
                owner: user.to_string(),
                bonuses: *bonuses,
                special_id: special.as_ref().map(|s| s.id),
            })
            .collect();
        let instance_ids = self.collaborators.persistence.bulk_create(specs).await?;
        self.telemetry.record_packs_opened(channel.as_str(), count);

        let rewards: Vec<OpenedReward> = assigned
            .into_iter()
            .zip(&instance_ids)
            .map(|((item, bonuses, special), id)| OpenedReward {
                instance_id: *id,
                item,
                bonuses,
                special: special.map(|s| s.name),
            })
            .collect();

        let mode = DeliveryMode::for_count(count, self.config.detail_threshold);
        let delivery = match mode {
            DeliveryMode::Detailed => {
                let batches = reveal_batches(&rewards, self.config.reveal_batch_size);
                let last = batches.len().saturating_sub(1);
                for (n, batch) in batches.iter().enumerate() {
                    presenter.reveal_batch(user, batch).await?;
                    if n < last {
                        pause(self.config.reveal_pacing()).await;
                    }
                }
                let summary = detailed_summary(&rewards, self.store.balance(user));
                presenter.detailed_summary(user, &summary).await?;
                None
            }
            DeliveryMode::Compact => {
                let summary = compact_summary(&rewards, self.config.highlight_limit);
                presenter.compact_summary(user, &summary).await?;
                let report = full_report(&rewards);
                let tier = deliver_full_report(
                    presenter.as_ref(),
                    user,
                    &summary,
                    &report,
                    ChunkPolicy {
                        chunk_chars: self.config.report_chunk_chars,
                        max_chunks: self.config.max_private_chunks,
                    },
                )
                .await;
                self.telemetry.record_report_delivery(tier.as_str());
                Some(tier)
            }
        };

        Ok(BatchReport {
            user: user.to_string(),
            count,
            mode,
            instance_ids,
            delivery,
        })
    }
}

#[async_trait]
impl JobRunner for Fulfiller {
    async fn run(&self, user: &str, count: u64) -> Result<BatchReport, FulfillmentError> {
        self.fulfill_batch(user, count).await
    }

    async fn notify_failure(&self, user: &str, message: &str) -> Result<(), DeliveryError> {
        self.collaborators.presenter.notify_failure(user, message).await
    }
}
