// Copyright (c) 2026 Joseph Verdicchio and Packly Contributors
// SPDX-License-Identifier: Apache-2.0

//! Delivery payloads and strategies for opened packs.
//!
//! Small batches are revealed progressively; large ones get a compact summary
//! and a full line-itemized report delivered through a fallback chain that
//! never fails the batch itself.

use packly_core::catalog::{format_rarity, Bonuses, InstanceId, Item};
use serde::Serialize;

use crate::collaborators::Presenter;

pub const REPORT_FILENAME: &str = "multipackly_results.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    Detailed,
    Compact,
}

impl DeliveryMode {
    pub fn for_count(count: u64, detail_threshold: u64) -> Self {
        if count <= detail_threshold {
            Self::Detailed
        } else {
            Self::Compact
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Detailed => "detailed",
            Self::Compact => "compact",
        }
    }
}

/// One persisted reward together with what is needed to render it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenedReward {
    pub instance_id: InstanceId,
    pub item: Item,
    pub bonuses: Bonuses,
    pub special: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimSource {
    Daily,
    Weekly,
    SingleOpen,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleReveal {
    pub source: ClaimSource,
    pub instance_id: InstanceId,
    pub name: String,
    pub rarity: String,
    pub card: String,
    pub attack: i32,
    pub health: i32,
    pub bonuses: Bonuses,
    pub special: Option<String>,
    pub special_emoji: Option<String>,
    pub remaining_uses: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevealEntry {
    pub index: usize,
    pub name: String,
    pub rarity: String,
    pub card: String,
    pub attack: i32,
    pub health: i32,
    pub special: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevealBatch {
    /// 1-based position of the first entry.
    pub first: usize,
    pub last: usize,
    pub entries: Vec<RevealEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailedSummary {
    pub pulled: Vec<String>,
    pub balance: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RarityCount {
    pub rarity: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompactSummary {
    pub opened: u64,
    pub rarity_counts: Vec<RarityCount>,
    pub specials_total: usize,
    pub specials_shown: Vec<String>,
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportAttachment {
    pub filename: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "tier")]
pub enum DeliveryTier {
    Direct,
    PrivateChunks { chunks: usize },
    PreviewWithPublicAttachment,
    PublicAttachment,
    GaveUp,
}

impl DeliveryTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::PrivateChunks { .. } => "private_chunks",
            Self::PreviewWithPublicAttachment => "preview_public_attachment",
            Self::PublicAttachment => "public_attachment",
            Self::GaveUp => "gave_up",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ChunkPolicy {
    pub chunk_chars: usize,
    pub max_chunks: usize,
}

fn reveal_entry(index: usize, reward: &OpenedReward) -> RevealEntry {
    RevealEntry {
        index,
        name: reward.item.display_name.clone(),
        rarity: format_rarity(reward.item.rarity),
        card: reward.item.card_name().to_string(),
        attack: reward.item.attack,
        health: reward.item.health,
        special: reward.special.clone(),
    }
}

pub fn reveal_batches(rewards: &[OpenedReward], batch_size: usize) -> Vec<RevealBatch> {
    let batch_size = batch_size.max(1);
    rewards
        .chunks(batch_size)
        .enumerate()
        .map(|(n, chunk)| {
            let first = n * batch_size + 1;
            RevealBatch {
                first,
                last: first + chunk.len() - 1,
                entries: chunk
                    .iter()
                    .enumerate()
                    .map(|(offset, reward)| reveal_entry(first + offset, reward))
                    .collect(),
            }
        })
        .collect()
}

pub fn detailed_summary(rewards: &[OpenedReward], balance: u64) -> DetailedSummary {
    DetailedSummary {
        pulled: rewards
            .iter()
            .map(|r| r.item.display_name.clone())
            .collect(),
        balance,
    }
}

pub fn compact_summary(rewards: &[OpenedReward], highlight_limit: usize) -> CompactSummary {
    let mut rarity_counts: Vec<RarityCount> = Vec::new();
    for reward in rewards {
        let rarity = format_rarity(reward.item.rarity);
        match rarity_counts.iter_mut().find(|c| c.rarity == rarity) {
            Some(entry) => entry.count += 1,
            None => rarity_counts.push(RarityCount { rarity, count: 1 }),
        }
    }
    // Stable: ties keep first-seen order.
    rarity_counts.sort_by(|a, b| b.count.cmp(&a.count));

    let specials: Vec<&String> = rewards.iter().filter_map(|r| r.special.as_ref()).collect();

    let mut by_rarity: Vec<&OpenedReward> = rewards.iter().collect();
    by_rarity.sort_by(|a, b| b.item.rarity.total_cmp(&a.item.rarity));

    CompactSummary {
        opened: rewards.len() as u64,
        rarity_counts,
        specials_total: specials.len(),
        specials_shown: specials
            .iter()
            .take(highlight_limit)
            .map(|s| s.to_string())
            .collect(),
        highlights: by_rarity
            .iter()
            .take(highlight_limit)
            .map(|r| {
                format!(
                    "{} ({})",
                    r.item.display_name,
                    format_rarity(r.item.rarity)
                )
            })
            .collect(),
    }
}

pub fn full_report(rewards: &[OpenedReward]) -> ReportAttachment {
    let content = rewards
        .iter()
        .enumerate()
        .map(|(idx, r)| {
            format!(
                "{}. {} | rarity: {} | card: {} | atk: {} | hp: {} | special: {}",
                idx + 1,
                r.item.display_name,
                format_rarity(r.item.rarity),
                r.item.card_name(),
                r.item.attack,
                r.item.health,
                r.special.as_deref().unwrap_or("")
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    ReportAttachment {
        filename: REPORT_FILENAME.to_string(),
        content,
    }
}

/// Splits on character boundaries so multi-byte text is never cut mid-codepoint.
pub fn chunk_report(content: &str, chunk_chars: usize) -> Vec<String> {
    let chars: Vec<char> = content.chars().collect();
    chars
        .chunks(chunk_chars.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// Best-effort delivery of the full report. Every failure is absorbed; the
/// returned tier records how far down the chain delivery had to go.
pub async fn deliver_full_report(
    presenter: &dyn Presenter,
    user: &str,
    summary: &CompactSummary,
    report: &ReportAttachment,
    policy: ChunkPolicy,
) -> DeliveryTier {
    match presenter.send_direct(user, summary, report).await {
        Ok(()) => {
            if let Err(err) = presenter
                .send_private(user, "Pack opening complete; full results were sent to your direct messages.")
                .await
            {
                tracing::debug!(target: "packly.delivery", %user, error = %err, "direct-message confirmation not delivered");
            }
            return DeliveryTier::Direct;
        }
        Err(err) => {
            tracing::info!(target: "packly.delivery", %user, error = %err, "direct delivery failed; falling back to private replies");
        }
    }

    let chunks = chunk_report(&report.content, policy.chunk_chars);
    let private_attempt = if chunks.len() <= policy.max_chunks {
        send_chunks(presenter, user, &chunks)
            .await
            .map(|()| DeliveryTier::PrivateChunks {
                chunks: chunks.len(),
            })
    } else {
        send_preview_and_attachment(presenter, user, &chunks, report, policy.max_chunks)
            .await
            .map(|()| DeliveryTier::PreviewWithPublicAttachment)
    };
    match private_attempt {
        Ok(tier) => tier,
        Err(err) => {
            tracing::info!(target: "packly.delivery", %user, error = %err, "private delivery failed; posting public attachment");
            match presenter
                .send_public_attachment(user, "Full pack opening results:", report)
                .await
            {
                Ok(()) => DeliveryTier::PublicAttachment,
                Err(err) => {
                    tracing::warn!(target: "packly.delivery", %user, error = %err, "all delivery tiers failed; giving up");
                    DeliveryTier::GaveUp
                }
            }
        }
    }
}

async fn send_chunks(
    presenter: &dyn Presenter,
    user: &str,
    chunks: &[String],
) -> Result<(), crate::collaborators::DeliveryError> {
    for chunk in chunks {
        presenter
            .send_private(user, &format!("```{chunk}```"))
            .await?;
    }
    Ok(())
}

async fn send_preview_and_attachment(
    presenter: &dyn Presenter,
    user: &str,
    chunks: &[String],
    report: &ReportAttachment,
    max_chunks: usize,
) -> Result<(), crate::collaborators::DeliveryError> {
    let preview: String = chunks
        .iter()
        .take(max_chunks.saturating_sub(1))
        .map(String::as_str)
        .collect();
    presenter
        .send_private(
            user,
            &format!(
                "Pack opening complete; results are long. Preview:\n```{preview}```\nFull results are attached publicly below."
            ),
        )
        .await?;
    presenter
        .send_public_attachment(user, "Full pack opening results (public):", report)
        .await
}
