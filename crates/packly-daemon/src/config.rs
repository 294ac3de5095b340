// Copyright (c) 2026 Joseph Verdicchio and Packly Contributors
// SPDX-License-Identifier: Apache-2.0

use std::time::Duration;

use packly_core::clock::MS_PER_DAY;
use packly_core::ledger::OnboardingGrants;
use packly_core::usage::{WindowConfig, DEFAULT_WEEKLY_COOLDOWN_MS};

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub min_batch_count: u64,
    pub max_batch_count: u64,
    /// Batches up to and including this size are revealed progressively.
    pub detail_threshold: u64,
    pub reveal_batch_size: usize,
    pub reveal_pacing_ms: u64,
    pub ready_pause_ms: u64,
    pub gamble_suspense_ms: u64,
    pub daily_window: WindowConfig,
    pub weekly_cooldown_ms: u64,
    pub min_account_age_days: u64,
    pub highlight_limit: usize,
    pub report_chunk_chars: usize,
    pub max_private_chunks: usize,
    pub max_concurrent_jobs: usize,
    /// How often elapsed claim windows and cooldowns are evicted.
    pub sweep_interval_ms: u64,
    pub grants: OnboardingGrants,
    pub rng_seed: Option<u64>,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            min_batch_count: 1,
            max_batch_count: 75,
            detail_threshold: 75,
            reveal_batch_size: 5,
            reveal_pacing_ms: 1_500,
            ready_pause_ms: 2_000,
            gamble_suspense_ms: 2_000,
            daily_window: WindowConfig::default(),
            weekly_cooldown_ms: DEFAULT_WEEKLY_COOLDOWN_MS,
            min_account_age_days: 14,
            highlight_limit: 5,
            report_chunk_chars: 1_900,
            max_private_chunks: 8,
            max_concurrent_jobs: 16,
            sweep_interval_ms: 60 * 60 * 1_000,
            grants: OnboardingGrants::default(),
            rng_seed: None,
        }
    }
}

impl DaemonConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        cfg.max_batch_count = read_env_u64("PACKLY_MAX_BATCH_COUNT", cfg.max_batch_count);
        cfg.detail_threshold = read_env_u64("PACKLY_DETAIL_THRESHOLD", cfg.detail_threshold);
        cfg.reveal_batch_size = read_env_usize("PACKLY_REVEAL_BATCH_SIZE", cfg.reveal_batch_size);
        cfg.reveal_pacing_ms =
            read_env_u64_allow_zero("PACKLY_REVEAL_PACING_MS", cfg.reveal_pacing_ms);
        cfg.ready_pause_ms = read_env_u64_allow_zero("PACKLY_READY_PAUSE_MS", cfg.ready_pause_ms);
        cfg.gamble_suspense_ms =
            read_env_u64_allow_zero("PACKLY_GAMBLE_SUSPENSE_MS", cfg.gamble_suspense_ms);
        cfg.daily_window.max_uses =
            read_env_u64("PACKLY_DAILY_MAX_USES", u64::from(cfg.daily_window.max_uses))
                .min(u64::from(u32::MAX)) as u32;
        cfg.daily_window.window_ms =
            read_env_u64("PACKLY_DAILY_WINDOW_MS", cfg.daily_window.window_ms);
        cfg.weekly_cooldown_ms = read_env_u64("PACKLY_WEEKLY_COOLDOWN_MS", cfg.weekly_cooldown_ms);
        cfg.min_account_age_days =
            read_env_u64_allow_zero("PACKLY_MIN_ACCOUNT_AGE_DAYS", cfg.min_account_age_days);
        cfg.highlight_limit = read_env_usize("PACKLY_HIGHLIGHT_LIMIT", cfg.highlight_limit);
        cfg.report_chunk_chars =
            read_env_usize("PACKLY_REPORT_CHUNK_CHARS", cfg.report_chunk_chars);
        cfg.max_private_chunks =
            read_env_usize("PACKLY_MAX_PRIVATE_CHUNKS", cfg.max_private_chunks);
        cfg.max_concurrent_jobs =
            read_env_usize("PACKLY_MAX_CONCURRENT_JOBS", cfg.max_concurrent_jobs);
        cfg.sweep_interval_ms = read_env_u64("PACKLY_SWEEP_INTERVAL_MS", cfg.sweep_interval_ms);
        cfg.grants.spend = read_env_u64_allow_zero("PACKLY_SPEND_GRANT", cfg.grants.spend);
        cfg.grants.gamble = read_env_u64_allow_zero("PACKLY_GAMBLE_GRANT", cfg.grants.gamble);
        cfg.rng_seed = std::env::var("PACKLY_RNG_SEED")
            .ok()
            .and_then(|v| v.parse::<u64>().ok());
        cfg
    }

    /// Zero delays everywhere; used by tests and dry runs.
    pub fn without_pacing(mut self) -> Self {
        self.reveal_pacing_ms = 0;
        self.ready_pause_ms = 0;
        self.gamble_suspense_ms = 0;
        self
    }

    pub fn min_account_age_ms(&self) -> u64 {
        self.min_account_age_days.saturating_mul(MS_PER_DAY)
    }

    pub fn reveal_pacing(&self) -> Duration {
        Duration::from_millis(self.reveal_pacing_ms)
    }

    pub fn ready_pause(&self) -> Duration {
        Duration::from_millis(self.ready_pause_ms)
    }

    pub fn gamble_suspense(&self) -> Duration {
        Duration::from_millis(self.gamble_suspense_ms)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.sweep_interval_ms)
    }
}

fn read_env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

fn read_env_u64_allow_zero(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn read_env_usize(name: &str, default: usize) -> usize {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}
