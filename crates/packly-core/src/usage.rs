// Copyright (c) 2026 Joseph Verdicchio and Packly Contributors
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::MS_PER_DAY;
use crate::error::{PacklyError, PacklyResult};

pub const DEFAULT_MAX_USES: u32 = 3;
pub const DEFAULT_WINDOW_MS: u64 = MS_PER_DAY;
pub const DEFAULT_WEEKLY_COOLDOWN_MS: u64 = 7 * MS_PER_DAY;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub max_uses: u32,
    pub window_ms: u64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            max_uses: DEFAULT_MAX_USES,
            window_ms: DEFAULT_WINDOW_MS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimWindow {
    pub window_start_ms: u64,
    pub uses_consumed: u32,
}

impl ClaimWindow {
    fn open(now_ms: u64) -> Self {
        Self {
            window_start_ms: now_ms,
            uses_consumed: 0,
        }
    }

    fn expired(&self, now_ms: u64, window_ms: u64) -> bool {
        now_ms.saturating_sub(self.window_start_ms) >= window_ms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageCheck {
    pub allowed: bool,
    pub remaining: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowState {
    Idle,
    Active,
    Exhausted,
}

/// Rolling per-user claim windows. A window opens on the first check and is
/// replaced wholesale once `window_ms` has elapsed since it opened.
#[derive(Debug, Default)]
pub struct UsageTracker {
    cfg: WindowConfig,
    windows: HashMap<String, ClaimWindow>,
}

impl UsageTracker {
    pub fn new(cfg: WindowConfig) -> Self {
        Self {
            cfg,
            windows: HashMap::new(),
        }
    }

    pub fn check_usage(&mut self, user: &str, now_ms: u64) -> UsageCheck {
        let cfg = self.cfg;
        let window = self
            .windows
            .entry(user.to_string())
            .or_insert_with(|| ClaimWindow::open(now_ms));
        if window.expired(now_ms, cfg.window_ms) {
            *window = ClaimWindow::open(now_ms);
        }
        if window.uses_consumed >= cfg.max_uses {
            return UsageCheck {
                allowed: false,
                remaining: 0,
            };
        }
        UsageCheck {
            allowed: true,
            remaining: cfg.max_uses - window.uses_consumed,
        }
    }

    pub fn record_use(&mut self, user: &str) {
        if let Some(window) = self.windows.get_mut(user) {
            window.uses_consumed = window.uses_consumed.saturating_add(1);
        }
    }

    pub fn cooldown_remaining(&self, user: &str, now_ms: u64) -> Option<Duration> {
        let window = self.windows.get(user)?;
        if window.uses_consumed < self.cfg.max_uses {
            return None;
        }
        let ends_at = window.window_start_ms.saturating_add(self.cfg.window_ms);
        if now_ms >= ends_at {
            return None;
        }
        Some(Duration::from_millis(ends_at - now_ms))
    }

    /// Check and record in one step. Returns the uses left after this one.
    pub fn try_consume(&mut self, user: &str, now_ms: u64) -> PacklyResult<u32> {
        let check = self.check_usage(user, now_ms);
        if !check.allowed {
            let retry_after_ms = self
                .cooldown_remaining(user, now_ms)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0);
            return Err(PacklyError::ClaimLimitReached { retry_after_ms });
        }
        self.record_use(user);
        Ok(check.remaining - 1)
    }

    pub fn state(&self, user: &str, now_ms: u64) -> WindowState {
        match self.windows.get(user) {
            None => WindowState::Idle,
            Some(w) if w.expired(now_ms, self.cfg.window_ms) => WindowState::Idle,
            Some(w) if w.uses_consumed >= self.cfg.max_uses => WindowState::Exhausted,
            Some(_) => WindowState::Active,
        }
    }

    pub fn window(&self, user: &str) -> Option<ClaimWindow> {
        self.windows.get(user).copied()
    }

    /// Drops windows that have run their full length; absent and expired
    /// windows answer identically.
    pub fn sweep(&mut self, now_ms: u64) -> usize {
        let window_ms = self.cfg.window_ms;
        let before = self.windows.len();
        self.windows.retain(|_, w| !w.expired(now_ms, window_ms));
        before - self.windows.len()
    }

    pub fn tracked(&self) -> usize {
        self.windows.len()
    }
}

/// Fixed-duration cooldown keyed by user, stamped on each successful start.
#[derive(Debug, Default)]
pub struct CooldownTracker {
    duration_ms: u64,
    last_use: HashMap<String, u64>,
}

impl CooldownTracker {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            duration_ms,
            last_use: HashMap::new(),
        }
    }

    pub fn remaining(&self, user: &str, now_ms: u64) -> Option<Duration> {
        let last = *self.last_use.get(user)?;
        let ends_at = last.saturating_add(self.duration_ms);
        (now_ms < ends_at).then(|| Duration::from_millis(ends_at - now_ms))
    }

    pub fn try_start(&mut self, user: &str, now_ms: u64) -> PacklyResult<()> {
        if let Some(left) = self.remaining(user, now_ms) {
            return Err(PacklyError::CooldownActive {
                retry_after_ms: left.as_millis() as u64,
            });
        }
        self.last_use.insert(user.to_string(), now_ms);
        Ok(())
    }

    /// Forgets users whose cooldown has elapsed.
    pub fn sweep(&mut self, now_ms: u64) -> usize {
        let duration_ms = self.duration_ms;
        let before = self.last_use.len();
        self.last_use
            .retain(|_, last| now_ms < last.saturating_add(duration_ms));
        before - self.last_use.len()
    }

    pub fn tracked(&self) -> usize {
        self.last_use.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_check_opens_window_with_full_allowance() {
        let mut tracker = UsageTracker::new(WindowConfig::default());
        assert_eq!(tracker.state("alice", 0), WindowState::Idle);
        let check = tracker.check_usage("alice", 0);
        assert_eq!(
            check,
            UsageCheck {
                allowed: true,
                remaining: 3
            }
        );
        assert_eq!(tracker.state("alice", 0), WindowState::Active);
    }

    #[test]
    fn record_use_without_window_is_noop() {
        let mut tracker = UsageTracker::new(WindowConfig::default());
        tracker.record_use("ghost");
        assert!(tracker.window("ghost").is_none());
    }

    #[test]
    fn cooldown_only_defined_while_exhausted() {
        let mut tracker = UsageTracker::new(WindowConfig::default());
        let _ = tracker.try_consume("bob", 1_000).expect("first");
        assert!(tracker.cooldown_remaining("bob", 1_000).is_none());
        let _ = tracker.try_consume("bob", 2_000).expect("second");
        let _ = tracker.try_consume("bob", 3_000).expect("third");
        assert_eq!(tracker.state("bob", 3_000), WindowState::Exhausted);
        assert_eq!(
            tracker.cooldown_remaining("bob", 4_000),
            Some(Duration::from_millis(DEFAULT_WINDOW_MS + 1_000 - 4_000))
        );
        assert!(tracker
            .cooldown_remaining("bob", 1_000 + DEFAULT_WINDOW_MS)
            .is_none());
    }

    #[test]
    fn cooldown_tracker_boundary_is_exact() {
        let mut weekly = CooldownTracker::new(DEFAULT_WEEKLY_COOLDOWN_MS);
        weekly.try_start("carol", 0).expect("first weekly");
        let err = weekly
            .try_start("carol", DEFAULT_WEEKLY_COOLDOWN_MS - 1)
            .expect_err("still cooling down");
        assert_eq!(err, PacklyError::CooldownActive { retry_after_ms: 1 });
        weekly
            .try_start("carol", DEFAULT_WEEKLY_COOLDOWN_MS)
            .expect("cooldown elapsed");
        weekly.try_start("dave", 5).expect("independent users");
    }

    #[test]
    fn sweep_drops_only_expired_entries() {
        let mut tracker = UsageTracker::new(WindowConfig::default());
        tracker.try_consume("old", 0).expect("old");
        tracker.try_consume("old", 1).expect("old");
        tracker.try_consume("old", 2).expect("old");
        tracker.try_consume("new", DEFAULT_WINDOW_MS / 2).expect("new");

        assert_eq!(tracker.sweep(DEFAULT_WINDOW_MS - 1), 0);
        assert_eq!(tracker.sweep(DEFAULT_WINDOW_MS), 1);
        assert_eq!(tracker.tracked(), 1);
        assert_eq!(
            tracker.check_usage("old", DEFAULT_WINDOW_MS),
            UsageCheck {
                allowed: true,
                remaining: 3
            }
        );
        assert_eq!(tracker.window("new").map(|w| w.uses_consumed), Some(1));

        let mut weekly = CooldownTracker::new(DEFAULT_WEEKLY_COOLDOWN_MS);
        weekly.try_start("erin", 0).expect("erin");
        weekly.try_start("finn", 10).expect("finn");
        assert_eq!(weekly.sweep(DEFAULT_WEEKLY_COOLDOWN_MS), 1);
        assert_eq!(weekly.tracked(), 1);
        assert!(weekly.remaining("finn", DEFAULT_WEEKLY_COOLDOWN_MS).is_some());
    }
}
