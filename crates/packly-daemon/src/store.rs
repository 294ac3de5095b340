// Copyright (c) 2026 Joseph Verdicchio and Packly Contributors
// SPDX-License-Identifier: Apache-2.0

//! Process-wide economy state.
//!
//! Balances, claim windows, weekly cooldowns and the active-batch set live
//! behind one mutex. Every public method takes the lock once and never holds
//! it across an `.await`, so each check-then-mutate sequence is a single
//! transaction no other task can interleave with.

use std::collections::HashSet;
use std::sync::Arc;

use packly_core::error::{PacklyError, PacklyResult};
use packly_core::ledger::{EconomyLedger, GambleOutcome, GambleResult, OnboardingGrants};
use packly_core::usage::{CooldownTracker, UsageTracker, WindowConfig};
use parking_lot::Mutex;

#[derive(Debug)]
struct StoreState {
    ledger: EconomyLedger,
    daily: UsageTracker,
    weekly: CooldownTracker,
    active: HashSet<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct BatchLimits {
    pub min_count: u64,
    pub max_count: u64,
}

#[derive(Debug)]
pub struct EconomyStore {
    state: Mutex<StoreState>,
    grants: OnboardingGrants,
}

impl EconomyStore {
    pub fn new(
        grants: OnboardingGrants,
        daily: WindowConfig,
        weekly_cooldown_ms: u64,
    ) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(StoreState {
                ledger: EconomyLedger::new(),
                daily: UsageTracker::new(daily),
                weekly: CooldownTracker::new(weekly_cooldown_ms),
                active: HashSet::new(),
            }),
            grants,
        })
    }

    /// Batch admission: exclusivity, count range and balance are checked and
    /// the debit plus active marker applied under one lock.
    pub fn admit_batch(
        self: &Arc<Self>,
        user: &str,
        count: u64,
        limits: BatchLimits,
    ) -> PacklyResult<(ActiveJobGuard, u64)> {
        let mut state = self.state.lock();
        if state.active.contains(user) {
            return Err(PacklyError::AlreadyActive);
        }
        if !(limits.min_count..=limits.max_count).contains(&count) {
            return Err(PacklyError::InvalidCount {
                requested: count,
                min: limits.min_count,
                max: limits.max_count,
            });
        }
        let balance = state.ledger.debit_strict(user, count, self.grants.spend)?;
        state.active.insert(user.to_string());
        Ok((
            ActiveJobGuard {
                store: Arc::clone(self),
                user: user.to_string(),
            },
            balance,
        ))
    }

    pub fn is_active(&self, user: &str) -> bool {
        self.state.lock().active.contains(user)
    }

    pub fn active_count(&self) -> usize {
        self.state.lock().active.len()
    }

    fn release(&self, user: &str) {
        self.state.lock().active.remove(user);
    }

    /// Consumes one daily claim; returns the claims left in the window.
    pub fn consume_daily(&self, user: &str, now_ms: u64) -> PacklyResult<u32> {
        self.state.lock().daily.try_consume(user, now_ms)
    }

    pub fn start_weekly(&self, user: &str, now_ms: u64) -> PacklyResult<()> {
        self.state.lock().weekly.try_start(user, now_ms)
    }

    /// Evicts elapsed daily windows and weekly cooldowns. Returns how many
    /// entries were dropped.
    pub fn sweep_expired(&self, now_ms: u64) -> usize {
        let mut state = self.state.lock();
        state.daily.sweep(now_ms) + state.weekly.sweep(now_ms)
    }

    pub fn balance(&self, user: &str) -> u64 {
        self.state.lock().ledger.balance(user)
    }

    pub fn spend(&self, user: &str, amount: u64) -> PacklyResult<u64> {
        self.state
            .lock()
            .ledger
            .debit_strict(user, amount, self.grants.spend)
    }

    pub fn credit(&self, user: &str, amount: u64) -> u64 {
        self.state
            .lock()
            .ledger
            .credit(user, amount, self.grants.spend)
    }

    pub fn admin_debit(&self, user: &str, amount: u64) -> u64 {
        self.state.lock().ledger.debit_floor(user, amount, 0)
    }

    pub fn stake_gamble(&self, user: &str, stake: u64) -> PacklyResult<u64> {
        self.state
            .lock()
            .ledger
            .stake_gamble(user, stake, self.grants.gamble)
    }

    pub fn settle_gamble(&self, user: &str, stake: u64, outcome: GambleOutcome) -> GambleResult {
        self.state
            .lock()
            .ledger
            .settle_gamble(user, stake, outcome, self.grants.gamble)
    }
}

/// Active-batch marker. Dropping it clears the user's membership exactly once,
/// including when the owning task unwinds.
#[derive(Debug)]
pub struct ActiveJobGuard {
    store: Arc<EconomyStore>,
    user: String,
}

impl Drop for ActiveJobGuard {
    fn drop(&mut self) {
        self.store.release(&self.user);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use packly_core::usage::DEFAULT_WINDOW_MS;

    const LIMITS: BatchLimits = BatchLimits {
        min_count: 1,
        max_count: 75,
    };

    fn store() -> Arc<EconomyStore> {
        EconomyStore::new(OnboardingGrants::default(), WindowConfig::default(), 1_000)
    }

    #[test]
    fn admission_rejects_in_documented_order() {
        let store = store();
        store.credit("alice", 99);
        let (guard, balance) = store.admit_batch("alice", 10, LIMITS).expect("admit");
        assert_eq!(balance, 90);
        assert!(store.is_active("alice"));

        // Already active wins over a bad count.
        assert_eq!(
            store.admit_batch("alice", 0, LIMITS).map(|(_, b)| b),
            Err(PacklyError::AlreadyActive)
        );
        drop(guard);
        assert!(!store.is_active("alice"));

        assert!(matches!(
            store.admit_batch("alice", 76, LIMITS),
            Err(PacklyError::InvalidCount { requested: 76, .. })
        ));
        let (_guard, balance) = store.admit_batch("alice", 75, LIMITS).expect("boundary");
        assert_eq!(balance, 15);
        assert_eq!(store.active_count(), 1);
    }

    #[test]
    fn rejected_admission_leaves_no_marker_and_no_debit() {
        let store = store();
        let err = store.admit_batch("bob", 2, LIMITS).map(|(_, b)| b);
        assert_eq!(
            err,
            Err(PacklyError::InsufficientBalance {
                requested: 2,
                available: 1
            })
        );
        assert!(!store.is_active("bob"));
        assert_eq!(store.balance("bob"), 1);
    }

    #[test]
    fn gamble_context_starts_from_zero() {
        let store = store();
        assert!(store.stake_gamble("carol", 1).is_err());
        assert_eq!(store.balance("carol"), 0);
        assert_eq!(store.credit("carol", 10), 10);
    }

    #[test]
    fn sweep_keeps_live_windows_and_cooldowns() {
        let store = store();
        store.consume_daily("alice", 0).expect("daily");
        store.start_weekly("alice", 0).expect("weekly");
        store.consume_daily("bob", 500).expect("daily");

        // Weekly cooldown here is 1s, the daily window a full day.
        assert_eq!(store.sweep_expired(1_000), 1);
        assert_eq!(
            store.start_weekly("alice", 1_000),
            Ok(()),
            "elapsed cooldown is forgotten"
        );
        assert_eq!(store.consume_daily("alice", 1_000), Ok(1));
        assert_eq!(store.sweep_expired(DEFAULT_WINDOW_MS + 500), 3);
        assert_eq!(store.consume_daily("bob", DEFAULT_WINDOW_MS + 500), Ok(2));
    }
}
