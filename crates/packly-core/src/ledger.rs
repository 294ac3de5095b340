// Copyright [2026] [Joseph Verdicchio]
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// Copyright (c) 2026 Joseph Verdicchio and Packly Contributors
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{PacklyError, PacklyResult};

pub const MIN_GAMBLE_STAKE: u64 = 1;
pub const MAX_GAMBLE_STAKE: u64 = 100;

/// Balance a wallet is created with, by the kind of operation that first touches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingGrants {
    pub spend: u64,
    pub gamble: u64,
}

impl Default for OnboardingGrants {
    fn default() -> Self {
        Self {
            spend: 1,
            gamble: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GambleOutcome {
    Win,
    Lose,
}

impl GambleOutcome {
    /// Fixed even odds.
    pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) {
            Self::Win
        } else {
            Self::Lose
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GambleResult {
    pub stake: u64,
    pub outcome: GambleOutcome,
    pub payout: u64,
    pub balance: u64,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EconomyLedger {
    balances: HashMap<String, u64>,
}

impl EconomyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current balance without creating the wallet.
    pub fn balance(&self, user: &str) -> u64 {
        self.balances.get(user).copied().unwrap_or(0)
    }

    pub fn has_account(&self, user: &str) -> bool {
        self.balances.contains_key(user)
    }

    pub fn ensure_account(&mut self, user: &str, grant: u64) -> &mut u64 {
        self.balances.entry(user.to_string()).or_insert(grant)
    }

    pub fn credit(&mut self, user: &str, amount: u64, grant: u64) -> u64 {
        let balance = self.ensure_account(user, grant);
        *balance = balance.saturating_add(amount);
        *balance
    }

    /// Fails without mutation when the balance cannot cover `amount`.
    pub fn debit_strict(&mut self, user: &str, amount: u64, grant: u64) -> PacklyResult<u64> {
        let balance = self.ensure_account(user, grant);
        if *balance < amount {
            return Err(PacklyError::InsufficientBalance {
                requested: amount,
                available: *balance,
            });
        }
        *balance -= amount;
        Ok(*balance)
    }

    /// Administrative removal: clamps at zero and never fails.
    pub fn debit_floor(&mut self, user: &str, amount: u64, grant: u64) -> u64 {
        let balance = self.ensure_account(user, grant);
        *balance = balance.saturating_sub(amount);
        *balance
    }

    /// Validates and debits a gamble stake. Settle with [`Self::settle_gamble`].
    pub fn stake_gamble(&mut self, user: &str, stake: u64, grant: u64) -> PacklyResult<u64> {
        if !(MIN_GAMBLE_STAKE..=MAX_GAMBLE_STAKE).contains(&stake) {
            return Err(PacklyError::InvalidAmount {
                requested: stake,
                min: MIN_GAMBLE_STAKE,
                max: MAX_GAMBLE_STAKE,
            });
        }
        self.debit_strict(user, stake, grant)
    }

    pub fn settle_gamble(
        &mut self,
        user: &str,
        stake: u64,
        outcome: GambleOutcome,
        grant: u64,
    ) -> GambleResult {
        let payout = match outcome {
            GambleOutcome::Win => stake.saturating_mul(2),
            GambleOutcome::Lose => 0,
        };
        let balance = self.credit(user, payout, grant);
        GambleResult {
            stake,
            outcome,
            payout,
            balance,
        }
    }

    pub fn gamble<R: Rng + ?Sized>(
        &mut self,
        user: &str,
        stake: u64,
        grant: u64,
        rng: &mut R,
    ) -> PacklyResult<GambleResult> {
        self.stake_gamble(user, stake, grant)?;
        let outcome = GambleOutcome::roll(rng);
        Ok(self.settle_gamble(user, stake, outcome, grant))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn ledger_with(user: &str, balance: u64) -> EconomyLedger {
        let mut ledger = EconomyLedger::new();
        ledger.credit(user, balance, 0);
        ledger
    }

    #[test]
    fn wallet_is_created_with_entry_point_grant() {
        let grants = OnboardingGrants::default();
        let mut ledger = EconomyLedger::new();
        assert_eq!(ledger.balance("alice"), 0);
        assert!(!ledger.has_account("alice"));
        assert_eq!(ledger.debit_strict("alice", 1, grants.spend), Ok(0));
        assert_eq!(
            ledger.stake_gamble("bob", 1, grants.gamble),
            Err(PacklyError::InsufficientBalance {
                requested: 1,
                available: 0
            })
        );
        assert!(ledger.has_account("bob"));
    }

    #[test]
    fn stake_outside_range_is_rejected_before_touching_balance() {
        let mut ledger = ledger_with("carol", 500);
        for stake in [0, 101] {
            let err = ledger.stake_gamble("carol", stake, 0).expect_err("range");
            assert!(err.is_validation());
        }
        assert_eq!(ledger.balance("carol"), 500);
    }

    #[test]
    fn gamble_of_ten_nets_plus_or_minus_ten() {
        let mut ledger = ledger_with("dan", 50);
        assert_eq!(ledger.stake_gamble("dan", 10, 0), Ok(40));
        let win = ledger.settle_gamble("dan", 10, GambleOutcome::Win, 0);
        assert_eq!(win.payout, 20);
        assert_eq!(win.balance, 60);

        let mut ledger = ledger_with("dan", 50);
        assert_eq!(ledger.stake_gamble("dan", 10, 0), Ok(40));
        let loss = ledger.settle_gamble("dan", 10, GambleOutcome::Lose, 0);
        assert_eq!(loss.payout, 0);
        assert_eq!(loss.balance, 40);
    }

    #[test]
    fn gamble_outcomes_are_roughly_even() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut wins = 0;
        for _ in 0..10_000 {
            let mut ledger = ledger_with("eve", 10);
            let result = ledger.gamble("eve", 10, 0, &mut rng).expect("gamble");
            match result.outcome {
                GambleOutcome::Win => {
                    wins += 1;
                    assert_eq!(result.balance, 20);
                }
                GambleOutcome::Lose => assert_eq!(result.balance, 0),
            }
        }
        assert!((4_700..=5_300).contains(&wins), "wins={wins}");
    }

    proptest! {
        #[test]
        fn strict_debit_never_overdraws(balance in 0u64..10_000, amount in 0u64..10_000) {
            let mut ledger = ledger_with("p", balance);
            let result = ledger.debit_strict("p", amount, 0);
            if amount <= balance {
                prop_assert_eq!(result, Ok(balance - amount));
                prop_assert_eq!(ledger.balance("p"), balance - amount);
            } else {
                prop_assert!(result.is_err());
                prop_assert_eq!(ledger.balance("p"), balance);
            }
        }

        #[test]
        fn floor_debit_clamps_at_zero(balance in 0u64..10_000, amount in 0u64..20_000) {
            let mut ledger = ledger_with("p", balance);
            let after = ledger.debit_floor("p", amount, 0);
            prop_assert_eq!(after, balance.saturating_sub(amount));
            prop_assert_eq!(ledger.balance("p"), after);
        }
    }
}
