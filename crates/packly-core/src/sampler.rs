// Copyright (c) 2026 Joseph Verdicchio and Packly Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tier-weighted reward selection and special (bonus attribute) selection.
//!
//! Every item's weight comes from the first matching range of its channel's
//! [`TierTable`]. Drawing from a [`WeightedPool`] is equivalent to repeating
//! each item `weight` times and picking one entry uniformly, so an item is
//! drawn with probability `weight / total_weight`.

use std::collections::HashSet;
use std::ops::{Bound, RangeBounds};

use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::catalog::{Item, ItemFilter, ItemId, RarityRange, SpecialDefinition};

/// Multiplier applied to items the owner already holds.
pub const OWNED_MULTIPLIER: u64 = 1;
/// Multiplier applied to items the owner does not hold yet.
pub const UNOWNED_MULTIPLIER: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierRange {
    pub low: Bound<f64>,
    pub high: Bound<f64>,
    pub weight: u64,
}

impl TierRange {
    pub const fn new(low: Bound<f64>, high: Bound<f64>, weight: u64) -> Self {
        Self { low, high, weight }
    }

    pub fn contains(&self, rarity: f64) -> bool {
        (self.low, self.high).contains(&rarity)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TierTable {
    ranges: Vec<TierRange>,
}

impl TierTable {
    pub fn new(ranges: Vec<TierRange>) -> Self {
        Self { ranges }
    }

    /// Weight of the first range containing `rarity`.
    pub fn weight_for(&self, rarity: f64) -> Option<u64> {
        self.ranges
            .iter()
            .find(|range| range.contains(rarity))
            .map(|range| range.weight)
    }

    pub fn ranges(&self) -> &[TierRange] {
        &self.ranges
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Daily claims and pack openings.
    Standard,
    /// Weekly claims; narrower rarity bounds, flatter weights.
    Weekly,
}

impl Channel {
    pub fn rarity_range(self) -> RarityRange {
        match self {
            Self::Standard => RarityRange::new(0.03, 30.0),
            Self::Weekly => RarityRange::new(0.03, 5.0),
        }
    }

    pub fn item_filter(self) -> ItemFilter {
        ItemFilter {
            enabled_only: true,
            rarity: self.rarity_range(),
        }
    }

    pub fn tier_table(self) -> TierTable {
        use Bound::{Excluded, Included, Unbounded};
        match self {
            Self::Standard => TierTable::new(vec![
                TierRange::new(Included(5.0), Included(30.0), 1600),
                TierRange::new(Included(2.5), Excluded(5.0), 600),
                TierRange::new(Included(1.5), Excluded(2.5), 300),
                TierRange::new(Excluded(0.5), Excluded(1.5), 100),
                TierRange::new(Excluded(0.1), Excluded(0.5), 30),
                TierRange::new(Included(0.03), Included(0.1), 20),
            ]),
            Self::Weekly => TierTable::new(vec![
                TierRange::new(Included(4.5), Unbounded, 900),
                TierRange::new(Included(1.5), Excluded(4.5), 500),
                TierRange::new(Included(0.5), Excluded(1.5), 200),
                TierRange::new(Unbounded, Excluded(0.5), 20),
            ]),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Weekly => "weekly",
        }
    }
}

pub fn ownership_multiplier(owned: bool) -> u64 {
    if owned {
        OWNED_MULTIPLIER
    } else {
        UNOWNED_MULTIPLIER
    }
}

#[derive(Debug, Clone)]
pub struct WeightedPool<'a> {
    items: Vec<&'a Item>,
    weights: Vec<u64>,
    total_weight: u64,
    index: WeightedIndex<u64>,
}

impl<'a> WeightedPool<'a> {
    /// Returns `None` when no item carries a positive weight.
    pub fn build(items: &'a [Item], table: &TierTable, owned: &HashSet<ItemId>) -> Option<Self> {
        let mut pooled = Vec::new();
        let mut weights = Vec::new();
        for item in items {
            let Some(tier_weight) = table.weight_for(item.rarity) else {
                continue;
            };
            let weight = tier_weight.saturating_mul(ownership_multiplier(owned.contains(&item.id)));
            if weight == 0 {
                continue;
            }
            pooled.push(item);
            weights.push(weight);
        }
        let index = WeightedIndex::new(&weights).ok()?;
        let total_weight = weights.iter().sum();
        Some(Self {
            items: pooled,
            weights,
            total_weight,
            index,
        })
    }

    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> &'a Item {
        self.items[self.index.sample(rng)]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    pub fn probability(&self, id: ItemId) -> f64 {
        let weight: u64 = self
            .items
            .iter()
            .zip(&self.weights)
            .filter(|(item, _)| item.id == id)
            .map(|(_, w)| *w)
            .sum();
        weight as f64 / self.total_weight as f64
    }
}

/// One draw over `items` (already filtered for the channel). `None` means the
/// caller must abort rather than retry.
pub fn sample_reward<R: Rng + ?Sized>(
    items: &[Item],
    channel: Channel,
    owned: &HashSet<ItemId>,
    rng: &mut R,
) -> Option<Item> {
    let table = channel.tier_table();
    let pool = WeightedPool::build(items, &table, owned)?;
    Some(pool.draw(rng).clone())
}

/// Single-claim path: walk specials in catalog order, each with its own
/// independent roll; the first hit wins.
pub fn select_special_sequential<'a, R: Rng + ?Sized>(
    eligible: &'a [SpecialDefinition],
    rng: &mut R,
) -> Option<&'a SpecialDefinition> {
    eligible
        .iter()
        .find(|special| rng.gen::<f64>() < special.rarity_threshold)
}

/// Batch path: pick one candidate uniformly, then keep it only if a fresh
/// roll lands under its threshold.
pub fn select_special_uniform<'a, R: Rng + ?Sized>(
    eligible: &'a [SpecialDefinition],
    rng: &mut R,
) -> Option<&'a SpecialDefinition> {
    let candidate = eligible.choose(rng)?;
    (rng.gen::<f64>() < candidate.rarity_threshold).then_some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn item(id: ItemId, rarity: f64) -> Item {
        Item {
            id,
            display_name: format!("item-{id}"),
            rarity,
            attack: 1,
            health: 1,
            card_regime: None,
            enabled: true,
        }
    }

    fn special(id: u64, threshold: f64) -> SpecialDefinition {
        SpecialDefinition {
            id,
            name: format!("special-{id}"),
            rarity_threshold: threshold,
            visible: true,
            start_ms: None,
            end_ms: None,
            emoji: None,
        }
    }

    #[test]
    fn standard_tier_boundaries_follow_first_match() {
        let table = Channel::Standard.tier_table();
        assert_eq!(table.weight_for(30.0), Some(1600));
        assert_eq!(table.weight_for(5.0), Some(1600));
        assert_eq!(table.weight_for(4.99), Some(600));
        assert_eq!(table.weight_for(2.5), Some(600));
        assert_eq!(table.weight_for(1.5), Some(300));
        assert_eq!(table.weight_for(1.0), Some(100));
        assert_eq!(table.weight_for(0.5), None);
        assert_eq!(table.weight_for(0.2), Some(30));
        assert_eq!(table.weight_for(0.1), Some(20));
        assert_eq!(table.weight_for(0.03), Some(20));
        assert_eq!(table.weight_for(0.02), None);
    }

    #[test]
    fn weekly_tier_boundaries() {
        let table = Channel::Weekly.tier_table();
        assert_eq!(table.weight_for(5.0), Some(900));
        assert_eq!(table.weight_for(4.5), Some(900));
        assert_eq!(table.weight_for(4.49), Some(500));
        assert_eq!(table.weight_for(1.5), Some(500));
        assert_eq!(table.weight_for(0.5), Some(200));
        assert_eq!(table.weight_for(0.03), Some(20));
    }

    #[test]
    fn ownership_does_not_change_weight() {
        let items = vec![item(1, 10.0), item(2, 10.0)];
        let owned: HashSet<ItemId> = [1].into_iter().collect();
        let pool = WeightedPool::build(&items, &Channel::Standard.tier_table(), &owned)
            .expect("pool");
        assert_eq!(pool.total_weight(), 3200);
        assert!((pool.probability(1) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn untiered_items_are_never_drawn() {
        let items = vec![item(1, 0.5), item(2, 3.0)];
        let pool = WeightedPool::build(&items, &Channel::Standard.tier_table(), &HashSet::new())
            .expect("pool");
        assert_eq!(pool.len(), 1);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..200 {
            assert_eq!(pool.draw(&mut rng).id, 2);
        }
    }

    #[test]
    fn empty_catalog_signals_abort() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(sample_reward(&[], Channel::Standard, &HashSet::new(), &mut rng).is_none());
        let only_gap = vec![item(9, 0.5)];
        assert!(sample_reward(&only_gap, Channel::Standard, &HashSet::new(), &mut rng).is_none());
    }

    #[test]
    fn sequential_specials_favour_earlier_entries() {
        let specials = vec![special(1, 0.5), special(2, 0.5)];
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut first = 0;
        let mut second = 0;
        let mut none = 0;
        for _ in 0..20_000 {
            match select_special_sequential(&specials, &mut rng).map(|s| s.id) {
                Some(1) => first += 1,
                Some(_) => second += 1,
                None => none += 1,
            }
        }
        // Expected 50% / 25% / 25%.
        assert!((9_500..=10_500).contains(&first), "first={first}");
        assert!((4_500..=5_500).contains(&second), "second={second}");
        assert!((4_500..=5_500).contains(&none), "none={none}");
    }

    #[test]
    fn uniform_specials_treat_entries_evenly() {
        let specials = vec![special(1, 0.5), special(2, 0.5)];
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut first = 0;
        let mut second = 0;
        for _ in 0..20_000 {
            match select_special_uniform(&specials, &mut rng).map(|s| s.id) {
                Some(1) => first += 1,
                Some(_) => second += 1,
                None => {}
            }
        }
        // Expected 25% each, 50% none.
        assert!((4_500..=5_500).contains(&first), "first={first}");
        assert!((4_500..=5_500).contains(&second), "second={second}");
    }

    #[test]
    fn specials_with_zero_threshold_never_hit() {
        let specials = vec![special(1, 0.0)];
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        for _ in 0..1_000 {
            assert!(select_special_sequential(&specials, &mut rng).is_none());
            assert!(select_special_uniform(&specials, &mut rng).is_none());
        }
        assert!(select_special_uniform(&[], &mut rng).is_none());
    }
}
