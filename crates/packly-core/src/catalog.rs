// Copyright (c) 2026 Joseph Verdicchio and Packly Contributors
// SPDX-License-Identifier: Apache-2.0

use rand::Rng;
use serde::{Deserialize, Serialize};

pub type ItemId = u64;
pub type SpecialId = u64;
pub type InstanceId = u64;

pub const BONUS_MIN: i32 = -20;
pub const BONUS_MAX: i32 = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub display_name: String,
    pub rarity: f64,
    pub attack: i32,
    pub health: i32,
    #[serde(default)]
    pub card_regime: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl Item {
    pub fn card_name(&self) -> &str {
        self.card_regime.as_deref().unwrap_or("Unknown")
    }

    pub fn matches(&self, filter: &ItemFilter) -> bool {
        (!filter.enabled_only || self.enabled) && filter.rarity.contains(self.rarity)
    }
}

/// Closed rarity interval used to pre-filter the catalog per channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RarityRange {
    pub min: f64,
    pub max: f64,
}

impl RarityRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, rarity: f64) -> bool {
        rarity >= self.min && rarity <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemFilter {
    pub enabled_only: bool,
    pub rarity: RarityRange,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialDefinition {
    pub id: SpecialId,
    pub name: String,
    /// Probability in `[0, 1]` that the special is granted once it is considered.
    pub rarity_threshold: f64,
    #[serde(default = "enabled_by_default")]
    pub visible: bool,
    #[serde(default)]
    pub start_ms: Option<u64>,
    #[serde(default)]
    pub end_ms: Option<u64>,
    #[serde(default)]
    pub emoji: Option<String>,
}

impl SpecialDefinition {
    pub fn is_active_at(&self, now_ms: u64) -> bool {
        self.start_ms.map_or(true, |start| start <= now_ms)
            && self.end_ms.map_or(true, |end| end >= now_ms)
    }

    pub fn matches(&self, filter: &SpecialFilter) -> bool {
        (!filter.visible_only || self.visible) && self.is_active_at(filter.active_at_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecialFilter {
    pub visible_only: bool,
    pub active_at_ms: u64,
}

impl SpecialFilter {
    pub fn eligible_at(now_ms: u64) -> Self {
        Self {
            visible_only: true,
            active_at_ms: now_ms,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bonuses {
    pub attack: i32,
    pub health: i32,
}

impl Bonuses {
    /// Each bonus is an independent uniform draw from the closed bonus range.
    pub fn roll<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            attack: rng.gen_range(BONUS_MIN..=BONUS_MAX),
            health: rng.gen_range(BONUS_MIN..=BONUS_MAX),
        }
    }
}

/// A reward instance before the persistence layer assigns it an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceSpec {
    pub item_id: ItemId,
    pub owner: String,
    pub bonuses: Bonuses,
    pub special_id: Option<SpecialId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardInstance {
    pub id: InstanceId,
    pub item_id: ItemId,
    pub owner: String,
    pub bonuses: Bonuses,
    pub special_id: Option<SpecialId>,
}

impl RewardInstance {
    pub fn from_spec(id: InstanceId, spec: InstanceSpec) -> Self {
        Self {
            id,
            item_id: spec.item_id,
            owner: spec.owner,
            bonuses: spec.bonuses,
            special_id: spec.special_id,
        }
    }
}

/// Rarity rendered the way catalog operators write it (`5.0`, `0.03`).
pub fn format_rarity(rarity: f64) -> String {
    format!("{rarity:?}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn special(visible: bool, start_ms: Option<u64>, end_ms: Option<u64>) -> SpecialDefinition {
        SpecialDefinition {
            id: 1,
            name: "Shiny".to_string(),
            rarity_threshold: 0.5,
            visible,
            start_ms,
            end_ms,
            emoji: None,
        }
    }

    fn eligible(special: &SpecialDefinition, now_ms: u64) -> bool {
        special.matches(&SpecialFilter::eligible_at(now_ms))
    }

    #[test]
    fn special_window_bounds_are_inclusive_and_optional() {
        assert!(eligible(&special(true, None, None), 10));
        assert!(eligible(&special(true, Some(10), Some(20)), 10));
        assert!(eligible(&special(true, Some(10), Some(20)), 20));
        assert!(!eligible(&special(true, Some(10), Some(20)), 21));
        assert!(!eligible(&special(true, Some(11), None), 10));
        assert!(!eligible(&special(false, None, None), 10));
    }

    #[test]
    fn catalog_rows_default_optional_fields() {
        let item: Item = serde_json::from_str(
            r#"{"id": 3, "display_name": "Winger", "rarity": 2.5, "attack": 60, "health": 55}"#,
        )
        .unwrap();
        assert!(item.enabled);
        assert_eq!(item.card_name(), "Unknown");

        let special: SpecialDefinition =
            serde_json::from_str(r#"{"id": 9, "name": "Gold", "rarity_threshold": 0.01}"#)
                .unwrap();
        assert!(special.visible);
        assert!(eligible(&special, 0));
    }

    #[test]
    fn item_filter_respects_enabled_flag_and_closed_range() {
        let mut item = Item {
            id: 7,
            display_name: "Keeper".to_string(),
            rarity: 30.0,
            attack: 10,
            health: 10,
            card_regime: None,
            enabled: true,
        };
        let filter = ItemFilter {
            enabled_only: true,
            rarity: RarityRange::new(0.03, 30.0),
        };
        assert!(item.matches(&filter));
        item.enabled = false;
        assert!(!item.matches(&filter));
        item.enabled = true;
        item.rarity = 30.01;
        assert!(!item.matches(&filter));
        assert_eq!(item.card_name(), "Unknown");
    }

    #[test]
    fn bonuses_stay_within_closed_range_and_hit_both_ends() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut seen_min = false;
        let mut seen_max = false;
        let mut differing = 0usize;
        for _ in 0..20_000 {
            let b = Bonuses::roll(&mut rng);
            assert!((BONUS_MIN..=BONUS_MAX).contains(&b.attack));
            assert!((BONUS_MIN..=BONUS_MAX).contains(&b.health));
            seen_min |= b.attack == BONUS_MIN;
            seen_max |= b.health == BONUS_MAX;
            if b.attack != b.health {
                differing += 1;
            }
        }
        assert!(seen_min && seen_max);
        // Independent draws agree roughly 1 time in 41.
        assert!(differing > 18_000, "differing={differing}");
    }

    #[test]
    fn rarity_formatting_keeps_decimal_point() {
        assert_eq!(format_rarity(5.0), "5.0");
        assert_eq!(format_rarity(0.03), "0.03");
    }
}
