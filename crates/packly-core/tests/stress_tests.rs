use std::collections::HashSet;

use packly_core::catalog::Item;
use packly_core::ledger::EconomyLedger;
use packly_core::sampler::{Channel, WeightedPool};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const DRAWS: usize = 100_000;

fn item(id: u64, rarity: f64) -> Item {
    Item {
        id,
        display_name: format!("item-{id}"),
        rarity,
        attack: 50,
        health: 50,
        card_regime: Some("Base".to_string()),
        enabled: true,
    }
}

#[test]
fn two_tier_draws_converge_to_weight_ratio() {
    // 10.0 lands in the 1600 tier, 3.0 in the 600 tier.
    let items = vec![item(1, 10.0), item(2, 3.0)];
    let table = Channel::Standard.tier_table();
    let pool = WeightedPool::build(&items, &table, &HashSet::new()).expect("pool");
    assert_eq!(pool.total_weight(), 2_200);

    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
    let mut common = 0usize;
    let mut decent = 0usize;
    for _ in 0..DRAWS {
        match pool.draw(&mut rng).id {
            1 => common += 1,
            _ => decent += 1,
        }
    }
    let observed = common as f64 / decent as f64;
    let expected = 1600.0 / 600.0;
    assert!(
        ((observed - expected) / expected).abs() < 0.05,
        "observed ratio {observed} vs expected {expected}"
    );
}

#[test]
fn storm_of_strict_debits_never_goes_negative() {
    let mut ledger = EconomyLedger::new();
    ledger.credit("storm", 10_000, 0);
    let mut accepted = 0u64;
    for i in 0..50_000u64 {
        if ledger.debit_strict("storm", (i % 7) + 1, 0).is_ok() {
            accepted += 1;
        }
    }
    assert!(accepted > 0);
    assert!(ledger.balance("storm") < 7);
}
