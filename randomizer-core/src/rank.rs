//! Desirability ranking and rank-preserving substitution.
//!
//! Ranks are pure functions of a record's current attributes; the only cached
//! input is the monster population's outlier-trimmed min/max bounds, which
//! live on the per-run [`Session`].

use crate::rng::Stream;
use crate::tables::{DropTable, Item, Monster, Spell};
use crate::{RandomizerError, Result, Session};

/// One item index carries a pinned rank so it always lands near the top of
/// the candidate list without competing on price.
const ITEM_SENTINEL_INDEX: u8 = 0x3E;
const ITEM_SENTINEL_RANK: i32 = 8000;

/// Unsellable oddballs whose price is meaningless; ranked from power instead.
const PRICELESS_GEAR: [u8; 1] = [0xAD];

pub fn item_rank(item: &Item) -> i32 {
    if item.index == ITEM_SENTINEL_INDEX {
        return ITEM_SENTINEL_RANK;
    }
    if item.key_item() || item.price == 0 || item.display_name().is_empty() {
        return -1;
    }
    let equippable = item.kind.is_equippable();
    if equippable
        && (item.cant_be_sold || item.price <= 1 || PRICELESS_GEAR.contains(&item.index))
    {
        ((item.power as f64).powf(1.5) * 50.0).round() as i32
    } else {
        let mut rank = item.price as i32;
        if equippable {
            rank += item.power as i32;
        }
        rank
    }
}

const MONSTER_RANK_ATTRS: usize = 4;

fn monster_attr(monster: &Monster, attr: usize) -> u32 {
    match attr {
        0 => monster.hp as u32,
        1 => monster.luck as u32,
        2 => monster.atp as u32,
        _ => monster.dfp as u32,
    }
}

/// Population bounds per rank attribute, discarding the single extreme low
/// (among positive values) and the single extreme high to reduce skew.
pub fn compute_monster_bounds(monsters: &[Monster]) -> [(f64, f64); MONSTER_RANK_ATTRS] {
    let mut bounds = [(0.0, 0.0); MONSTER_RANK_ATTRS];
    for (attr, slot) in bounds.iter_mut().enumerate() {
        let values: Vec<u32> = monsters.iter().map(|m| monster_attr(m, attr)).collect();
        let low = values
            .iter()
            .copied()
            .filter(|&v| v > 0)
            .min()
            .unwrap_or(0);
        let min = values
            .iter()
            .copied()
            .filter(|&v| v > low)
            .min()
            .unwrap_or(low);
        let high = values.iter().copied().max().unwrap_or(0);
        let max = values
            .iter()
            .copied()
            .filter(|&v| v < high)
            .max()
            .unwrap_or(high);
        *slot = (min as f64, max as f64);
    }
    bounds
}

pub fn monster_rank(session: &mut Session, monsters: &[Monster], index: usize) -> i32 {
    let monster = &monsters[index];
    if monster.display_name().is_empty() {
        return -1;
    }
    let bounds = session
        .monster_bounds
        .get_or_insert_with(|| compute_monster_bounds(monsters));
    let mut total = 0.0;
    for (attr, &(min, max)) in bounds.iter().enumerate() {
        if max <= min {
            continue;
        }
        let value = (monster_attr(monster, attr) as f64).clamp(min, max);
        total += (value - min) / (max - min);
    }
    ((total / MONSTER_RANK_ATTRS as f64) * 10_000.0).round() as i32
}

/// Composite rank of a common/rare drop pair, weighted 3:1 toward the common
/// slot. Ineligibility of either component poisons the whole table.
pub fn drop_rank(drop: &DropTable, items: &[Item]) -> i32 {
    let common = item_rank(&items[drop.common as usize]);
    let rare = item_rank(&items[drop.rare as usize]);
    if common < 0 || rare < 0 {
        return -1;
    }
    common * 3 + rare
}

/// Spell ranks come from a compiled-in level table; a malformed table is a
/// startup failure, never a mid-run one.
pub struct SpellLevels {
    levels: Vec<u8>,
}

impl SpellLevels {
    pub fn parse(text: &str, spell_count: usize) -> Result<SpellLevels> {
        let mut levels = vec![0u8; spell_count];
        let mut seen = vec![false; spell_count];
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let mut parts = line.split_whitespace();
            let (index, level) = match (parts.next(), parts.next()) {
                (Some(i), Some(l)) => (i, l),
                _ => {
                    return Err(RandomizerError::Config(format!(
                        "malformed spell level line: {:?}",
                        line
                    )))
                }
            };
            let index = usize::from_str_radix(index.trim_start_matches("0x"), 16)
                .map_err(|_| {
                    RandomizerError::Config(format!("bad spell index in line: {:?}", line))
                })?;
            let level: u8 = level.parse().map_err(|_| {
                RandomizerError::Config(format!("bad spell level in line: {:?}", line))
            })?;
            if index >= spell_count {
                return Err(RandomizerError::Config(format!(
                    "spell index {:#x} outside the spell table",
                    index
                )));
            }
            levels[index] = level;
            seen[index] = true;
        }
        if let Some(missing) = seen.iter().position(|&s| !s) {
            return Err(RandomizerError::Config(format!(
                "spell level table has no entry for spell {:#x}",
                missing
            )));
        }
        Ok(SpellLevels { levels })
    }

    pub fn rank(&self, spell_index: u8) -> i32 {
        self.levels[spell_index as usize] as i32
    }
}

/// How tightly a substitution is pinned to the source's category.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum KindFilter {
    Any,
    SameKind,
    SimilarKind,
}

/// Core of every substitution: sort the eligible pool by (rank, index) for a
/// total order, find the source, and take a jittered step from its position.
fn pick_similar(mut pool: Vec<(i32, u16)>, source: u16, rng: &mut Stream) -> Result<u16> {
    pool.sort_unstable();
    let position = pool
        .iter()
        .position(|&(_, index)| index == source)
        .ok_or_else(|| {
            RandomizerError::Invariant(format!(
                "substitution source {} missing from its own candidate pool",
                source
            ))
        })?;
    let destination = rng.jitter(position as i64, 0, pool.len() as i64 - 1) as usize;
    Ok(pool[destination].1)
}

/// Picks a replacement item of similar rank. Ineligible sources (key items,
/// negative rank) pass through unchanged; the result always satisfies the
/// kind filter and is never key-flagged or negative-ranked.
pub fn similar_item(
    items: &[Item],
    source: u8,
    filter: KindFilter,
    rng: &mut Stream,
) -> Result<u8> {
    let src = &items[source as usize];
    if src.key_item() || item_rank(src) < 0 {
        return Ok(source);
    }
    let pool: Vec<(i32, u16)> = items
        .iter()
        .filter(|item| {
            let rank = item_rank(item);
            if rank < 0 || item.key_item() {
                return false;
            }
            match filter {
                KindFilter::Any => true,
                KindFilter::SameKind => item.kind == src.kind,
                KindFilter::SimilarKind => {
                    item.kind.similar_class() == src.kind.similar_class()
                }
            }
        })
        .map(|item| (item_rank(item), item.index as u16))
        .collect();
    Ok(pick_similar(pool, source as u16, rng)? as u8)
}

pub fn similar_drop(
    drops: &[DropTable],
    items: &[Item],
    source: u8,
    rng: &mut Stream,
) -> Result<u8> {
    if drop_rank(&drops[source as usize], items) < 0 {
        return Ok(source);
    }
    let pool: Vec<(i32, u16)> = drops
        .iter()
        .filter(|d| drop_rank(d, items) >= 0)
        .map(|d| (drop_rank(d, items), d.index as u16))
        .collect();
    Ok(pick_similar(pool, source as u16, rng)? as u8)
}

pub fn similar_spell(
    spells: &[Spell],
    levels: &SpellLevels,
    source: u8,
    rng: &mut Stream,
) -> Result<u8> {
    if levels.rank(source) < 0 {
        return Ok(source);
    }
    let pool: Vec<(i32, u16)> = spells
        .iter()
        .map(|s| (levels.rank(s.index), s.index as u16))
        .collect();
    Ok(pick_similar(pool, source as u16, rng)? as u8)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::ItemKind;
    use crate::Session;

    fn item(index: u8, price: u16, power: u8, item_type: u8) -> Item {
        let mut name = [0u8; 8];
        name[..4].copy_from_slice(b"ITEM");
        Item {
            index,
            name,
            price,
            power,
            item_type,
            equippable: 0xFF,
            cant_be_sold: false,
            kind: ItemKind::classify(item_type, index),
        }
    }

    fn monster(index: u8, hp: u16, luck: u8, atp: u16, dfp: u16) -> Monster {
        let mut name = [0u8; 8];
        name[..3].copy_from_slice(b"MON");
        Monster {
            index,
            name,
            hp,
            ap: 10,
            atp,
            dfp,
            agl: 10,
            ms: 1,
            luck,
            xp: 10,
            gp: 10,
            treasure_set: 0,
            treasure_class: 0,
            immunity: 0,
            ai: 0,
            boss: false,
        }
    }

    #[test]
    fn item_rank_rules() {
        let mut key = item(0x57, 500, 0, 0);
        assert!(key.key_item());
        assert_eq!(item_rank(&key), -1);
        key.index = 2;
        key.kind = ItemKind::classify(0, 2);
        assert_eq!(item_rank(&key), 500);

        let sentinel = item(ITEM_SENTINEL_INDEX, 1, 1, 0);
        assert_eq!(item_rank(&sentinel), ITEM_SENTINEL_RANK);

        let unsellable_sword = {
            let mut i = item(0x70, 2000, 16, 0x8A);
            i.cant_be_sold = true;
            i
        };
        assert_eq!(item_rank(&unsellable_sword), 3200);

        let free = item(3, 0, 0, 0);
        assert_eq!(item_rank(&free), -1);
    }

    #[test]
    fn monster_bounds_discard_single_extremes() {
        let monsters: Vec<Monster> = [10u16, 20, 30, 40, 900]
            .iter()
            .enumerate()
            .map(|(i, &hp)| monster(i as u8, hp, 5, 50, 50))
            .collect();
        let bounds = compute_monster_bounds(&monsters);
        // hp: lowest (10) and highest (900) are trimmed.
        assert_eq!(bounds[0], (20.0, 40.0));
    }

    #[test]
    fn monster_rank_is_normalized_and_cached() {
        let monsters: Vec<Monster> = [10u16, 20, 30, 40, 900]
            .iter()
            .enumerate()
            .map(|(i, &hp)| monster(i as u8, hp, 5, 50, 50))
            .collect();
        let mut session = Session::for_tests();
        // Only hp varies; the other three attrs contribute zero spread.
        let low = monster_rank(&mut session, &monsters, 0);
        let mid = monster_rank(&mut session, &monsters, 2);
        let high = monster_rank(&mut session, &monsters, 4);
        assert!(low < mid && mid < high);
        assert!(session.monster_bounds.is_some());
        assert!((0..=10_000).contains(&high));
    }

    #[test]
    fn drop_rank_weights_common_three_to_one() {
        let items = vec![item(0, 100, 0, 0), item(1, 40, 0, 0), item(2, 0, 0, 0)];
        let good = DropTable {
            index: 0,
            common: 0,
            rare: 1,
        };
        assert_eq!(drop_rank(&good, &items), 340);
        let poisoned = DropTable {
            index: 1,
            common: 0,
            rare: 2,
        };
        assert_eq!(drop_rank(&poisoned, &items), -1);
    }

    #[test]
    fn spell_level_table_rejects_gaps() {
        let ok = SpellLevels::parse("0x00 3 Flare\n0x01 10 Frost\n", 2).unwrap();
        assert_eq!(ok.rank(1), 10);
        assert!(SpellLevels::parse("0x00 3 Flare\n", 2).is_err());
        assert!(SpellLevels::parse("0x09 3 Flare\n", 2).is_err());
    }

    #[test]
    fn similar_item_honors_kind_filter_and_eligibility() {
        let mut items: Vec<Item> = (0..24u8)
            .map(|i| {
                let item_type = if i % 2 == 0 { 0x8A } else { 0x93 };
                item(i, 50 + 25 * i as u16, i, item_type)
            })
            .collect();
        // One key item and one zero-price record in the population.
        items[7].cant_be_sold = true;
        items[7].equippable = 0;
        items[7].item_type = 0;
        items[7].kind = ItemKind::classify(0, 7);
        items[9].price = 0;

        let mut rng = Stream::from_seed(0xBEEF);
        for seed in 0..50u64 {
            rng.reseed(seed);
            let chosen = similar_item(&items, 4, KindFilter::SameKind, &mut rng).unwrap();
            assert_eq!(items[chosen as usize].kind, ItemKind::Weapon);
            assert!(!items[chosen as usize].key_item());
            assert!(item_rank(&items[chosen as usize]) >= 0);
        }
    }

    #[test]
    fn ineligible_source_passes_through() {
        let mut items: Vec<Item> = (0..8u8).map(|i| item(i, 100, 1, 0x8A)).collect();
        items[3].price = 0;
        let mut rng = Stream::from_seed(1);
        assert_eq!(
            similar_item(&items, 3, KindFilter::Any, &mut rng).unwrap(),
            3
        );
    }

    #[test]
    fn substitution_is_deterministic_per_seed() {
        let items: Vec<Item> = (0..32u8).map(|i| item(i, 10 + i as u16, 0, 0x8A)).collect();
        let mut a = Stream::from_seed(99);
        let mut b = Stream::from_seed(99);
        for i in 0..32u8 {
            assert_eq!(
                similar_item(&items, i, KindFilter::Any, &mut a).unwrap(),
                similar_item(&items, i, KindFilter::Any, &mut b).unwrap()
            );
        }
    }
}
