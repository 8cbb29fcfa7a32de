//! Character randomization: level-curve shuffling, fresh starting stats,
//! equippability redraws, and starting equipment reassignment.

use crate::rank::item_rank;
use crate::tables::{ItemKind, Stat, Tables};
use crate::{Result, Session};

/// Fixed visit order so the draw sequence is stable across runs.
const CURVE_SHUFFLE_ORDER: [Stat; 7] = [
    Stat::Agility,
    Stat::Ap,
    Stat::Hp,
    Stat::Luck,
    Stat::Stamina,
    Stat::Strength,
    Stat::Wisdom,
];

const CHAR_STAT_ORDER: [Stat; 7] = [
    Stat::Strength,
    Stat::Stamina,
    Stat::Agility,
    Stat::Wisdom,
    Stat::Luck,
    Stat::Hp,
    Stat::Ap,
];

/// Playable roster size; the ninth record is the shaman template.
const PLAYABLE_COUNT: usize = 8;
const SHAMAN_TEMPLATE: usize = 8;

pub fn randomize_characters(session: &mut Session, tables: &mut Tables) -> Result<()> {
    shuffle_curves(session, tables);
    for index in 0..=SHAMAN_TEMPLATE {
        set_initial_stats(session, tables, index);
    }
    Ok(())
}

pub fn randomize_equipment(session: &mut Session, tables: &mut Tables) -> Result<()> {
    mutate_equippable(session, tables);
    for index in 0..=SHAMAN_TEMPLATE {
        set_initial_equips(tables, index);
    }
    Ok(())
}

/// Items below this index keep their fixed story-critical equip masks.
const EQUIP_MUTATE_FLOOR: u8 = 0x3E;
/// Only late-table gear contributes masks to the redraw pools.
const EQUIP_POOL_FLOOR: u8 = 0x5B;

/// Redraws who can equip what. Gear swaps its mask for another mask drawn
/// from the late-table population of its slot; accessories occasionally grow
/// an extra wearer bit. Dragon gear stays bound to its owner.
fn mutate_equippable(session: &mut Session, tables: &mut Tables) {
    let pool = |kind: ItemKind| -> Vec<u8> {
        tables
            .items
            .iter()
            .filter(|item| {
                item.index > EQUIP_POOL_FLOOR
                    && item.kind == kind
                    && item.equippable != 0
                    && item.equippable != 0xFF
            })
            .map(|item| item.equippable)
            .collect()
    };
    let pools = [
        (ItemKind::Weapon, pool(ItemKind::Weapon)),
        (ItemKind::Shield, pool(ItemKind::Shield)),
        (ItemKind::Helmet, pool(ItemKind::Helmet)),
        (ItemKind::Armor, pool(ItemKind::Armor)),
    ];

    for item in &mut tables.items {
        if item.index <= EQUIP_MUTATE_FLOOR || item.is_dragon() {
            continue;
        }
        if item.kind == ItemKind::Accessory {
            while session.rng.uniform_int(1, 25) == 25 {
                if item.equippable == 0xFF {
                    item.equippable = 0;
                }
                item.equippable |= 1 << session.rng.uniform_int(0, 7);
            }
            continue;
        }
        if let Some((_, masks)) = pools.iter().find(|&&(kind, _)| kind == item.kind) {
            if !masks.is_empty() {
                item.equippable = *session.rng.pick(masks);
            }
        }
    }
}

/// One-time permutation of each stat's gain sequence across the playable
/// roster. Curves keep their shape, characters trade growth identities.
fn shuffle_curves(session: &mut Session, tables: &mut Tables) {
    if session.curves_shuffled {
        return;
    }
    session.curves_shuffled = true;
    for stat in CURVE_SHUFFLE_ORDER {
        let mut columns: Vec<Vec<u8>> = tables
            .curves
            .iter()
            .take(PLAYABLE_COUNT)
            .map(|curve| curve.gains.iter().map(|gain| gain.get(stat)).collect())
            .collect();
        session.rng.shuffle(&mut columns);
        for (curve, column) in tables
            .curves
            .iter_mut()
            .take(PLAYABLE_COUNT)
            .zip(columns)
        {
            for (gain, value) in curve.gains.iter_mut().zip(column) {
                gain.set(stat, value);
            }
        }
    }
}

/// Re-derives starting stats from the (possibly shuffled) level curve at a
/// jittered joining level. The shaman template instead shrinks uniformly.
fn set_initial_stats(session: &mut Session, tables: &mut Tables, index: usize) {
    let level = session
        .rng
        .jitter(tables.characters[index].level as i64, 1, 99) as u8;
    tables.characters[index].level = level;

    if index == SHAMAN_TEMPLATE {
        for stat in CHAR_STAT_ORDER {
            let value = tables.characters[index].get_stat(stat);
            let shrunk = session.rng.uniform_int(1, value as i64) as u32;
            tables.characters[index].set_stat(stat, shrunk);
        }
        return;
    }

    let guts = tables.characters[index].guts;
    tables.characters[index].guts = session.rng.jitter(guts as i64, 1, 0xFF) as u8;

    for stat in CHAR_STAT_ORDER {
        let base = tables.curves[index].value_at_level(stat, level);
        let fifty = tables.curves[index].value_at_level(stat, 50);
        let bonus = session
            .rng
            .jitter_f64(fifty as f64 / 5.0, 1.0, 255.0)
            .round() as u32;
        let value = (base + bonus).min(0xFF);
        tables.characters[index].set_stat(stat, value);
    }
}

/// Equips the cheapest item of each gear slot the character can actually
/// use. Universally-equippable gear is excluded so everyone starts with
/// something of their own.
fn set_initial_equips(tables: &mut Tables, index: usize) {
    if index == 0 {
        return;
    }
    let bit = if index == SHAMAN_TEMPLATE {
        3
    } else {
        7 - index as u8
    };
    let mask = 1u8 << bit;

    let mut candidates: Vec<(i32, u8)> = tables
        .items
        .iter()
        .filter(|item| {
            item.equippable & mask != 0 && item.equippable != 0xFF && item_rank(item) > 0
        })
        .map(|item| (item_rank(item), item.index))
        .collect();
    candidates.sort_unstable();

    let pick = |kind: ItemKind| -> u8 {
        candidates
            .iter()
            .find(|&&(_, i)| tables.items[i as usize].kind == kind)
            .map(|&(_, i)| i)
            .unwrap_or(0)
    };
    let (weapon, shield, helmet, armor) = (
        pick(ItemKind::Weapon),
        pick(ItemKind::Shield),
        pick(ItemKind::Helmet),
        pick(ItemKind::Armor),
    );
    let character = &mut tables.characters[index];
    character.weapon = weapon;
    character.shield = shield;
    character.helmet = helmet;
    character.armor = armor;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rom::{Rom, MIN_ROM_SIZE};
    use crate::Session;

    fn seeded_tables() -> Tables {
        let mut tables = Tables::load(Rom::from_bytes(vec![0u8; MIN_ROM_SIZE])).unwrap();
        for (i, curve) in tables.curves.iter_mut().enumerate() {
            for gain in curve.gains.iter_mut() {
                gain.set(Stat::Hp, ((i + 1) % 10) as u8);
                gain.set(Stat::Strength, (i % 4) as u8);
            }
        }
        for (i, character) in tables.characters.iter_mut().enumerate() {
            character.name[..4].copy_from_slice(b"CHAR");
            character.level = 5 + 3 * i as u8;
            character.guts = 30;
            character.strength = 10;
            character.stamina = 10;
            character.agility = 10;
            character.wisdom = 10;
            character.luck = 10;
            character.max_hp = 50;
            character.max_ap = 20;
        }
        tables
    }

    #[test]
    fn curve_shuffle_permutes_whole_columns() {
        let mut session = Session::for_tests();
        let mut tables = seeded_tables();
        let before: Vec<u32> = (0..PLAYABLE_COUNT)
            .map(|i| tables.curves[i].value_at_level(Stat::Hp, 99))
            .collect();
        shuffle_curves(&mut session, &mut tables);
        let mut after: Vec<u32> = (0..PLAYABLE_COUNT)
            .map(|i| tables.curves[i].value_at_level(Stat::Hp, 99))
            .collect();
        let mut sorted_before = before;
        sorted_before.sort_unstable();
        after.sort_unstable();
        assert_eq!(sorted_before, after);
        // The shaman template's curve never joins the shuffle.
        assert_eq!(
            tables.curves[SHAMAN_TEMPLATE].value_at_level(Stat::Hp, 99),
            98 * 9
        );
    }

    #[test]
    fn curve_shuffle_runs_once_per_session() {
        let mut session = Session::for_tests();
        let mut tables = seeded_tables();
        shuffle_curves(&mut session, &mut tables);
        let snapshot: Vec<u32> = (0..PLAYABLE_COUNT)
            .map(|i| tables.curves[i].value_at_level(Stat::Strength, 99))
            .collect();
        shuffle_curves(&mut session, &mut tables);
        let again: Vec<u32> = (0..PLAYABLE_COUNT)
            .map(|i| tables.curves[i].value_at_level(Stat::Strength, 99))
            .collect();
        assert_eq!(snapshot, again);
    }

    #[test]
    fn initial_stats_stay_in_byte_range() {
        let mut session = Session::for_tests();
        let mut tables = seeded_tables();
        randomize_characters(&mut session, &mut tables).unwrap();
        for character in tables.characters.iter().take(PLAYABLE_COUNT) {
            assert!((1..=99).contains(&character.level));
            assert!(character.guts >= 1);
            for stat in CHAR_STAT_ORDER {
                let value = character.get_stat(stat);
                assert!((1..=0xFF).contains(&value), "{:?} = {}", stat, value);
            }
        }
    }

    #[test]
    fn shaman_template_only_shrinks() {
        let mut session = Session::for_tests();
        let mut tables = seeded_tables();
        randomize_characters(&mut session, &mut tables).unwrap();
        let template = &tables.characters[SHAMAN_TEMPLATE];
        for stat in CHAR_STAT_ORDER {
            let value = template.get_stat(stat);
            let original = if stat == Stat::Hp {
                50
            } else if stat == Stat::Ap {
                20
            } else {
                10
            };
            assert!((1..=original).contains(&value));
        }
    }

    #[test]
    fn gear_redraws_masks_from_the_late_table_pool() {
        let mut session = Session::for_tests();
        let mut tables = seeded_tables();
        let donors = [(0x60u8, 0x20u8), (0x61, 0x10), (0x62, 0x01)];
        for (i, mask) in donors {
            let item = &mut tables.items[i as usize];
            item.name[..5].copy_from_slice(b"SWORD");
            item.price = 300;
            item.item_type = 0x8A;
            item.equippable = mask;
            item.kind = ItemKind::classify(0x8A, i);
        }
        // Story gear below the floor never moves.
        tables.items[0x10].item_type = 0x8A;
        tables.items[0x10].equippable = 0x80;
        tables.items[0x10].kind = ItemKind::classify(0x8A, 0x10);

        mutate_equippable(&mut session, &mut tables);
        for (i, _) in donors {
            let mask = tables.items[i as usize].equippable;
            assert!([0x20, 0x10, 0x01].contains(&mask), "mask {:#X}", mask);
        }
        assert_eq!(tables.items[0x10].equippable, 0x80);
    }

    #[test]
    fn accessories_only_ever_gain_wearers() {
        let mut session = Session::for_tests();
        let mut tables = seeded_tables();
        tables.items[0x40].equippable = 0x40;
        tables.items[0x41].equippable = 0xFF;
        for _ in 0..50 {
            mutate_equippable(&mut session, &mut tables);
            assert_eq!(tables.items[0x40].equippable & 0x40, 0x40);
        }
        // A universal accessory either stays universal or narrows to real bits.
        assert!(tables.items[0x41].equippable != 0);
    }

    #[test]
    fn dragon_gear_keeps_its_owner() {
        let mut session = Session::for_tests();
        let mut tables = seeded_tables();
        let item = &mut tables.items[0x7B];
        item.item_type = 0x8D;
        item.equippable = 0x80;
        item.kind = ItemKind::classify(0x8D, 0x7B);
        // Give the weapon pool something to hand out.
        tables.items[0x70].item_type = 0x8A;
        tables.items[0x70].equippable = 0x01;
        tables.items[0x70].kind = ItemKind::classify(0x8A, 0x70);

        mutate_equippable(&mut session, &mut tables);
        assert_eq!(tables.items[0x7B].equippable, 0x80);
    }

    #[test]
    fn starting_gear_is_the_cheapest_usable_piece() {
        let mut session = Session::for_tests();
        let mut tables = seeded_tables();
        let mask = 1u8 << 6; // character 1
        for (i, price, item_type) in [(3u8, 500u16, 0x8A), (4, 100, 0x8A), (5, 80, 0x96)] {
            let item = &mut tables.items[i as usize];
            item.name[..4].copy_from_slice(b"GEAR");
            item.price = price;
            item.power = 5;
            item.item_type = item_type;
            item.equippable = mask;
            item.kind = ItemKind::classify(item_type, i);
        }
        randomize_equipment(&mut session, &mut tables).unwrap();
        let character = &tables.characters[1];
        assert_eq!(character.weapon, 4);
        assert_eq!(character.shield, 5);
        // No usable helmet exists, so the slot empties.
        assert_eq!(character.helmet, 0);
        // The hero keeps whatever he had.
        assert_eq!(tables.characters[0].weapon, 0);
    }
}
