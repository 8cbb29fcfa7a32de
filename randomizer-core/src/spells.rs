//! Learn-list randomization and the initially-known-spell fixup.

use crate::rank::{similar_spell, SpellLevels};
use crate::tables::{Tables, CHARACTER_COUNT};
use crate::{RandomizerError, Result, Session};

/// Field warp spells: always free, always granted to the hero.
pub const WARP_SPELLS: [u8; 3] = [0x1E, 0x1F, 0x20];

/// Characters that skip their first N learn entries in-game; padding the
/// lists with throwaway pairs keeps the real spells reachable.
const SPELL_SKIPS: [(usize, usize); 6] = [(2, 2), (4, 4), (5, 1), (6, 1), (7, 7), (8, 15)];
const SKIP_FILLER: (u8, u8) = (0x01, 0x09);

const SUBSTITUTION_RETRIES: usize = 1000;

pub fn randomize_spells(
    session: &mut Session,
    tables: &mut Tables,
    levels: &SpellLevels,
) -> Result<()> {
    shuffle_learn_lists(session, tables);
    for index in 0..tables.learn_lists.len() {
        mutate_learn_list(session, tables, levels, index)?;
    }
    fix_initial_spells(session, tables)?;
    set_warps_free(tables);
    Ok(())
}

/// One-time whole-list permutation across every character except the hero.
fn shuffle_learn_lists(session: &mut Session, tables: &mut Tables) {
    if session.learn_shuffled {
        return;
    }
    session.learn_shuffled = true;
    let mut donors: Vec<Vec<(u8, u8)>> = tables
        .learn_lists
        .iter()
        .skip(1)
        .map(|list| list.pairs.clone())
        .collect();
    session.rng.shuffle(&mut donors);
    for (list, pairs) in tables.learn_lists.iter_mut().skip(1).zip(donors) {
        list.pairs = pairs;
    }
}

fn mutate_learn_list(
    session: &mut Session,
    tables: &mut Tables,
    levels: &SpellLevels,
    index: usize,
) -> Result<()> {
    let mut pairs = tables.learn_lists[index].pairs.clone();
    if pairs.is_empty() {
        return Ok(());
    }

    let mut chosen: Vec<u8> = Vec::with_capacity(pairs.len());
    for entry in pairs.iter_mut() {
        let mut attempts = 0;
        loop {
            let candidate = similar_spell(&tables.spells, levels, entry.1, &mut session.rng)?;
            if !WARP_SPELLS.contains(&candidate) && !chosen.contains(&candidate) {
                entry.1 = candidate;
                chosen.push(candidate);
                break;
            }
            attempts += 1;
            if attempts >= SUBSTITUTION_RETRIES {
                return Err(RandomizerError::Invariant(format!(
                    "learn list {} cannot fill {} distinct spells",
                    index,
                    pairs.len()
                )));
            }
        }
    }

    // Placeholder level-1 entries respawn anywhere up to the first real one.
    if let Some(first_real) = pairs.iter().map(|&(l, _)| l).filter(|&l| l > 1).min() {
        for entry in pairs.iter_mut() {
            if entry.0 <= 1 {
                entry.0 = session.rng.uniform_int(1, first_real as i64) as u8;
            }
        }
    }
    for entry in pairs.iter_mut() {
        entry.0 = session.rng.jitter(entry.0 as i64, 1, 99) as u8;
    }
    repair_duplicate_levels(&mut pairs)?;

    let list = &mut tables.learn_lists[index];
    list.pairs = pairs;
    list.sort_pairs();
    Ok(())
}

/// Bumps colliding learn levels upward until every level above 1 is unique.
/// Level-1 entries may repeat; the game treats them as already known.
fn repair_duplicate_levels(pairs: &mut [(u8, u8)]) -> Result<()> {
    for i in 0..pairs.len() {
        while pairs[i].0 > 1 && pairs.iter().filter(|&&(l, _)| l == pairs[i].0).count() > 1 {
            if pairs[i].0 == u8::MAX {
                return Err(RandomizerError::Invariant(
                    "learn level collision cannot be repaired".to_string(),
                ));
            }
            pairs[i].0 += 1;
        }
    }
    Ok(())
}

/// Rebuilds the initially-known-spell slots from whatever each character
/// would already know at their joining level, with the hero's warp spells
/// claiming the first slots. Consumed pairs leave the learn lists; entries
/// that found no slot are relearned at the nearest later free level.
pub fn fix_initial_spells(session: &mut Session, tables: &mut Tables) -> Result<()> {
    let mut to_make: Vec<(usize, u8, u8)> = Vec::new();
    for list in &tables.learn_lists {
        let joining_level = tables.characters[list.index as usize].level;
        for &(level, spell) in &list.pairs {
            if level <= joining_level {
                to_make.push((list.index as usize, level, spell));
            }
        }
    }
    session.rng.shuffle(&mut to_make);
    // Stack order: the last push pops first.
    for &warp in &WARP_SPELLS {
        to_make.push((0, 0, warp));
    }

    let mut spares: Vec<usize> = tables
        .initial_slots
        .iter()
        .enumerate()
        .filter(|(_, slot)| slot.is_learned_spell())
        .map(|(i, _)| i)
        .collect();
    spares.sort_by_key(|&i| tables.initial_slots[i].addr);

    let mut slot_counter = [0u16; CHARACTER_COUNT];
    for &spare in &spares {
        let Some((char_id, _, spell)) = to_make.pop() else {
            break;
        };
        let slot = &mut tables.initial_slots[spare];
        slot.value = spell;
        slot.set_char(char_id);
        slot.set_slot(slot_counter[char_id]);
        slot_counter[char_id] += 1;
    }

    for list in tables.learn_lists.iter_mut() {
        let joining_level = tables.characters[list.index as usize].level;
        list.pairs.retain(|&(level, _)| level > joining_level);
    }

    for (char_id, level, spell) in to_make {
        let joining_level = tables.characters[char_id].level;
        let list = &mut tables.learn_lists[char_id];
        let mut level = level;
        loop {
            if level == u8::MAX {
                return Err(RandomizerError::Invariant(format!(
                    "no free learn level left for spell {:#x}",
                    spell
                )));
            }
            level += 1;
            if level > joining_level && !list.pairs.iter().any(|&(l, _)| l == level) {
                break;
            }
        }
        if let Some(entry) = list.pairs.iter_mut().find(|(_, s)| *s == spell) {
            entry.0 = level;
        } else {
            list.pairs.push((level, spell));
        }
        list.sort_pairs();
    }

    for (char_id, count) in SPELL_SKIPS {
        let list = &mut tables.learn_lists[char_id];
        for _ in 0..count {
            list.pairs.push(SKIP_FILLER);
        }
        list.sort_pairs();
    }
    Ok(())
}

pub fn set_warps_free(tables: &mut Tables) {
    for &index in &WARP_SPELLS {
        tables.spells[index as usize].cost = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rom::{Rom, MIN_ROM_SIZE};
    use crate::tables::SPELL_COUNT;
    use crate::Session;

    fn blank_tables() -> Tables {
        Tables::load(Rom::from_bytes(vec![0u8; MIN_ROM_SIZE])).unwrap()
    }

    fn flat_levels() -> SpellLevels {
        let text: String = (0..SPELL_COUNT)
            .map(|i| format!("{:#04x} {} Spell{}\n", i, i + 1, i))
            .collect();
        SpellLevels::parse(&text, SPELL_COUNT).unwrap()
    }

    #[test]
    fn duplicate_levels_are_bumped_until_unique() {
        let mut pairs = vec![(5, 0x0A), (5, 0x0B), (12, 0x0C), (1, 0x0D), (1, 0x0E)];
        repair_duplicate_levels(&mut pairs).unwrap();
        let mut real: Vec<u8> = pairs.iter().map(|&(l, _)| l).filter(|&l| l > 1).collect();
        real.sort_unstable();
        real.dedup();
        assert_eq!(real.len(), 3);
        // Level-1 placeholders are left alone.
        assert_eq!(pairs.iter().filter(|&&(l, _)| l == 1).count(), 2);
    }

    #[test]
    fn mutated_lists_hold_distinct_legal_spells() {
        let mut session = Session::for_tests();
        let mut tables = blank_tables();
        let levels = flat_levels();
        tables.learn_lists[3].pairs = vec![(1, 0x05), (8, 0x0A), (20, 0x10), (44, 0x22)];

        mutate_learn_list(&mut session, &mut tables, &levels, 3).unwrap();

        let pairs = &tables.learn_lists[3].pairs;
        assert_eq!(pairs.len(), 4);
        let mut spells: Vec<u8> = pairs.iter().map(|&(_, s)| s).collect();
        spells.sort_unstable();
        spells.dedup();
        assert_eq!(spells.len(), 4);
        for &(level, spell) in pairs {
            assert!((1..=99).contains(&level));
            assert!(!WARP_SPELLS.contains(&spell));
        }
        assert!(pairs.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[test]
    fn list_shuffle_spares_the_hero() {
        let mut session = Session::for_tests();
        let mut tables = blank_tables();
        for (i, list) in tables.learn_lists.iter_mut().enumerate() {
            list.pairs = vec![(10, i as u8)];
        }
        shuffle_learn_lists(&mut session, &mut tables);

        assert_eq!(tables.learn_lists[0].pairs, vec![(10, 0)]);
        let mut others: Vec<u8> = tables.learn_lists[1..]
            .iter()
            .map(|l| l.pairs[0].1)
            .collect();
        others.sort_unstable();
        assert_eq!(others, (1..=8).collect::<Vec<u8>>());
        // Second call is a no-op.
        let snapshot: Vec<_> = tables.learn_lists.iter().map(|l| l.pairs.clone()).collect();
        shuffle_learn_lists(&mut session, &mut tables);
        let after: Vec<_> = tables.learn_lists.iter().map(|l| l.pairs.clone()).collect();
        assert_eq!(snapshot, after);
    }

    #[test]
    fn initial_slots_get_warps_first_and_lists_drop_known_pairs() {
        let mut session = Session::for_tests();
        let mut tables = blank_tables();
        tables.characters[0].level = 10;
        tables.learn_lists[0].pairs = vec![(5, 0x05), (12, 0x06)];
        for k in 0..4 {
            tables.initial_slots[k].addr = 0x5420 + k as u16;
        }

        fix_initial_spells(&mut session, &mut tables).unwrap();

        // Pop order: the three warps, then the one known pair.
        let values: Vec<u8> = (0..4).map(|k| tables.initial_slots[k].value).collect();
        assert_eq!(&values[..3], &[0x20, 0x1F, 0x1E]);
        assert_eq!(values[3], 0x05);
        for k in 0..4 {
            assert!(tables.initial_slots[k].is_learned_spell());
            assert_eq!(tables.initial_slots[k].char_id(), Some(0));
        }

        let pairs = &tables.learn_lists[0].pairs;
        assert!(pairs.iter().all(|&(l, _)| l > 10));
        assert!(pairs.iter().any(|&(_, s)| s == 0x06));
    }

    #[test]
    fn skipped_characters_get_filler_pairs() {
        let mut session = Session::for_tests();
        let mut tables = blank_tables();
        fix_initial_spells(&mut session, &mut tables).unwrap();
        for (char_id, count) in SPELL_SKIPS {
            let fillers = tables.learn_lists[char_id]
                .pairs
                .iter()
                .filter(|&&p| p == SKIP_FILLER)
                .count();
            assert_eq!(fillers, count, "character {}", char_id);
        }
    }

    #[test]
    fn warps_cost_nothing() {
        let mut tables = blank_tables();
        for &w in &WARP_SPELLS {
            tables.spells[w as usize].cost = 9;
        }
        set_warps_free(&mut tables);
        for &w in &WARP_SPELLS {
            assert_eq!(tables.spells[w as usize].cost, 0);
        }
    }
}
