//! Shaman fusion assignment: every (owner, combination) slot competes for the
//! fixed pool of fusion records, the weakest entries are nullified, and the
//! survivors get their stat boosts and transformation variant written out.

use crate::shaman::{combo_elements, BoostTable, ShamanTable, COMBO_COUNT};
use crate::tables::{Tables, COMBO_OWNER_COUNT};
use crate::{RandomizerError, Result, Session};

/// Transformation targets rolled on a dischordant fusion.
const CHAOS_VARIANTS: [u8; 10] = [0x00, 0x02, 0x04, 0x06, 0x08, 0x0A, 0x0C, 0x0E, 0x10, 0x12];

/// Transformation targets rolled on a harmonious fusion.
const SUPER_VARIANTS: [u8; 9] = [0x16, 0x18, 0x1A, 0x1C, 0x1E, 0x20, 0x22, 0x24, 0x26];

/// Regenerates the compatibility tables and reassigns the whole fusion pool.
/// Returns the generated [`ShamanTable`] so the run catalogue can print it.
pub fn randomize_fusions(session: &mut Session, tables: &mut Tables) -> Result<ShamanTable> {
    let shaman = ShamanTable::generate(&mut session.rng);
    let mut boosts = BoostTable::new();

    let mut entries: Vec<(usize, usize, f64)> =
        Vec::with_capacity(COMBO_OWNER_COUNT * COMBO_COUNT);
    for owner in 0..COMBO_OWNER_COUNT {
        for combo in 0..COMBO_COUNT {
            let total = boosts.total(&shaman, owner, combo, &mut session.rng);
            entries.push((owner, combo, total));
        }
    }
    entries.sort_by(|a, b| a.2.total_cmp(&b.2));

    let pool_size = tables.fusions.len();
    if entries.len() < pool_size {
        return Err(RandomizerError::Invariant(format!(
            "{} fusion records but only {} slots to hold them",
            pool_size,
            entries.len()
        )));
    }

    // Weakest entries lose their slot entirely.
    let cut = entries.len() - pool_size;
    for &(owner, combo, _) in &entries[..cut] {
        tables.combos[owner].fusions[combo] = 0;
    }

    let mut survivors: Vec<(usize, usize)> = entries[cut..]
        .iter()
        .map(|&(owner, combo, _)| (owner, combo))
        .collect();
    survivors.sort_unstable();

    for (fusion_index, &(owner, combo)) in survivors.iter().enumerate() {
        set_fusion(session, tables, &shaman, &mut boosts, fusion_index, owner, combo);
    }

    let assigned: usize = tables
        .combos
        .iter()
        .map(|row| row.fusions.iter().filter(|&&f| f != 0).count())
        .sum();
    if assigned != pool_size {
        return Err(RandomizerError::Invariant(format!(
            "fusion assignment filled {} slots, expected {}",
            assigned, pool_size
        )));
    }

    Ok(shaman)
}

/// Writes one fusion record for its winning (owner, combination) slot.
fn set_fusion(
    session: &mut Session,
    tables: &mut Tables,
    shaman: &ShamanTable,
    boosts: &mut BoostTable,
    fusion_index: usize,
    owner: usize,
    combo: usize,
) {
    tables.combos[owner].fusions[combo] = fusion_index as u8 + 1;

    let values = boosts.boosts(shaman, owner, combo, &mut session.rng);
    let fusion = &mut tables.fusions[fusion_index];
    fusion.off = (values[0] * 255.0).round() as u8;
    fusion.def = (values[1] * 255.0).round() as u8;
    fusion.vig = (values[2] * 255.0).round() as u8;
    fusion.wis = (values[3] * 255.0).round() as u8;
    fusion.map = (values[4] * 255.0).round() as u8;
    // Luck never carries into a fusion.
    fusion.luk = 0;

    let comps = shaman.compatibilities(owner, combo);
    let best = comps.iter().copied().fold(f64::MIN, f64::max);
    let worst = comps.iter().copied().fold(f64::MAX, f64::min);
    let mut harmony = best.powi(4) * 50.0;
    let mut dischord = (1.0 - worst).powi(4) * 25.0;
    if combo_elements(combo).1.is_none() {
        harmony /= 2.0;
        dischord /= 2.0;
    }

    // The hero's fusions never change his sprite.
    fusion.character = if owner == 0 {
        0
    } else if (session.rng.uniform_int(1, 100) as f64) <= harmony {
        *session.rng.pick(&SUPER_VARIANTS)
    } else if (session.rng.uniform_int(1, 100) as f64) <= dischord {
        *session.rng.pick(&CHAOS_VARIANTS)
    } else {
        owner as u8 * 2
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rom::{Rom, MIN_ROM_SIZE};
    use crate::tables::FUSION_COUNT;
    use crate::Session;

    fn blank_tables() -> Tables {
        Tables::load(Rom::from_bytes(vec![0u8; MIN_ROM_SIZE])).unwrap()
    }

    #[test]
    fn pool_is_assigned_exactly_once() {
        let mut session = Session::for_tests();
        let mut tables = blank_tables();
        randomize_fusions(&mut session, &mut tables).unwrap();

        let mut refs: Vec<u8> = tables
            .combos
            .iter()
            .flat_map(|row| row.fusions.iter().copied())
            .filter(|&f| f != 0)
            .collect();
        refs.sort_unstable();
        let expected: Vec<u8> = (1..=FUSION_COUNT as u8).collect();
        assert_eq!(refs, expected);
    }

    #[test]
    fn weak_slots_are_nullified() {
        let mut session = Session::for_tests();
        let mut tables = blank_tables();
        randomize_fusions(&mut session, &mut tables).unwrap();

        let empty: usize = tables
            .combos
            .iter()
            .map(|row| row.fusions.iter().filter(|&&f| f == 0).count())
            .sum();
        assert_eq!(empty, COMBO_OWNER_COUNT * COMBO_COUNT - FUSION_COUNT);
    }

    #[test]
    fn assigned_fusions_have_no_luck_and_valid_variants() {
        let mut session = Session::for_tests();
        let mut tables = blank_tables();
        randomize_fusions(&mut session, &mut tables).unwrap();

        for (owner, row) in tables.combos.iter().enumerate() {
            for &slot in &row.fusions {
                if slot == 0 {
                    continue;
                }
                let fusion = &tables.fusions[slot as usize - 1];
                assert_eq!(fusion.luk, 0);
                if owner == 0 {
                    assert_eq!(fusion.character, 0);
                } else {
                    let base = owner as u8 * 2;
                    assert!(
                        fusion.character == base
                            || SUPER_VARIANTS.contains(&fusion.character)
                            || CHAOS_VARIANTS.contains(&fusion.character),
                        "owner {} got variant {:#x}",
                        owner,
                        fusion.character
                    );
                }
            }
        }
    }

    #[test]
    fn assignment_is_deterministic_per_seed() {
        let run = || {
            let mut session = Session::for_tests();
            let mut tables = blank_tables();
            randomize_fusions(&mut session, &mut tables).unwrap();
            tables
                .combos
                .iter()
                .map(|row| row.fusions)
                .collect::<Vec<_>>()
        };
        assert_eq!(run(), run());
    }
}
