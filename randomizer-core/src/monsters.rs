//! Monster stat mutation and the ranked-neighbor shuffles.

use crate::rank::monster_rank;
use crate::tables::{Monster, Tables, Zone};
use crate::{Result, Session};

const MAX_HP: i64 = 65535;
const MAX_AP: i64 = 65535;
const MAX_ATP: i64 = 511;
const MAX_DFP: i64 = 511;
const MAX_AGL: i64 = 511;
const MAX_MS: i64 = 7;
const MAX_LUCK: i64 = 255;
const MAX_XP: i64 = 65535;
const MAX_GP: i64 = 65535;

/// One late-game boss keeps a fixed attack value so the difficulty spike it
/// guards stays in place.
const PINNED_BOSS_INDEX: usize = 0x80;
const PINNED_BOSS_ATP: u16 = 400;

pub fn randomize_monsters(session: &mut Session, tables: &mut Tables) -> Result<()> {
    let ranked = ranked_indices(session, &tables.monsters);
    let mut position = vec![0usize; tables.monsters.len()];
    for (pos, &index) in ranked.iter().enumerate() {
        position[index] = pos;
    }

    let count = tables.monsters.len();
    for index in 0..count {
        let modifactor = if count > 1 {
            let fraction = position[index] as f64 / (count - 1) as f64;
            fraction.powi(2) / 2.0 * session.difficulty.sqrt()
        } else {
            0.0
        };
        mutate_stats(session, &mut tables.monsters[index], modifactor);
    }

    shuffle_ai(session, &mut tables.monsters, &ranked);
    shuffle_stats(session, &mut tables.monsters, &ranked);

    tables.monsters[PINNED_BOSS_INDEX].atp = PINNED_BOSS_ATP;

    shuffle_zones(session, &mut tables.zones);
    Ok(())
}

/// Rebalances each encounter zone's formation slots: every formation the
/// zone already knows stays reachable, the remaining slots re-weight by
/// random picks from that same set.
fn shuffle_zones(session: &mut Session, zones: &mut [Zone]) {
    for zone in zones {
        let mut distinct: Vec<u8> = zone.formation_indexes.to_vec();
        distinct.sort_unstable();
        distinct.dedup();
        let mut slots = distinct.clone();
        while slots.len() < zone.formation_indexes.len() {
            slots.push(*session.rng.pick(&distinct));
        }
        session.rng.shuffle(&mut slots);
        zone.formation_indexes.copy_from_slice(&slots);
    }
}

/// Rank-ascending visit order, ties broken by table index.
fn ranked_indices(session: &mut Session, monsters: &[Monster]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..monsters.len()).collect();
    let ranks: Vec<i32> = indices
        .iter()
        .map(|&i| monster_rank(session, monsters, i))
        .collect();
    indices.sort_by_key(|&i| (ranks[i], i));
    indices
}

fn mutate_stats(session: &mut Session, monster: &mut Monster, modifactor: f64) {
    // Rewards scale down as difficulty rises, before any jitter.
    let reward_scale = 4.0 / f64::powf(2.0, session.difficulty);
    let xp = ((monster.xp as f64 * reward_scale).round() as i64).min(MAX_XP);
    let gp = ((monster.gp as f64 * reward_scale).round() as i64).min(MAX_GP);
    monster.xp = xp as u16;
    monster.gp = gp as u16;

    // Alphabetical attribute order keeps the draw sequence stable.
    monster.agl = mutate_stat(session, monster.agl as i64, MAX_AGL, modifactor) as u16;
    monster.ap = mutate_stat(session, monster.ap as i64, MAX_AP, modifactor) as u16;
    monster.atp = mutate_stat(session, monster.atp as i64, MAX_ATP, modifactor) as u16;
    monster.dfp = mutate_stat(session, monster.dfp as i64, MAX_DFP, modifactor) as u16;
    monster.gp = mutate_stat(session, monster.gp as i64, MAX_GP, modifactor) as u16;
    monster.hp = mutate_stat(session, monster.hp as i64, MAX_HP, modifactor) as u16;
    monster.luck = mutate_stat(session, monster.luck as i64, MAX_LUCK, modifactor) as u8;
    monster.ms = mutate_stat(session, monster.ms as i64, MAX_MS, modifactor) as u8;
    monster.xp = mutate_stat(session, monster.xp as i64, MAX_XP, modifactor) as u16;
}

fn mutate_stat(session: &mut Session, value: i64, max: i64, modifactor: f64) -> i64 {
    let minimum = value.min(1);
    let scaled = if modifactor > 0.0 {
        (value as f64 * (1.0 + modifactor)).round() as i64
    } else {
        value
    };
    session.rng.jitter(scaled, minimum, max)
}

/// Coin-flip swap of behavior between adjacent monsters in rank order. The
/// AP pool travels with the script so spellcasters stay funded.
fn shuffle_ai(session: &mut Session, monsters: &mut [Monster], ranked: &[usize]) {
    let order: Vec<usize> = ranked
        .iter()
        .copied()
        .filter(|&i| !monsters[i].boss)
        .collect();
    for pair in order.windows(2) {
        if session.rng.coin() {
            let (a, b) = pair_mut(monsters, pair[0], pair[1]);
            std::mem::swap(&mut a.ai, &mut b.ai);
            std::mem::swap(&mut a.ap, &mut b.ap);
        }
    }
}

/// Per-attribute coin-flip swaps between adjacent ranked monsters. Defense
/// drags hit points along and a treasure set drags its class.
fn shuffle_stats(session: &mut Session, monsters: &mut [Monster], ranked: &[usize]) {
    let order: Vec<usize> = ranked
        .iter()
        .copied()
        .filter(|&i| !monsters[i].boss)
        .collect();
    for pair in order.windows(2) {
        for attr in 0..6 {
            if !session.rng.coin() {
                continue;
            }
            let (a, b) = pair_mut(monsters, pair[0], pair[1]);
            match attr {
                0 => std::mem::swap(&mut a.atp, &mut b.atp),
                1 => {
                    std::mem::swap(&mut a.hp, &mut b.hp);
                    std::mem::swap(&mut a.dfp, &mut b.dfp);
                }
                2 => std::mem::swap(&mut a.agl, &mut b.agl),
                3 => std::mem::swap(&mut a.ms, &mut b.ms),
                4 => std::mem::swap(&mut a.luck, &mut b.luck),
                _ => {
                    std::mem::swap(&mut a.treasure_class, &mut b.treasure_class);
                    std::mem::swap(&mut a.treasure_set, &mut b.treasure_set);
                }
            }
        }
    }
}

fn pair_mut(monsters: &mut [Monster], i: usize, j: usize) -> (&mut Monster, &mut Monster) {
    debug_assert_ne!(i, j);
    if i < j {
        let (left, right) = monsters.split_at_mut(j);
        (&mut left[i], &mut right[0])
    } else {
        let (left, right) = monsters.split_at_mut(i);
        (&mut right[0], &mut left[j])
    }
}
