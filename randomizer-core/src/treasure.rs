//! Treasure randomization: drop tables, field chests, and the treasure
//! references monsters carry.

use crate::rank::{drop_rank, item_rank, similar_drop, similar_item, KindFilter};
use crate::tables::Tables;
use crate::{Result, Session};

const MAX_TREASURE_CLASS: i64 = 6;

pub fn randomize_treasure(session: &mut Session, tables: &mut Tables) -> Result<()> {
    for index in 0..tables.drops.len() {
        mutate_drop(session, tables, index)?;
    }
    for index in 0..tables.chests.len() {
        mutate_chest(session, tables, index)?;
    }
    for index in 0..tables.monsters.len() {
        mutate_monster_treasure(session, tables, index)?;
    }
    Ok(())
}

/// Replaces both halves of a drop pair. When the source pair was degenerate
/// (common == rare) the lesser pick becomes the common drop.
fn mutate_drop(session: &mut Session, tables: &mut Tables, index: usize) -> Result<()> {
    let (common, rare) = {
        let drop = &tables.drops[index];
        (drop.common, drop.rare)
    };
    let mut new_common = similar_item(&tables.items, common, KindFilter::Any, &mut session.rng)?;
    let mut new_rare = similar_item(&tables.items, rare, KindFilter::Any, &mut session.rng)?;
    if common == rare {
        let key = |i: u8| (item_rank(&tables.items[i as usize]), i);
        if key(new_common) > key(new_rare) {
            std::mem::swap(&mut new_common, &mut new_rare);
        }
    }
    let drop = &mut tables.drops[index];
    drop.common = new_common;
    drop.rare = new_rare;
    Ok(())
}

/// Chests at the same map address always hold the same replacement, so one
/// pick per address is memoized for the run.
fn mutate_chest(session: &mut Session, tables: &mut Tables, index: usize) -> Result<()> {
    let (addr, contents) = {
        let chest = &tables.chests[index];
        (chest.addr, chest.contents)
    };
    if let Some(&shared) = session.chest_memo.get(&addr) {
        tables.chests[index].contents = shared;
        return Ok(());
    }
    let new_contents = similar_item(
        &tables.items,
        contents,
        KindFilter::SimilarKind,
        &mut session.rng,
    )?;
    session.chest_memo.insert(addr, new_contents);
    tables.chests[index].contents = new_contents;
    Ok(())
}

fn mutate_monster_treasure(
    session: &mut Session,
    tables: &mut Tables,
    index: usize,
) -> Result<()> {
    let set = tables.monsters[index].treasure_set;
    if drop_rank(&tables.drops[set as usize], &tables.items) < 0 {
        return Ok(());
    }
    let new_set = similar_drop(&tables.drops, &tables.items, set, &mut session.rng)?;
    let monster = &mut tables.monsters[index];
    monster.treasure_set = new_set;
    monster.treasure_class = session
        .rng
        .jitter(monster.treasure_class as i64, 0, MAX_TREASURE_CLASS)
        as u8;
    Ok(())
}
