//! The spoiler catalogue written next to the output ROM: projected character
//! growth, learned spells, and the generated shaman compatibility grids.

use std::collections::BTreeSet;
use std::fmt::Write;

use crate::shaman::{ShamanTable, ELEMENTS, ELEMENT_COUNT};
use crate::tables::{Stat, Tables, COMBO_OWNER_COUNT};

const LEVEL_MILESTONES: [u8; 4] = [10, 20, 30, 50];

/// Learn-list filler entries are an engine quirk, not real spells.
const FILLER_PAIR: (u8, u8) = (1, 9);

pub fn render(tables: &Tables, shaman: Option<&ShamanTable>) -> String {
    let mut out = String::from("CHARACTERS\n");
    for index in 0..tables.characters.len() {
        out.push_str(&character_summary(tables, index));
        out.push('\n');
    }
    if let Some(shaman) = shaman {
        out.push('\n');
        for element in 0..ELEMENT_COUNT {
            out.push_str(&compatibility_grid(tables, shaman, element));
            out.push_str("\n\n");
        }
    }
    out.trim_end().to_string() + "\n"
}

/// Stats projected forward from the joining level along the level curve.
fn character_summary(tables: &Tables, index: usize) -> String {
    let character = &tables.characters[index];
    let curve = &tables.curves[index];
    let mut out = String::new();
    writeln!(out, "{}", character.display_name()).ok();

    let mut levels: Vec<u8> = LEVEL_MILESTONES.to_vec();
    if !levels.contains(&character.level) {
        levels.insert(0, character.level);
    }
    for level in levels {
        if level < character.level {
            continue;
        }
        let project = |stat: Stat| -> i64 {
            curve.value_at_level(stat, level) as i64
                - curve.value_at_level(stat, character.level) as i64
                + character.get_stat(stat) as i64
        };
        writeln!(
            out,
            "lv{:2} hp:{:3} ap:{:3} str:{:3} sta:{:3} agi:{:3} wis:{:3} luc:{:3}",
            level,
            project(Stat::Hp),
            project(Stat::Ap),
            project(Stat::Strength),
            project(Stat::Stamina),
            project(Stat::Agility),
            project(Stat::Wisdom),
            project(Stat::Luck),
        )
        .ok();
    }

    let initial: BTreeSet<String> = tables
        .initial_slots
        .iter()
        .filter(|slot| slot.char_id() == Some(index))
        .map(|slot| tables.spells[slot.value as usize].display_name())
        .filter(|name| !name.is_empty())
        .collect();
    if !initial.is_empty() {
        let names: Vec<String> = initial.into_iter().collect();
        writeln!(out, "Starts with {}", names.join(", ")).ok();
    }

    for &(level, spell) in &tables.learn_lists[index].pairs {
        if (level, spell) == FILLER_PAIR {
            continue;
        }
        writeln!(
            out,
            "lv{:2} {}",
            level,
            tables.spells[spell as usize].display_name()
        )
        .ok();
    }
    out
}

/// A five-star rating cell, dash-padded to fixed width.
fn stars(value: f64) -> String {
    let count = ((value * 5.0) as i64).clamp(0, 4) as usize;
    format!("{:-<5}", "*".repeat(count + 1))
}

fn compatibility_grid(tables: &Tables, shaman: &ShamanTable, element: usize) -> String {
    let mut out = format!("{} SHAMAN COMPATIBILITY\n", ELEMENTS[element].to_uppercase());
    let order = shaman.affinity_order(element);
    let tags: Vec<&str> = order
        .iter()
        .map(|&t| crate::shaman::AFFINITIES[t])
        .collect();
    out.push_str(&tags.join(" "));

    for chunk in (0..ELEMENT_COUNT).collect::<Vec<_>>().chunks(3) {
        out = out.trim_end().to_string();
        out.push('\n');
        for &other in chunk {
            if other == element {
                out.push_str(&format!("{:<5} N/A      ", ELEMENTS[other]));
                continue;
            }
            let value = shaman
                .element_compat(element, other)
                .unwrap_or_default();
            out.push_str(&format!("{:<5} {}    ", ELEMENTS[other], stars(value)));
        }
    }
    for chunk in (0..COMBO_OWNER_COUNT).collect::<Vec<_>>().chunks(4) {
        out = out.trim_end().to_string();
        out.push('\n');
        for &owner in chunk {
            let name = tables.characters[owner].display_name();
            let value = shaman.owner_compat(element, owner);
            out.push_str(&format!("{:<4} {}    ", name, stars(value)));
        }
    }
    out.trim_end().to_string()
}
