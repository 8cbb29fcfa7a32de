//! Shop pass: item price mutation plus inventory substitution.

use crate::rank::{similar_item, KindFilter};
use crate::tables::{Item, Tables};
use crate::{RandomizerError, Result, Session};

const BOOSTER_PRICE: u16 = 4000;
const PRICE_FLOOR: u16 = 14;
const MAX_PRICE: i64 = 65000;

const SUBSTITUTION_RETRIES: usize = 1000;

pub fn randomize_shops(session: &mut Session, tables: &mut Tables) -> Result<()> {
    for index in 0..tables.items.len() {
        mutate_price(session, &mut tables.items[index]);
    }
    for index in 0..tables.shops.len() {
        mutate_shop(session, tables, index)?;
    }
    Ok(())
}

/// Jitters a price and rounds it to a half-step of its magnitude, so shops
/// keep the familiar 250/1500-style figures. Stat boosters are repriced flat
/// and bargain-bin items never move.
fn mutate_price(session: &mut Session, item: &mut Item) {
    if item.is_booster() {
        item.price = BOOSTER_PRICE;
    }
    if item.price <= PRICE_FLOOR {
        return;
    }
    let price = session.rng.jitter(item.price as i64, 0, MAX_PRICE);
    let rounder: u32 = if price < 100 {
        1
    } else if price < 1000 {
        2
    } else {
        3
    };
    let step = 10f64.powi(rounder as i32);
    let price = ((price as f64 * 2.0 / step).round() * step / 2.0) as i64;
    item.price = price.clamp(0, MAX_PRICE) as u16;
}

/// Rebuilds one inventory: every distinct entry is substituted without
/// duplicates, then the original length is restored by repeating picks.
fn mutate_shop(session: &mut Session, tables: &mut Tables, index: usize) -> Result<()> {
    let contents = tables.shops[index].contents.clone();
    if contents.is_empty() {
        return Ok(());
    }
    let mut distinct: Vec<u8> = contents.clone();
    distinct.sort_unstable();
    distinct.dedup();

    let mut new_contents: Vec<u8> = Vec::with_capacity(contents.len());
    for source in distinct {
        let mut attempts = 0;
        loop {
            let pick = similar_item(
                &tables.items,
                source,
                KindFilter::SimilarKind,
                &mut session.rng,
            )?;
            if !new_contents.contains(&pick) {
                new_contents.push(pick);
                break;
            }
            attempts += 1;
            if attempts >= SUBSTITUTION_RETRIES {
                return Err(RandomizerError::Invariant(format!(
                    "shop {} cannot stock enough distinct items",
                    index
                )));
            }
        }
    }
    while new_contents.len() < contents.len() {
        let repeat = *session.rng.pick(&new_contents);
        new_contents.push(repeat);
    }
    tables.shops[index].contents = new_contents;
    Ok(())
}
