use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod catalogue;
mod characters;
mod fusion;
mod monsters;
mod rank;
mod rng;
mod rom;
mod shaman;
mod shops;
mod spells;
mod tables;
mod treasure;

use rng::Stream;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomizerSettings {
    pub seed: u64,
    pub difficulty: f64,
    pub randomize_fusions: bool,
    pub randomize_treasure: bool,
    pub randomize_monsters: bool,
    pub randomize_shops: bool,
    pub randomize_equipment: bool,
    pub randomize_characters: bool,
    pub randomize_spells: bool,
    pub debug: bool,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

#[derive(Debug, Error)]
pub enum RandomizerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invariant violated: {0}")]
    Invariant(String),
}

pub type Result<T> = std::result::Result<T, RandomizerError>;

/// Per-run state shared across the category passes: the random stream, the
/// difficulty knob, memoized rank bounds, and the diagnostic log.
pub(crate) struct Session {
    pub rng: Stream,
    pub difficulty: f64,
    pub monster_bounds: Option<[(f64, f64); 4]>,
    pub chest_memo: HashMap<u16, u8>,
    pub learn_shuffled: bool,
    pub curves_shuffled: bool,
    pub log: String,
}

impl Session {
    pub fn new(settings: &RandomizerSettings) -> Session {
        Session {
            rng: Stream::from_seed(settings.seed),
            difficulty: settings.difficulty,
            monster_bounds: None,
            chest_memo: HashMap::new(),
            learn_shuffled: false,
            curves_shuffled: false,
            log: String::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests() -> Session {
        Session {
            rng: Stream::from_seed(0),
            difficulty: 1.0,
            monster_bounds: None,
            chest_memo: HashMap::new(),
            learn_shuffled: false,
            curves_shuffled: false,
            log: String::new(),
        }
    }
}

pub fn run(settings: RandomizerSettings) -> Result<()> {
    let rom = rom::Rom::load(&settings.input_path)?;
    let mut tables = tables::Tables::load(rom)?;
    let spell_levels = rank::SpellLevels::parse(
        include_str!("../data/spell_levels.txt"),
        tables::SPELL_COUNT,
    )?;

    let mut session = Session::new(&settings);
    let mut shaman = None;

    // Each category pass restarts the stream from the run seed, so toggling
    // one category never disturbs another category's results.
    if settings.randomize_fusions {
        session.rng.reseed(settings.seed);
        shaman = Some(fusion::randomize_fusions(&mut session, &mut tables)?);
    }
    if settings.randomize_treasure {
        session.rng.reseed(settings.seed);
        treasure::randomize_treasure(&mut session, &mut tables)?;
    }
    if settings.randomize_monsters {
        session.rng.reseed(settings.seed);
        monsters::randomize_monsters(&mut session, &mut tables)?;
    }
    if settings.randomize_shops {
        session.rng.reseed(settings.seed);
        shops::randomize_shops(&mut session, &mut tables)?;
    }
    if settings.randomize_equipment {
        session.rng.reseed(settings.seed);
        characters::randomize_equipment(&mut session, &mut tables)?;
    }
    if settings.randomize_characters {
        session.rng.reseed(settings.seed);
        characters::randomize_characters(&mut session, &mut tables)?;
    }
    if settings.randomize_spells {
        session.rng.reseed(settings.seed);
        spells::randomize_spells(&mut session, &mut tables, &spell_levels)?;
    }

    tables.rom.lower_encounter_rate();

    let mut log = std::mem::take(&mut session.log);
    tables.persist(&mut log);
    tables
        .rom
        .rewrite_title(&format!("BOF2 RND {}", settings.seed));
    tables.rom.rewrite_checksum();
    tables.rom.save(&settings.output_path)?;

    let mut catalogue = catalogue::render(&tables, shaman.as_ref());
    if !log.is_empty() {
        catalogue.push('\n');
        catalogue.push_str(&log);
    }
    fs::write(settings.output_path.with_extension("txt"), catalogue)?;

    if settings.debug {
        let json = serde_json::to_string_pretty(&settings)
            .map_err(|e| RandomizerError::Config(format!("cannot serialize settings: {}", e)))?;
        fs::write(settings.output_path.with_extension("json"), json)?;
    }

    Ok(())
}
