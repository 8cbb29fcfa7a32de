use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;

use randomizer_core::{run, RandomizerSettings};

#[derive(Debug, Parser)]
#[command(name = "bof2-randomizer", version, about = "Breath of Fire II randomizer")]
struct Args {
    #[arg(long)]
    input: PathBuf,

    #[arg(long)]
    output: PathBuf,

    /// Run seed; derived from the clock when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Scales monster stats up and rewards down. 1.0 matches the original
    /// game's balance.
    #[arg(long, default_value_t = 1.0)]
    difficulty: f64,

    #[arg(long, default_value_t = true)]
    randomize_fusions: bool,

    #[arg(long, default_value_t = true)]
    randomize_treasure: bool,

    #[arg(long, default_value_t = true)]
    randomize_monsters: bool,

    #[arg(long, default_value_t = true)]
    randomize_shops: bool,

    #[arg(long, default_value_t = true)]
    randomize_equipment: bool,

    #[arg(long, default_value_t = true)]
    randomize_characters: bool,

    #[arg(long, default_value_t = true)]
    randomize_spells: bool,

    #[arg(long, default_value_t = false)]
    debug: bool,
}

fn main() {
    let args = Args::parse();

    let seed = args.seed.unwrap_or_else(clock_seed);
    println!("Using seed: {}", seed);

    let settings = RandomizerSettings {
        seed,
        difficulty: args.difficulty,
        randomize_fusions: args.randomize_fusions,
        randomize_treasure: args.randomize_treasure,
        randomize_monsters: args.randomize_monsters,
        randomize_shops: args.randomize_shops,
        randomize_equipment: args.randomize_equipment,
        randomize_characters: args.randomize_characters,
        randomize_spells: args.randomize_spells,
        debug: args.debug,
        input_path: args.input,
        output_path: args.output,
    };

    if let Err(err) = run(settings) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}

/// Ten-digit clock seed, easy to read back over the shoulder.
fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64 % 10_000_000_000)
        .unwrap_or(0)
}
