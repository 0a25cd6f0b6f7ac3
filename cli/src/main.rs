use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use jigsaw_core::codec::{decode_record, encode_record};
use jigsaw_core::{
    grid_choice_label, GameRecord, Location, Piece, Puzzle, PuzzleConfig, PuzzleRecord, Session,
    Side,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod bot;

#[derive(Parser)]
#[command(name = "jigsaw-cli", version, about = "Tools for the jigsaw assembly engine")]
struct Cli {
    /// TOML file with puzzle settings; flags override its fields.
    #[arg(long, global = true, env = "JIGSAW_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the piece counts offered for an image size.
    Catalog {
        #[command(flatten)]
        image: ImageArgs,
        #[arg(long)]
        max_pieces: Option<u32>,
    },
    /// Let the solver bot play a puzzle to the end.
    Play {
        #[command(flatten)]
        game: GameArgs,
        #[command(flatten)]
        bot: bot::BotArgs,
        /// Write autosaves here; the game record goes to a `.game.toml` file
        /// beside it.
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Play a few moves, write the encoded record and game record, then load
    /// both back.
    Snapshot {
        #[command(flatten)]
        game: GameArgs,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 20)]
        moves: u32,
    },
}

#[derive(clap::Args, Clone, Copy, Debug)]
struct ImageArgs {
    #[arg(long, env = "JIGSAW_IMAGE_WIDTH", default_value_t = 1024)]
    width: u32,
    #[arg(long, env = "JIGSAW_IMAGE_HEIGHT", default_value_t = 768)]
    height: u32,
}

#[derive(clap::Args, Clone, Copy, Debug)]
struct GameArgs {
    #[command(flatten)]
    image: ImageArgs,
    /// Piece count; defaults to the offered count closest to 100.
    #[arg(long)]
    pieces: Option<u32>,
    #[arg(long, env = "JIGSAW_ROTATION_STEPS")]
    rotation_steps: Option<u32>,
    #[arg(long, env = "JIGSAW_SNAP_STRENGTH")]
    snap_strength: Option<u32>,
    #[arg(long)]
    max_pieces: Option<u32>,
    #[arg(long, env = "JIGSAW_SEED")]
    seed: Option<u64>,
}

impl GameArgs {
    fn apply(&self, config: &mut PuzzleConfig) {
        if let Some(value) = self.rotation_steps {
            config.rotation_steps = value;
        }
        if let Some(value) = self.snap_strength {
            config.snap_strength = value;
        }
        if let Some(value) = self.max_pieces {
            config.max_pieces = value;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Catalog { image, max_pieces } => {
            if let Some(value) = max_pieces {
                config.max_pieces = value;
            }
            config.validate()?;
            let puzzle = Puzzle::new(image.width, image.height, &config)?;
            let counts = puzzle.piece_counts();
            if counts.is_empty() {
                println!("no piece counts fit a {}x{} image", image.width, image.height);
            }
            for count in counts {
                if let Some(choice) = puzzle.grid_choice(count) {
                    println!("{}", grid_choice_label(count, choice));
                }
            }
        }
        Commands::Play { game, bot, save } => {
            game.apply(&mut config);
            let (puzzle, mut rng) = new_game(&game, &config)?;
            let session = Session::new(puzzle, Duration::from_secs(config.autosave_secs));
            let report = bot::run_bot(&session, bot.into(), &mut rng, |game, record| {
                match &save {
                    Some(path) => {
                        write_record(path, record)?;
                        write_game(&game_path(path), game)
                    }
                    None => Ok(()),
                }
            })?;
            println!(
                "steps: {}, drops: {}, snaps: {}, hints: {}, autosaves: {}",
                report.steps, report.drops, report.snaps, report.hints, report.autosaves
            );
            println!(
                "progress: {}%{}",
                report.progress,
                if report.complete { " (complete)" } else { "" }
            );
            let game = session.game();
            println!(
                "{}: played {}s",
                game.game_name(),
                game.played().as_secs()
            );
        }
        Commands::Snapshot { game, out, moves } => {
            game.apply(&mut config);
            let (puzzle, mut rng) = new_game(&game, &config)?;
            let session = Session::new(puzzle, Duration::from_secs(config.autosave_secs));
            let bot_config = bot::BotRunConfig {
                max_steps: moves.max(1),
                hint_every: 0,
                miss_rate: 0.2,
                jitter: 3.0,
                think_ms: 0,
            };
            bot::run_bot(&session, bot_config, &mut rng, |_, _| Ok(()))?;

            let record = session.snapshot();
            write_record(&out, &record)?;
            let restored = read_record(&out)?;
            let puzzle = Puzzle::from_record(&restored, StdRng::seed_from_u64(rng.random()))?;
            if puzzle.to_record() != record {
                return Err(err_msg("restored puzzle differs from the saved record"));
            }
            let game = session.game();
            write_game(&game_path(&out), &game)?;
            if read_game(&game_path(&out))? != game {
                return Err(err_msg("reloaded game record differs from the saved one"));
            }
            println!(
                "wrote {} ({} pieces, {} groups, progress {}%)",
                out.display(),
                record.pieces.len(),
                record.groups.len(),
                puzzle.progress()
            );
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PuzzleConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(PuzzleConfig::default());
    };
    let raw = std::fs::read_to_string(path)?;
    let config: PuzzleConfig = toml::from_str(&raw)?;
    debug!(path = %path.display(), ?config, "loaded config");
    Ok(config)
}

fn new_game(
    game: &GameArgs,
    config: &PuzzleConfig,
) -> Result<(Puzzle, StdRng), Box<dyn std::error::Error>> {
    config.validate()?;
    let seed = config.seed.unwrap_or_else(|| rand::rng().random());
    let mut rng = StdRng::seed_from_u64(seed);
    let mut puzzle = Puzzle::with_rng(
        game.image.width,
        game.image.height,
        config.max_pieces,
        StdRng::seed_from_u64(rng.random()),
    )?;
    let count = match game.pieces {
        Some(count) => count,
        None => closest_count(&puzzle.piece_counts(), 100).ok_or_else(|| {
            err_msg(format!(
                "no piece counts fit a {}x{} image",
                game.image.width, game.image.height
            ))
        })?,
    };
    puzzle.setup(count, config.rotation_steps, config.snap_strength)?;
    info!(seed, pieces = count, "new game");
    Ok((puzzle, rng))
}

fn closest_count(counts: &[u32], target: u32) -> Option<u32> {
    counts.iter().copied().min_by_key(|count| count.abs_diff(target))
}

fn write_record(path: &Path, record: &PuzzleRecord) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = encode_record(record)?;
    std::fs::write(path, bytes)?;
    Ok(())
}

fn read_record(path: &Path) -> Result<PuzzleRecord, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path)?;
    Ok(decode_record(&bytes)?)
}

fn game_path(save: &Path) -> PathBuf {
    save.with_extension("game.toml")
}

fn write_game(path: &Path, game: &GameRecord) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::write(path, toml::to_string(game)?)?;
    Ok(())
}

fn read_game(path: &Path) -> Result<GameRecord, Box<dyn std::error::Error>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&raw)?)
}

fn err_msg(message: impl Into<String>) -> Box<dyn std::error::Error> {
    Box::<dyn std::error::Error>::from(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closest_count_prefers_smaller_on_ties() {
        assert_eq!(closest_count(&[80, 120], 100), Some(80));
        assert_eq!(closest_count(&[9, 12, 99], 100), Some(99));
        assert_eq!(closest_count(&[], 100), None);
    }

    #[test]
    fn config_file_overrides_defaults() {
        let path = std::env::temp_dir().join(format!("jigsaw-config-{}.toml", std::process::id()));
        std::fs::write(&path, "rotation_steps = 4\nseed = 9\n").expect("write config");
        let config = load_config(Some(path.as_path())).expect("load config");
        assert_eq!(config.rotation_steps, 4);
        assert_eq!(config.seed, Some(9));
        assert_eq!(config.snap_strength, PuzzleConfig::default().snap_strength);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn record_file_round_trip() {
        let game = GameArgs {
            image: ImageArgs {
                width: 200,
                height: 200,
            },
            pieces: None,
            rotation_steps: None,
            snap_strength: None,
            max_pieces: None,
            seed: Some(4),
        };
        let mut config = PuzzleConfig::default();
        game.apply(&mut config);
        let (puzzle, _) = new_game(&game, &config).expect("game");
        let record = puzzle.to_record();
        let path = std::env::temp_dir().join(format!("jigsaw-record-{}.bin", std::process::id()));
        write_record(&path, &record).expect("write");
        assert_eq!(read_record(&path).expect("read"), record);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn game_file_sits_beside_the_save() {
        let save = std::env::temp_dir().join(format!("jigsaw-save-{}.bin", std::process::id()));
        let path = game_path(&save);
        assert!(path.to_string_lossy().ends_with(".game.toml"));
        let mut game = GameRecord::new(1_700_000_000_000);
        game.record_play(Duration::from_secs(42), 1_700_000_060_000);
        game.completed = true;
        write_game(&path, &game).expect("write");
        assert_eq!(read_game(&path).expect("read"), game);
        let _ = std::fs::remove_file(path);
    }
}
