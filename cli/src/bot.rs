use super::*;

#[derive(clap::Args, Clone, Copy, Debug)]
pub(super) struct BotArgs {
    /// Upper bound on solver actions before giving up.
    #[arg(long, default_value_t = 5000)]
    max_steps: u32,
    /// Ask for a hint every N actions (0 disables hints).
    #[arg(long, default_value_t = 25)]
    hint_every: u32,
    /// Share of drops that deliberately land outside the snap tolerance.
    #[arg(long, default_value_t = 0.2)]
    miss_rate: f64,
    /// Maximum distance from the ideal spot for a drop that should snap.
    #[arg(long, default_value_t = 3.0)]
    jitter: f64,
    /// Simulated pause between actions.
    #[arg(long, default_value_t = 900)]
    think_ms: u64,
}

#[derive(Clone, Copy, Debug)]
pub(super) struct BotRunConfig {
    pub max_steps: u32,
    pub hint_every: u32,
    pub miss_rate: f64,
    pub jitter: f64,
    pub think_ms: u64,
}

impl From<BotArgs> for BotRunConfig {
    fn from(args: BotArgs) -> Self {
        Self {
            max_steps: args.max_steps,
            hint_every: args.hint_every,
            miss_rate: args.miss_rate,
            jitter: args.jitter,
            think_ms: args.think_ms,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(super) struct BotReport {
    pub steps: u32,
    pub drops: u32,
    pub snaps: u32,
    pub hints: u32,
    pub autosaves: u32,
    pub progress: u32,
    pub complete: bool,
}

#[derive(Clone, Copy, Debug)]
struct DragPlan {
    piece: usize,
    turns: u32,
    target: Location,
}

pub(super) fn validate_bot_config(config: BotRunConfig) -> Result<(), Box<dyn std::error::Error>> {
    if config.max_steps == 0 {
        return Err(err_msg("max-steps must be positive"));
    }
    if !(0.0..=1.0).contains(&config.miss_rate) {
        return Err(err_msg("miss-rate must be between 0 and 1"));
    }
    if config.jitter < 0.0 {
        return Err(err_msg("jitter must not be negative"));
    }
    Ok(())
}

/// Plays the session until it is complete or the step budget runs out.
/// `save` receives every due autosave.
pub(super) fn run_bot<F>(
    session: &Session,
    config: BotRunConfig,
    rng: &mut StdRng,
    mut save: F,
) -> Result<BotReport, Box<dyn std::error::Error>>
where
    F: FnMut(&GameRecord, &PuzzleRecord) -> Result<(), Box<dyn std::error::Error>>,
{
    validate_bot_config(config)?;
    let mut report = BotReport::default();
    let mut now = Instant::now();
    let think = Duration::from_millis(config.think_ms);

    while report.steps < config.max_steps && !session.is_complete() {
        report.steps += 1;
        now += think;

        let wants_hint = config.hint_every > 0 && report.steps % config.hint_every == 0;
        let plan = if wants_hint {
            None
        } else {
            choose_drag(&session.view(), config, rng)
        };

        match plan {
            Some(plan) => {
                for _ in 0..plan.turns {
                    session.rotate_piece(plan.piece, true, now);
                }
                let delta = session.drop_piece(plan.piece, plan.target.x, plan.target.y, now)?;
                report.drops += 1;
                if delta.joined {
                    report.snaps += 1;
                    debug!(piece = plan.piece, progress = delta.progress, "bot snap");
                }
            }
            None => {
                let delta = session.provide_hint(now)?;
                if delta.joined {
                    report.hints += 1;
                    debug!(progress = delta.progress, "bot hint");
                }
            }
        }

        if session.autosave_if_due(now, &mut save)? {
            report.autosaves += 1;
        }
    }

    // Flush whatever is left regardless of the quiet period.
    if session.autosave_if_due(now + Duration::from_secs(3600), &mut save)? {
        report.autosaves += 1;
    }
    report.progress = session.progress();
    report.complete = session.is_complete();
    info!(
        steps = report.steps,
        snaps = report.snaps,
        hints = report.hints,
        progress = report.progress,
        "bot finished"
    );
    Ok(report)
}

/// Picks a random pair of grid neighbors that are not yet joined and plans
/// a drop of the first onto the second.
fn choose_drag(puzzle: &Puzzle, config: BotRunConfig, rng: &mut StdRng) -> Option<DragPlan> {
    let pairs: Vec<(usize, Side, usize)> = puzzle
        .pieces()
        .iter()
        .flat_map(|piece| {
            piece
                .neighbors()
                .map(move |(side, neighbor)| (piece.id(), side, neighbor))
        })
        .filter(|&(piece, _, neighbor)| {
            let ours = puzzle.piece(piece).and_then(Piece::group);
            let theirs = puzzle.piece(neighbor).and_then(Piece::group);
            ours.is_none() || ours != theirs
        })
        .collect();
    if pairs.is_empty() {
        return None;
    }
    let (piece, side, neighbor) = pairs[rng.random_range(0..pairs.len())];

    let steps = puzzle.rotation_steps();
    let turns = if puzzle.rotation_enabled() {
        let ours = puzzle.piece(piece)?.rotation_step();
        let theirs = puzzle.piece(neighbor)?.rotation_step();
        (theirs + steps - ours) % steps
    } else {
        0
    };

    let ideal = puzzle.ideal_location(neighbor, side.opposite())?;
    let tolerance = puzzle.snap_distance();
    let angle = rng.random_range(0.0..std::f64::consts::TAU);
    let radius = if rng.random_bool(config.miss_rate) {
        tolerance * rng.random_range(1.5..3.0)
    } else {
        let limit = config.jitter.min(tolerance * 0.5);
        if limit > 0.0 {
            rng.random_range(0.0..=limit)
        } else {
            0.0
        }
    };
    Some(DragPlan {
        piece,
        turns,
        target: ideal.offset(radius * angle.cos(), radius * angle.sin()),
    })
}
