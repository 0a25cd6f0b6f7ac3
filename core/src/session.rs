//! Exclusive access to one puzzle plus debounced autosave and play-time
//! bookkeeping.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::GroupError;
use crate::game::{now_ms, GameRecord};
use crate::geometry::Location;
use crate::puzzle::Puzzle;
use crate::snapshot::PuzzleRecord;

/// New placement of one piece after an operation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PiecePlacement {
    pub id: usize,
    pub location: Location,
    pub rotation_step: u32,
}

/// What a renderer needs after one operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub moved: Vec<PiecePlacement>,
    /// Whether the operation joined anything (snap or hint).
    pub joined: bool,
    pub progress: u32,
    pub complete: bool,
}

struct SessionState {
    puzzle: Puzzle,
    game: GameRecord,
    dirty: bool,
    deadline: Option<Instant>,
    autosave_after: Duration,
    last_activity: Option<Instant>,
    clock_origin: Instant,
    /// Wall-clock milliseconds at `clock_origin`.
    clock_origin_ms: i64,
}

impl SessionState {
    fn touch(&mut self, now: Instant) {
        let active = self
            .last_activity
            .map_or(Duration::ZERO, |previous| now.saturating_duration_since(previous));
        let since_origin = now.saturating_duration_since(self.clock_origin).as_millis() as i64;
        self.game
            .record_play(active, self.clock_origin_ms.saturating_add(since_origin));
        self.last_activity = Some(self.last_activity.map_or(now, |previous| previous.max(now)));
        self.game.completed = self.puzzle.is_complete();
    }

    fn finish(&mut self, joined: bool, now: Instant) -> Delta {
        self.touch(now);
        let moved: Vec<PiecePlacement> = self
            .puzzle
            .take_moves()
            .into_iter()
            .filter_map(|id| {
                self.puzzle.piece(id).map(|piece| PiecePlacement {
                    id,
                    location: piece.location(),
                    rotation_step: piece.rotation_step(),
                })
            })
            .collect();
        let complete = self.puzzle.is_complete();
        if !moved.is_empty() || joined {
            self.dirty = true;
            // Completion is saved right away; anything else waits for a quiet
            // period.
            self.deadline = Some(if complete {
                now
            } else {
                now + self.autosave_after
            });
        }
        Delta {
            moved,
            joined,
            progress: self.puzzle.progress(),
            complete,
        }
    }
}

pub struct Session {
    state: Mutex<SessionState>,
}

impl Session {
    /// Starts a fresh game around a puzzle that was just set up.
    pub fn new(puzzle: Puzzle, autosave_after: Duration) -> Self {
        Self::resume(puzzle, GameRecord::new(now_ms()), autosave_after)
    }

    /// Continues a stored game.
    pub fn resume(puzzle: Puzzle, game: GameRecord, autosave_after: Duration) -> Self {
        Self::with_clock(puzzle, game, autosave_after, Instant::now(), now_ms())
    }

    fn with_clock(
        puzzle: Puzzle,
        mut game: GameRecord,
        autosave_after: Duration,
        clock_origin: Instant,
        clock_origin_ms: i64,
    ) -> Self {
        game.completed = puzzle.is_complete();
        Self {
            state: Mutex::new(SessionState {
                puzzle,
                game,
                dirty: false,
                deadline: None,
                autosave_after,
                last_activity: None,
                clock_origin,
                clock_origin_ms,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn move_piece(&self, id: usize, x: f64, y: f64, now: Instant) -> Delta {
        let mut state = self.lock();
        state.puzzle.move_piece_to(id, x, y);
        state.finish(false, now)
    }

    pub fn rotate_piece(&self, id: usize, clockwise: bool, now: Instant) -> Delta {
        let mut state = self.lock();
        state.puzzle.rotate_piece(id, clockwise);
        state.finish(false, now)
    }

    pub fn check_for_snap(&self, id: usize, now: Instant) -> Result<Delta, GroupError> {
        let mut state = self.lock();
        let joined = state.puzzle.check_for_snap(id)?;
        Ok(state.finish(joined, now))
    }

    /// Moves a piece and then tries to snap it, under one lock.
    pub fn drop_piece(&self, id: usize, x: f64, y: f64, now: Instant) -> Result<Delta, GroupError> {
        let mut state = self.lock();
        state.puzzle.move_piece_to(id, x, y);
        let joined = state.puzzle.check_for_snap(id)?;
        Ok(state.finish(joined, now))
    }

    pub fn provide_hint(&self, now: Instant) -> Result<Delta, GroupError> {
        let mut state = self.lock();
        let joined = state.puzzle.provide_hint()?;
        Ok(state.finish(joined, now))
    }

    pub fn progress(&self) -> u32 {
        self.lock().puzzle.progress()
    }

    pub fn is_complete(&self) -> bool {
        self.lock().puzzle.is_complete()
    }

    pub fn is_dirty(&self) -> bool {
        self.lock().dirty
    }

    pub fn snapshot(&self) -> PuzzleRecord {
        self.lock().puzzle.to_record()
    }

    pub fn game(&self) -> GameRecord {
        self.lock().game.clone()
    }

    /// A detached copy for planning or rendering. Changes made to it never
    /// reach the session.
    pub fn view(&self) -> Puzzle {
        self.lock().puzzle.clone()
    }

    /// Hands the game and puzzle records to `sink` when changes are pending
    /// and the quiet period has passed. The lock is held while the sink runs.
    /// A failing sink keeps the session dirty so the next call retries.
    pub fn autosave_if_due<E, F>(&self, now: Instant, sink: F) -> Result<bool, E>
    where
        F: FnOnce(&GameRecord, &PuzzleRecord) -> Result<(), E>,
        E: std::fmt::Display,
    {
        let mut state = self.lock();
        let due = state.dirty && state.deadline.is_some_and(|deadline| now >= deadline);
        if !due {
            return Ok(false);
        }
        let record = state.puzzle.to_record();
        state.game.completed = state.puzzle.is_complete();
        match sink(&state.game, &record) {
            Ok(()) => {
                state.dirty = false;
                state.deadline = None;
                debug!(progress = state.puzzle.progress(), "autosaved");
                Ok(true)
            }
            Err(err) => {
                warn!(%err, "autosave failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::game::PLAY_IDLE_LIMIT;
    use crate::geometry::Side;

    fn session() -> Session {
        let mut puzzle = Puzzle::with_rng(100, 100, 100, StdRng::seed_from_u64(4)).expect("puzzle");
        puzzle.setup(9, 0, 2).expect("setup");
        Session::new(puzzle, Duration::from_secs(20))
    }

    #[test]
    fn drop_reports_placement_and_progress() {
        let session = session();
        let now = Instant::now();
        let ideal = session.view().ideal_location(1, Side::Left).expect("ideal");
        let delta = session
            .drop_piece(0, ideal.x + 3.0, ideal.y - 2.0, now)
            .expect("drop");
        assert!(delta.joined);
        assert_eq!(delta.progress, 22);
        assert_eq!(delta.moved.len(), 1);
        assert_eq!(delta.moved[0].id, 0);
        assert_eq!(delta.moved[0].location, ideal);
        assert!(session.is_dirty());
    }

    #[test]
    fn autosave_waits_for_the_quiet_period() {
        let session = session();
        let now = Instant::now();
        session.move_piece(4, 10.0, 10.0, now);
        let saved = session.autosave_if_due(now, |_, _| Ok::<(), String>(()));
        assert_eq!(saved, Ok(false));

        let later = now + Duration::from_secs(21);
        let failed = session.autosave_if_due(later, |_, _| Err("disk full".to_string()));
        assert!(failed.is_err());
        assert!(session.is_dirty());

        let mut pieces = 0;
        let saved = session.autosave_if_due(later, |_, record| {
            pieces = record.pieces.len();
            Ok::<(), String>(())
        });
        assert_eq!(saved, Ok(true));
        assert_eq!(pieces, 9);
        assert!(!session.is_dirty());
    }

    #[test]
    fn view_is_detached() {
        let session = session();
        let mut copy = session.view();
        let before = session.snapshot();
        assert!(copy.move_piece_to(4, 500.0, 500.0));
        assert_eq!(session.snapshot(), before);
    }

    #[test]
    fn play_time_accumulates_between_operations() {
        let origin = Instant::now();
        let mut puzzle = Puzzle::with_rng(100, 100, 100, StdRng::seed_from_u64(4)).expect("puzzle");
        puzzle.setup(9, 0, 2).expect("setup");
        let session = Session::with_clock(
            puzzle,
            GameRecord::new(1_000),
            Duration::from_secs(20),
            origin,
            1_000,
        );

        session.move_piece(4, 10.0, 10.0, origin + Duration::from_secs(1));
        session.rotate_piece(4, true, origin + Duration::from_secs(4));
        session.move_piece(4, 20.0, 20.0, origin + Duration::from_secs(3600));
        let game = session.game();
        assert_eq!(game.played(), Duration::from_secs(3) + PLAY_IDLE_LIMIT);
        assert_eq!(game.last_played_ms, 1_000 + 3_600_000);
        assert_eq!(game.started_ms, 1_000);
        assert!(!game.completed);
    }

    #[test]
    fn completion_is_mirrored_and_saved_at_once() {
        let mut puzzle = Puzzle::with_rng(100, 100, 100, StdRng::seed_from_u64(4)).expect("puzzle");
        puzzle.setup(9, 0, 2).expect("setup");
        for id in 1..8 {
            puzzle.join(0, id).expect("join");
        }
        let ideal = puzzle.ideal_location(7, Side::Right).expect("ideal");
        let session = Session::new(puzzle, Duration::from_secs(20));
        assert!(!session.game().completed);

        let now = Instant::now();
        let delta = session.drop_piece(8, ideal.x, ideal.y, now).expect("drop");
        assert!(delta.complete);
        assert!(session.game().completed);

        let mut saved = None;
        let due = session.autosave_if_due(now, |game, record| {
            saved = Some((game.completed, record.groups.len()));
            Ok::<(), String>(())
        });
        assert_eq!(due, Ok(true));
        assert_eq!(saved, Some((true, 1)));
    }

    #[test]
    fn refused_move_is_not_dirty() {
        let session = session();
        let delta = session.move_piece(42, 0.0, 0.0, Instant::now());
        assert!(delta.moved.is_empty());
        assert!(!session.is_dirty());
    }
}
