//! Per-game bookkeeping kept beside the puzzle record: when the game started,
//! when it was last played, how long it has been played and whether it is
//! done. Lets a game list be shown without restoring every puzzle.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// Longest gap between two operations that still counts as play time.
pub const PLAY_IDLE_LIMIT: Duration = Duration::from_secs(120);

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
pub struct GameRecord {
    pub name: String,
    pub started_ms: i64,
    pub last_played_ms: i64,
    #[serde(default)]
    pub played_ms: u64,
    #[serde(default)]
    pub completed: bool,
}

impl GameRecord {
    /// A fresh game named after its start time.
    pub fn new(started_ms: i64) -> Self {
        Self {
            name: started_ms.to_string(),
            started_ms,
            last_played_ms: started_ms,
            played_ms: 0,
            completed: false,
        }
    }

    pub fn game_name(&self) -> String {
        format!("game_{}", self.name)
    }

    pub fn puzzle_name(&self) -> String {
        format!("puzzle_{}", self.name)
    }

    pub fn played(&self) -> Duration {
        Duration::from_millis(self.played_ms)
    }

    /// Adds `active` play time, capped at `PLAY_IDLE_LIMIT`, and stamps the
    /// wall clock.
    pub fn record_play(&mut self, active: Duration, wall_ms: i64) {
        let active = active.min(PLAY_IDLE_LIMIT).as_millis() as u64;
        self.played_ms = self.played_ms.saturating_add(active);
        self.last_played_ms = self.last_played_ms.max(wall_ms);
    }
}
