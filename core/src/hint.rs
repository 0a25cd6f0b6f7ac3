use rand::Rng;
use tracing::debug;

use crate::error::GroupError;
use crate::puzzle::Puzzle;

pub const HINT_CHAIN_MIN: usize = 2;
pub const HINT_CHAIN_MAX: usize = 16;
/// Random chain heads tried per target length between the maximum and
/// `HINT_CHAIN_MIN`.
pub const HINT_HEADS_PER_LENGTH: usize = 2;

/// Target chain length for a puzzle of `total` pieces.
pub fn hint_chain_length(total: usize) -> usize {
    ((total as f64).sqrt().round() as usize).clamp(HINT_CHAIN_MIN, HINT_CHAIN_MAX)
}

impl Puzzle {
    /// Pre-assembles a short chain of loose neighboring pieces in the middle
    /// of the play surface. Returns false when solved or when no two loose
    /// pieces are neighbors.
    pub fn provide_hint(&mut self) -> Result<bool, GroupError> {
        if self.is_complete() || self.pieces.is_empty() {
            return Ok(false);
        }
        let loose: Vec<usize> = self
            .pieces
            .iter()
            .filter(|piece| self.is_loose(piece.id()))
            .map(|piece| piece.id())
            .collect();
        if loose.len() < HINT_CHAIN_MIN {
            return Ok(false);
        }

        // Shorter chains are accepted, so one head budget covers every target
        // length. A head fails only when it has no loose neighbor.
        let length = hint_chain_length(self.pieces.len());
        let attempts = HINT_HEADS_PER_LENGTH * (length + 1 - HINT_CHAIN_MIN);
        for _ in 0..attempts {
            let head = loose[self.rng.random_range(0..loose.len())];
            let chain = self.build_chain(head, length);
            if chain.len() >= HINT_CHAIN_MIN {
                self.assemble_chain(&chain)?;
                return Ok(true);
            }
        }
        let head = loose.iter().copied().find(|&id| {
            self.pieces[id]
                .neighbors()
                .any(|(_, neighbor)| self.is_loose(neighbor))
        });
        if let Some(head) = head {
            let chain = self.build_chain(head, length);
            self.assemble_chain(&chain)?;
            return Ok(true);
        }
        debug!("no hint chain available");
        Ok(false)
    }

    fn is_loose(&self, id: usize) -> bool {
        self.pieces
            .get(id)
            .is_some_and(|piece| !piece.is_grouped() && piece.is_visible())
    }

    fn build_chain(&mut self, head: usize, length: usize) -> Vec<usize> {
        let mut chain = vec![head];
        while chain.len() < length {
            let Some(&last) = chain.last() else { break };
            let options: Vec<usize> = self.pieces[last]
                .neighbors()
                .map(|(_, id)| id)
                .filter(|id| !chain.contains(id) && self.is_loose(*id))
                .collect();
            if options.is_empty() {
                break;
            }
            chain.push(options[self.rng.random_range(0..options.len())]);
        }
        chain
    }

    fn assemble_chain(&mut self, chain: &[usize]) -> Result<(), GroupError> {
        for &id in chain {
            self.pieces[id].rotation_step = 0;
            self.record_move(id);
        }
        for pair in chain.windows(2) {
            let (previous, current) = (pair[0], pair[1]);
            let side = self.pieces[previous]
                .neighbors()
                .find(|&(_, id)| id == current)
                .map(|(side, _)| side);
            if let Some(location) = side.and_then(|side| self.ideal_location(previous, side)) {
                self.pieces[current].location = location;
            }
            self.join(previous, current)?;
        }

        let size = self.piece_size as f64;
        let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
        let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &id in chain {
            let location = self.pieces[id].location;
            min_x = min_x.min(location.x);
            min_y = min_y.min(location.y);
            max_x = max_x.max(location.x + size);
            max_y = max_y.max(location.y + size);
        }
        let (width, height) = self.play_surface();
        let dx = width * 0.5 - (min_x + max_x) * 0.5;
        let dy = height * 0.5 - (min_y + max_y) * 0.5;
        self.translate(chain, dx, dy);
        debug!(pieces = ?chain, "hint placed");
        Ok(())
    }
}
