use tracing::debug;

use crate::error::GroupError;
use crate::geometry::{rotate_vec, Location, Side};
use crate::puzzle::Puzzle;

/// A neighbor whose shared edge lies within tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapCandidate {
    pub piece: usize,
    pub side: Side,
    pub neighbor: usize,
    pub distance: f64,
}

impl Puzzle {
    /// Midpoint of a piece's side in canvas space, following its rotation.
    pub fn edge_center(&self, id: usize, side: Side) -> Option<Location> {
        let (cx, cy) = self.piece_center(id)?;
        let (ux, uy) = side.unit();
        let half = self.piece_size as f64 * 0.5;
        let (dx, dy) = rotate_vec(ux * half, uy * half, self.piece_angle(id));
        Some(Location::new(cx + dx, cy + dy))
    }

    /// Nearest joinable neighbor of a single piece. Ties keep the earlier
    /// side in top, bottom, left, right order.
    pub fn snap_candidate(&self, id: usize) -> Option<SnapCandidate> {
        let piece = self.pieces.get(id)?;
        let tolerance = self.snap_distance();
        let mut best: Option<SnapCandidate> = None;
        for (side, neighbor_id) in piece.neighbors() {
            let Some(neighbor) = self.pieces.get(neighbor_id) else {
                continue;
            };
            if !neighbor.visible || neighbor.rotation_step != piece.rotation_step {
                continue;
            }
            if piece.group.is_some() && piece.group == neighbor.group {
                continue;
            }
            let (Some(ours), Some(theirs)) = (
                self.edge_center(id, side),
                self.edge_center(neighbor_id, side.opposite()),
            ) else {
                continue;
            };
            let distance = ours.distance(theirs);
            if distance > tolerance {
                continue;
            }
            if best.is_none_or(|current| distance < current.distance) {
                best = Some(SnapCandidate {
                    piece: id,
                    side,
                    neighbor: neighbor_id,
                    distance,
                });
            }
        }
        best
    }

    /// Tries to attach a piece that just stopped moving.
    ///
    /// A grouped piece with no candidate of its own lets the rest of its group
    /// try, in ascending id order. On success the non-anchoring side is moved
    /// onto the exact offset (with its whole group) and the two are joined.
    pub fn check_for_snap(&mut self, id: usize) -> Result<bool, GroupError> {
        if self.is_complete() {
            return Ok(false);
        }
        let Some(piece) = self.pieces.get(id) else {
            return Ok(false);
        };
        let grouped = piece.is_grouped();

        let mut found = self.snap_candidate(id);
        if found.is_none() && grouped {
            found = self
                .cluster_of(id)
                .into_iter()
                .filter(|&member| member != id)
                .find_map(|member| self.snap_candidate(member));
        }
        let Some(candidate) = found else {
            return Ok(false);
        };

        // A dragged group stays put and pulls the neighbor in; a lone piece
        // is pulled onto the neighbor.
        let (anchor, target, side) = if grouped {
            (candidate.piece, candidate.neighbor, candidate.side)
        } else {
            (candidate.neighbor, candidate.piece, candidate.side.opposite())
        };
        let Some(ideal) = self.ideal_location(anchor, side) else {
            return Ok(false);
        };
        let current = self.pieces[target].location;
        let members = self.cluster_of(target);
        self.translate(&members, ideal.x - current.x, ideal.y - current.y);

        debug!(
            anchor,
            target,
            side = side.name(),
            distance = candidate.distance,
            "snap"
        );
        self.join(anchor, target)?;
        Ok(true)
    }
}
