use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{validate_rotation_steps, validate_snap_strength};
use crate::edge::{CurvePoint, PieceEdges};
use crate::error::ReconstructError;
use crate::geometry::{neighbor_id, Location, Side};
use crate::group::{Group, GroupId};
use crate::piece::Piece;
use crate::puzzle::Puzzle;

pub const SNAPSHOT_VERSION: u32 = 1;

/// Flat persistence form of a piece.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
pub struct PieceRecord {
    pub id: u32,
    pub row: u32,
    pub col: u32,
    pub x: f64,
    pub y: f64,
    pub rotation_step: u32,
    pub top: Option<u32>,
    pub bottom: Option<u32>,
    pub left: Option<u32>,
    pub right: Option<u32>,
    pub top_curve: Vec<CurvePoint>,
    pub bottom_curve: Vec<CurvePoint>,
    pub left_curve: Vec<CurvePoint>,
    pub right_curve: Vec<CurvePoint>,
    pub group: Option<GroupId>,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

impl PieceRecord {
    fn neighbor(&self, side: Side) -> Option<u32> {
        match side {
            Side::Top => self.top,
            Side::Bottom => self.bottom,
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }

    fn curve(&self, side: Side) -> &[CurvePoint] {
        match side {
            Side::Top => &self.top_curve,
            Side::Bottom => &self.bottom_curve,
            Side::Left => &self.left_curve,
            Side::Right => &self.right_curve,
        }
    }
}

#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
pub struct GroupRecord {
    pub id: GroupId,
    pub pieces: Vec<u32>,
}

#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize, RkyvDeserialize,
)]
pub struct PuzzleRecord {
    pub version: u32,
    pub image_width: u32,
    pub image_height: u32,
    pub max_pieces: u32,
    pub rows: u32,
    pub cols: u32,
    pub piece_size: u32,
    pub rotation_steps: u32,
    pub snap_strength: u32,
    pub next_generation: u32,
    pub pieces: Vec<PieceRecord>,
    pub groups: Vec<GroupRecord>,
}

impl Puzzle {
    pub fn to_record(&self) -> PuzzleRecord {
        let pieces = self
            .pieces
            .iter()
            .map(|piece| {
                let neighbor = |side| piece.neighbor(side).map(|id| id as u32);
                let location = piece.location();
                PieceRecord {
                    id: piece.id() as u32,
                    row: piece.row(),
                    col: piece.col(),
                    x: location.x,
                    y: location.y,
                    rotation_step: piece.rotation_step(),
                    top: neighbor(Side::Top),
                    bottom: neighbor(Side::Bottom),
                    left: neighbor(Side::Left),
                    right: neighbor(Side::Right),
                    top_curve: piece.curve(Side::Top).clone(),
                    bottom_curve: piece.curve(Side::Bottom).clone(),
                    left_curve: piece.curve(Side::Left).clone(),
                    right_curve: piece.curve(Side::Right).clone(),
                    group: piece.group(),
                    visible: piece.is_visible(),
                }
            })
            .collect();
        let groups = self
            .groups
            .values()
            .map(|group| GroupRecord {
                id: group.id(),
                pieces: group.members().map(|id| id as u32).collect(),
            })
            .collect();
        PuzzleRecord {
            version: SNAPSHOT_VERSION,
            image_width: self.image_width,
            image_height: self.image_height,
            max_pieces: self.max_pieces,
            rows: self.rows as u32,
            cols: self.cols as u32,
            piece_size: self.piece_size,
            rotation_steps: self.rotation_steps,
            snap_strength: self.snap_strength,
            next_generation: self.next_generation,
            pieces,
            groups,
        }
    }

    /// Rebuilds a puzzle from stored records. Every id reference is checked;
    /// the first inconsistency fails the whole load.
    pub fn from_record(record: &PuzzleRecord, rng: StdRng) -> Result<Self, ReconstructError> {
        let result = reconstruct(record, rng);
        match &result {
            Ok(puzzle) => info!(
                pieces = puzzle.piece_count(),
                groups = puzzle.group_count(),
                "puzzle restored"
            ),
            Err(err) => warn!(%err, "puzzle record rejected"),
        }
        result
    }
}

fn reconstruct(record: &PuzzleRecord, rng: StdRng) -> Result<Puzzle, ReconstructError> {
    if record.version != SNAPSHOT_VERSION {
        return Err(ReconstructError::Version {
            expected: SNAPSHOT_VERSION,
            found: record.version,
        });
    }
    validate_rotation_steps(record.rotation_steps)?;
    validate_snap_strength(record.snap_strength)?;
    let rows = record.rows as usize;
    let cols = record.cols as usize;
    if rows == 0 || cols == 0 || record.piece_size == 0 {
        return Err(ReconstructError::Grid {
            rows: record.rows,
            cols: record.cols,
            piece_size: record.piece_size,
        });
    }
    let total = rows * cols;
    if record.pieces.len() != total {
        return Err(ReconstructError::PieceCount {
            expected: total,
            found: record.pieces.len(),
        });
    }

    let mut by_id: Vec<Option<&PieceRecord>> = vec![None; total];
    for piece in &record.pieces {
        let slot = by_id
            .get_mut(piece.id as usize)
            .ok_or(ReconstructError::MissingPiece { id: piece.id })?;
        if slot.is_some() {
            return Err(ReconstructError::DuplicatePiece { id: piece.id });
        }
        *slot = Some(piece);
    }

    let mut pieces = Vec::with_capacity(total);
    for (index, slot) in by_id.into_iter().enumerate() {
        let stored = slot.ok_or(ReconstructError::MissingPiece { id: index as u32 })?;
        pieces.push(restore_piece(stored, rows, cols, record.rotation_steps)?);
    }

    let mut groups = BTreeMap::new();
    let mut next_generation = record.next_generation;
    for stored in &record.groups {
        if groups.contains_key(&stored.id) {
            return Err(ReconstructError::DuplicateGroup(stored.id));
        }
        let successor = stored
            .id
            .generation
            .checked_add(1)
            .ok_or(ReconstructError::Generation(stored.id))?;
        let mut members = BTreeSet::new();
        for &member in &stored.pieces {
            let piece: &Piece = pieces
                .get(member as usize)
                .ok_or(ReconstructError::UnknownMember {
                    group: stored.id,
                    piece: member,
                })?;
            if piece.group != Some(stored.id) {
                return Err(ReconstructError::Membership {
                    piece: member,
                    listed: stored.id,
                    stored: piece.group,
                });
            }
            if !members.insert(member as usize) {
                return Err(ReconstructError::DuplicateMember {
                    group: stored.id,
                    piece: member,
                });
            }
        }
        if members.len() < 2 {
            return Err(ReconstructError::GroupTooSmall {
                group: stored.id,
                count: members.len(),
            });
        }
        next_generation = next_generation.max(successor);
        groups.insert(stored.id, Group::from_members(stored.id, members));
    }

    for piece in &pieces {
        let Some(group_id) = piece.group else {
            continue;
        };
        let group = groups
            .get(&group_id)
            .ok_or(ReconstructError::UnknownGroup {
                piece: piece.id() as u32,
                group: group_id,
            })?;
        if !group.contains(piece.id()) {
            return Err(ReconstructError::Unlisted {
                piece: piece.id() as u32,
                group: group_id,
            });
        }
    }

    let mut puzzle = Puzzle::with_rng(
        record.image_width,
        record.image_height,
        record.max_pieces,
        rng,
    )?;
    puzzle.rows = rows;
    puzzle.cols = cols;
    puzzle.piece_size = record.piece_size;
    puzzle.rotation_steps = record.rotation_steps;
    puzzle.snap_strength = record.snap_strength;
    puzzle.pieces = pieces;
    puzzle.groups = groups;
    puzzle.next_generation = next_generation;
    Ok(puzzle)
}

fn restore_piece(
    stored: &PieceRecord,
    rows: usize,
    cols: usize,
    rotation_steps: u32,
) -> Result<Piece, ReconstructError> {
    let id = stored.id as usize;
    let row = (id / cols) as u32;
    let col = (id % cols) as u32;
    if stored.row != row || stored.col != col {
        return Err(ReconstructError::PiecePosition {
            id: stored.id,
            row: stored.row,
            col: stored.col,
        });
    }

    let mut neighbors = [None; 4];
    for side in Side::ALL {
        let expected = neighbor_id(id, cols, rows, side);
        match (stored.neighbor(side), expected) {
            (Some(found), Some(want)) if found as usize == want => {}
            (None, None) => {}
            (None, Some(_)) => {
                return Err(ReconstructError::MissingNeighbor {
                    id: stored.id,
                    side: side.name(),
                })
            }
            (Some(found), want) => {
                return Err(ReconstructError::Neighbor {
                    id: stored.id,
                    side: side.name(),
                    neighbor: found,
                    expected: want.map(|want| want as u32),
                })
            }
        }
        neighbors[side.index()] = expected;
    }

    for side in Side::ALL {
        if stored.curve(side).len() < 2 {
            return Err(ReconstructError::EmptyCurve {
                id: stored.id,
                side: side.name(),
            });
        }
    }

    let step_limit = rotation_steps.max(1);
    if stored.rotation_step >= step_limit {
        return Err(ReconstructError::RotationStep {
            id: stored.id,
            step: stored.rotation_step,
        });
    }

    let edges = PieceEdges {
        top: stored.curve(Side::Top).to_vec(),
        bottom: stored.curve(Side::Bottom).to_vec(),
        left: stored.curve(Side::Left).to_vec(),
        right: stored.curve(Side::Right).to_vec(),
    };
    let mut piece = Piece::new(id, row, col, neighbors, edges);
    piece.location = Location::new(stored.x, stored.y);
    piece.rotation_step = stored.rotation_step;
    piece.group = stored.group;
    piece.visible = stored.visible;
    Ok(piece)
}
