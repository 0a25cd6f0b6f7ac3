use std::collections::{BTreeMap, BTreeSet};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::config::{
    rotation_step_angle, snap_distance, validate_rotation_steps, validate_snap_strength,
    PuzzleConfig,
};
use crate::edge::generate_edges;
use crate::error::{GroupError, SetupError};
use crate::geometry::{neighbor_id, rotate_about, rotate_vec, Location, Side};
use crate::grid::{build_grid_choices, GridChoice};
use crate::group::{Group, GroupId};
use crate::piece::Piece;

/// One game session: every piece, every group, and the pending move list.
#[derive(Clone, Debug)]
pub struct Puzzle {
    pub(crate) image_width: u32,
    pub(crate) image_height: u32,
    pub(crate) max_pieces: u32,
    pub(crate) choices: BTreeMap<u32, GridChoice>,
    pub(crate) rows: usize,
    pub(crate) cols: usize,
    pub(crate) piece_size: u32,
    pub(crate) rotation_steps: u32,
    pub(crate) snap_strength: u32,
    pub(crate) pieces: Vec<Piece>,
    pub(crate) groups: BTreeMap<GroupId, Group>,
    pub(crate) next_generation: u32,
    pub(crate) moves: Vec<usize>,
    pub(crate) rng: StdRng,
}

impl Puzzle {
    /// Creates an empty puzzle for an image. The randomness source is seeded
    /// from `config.seed` when present.
    pub fn new(width: u32, height: u32, config: &PuzzleConfig) -> Result<Self, SetupError> {
        config.validate()?;
        let seed = config.seed.unwrap_or_else(|| rand::rng().random());
        Self::with_rng(width, height, config.max_pieces, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(
        width: u32,
        height: u32,
        max_pieces: u32,
        rng: StdRng,
    ) -> Result<Self, SetupError> {
        if width == 0 || height == 0 {
            return Err(SetupError::ImageSize { width, height });
        }
        Ok(Self {
            image_width: width,
            image_height: height,
            max_pieces,
            choices: build_grid_choices(width, height, max_pieces),
            rows: 0,
            cols: 0,
            piece_size: 0,
            rotation_steps: 0,
            snap_strength: 0,
            pieces: Vec::new(),
            groups: BTreeMap::new(),
            next_generation: 0,
            moves: Vec::new(),
            rng,
        })
    }

    /// Lays out a fresh game. On error the puzzle is left untouched.
    pub fn setup(
        &mut self,
        piece_count: u32,
        rotation_steps: u32,
        snap_strength: u32,
    ) -> Result<(), SetupError> {
        validate_rotation_steps(rotation_steps)?;
        validate_snap_strength(snap_strength)?;
        let choice = *self
            .choices
            .get(&piece_count)
            .ok_or(SetupError::UnsupportedPieceCount(piece_count))?;

        let rows = choice.rows as usize;
        let cols = choice.cols as usize;
        let edges = generate_edges(rows, cols, &mut self.rng)?;
        let pitch = (choice.piece_size + 2 * (choice.piece_size / 4)) as f64;
        let mut pieces = Vec::with_capacity(rows * cols);
        for (id, piece_edges) in edges.into_iter().enumerate() {
            let row = id / cols;
            let col = id % cols;
            let neighbors = Side::ALL.map(|side| neighbor_id(id, cols, rows, side));
            let mut piece = Piece::new(id, row as u32, col as u32, neighbors, piece_edges);
            piece.location = Location::new(col as f64 * pitch, row as f64 * pitch);
            if rotation_steps > 1 {
                piece.rotation_step = self.rng.random_range(0..rotation_steps);
            }
            pieces.push(piece);
        }

        self.rows = rows;
        self.cols = cols;
        self.piece_size = choice.piece_size;
        self.rotation_steps = rotation_steps;
        self.snap_strength = snap_strength;
        self.pieces = pieces;
        self.groups.clear();
        self.next_generation = 0;
        self.moves.clear();
        info!(
            pieces = piece_count,
            rows,
            cols,
            piece_size = choice.piece_size,
            rotation_steps,
            snap_distance = self.snap_distance(),
            "puzzle set up"
        );
        Ok(())
    }

    pub fn max_pieces(&self) -> u32 {
        self.max_pieces
    }

    /// Piece counts `setup` accepts for this image, ascending.
    pub fn piece_counts(&self) -> Vec<u32> {
        self.choices.keys().copied().collect()
    }

    pub fn grid_choice(&self, piece_count: u32) -> Option<&GridChoice> {
        self.choices.get(&piece_count)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.cols
    }

    pub fn piece_size(&self) -> u32 {
        self.piece_size
    }

    pub fn piece_overlap(&self) -> u32 {
        self.piece_size / 4
    }

    /// Spacing of the initial spread layout.
    pub fn pitch(&self) -> f64 {
        (self.piece_size + 2 * self.piece_overlap()) as f64
    }

    pub fn play_surface(&self) -> (f64, f64) {
        (self.cols as f64 * self.pitch(), self.rows as f64 * self.pitch())
    }

    pub fn rotation_steps(&self) -> u32 {
        self.rotation_steps
    }

    pub fn rotation_step_angle(&self) -> f64 {
        rotation_step_angle(self.rotation_steps)
    }

    pub fn rotation_enabled(&self) -> bool {
        self.rotation_steps > 1
    }

    pub fn snap_strength(&self) -> u32 {
        self.snap_strength
    }

    pub fn snap_distance(&self) -> f64 {
        snap_distance(self.piece_overlap(), self.snap_strength)
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    pub fn piece(&self, id: usize) -> Option<&Piece> {
        self.pieces.get(id)
    }

    pub fn piece_at(&self, row: usize, col: usize) -> Option<&Piece> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        self.pieces.get(row * self.cols + col)
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> + '_ {
        self.groups.values()
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(&id)
    }

    pub fn group_of(&self, piece: usize) -> Option<&Group> {
        self.pieces
            .get(piece)
            .and_then(|p| p.group)
            .and_then(|id| self.groups.get(&id))
    }

    pub fn is_complete(&self) -> bool {
        self.groups.len() == 1
            && self
                .groups
                .values()
                .next()
                .map(|group| group.len() == self.pieces.len())
                .unwrap_or(false)
    }

    /// Share of pieces that sit in some group, as a whole percentage. Never
    /// reports 100 before the puzzle is complete.
    pub fn progress(&self) -> u32 {
        let total = self.pieces.len();
        if total == 0 {
            return 0;
        }
        if self.is_complete() {
            return 100;
        }
        let grouped: usize = self.groups.values().map(Group::len).sum();
        let percent = (100.0 * grouped as f64 / total as f64).round() as u32;
        percent.min(99)
    }

    /// Pieces moved or rotated since the previous call.
    pub fn take_moves(&mut self) -> Vec<usize> {
        std::mem::take(&mut self.moves)
    }

    pub fn piece_angle(&self, id: usize) -> f64 {
        self.pieces
            .get(id)
            .map(|piece| piece.rotation_step as f64 * self.rotation_step_angle())
            .unwrap_or(0.0)
    }

    pub fn piece_center(&self, id: usize) -> Option<(f64, f64)> {
        let half = self.piece_size as f64 * 0.5;
        self.pieces
            .get(id)
            .map(|piece| (piece.location.x + half, piece.location.y + half))
    }

    /// Where the neighbor on `side` of `anchor` belongs, given the anchor's
    /// current location and rotation.
    pub fn ideal_location(&self, anchor: usize, side: Side) -> Option<Location> {
        let (cx, cy) = self.piece_center(anchor)?;
        let (ux, uy) = side.unit();
        let size = self.piece_size as f64;
        let (dx, dy) = rotate_vec(ux * size, uy * size, self.piece_angle(anchor));
        let half = size * 0.5;
        Some(Location::new(cx + dx - half, cy + dy - half))
    }

    /// Moves a piece's top-left corner to `(x, y)`, dragging its group along.
    pub fn move_piece_to(&mut self, id: usize, x: f64, y: f64) -> bool {
        if self.is_complete() {
            warn!(piece = id, "move refused, puzzle is complete");
            return false;
        }
        let Some(piece) = self.pieces.get(id) else {
            return false;
        };
        let dx = x - piece.location.x;
        let dy = y - piece.location.y;
        let members = self.cluster_of(id);
        self.translate(&members, dx, dy);
        true
    }

    pub fn set_piece_visible(&mut self, id: usize, visible: bool) -> bool {
        match self.pieces.get_mut(id) {
            Some(piece) => {
                piece.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Turns a piece one step. A grouped piece turns its whole group around
    /// its own center; the clicked piece itself stays in place.
    pub fn rotate_piece(&mut self, id: usize, clockwise: bool) -> bool {
        if !self.rotation_enabled() || self.is_complete() || id >= self.pieces.len() {
            return false;
        }
        let steps = self.rotation_steps;
        let angle = if clockwise {
            self.rotation_step_angle()
        } else {
            -self.rotation_step_angle()
        };
        let pivot = match self.piece_center(id) {
            Some(center) => center,
            None => return false,
        };
        let half = self.piece_size as f64 * 0.5;
        let members = self.cluster_of(id);
        for member in members {
            let Some(piece) = self.pieces.get_mut(member) else {
                continue;
            };
            piece.rotation_step = if clockwise {
                (piece.rotation_step + 1) % steps
            } else {
                (piece.rotation_step + steps - 1) % steps
            };
            if member != id {
                let center = (piece.location.x + half, piece.location.y + half);
                let (x, y) = rotate_about(center, pivot, angle);
                piece.location = Location::new(x - half, y - half);
            }
            self.record_move(member);
        }
        true
    }

    /// Starts a group from two loose pieces.
    pub fn create_group(&mut self, first: usize, second: usize) -> Result<GroupId, GroupError> {
        if first == second {
            return Err(GroupError::SamePiece(first));
        }
        self.ensure_loose(first)?;
        self.ensure_loose(second)?;
        let id = self.allocate_group_id(first)?;
        self.groups.insert(id, Group::pair(id, first, second));
        self.pieces[first].group = Some(id);
        self.pieces[second].group = Some(id);
        debug!(group = %id, first, second, "group created");
        Ok(id)
    }

    /// Adds a loose piece to an existing group.
    pub fn extend_group(&mut self, group: GroupId, piece: usize) -> Result<GroupId, GroupError> {
        self.ensure_loose(piece)?;
        let target = self
            .groups
            .get_mut(&group)
            .ok_or(GroupError::UnknownGroup(group))?;
        if !target.insert(piece) {
            return Err(GroupError::AlreadyGrouped { piece, group });
        }
        self.pieces[piece].group = Some(group);
        debug!(group = %group, piece, size = target.len(), "group extended");
        Ok(group)
    }

    /// Folds two groups into a new one. Both source ids stop resolving.
    pub fn merge_groups(&mut self, first: GroupId, second: GroupId) -> Result<GroupId, GroupError> {
        if first == second {
            return Err(GroupError::SameGroup(first));
        }
        if !self.groups.contains_key(&first) {
            return Err(GroupError::UnknownGroup(first));
        }
        if !self.groups.contains_key(&second) {
            return Err(GroupError::UnknownGroup(second));
        }
        let id = self.allocate_group_id(first.anchor as usize)?;
        let mut members: BTreeSet<usize> = BTreeSet::new();
        for source in [first, second] {
            if let Some(group) = self.groups.remove(&source) {
                members.extend(group.into_members());
            }
        }
        for &member in &members {
            self.pieces[member].group = Some(id);
        }
        debug!(group = %id, absorbed = %second, into = %first, size = members.len(), "groups merged");
        self.groups.insert(id, Group::from_members(id, members));
        Ok(id)
    }

    /// Records that `target` now sits correctly against `anchor`.
    ///
    /// Returns the group holding both, or `None` when they already shared one.
    pub fn join(&mut self, anchor: usize, target: usize) -> Result<Option<GroupId>, GroupError> {
        let anchor_group = self.piece_ref(anchor)?.group;
        let target_group = self.piece_ref(target)?.group;
        let joined = match (anchor_group, target_group) {
            (None, None) => self.create_group(anchor, target)?,
            (Some(group), None) => self.extend_group(group, target)?,
            (None, Some(group)) => self.extend_group(group, anchor)?,
            (Some(a), Some(b)) if a == b => return Ok(None),
            (Some(a), Some(b)) => self.merge_groups(a, b)?,
        };
        if self.is_complete() {
            info!(pieces = self.pieces.len(), "puzzle complete");
        }
        Ok(Some(joined))
    }

    /// The piece and every member of its group, ascending.
    pub(crate) fn cluster_of(&self, id: usize) -> Vec<usize> {
        match self.group_of(id) {
            Some(group) => group.members().collect(),
            None => vec![id],
        }
    }

    pub(crate) fn translate(&mut self, members: &[usize], dx: f64, dy: f64) {
        for &member in members {
            if let Some(piece) = self.pieces.get_mut(member) {
                piece.location = piece.location.offset(dx, dy);
                self.record_move(member);
            }
        }
    }

    pub(crate) fn record_move(&mut self, id: usize) {
        if !self.moves.contains(&id) {
            self.moves.push(id);
        }
    }

    fn piece_ref(&self, id: usize) -> Result<&Piece, GroupError> {
        self.pieces.get(id).ok_or(GroupError::UnknownPiece(id))
    }

    fn ensure_loose(&self, id: usize) -> Result<(), GroupError> {
        match self.piece_ref(id)?.group {
            Some(group) => Err(GroupError::AlreadyGrouped { piece: id, group }),
            None => Ok(()),
        }
    }

    /// The last generation is never handed out, so the counter always has a
    /// successor to store.
    fn allocate_group_id(&mut self, anchor: usize) -> Result<GroupId, GroupError> {
        let generation = self.next_generation;
        self.next_generation = generation
            .checked_add(1)
            .ok_or(GroupError::GenerationsExhausted)?;
        Ok(GroupId {
            anchor: anchor as u32,
            generation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn puzzle(rotation_steps: u32) -> Puzzle {
        let mut puzzle =
            Puzzle::with_rng(100, 100, 100, StdRng::seed_from_u64(5)).expect("puzzle");
        puzzle.setup(9, rotation_steps, 2).expect("setup");
        puzzle
    }

    #[test]
    fn setup_spreads_pieces_on_the_pitch() {
        let puzzle = puzzle(0);
        assert_eq!(puzzle.piece_size(), 32);
        assert_eq!(puzzle.piece_overlap(), 8);
        assert_eq!(puzzle.pitch(), 48.0);
        assert_eq!(puzzle.snap_distance(), 10.0);
        let piece = puzzle.piece_at(2, 1).expect("piece");
        assert_eq!(piece.id(), 7);
        assert_eq!(piece.location(), Location::new(48.0, 96.0));
        assert_eq!(piece.neighbor(Side::Bottom), None);
        assert_eq!(piece.neighbor(Side::Top), Some(4));
    }

    #[test]
    fn rejected_setup_leaves_state_alone() {
        let mut puzzle = puzzle(0);
        let before: Vec<_> = puzzle.pieces().to_vec();
        assert_eq!(
            puzzle.setup(10, 0, 2),
            Err(SetupError::UnsupportedPieceCount(10))
        );
        assert_eq!(puzzle.setup(9, 7, 2), Err(SetupError::RotationSteps(7)));
        assert_eq!(puzzle.setup(9, 0, 11), Err(SetupError::SnapStrength(11)));
        assert_eq!(puzzle.pieces(), before.as_slice());
    }

    #[test]
    fn grouping_rules() {
        let mut puzzle = puzzle(0);
        assert_eq!(puzzle.create_group(0, 0), Err(GroupError::SamePiece(0)));
        let group = puzzle.create_group(0, 1).expect("group");
        assert!(matches!(
            puzzle.create_group(1, 2),
            Err(GroupError::AlreadyGrouped { piece: 1, .. })
        ));
        assert!(matches!(
            puzzle.extend_group(group, 0),
            Err(GroupError::AlreadyGrouped { piece: 0, .. })
        ));
        assert_eq!(puzzle.extend_group(group, 2), Ok(group));
        assert_eq!(puzzle.group(group).map(Group::len), Some(3));
        assert_eq!(puzzle.merge_groups(group, group), Err(GroupError::SameGroup(group)));
    }

    #[test]
    fn merge_creates_a_fresh_group() {
        let mut puzzle = puzzle(0);
        let a = puzzle.create_group(0, 1).expect("a");
        let b = puzzle.create_group(3, 4).expect("b");
        let merged = puzzle.merge_groups(a, b).expect("merge");
        assert_ne!(merged, a);
        assert_ne!(merged, b);
        assert!(puzzle.group(a).is_none());
        assert!(puzzle.group(b).is_none());
        assert_eq!(puzzle.group_count(), 1);
        for id in [0, 1, 3, 4] {
            assert_eq!(puzzle.piece(id).and_then(Piece::group), Some(merged));
        }
        assert_eq!(puzzle.extend_group(a, 5), Err(GroupError::UnknownGroup(a)));
    }

    #[test]
    fn join_dispatch() {
        let mut puzzle = puzzle(0);
        let first = puzzle.join(0, 1).expect("join").expect("group");
        let extended = puzzle.join(2, 1).expect("join").expect("group");
        assert_eq!(first, extended);
        assert_eq!(puzzle.join(0, 2), Ok(None));
        let other = puzzle.join(3, 4).expect("join").expect("group");
        let merged = puzzle.join(4, 1).expect("join").expect("group");
        assert_ne!(merged, other);
        assert_eq!(puzzle.group(merged).map(Group::len), Some(5));
    }

    #[test]
    fn moving_a_grouped_piece_drags_its_group() {
        let mut puzzle = puzzle(0);
        puzzle.create_group(0, 1).expect("group");
        let before = puzzle.piece(1).expect("piece").location();
        assert!(puzzle.move_piece_to(0, 10.0, 20.0));
        assert_eq!(
            puzzle.piece(1).expect("piece").location(),
            before.offset(10.0, 20.0)
        );
        let mut moves = puzzle.take_moves();
        moves.sort_unstable();
        assert_eq!(moves, vec![0, 1]);
        assert!(puzzle.take_moves().is_empty());
        assert!(!puzzle.move_piece_to(99, 0.0, 0.0));
    }

    #[test]
    fn single_piece_rotation_direction() {
        let mut puzzle = puzzle(4);
        let start = puzzle.piece(4).expect("piece").rotation_step();
        assert!(puzzle.rotate_piece(4, true));
        assert_eq!(puzzle.piece(4).expect("piece").rotation_step(), (start + 1) % 4);
        assert!(puzzle.rotate_piece(4, false));
        assert!(puzzle.rotate_piece(4, false));
        assert_eq!(puzzle.piece(4).expect("piece").rotation_step(), (start + 3) % 4);
    }

    #[test]
    fn rotation_disabled_is_a_no_op() {
        let mut puzzle = puzzle(0);
        assert!(!puzzle.rotate_piece(4, true));
        assert!(puzzle.take_moves().is_empty());
    }

    #[test]
    fn progress_counts_grouped_pieces() {
        let mut puzzle = puzzle(0);
        assert_eq!(puzzle.progress(), 0);
        puzzle.create_group(0, 1).expect("group");
        assert_eq!(puzzle.progress(), 22);
        assert!(!puzzle.is_complete());
    }
}
