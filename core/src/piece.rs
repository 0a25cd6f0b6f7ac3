use crate::edge::{EdgeCurve, PieceEdges};
use crate::geometry::{Location, Side};
use crate::group::GroupId;

/// A single tile. Grid position, neighbors and curves never change after
/// setup; placement and group membership do.
#[derive(Clone, Debug, PartialEq)]
pub struct Piece {
    id: usize,
    row: u32,
    col: u32,
    neighbors: [Option<usize>; 4],
    edges: PieceEdges,
    pub(crate) location: Location,
    pub(crate) rotation_step: u32,
    pub(crate) group: Option<GroupId>,
    pub(crate) visible: bool,
}

impl Piece {
    pub(crate) fn new(
        id: usize,
        row: u32,
        col: u32,
        neighbors: [Option<usize>; 4],
        edges: PieceEdges,
    ) -> Self {
        Self {
            id,
            row,
            col,
            neighbors,
            edges,
            location: Location::default(),
            rotation_step: 0,
            group: None,
            visible: true,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn row(&self) -> u32 {
        self.row
    }

    pub fn col(&self) -> u32 {
        self.col
    }

    pub fn neighbor(&self, side: Side) -> Option<usize> {
        self.neighbors[side.index()]
    }

    pub fn neighbors(&self) -> impl Iterator<Item = (Side, usize)> + '_ {
        Side::ALL
            .into_iter()
            .filter_map(|side| self.neighbor(side).map(|id| (side, id)))
    }

    pub fn edges(&self) -> &PieceEdges {
        &self.edges
    }

    pub fn curve(&self, side: Side) -> &EdgeCurve {
        self.edges.side(side)
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn rotation_step(&self) -> u32 {
        self.rotation_step
    }

    pub fn group(&self) -> Option<GroupId> {
        self.group
    }

    pub fn is_grouped(&self) -> bool {
        self.group.is_some()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}
