use crate::group::GroupId;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SetupError {
    #[error("piece count {0} is not offered for this image")]
    UnsupportedPieceCount(u32),
    #[error("rotation steps must be within 0..=6, got {0}")]
    RotationSteps(u32),
    #[error("snap strength must be within 1..=10, got {0}")]
    SnapStrength(u32),
    #[error("max pieces must be at least 4, got {0}")]
    MaxPieces(u32),
    #[error("invalid image dimensions {width}x{height}")]
    ImageSize { width: u32, height: u32 },
    #[error("piece {id} has an unresolved {side} edge after generation")]
    UnresolvedEdge { id: usize, side: &'static str },
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GroupError {
    #[error("no such piece: {0}")]
    UnknownPiece(usize),
    #[error("no such group: {0}")]
    UnknownGroup(GroupId),
    #[error("piece {0} cannot be grouped with itself")]
    SamePiece(usize),
    #[error("piece {piece} already belongs to group {group}")]
    AlreadyGrouped { piece: usize, group: GroupId },
    #[error("group {0} cannot be merged with itself")]
    SameGroup(GroupId),
    #[error("group generations are exhausted")]
    GenerationsExhausted,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReconstructError {
    #[error(transparent)]
    Config(#[from] SetupError),
    #[error("snapshot version {found} is not supported (expected {expected})")]
    Version { expected: u32, found: u32 },
    #[error("grid {rows}x{cols} with piece size {piece_size} is invalid")]
    Grid { rows: u32, cols: u32, piece_size: u32 },
    #[error("expected {expected} piece records, found {found}")]
    PieceCount { expected: usize, found: usize },
    #[error("piece record {id} is missing")]
    MissingPiece { id: u32 },
    #[error("piece record {id} is duplicated")]
    DuplicatePiece { id: u32 },
    #[error("piece {id} is stored at row {row} column {col}, which does not match its id")]
    PiecePosition { id: u32, row: u32, col: u32 },
    #[error("piece {id} references neighbor {neighbor} on its {side} side, expected {expected:?}")]
    Neighbor {
        id: u32,
        side: &'static str,
        neighbor: u32,
        expected: Option<u32>,
    },
    #[error("piece {id} is missing its {side} neighbor")]
    MissingNeighbor { id: u32, side: &'static str },
    #[error("piece {id} has an empty {side} curve")]
    EmptyCurve { id: u32, side: &'static str },
    #[error("piece {id} rotation step {step} is out of range")]
    RotationStep { id: u32, step: u32 },
    #[error("piece {piece} references unknown group {group}")]
    UnknownGroup { piece: u32, group: GroupId },
    #[error("group {group} lists unknown piece {piece}")]
    UnknownMember { group: GroupId, piece: u32 },
    #[error("group {group} lists piece {piece} twice")]
    DuplicateMember { group: GroupId, piece: u32 },
    #[error("piece {piece} stores group {group}, which does not list it")]
    Unlisted { piece: u32, group: GroupId },
    #[error("group {0} is duplicated")]
    DuplicateGroup(GroupId),
    #[error("group {0} has a generation with no successor")]
    Generation(GroupId),
    #[error("group {group} has {count} members, at least 2 are required")]
    GroupTooSmall { group: GroupId, count: usize },
    #[error("piece {piece} is listed by group {listed} but stores group {stored:?}")]
    Membership {
        piece: u32,
        listed: GroupId,
        stored: Option<GroupId>,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(rkyv::rancor::Error),
    #[error("decode failed: {0}")]
    Decode(rkyv::rancor::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum PuzzleError {
    #[error(transparent)]
    Setup(#[from] SetupError),
    #[error(transparent)]
    Group(#[from] GroupError),
    #[error(transparent)]
    Reconstruct(#[from] ReconstructError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}
