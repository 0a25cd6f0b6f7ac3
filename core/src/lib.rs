pub mod codec;
pub mod config;
pub mod edge;
pub mod error;
pub mod game;
pub mod geometry;
pub mod grid;
pub mod group;
pub mod hint;
pub mod piece;
pub mod puzzle;
pub mod session;
pub mod snap;
pub mod snapshot;

pub use codec::{decode, decode_record, encode, encode_record};
pub use config::{rotation_step_angle, snap_distance, PuzzleConfig};
pub use edge::{CurvePoint, EdgeCurve, PieceEdges, EDGE_MARGIN, EDGE_SPAN};
pub use error::{CodecError, GroupError, PuzzleError, ReconstructError, SetupError};
pub use game::{GameRecord, PLAY_IDLE_LIMIT};
pub use geometry::{Location, Side};
pub use grid::{build_grid_choices, grid_choice_label, GridChoice};
pub use group::{Group, GroupId};
pub use hint::hint_chain_length;
pub use piece::Piece;
pub use puzzle::Puzzle;
pub use session::{Delta, PiecePlacement, Session};
pub use snap::SnapCandidate;
pub use snapshot::{GroupRecord, PieceRecord, PuzzleRecord, SNAPSHOT_VERSION};
