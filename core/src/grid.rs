use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const PIECE_SIZE_MIN: u32 = 32;
pub const PIECE_SIZE_STEP: u32 = 4;
/// Pieces never exceed a third of the smaller image side, so grids are at least 3x3.
pub const PIECE_SIZE_DIVISOR: u32 = 3;
pub const MAX_PIECES_DEFAULT: u32 = 2000;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridChoice {
    pub rows: u32,
    pub cols: u32,
    pub piece_size: u32,
    /// Offset that centers the tiled area inside the source image.
    pub offset_x: u32,
    pub offset_y: u32,
}

impl GridChoice {
    pub fn new(piece_size: u32, width: u32, height: u32) -> Self {
        let rows = height / piece_size;
        let cols = width / piece_size;
        Self {
            rows,
            cols,
            piece_size,
            offset_x: (width - cols * piece_size) / 2,
            offset_y: (height - rows * piece_size) / 2,
        }
    }

    pub fn piece_count(&self) -> u32 {
        self.rows * self.cols
    }
}

pub fn grid_choice_label(count: u32, choice: &GridChoice) -> String {
    format!(
        "{} pieces ({}x{}, {}px)",
        count, choice.cols, choice.rows, choice.piece_size
    )
}

/// Enumerates every achievable piece count for an image, keyed by count.
///
/// Smaller piece sizes are tried first and keep their slot when a larger
/// size produces the same count.
pub fn build_grid_choices(width: u32, height: u32, max_pieces: u32) -> BTreeMap<u32, GridChoice> {
    let mut choices = BTreeMap::new();
    let max_piece_size = width.min(height) / PIECE_SIZE_DIVISOR;
    let mut piece_size = PIECE_SIZE_MIN;
    while piece_size <= max_piece_size {
        let choice = GridChoice::new(piece_size, width, height);
        let count = choice.piece_count();
        if count > 0 && count <= max_pieces {
            choices.entry(count).or_insert(choice);
        }
        piece_size += PIECE_SIZE_STEP;
    }
    choices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiny_image_has_no_choices() {
        assert!(build_grid_choices(90, 300, MAX_PIECES_DEFAULT).is_empty());
    }

    #[test]
    fn first_piece_size_wins_for_a_count() {
        let choices = build_grid_choices(120, 120, MAX_PIECES_DEFAULT);
        assert_eq!(choices.len(), 1);
        let choice = choices[&9];
        assert_eq!(choice.piece_size, 32);
        assert_eq!((choice.rows, choice.cols), (3, 3));
        assert_eq!((choice.offset_x, choice.offset_y), (12, 12));
    }

    #[test]
    fn bound_excludes_large_counts() {
        let choices = build_grid_choices(1920, 1080, 500);
        assert!(choices.keys().all(|count| *count <= 500));
        assert!(!choices.is_empty());
        let all = build_grid_choices(1920, 1080, u32::MAX);
        assert_eq!(all[&(33 * 60)].piece_size, 32);
    }

    #[test]
    fn tiled_area_is_centered() {
        for choice in build_grid_choices(1000, 700, MAX_PIECES_DEFAULT).values() {
            let used_w = choice.cols * choice.piece_size;
            let used_h = choice.rows * choice.piece_size;
            assert!(used_w <= 1000 && used_h <= 700);
            assert_eq!(choice.offset_x, (1000 - used_w) / 2);
            assert_eq!(choice.offset_y, (700 - used_h) / 2);
        }
    }
}
