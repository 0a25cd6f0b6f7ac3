use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// Top-left canvas position of a piece's nominal square.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Archive, RkyvSerialize,
    RkyvDeserialize,
)]
pub struct Location {
    pub x: f64,
    pub y: f64,
}

impl Location {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn distance(self, other: Location) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One side of a piece, listed in snap scan order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Archive, RkyvSerialize,
    RkyvDeserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Top,
    Bottom,
    Left,
    Right,
}

impl Side {
    pub const ALL: [Side; 4] = [Side::Top, Side::Bottom, Side::Left, Side::Right];

    pub const fn opposite(self) -> Side {
        match self {
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Side::Top => 0,
            Side::Bottom => 1,
            Side::Left => 2,
            Side::Right => 3,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Side::Top => "top",
            Side::Bottom => "bottom",
            Side::Left => "left",
            Side::Right => "right",
        }
    }

    /// Unit vector from a piece's center toward this side, screen axes (Y down).
    pub const fn unit(self) -> (f64, f64) {
        match self {
            Side::Top => (0.0, -1.0),
            Side::Bottom => (0.0, 1.0),
            Side::Left => (-1.0, 0.0),
            Side::Right => (1.0, 0.0),
        }
    }
}

/// Rotates a screen-space vector clockwise (as seen on screen) by `angle_deg`.
pub fn rotate_vec(x: f64, y: f64, angle_deg: f64) -> (f64, f64) {
    let theta = angle_deg.to_radians();
    let (sin, cos) = theta.sin_cos();
    (x * cos - y * sin, x * sin + y * cos)
}

/// Rotates `point` around `pivot` on screen. Positive angles turn clockwise.
///
/// The rotation runs in a Y-up frame: both points are flipped vertically,
/// rotated counter-clockwise by `-angle_deg`, then flipped back.
pub fn rotate_about(point: (f64, f64), pivot: (f64, f64), angle_deg: f64) -> (f64, f64) {
    let theta = (-angle_deg).to_radians();
    let (sin, cos) = theta.sin_cos();
    let dx = point.0 - pivot.0;
    let dy = -(point.1 - pivot.1);
    let x = dx * cos - dy * sin;
    let y = dx * sin + dy * cos;
    (pivot.0 + x, pivot.1 - y)
}

pub fn neighbor_id(id: usize, cols: usize, rows: usize, side: Side) -> Option<usize> {
    let col = id % cols;
    let row = id / cols;
    match side {
        Side::Top if row > 0 => Some(id - cols),
        Side::Bottom if row + 1 < rows => Some(id + cols),
        Side::Left if col > 0 => Some(id - 1),
        Side::Right if col + 1 < cols => Some(id + 1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: (f64, f64), b: (f64, f64)) -> bool {
        (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
    }

    #[test]
    fn quarter_turn_moves_right_neighbor_below() {
        assert!(close(rotate_vec(10.0, 0.0, 90.0), (0.0, 10.0)));
        assert!(close(rotate_about((10.0, 0.0), (0.0, 0.0), 90.0), (0.0, 10.0)));
    }

    #[test]
    fn rotate_about_matches_screen_rotation() {
        let pivot = (3.0, -7.0);
        for angle in [60.0, 72.0, 120.0, 180.0, 270.0] {
            let point = (11.0, 4.0);
            let (rx, ry) = rotate_vec(point.0 - pivot.0, point.1 - pivot.1, angle);
            assert!(close(
                rotate_about(point, pivot, angle),
                (pivot.0 + rx, pivot.1 + ry)
            ));
        }
    }

    #[test]
    fn neighbors_stop_at_grid_edges() {
        assert_eq!(neighbor_id(0, 3, 3, Side::Top), None);
        assert_eq!(neighbor_id(0, 3, 3, Side::Left), None);
        assert_eq!(neighbor_id(0, 3, 3, Side::Right), Some(1));
        assert_eq!(neighbor_id(4, 3, 3, Side::Bottom), Some(7));
        assert_eq!(neighbor_id(8, 3, 3, Side::Right), None);
    }
}
