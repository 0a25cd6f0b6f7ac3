//! Tab/blank curves for piece sides.
//!
//! Curves live in a square frame of `EDGE_SPAN + 2 * EDGE_MARGIN` units per
//! piece: the piece's nominal square spans `EDGE_MARGIN..EDGE_MARGIN +
//! EDGE_SPAN` on both axes and the margin leaves room for tabs. Every side
//! runs clockwise around the piece, so the two pieces sharing an edge
//! traverse it in opposite directions.

use rand::Rng;
use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

use crate::error::SetupError;
use crate::geometry::Side;

pub const EDGE_SPAN: i32 = 800;
pub const EDGE_MARGIN: i32 = EDGE_SPAN / 4;

const BASE_TEMPLATE: [(i32, i32); 6] = [
    (0, 0),
    (300, 20),
    (350, -120),
    (450, -120),
    (500, 20),
    (800, 0),
];

/// Jitter ranges for template points 1..=4, as `(x range, y range)`.
const JITTER: [((i32, i32), (i32, i32)); 4] = [
    ((-30, 20), (10, 50)),
    ((-30, 30), (-50, 10)),
    ((-30, 30), (-50, 10)),
    ((-10, 30), (10, 50)),
];

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Archive, RkyvSerialize,
    RkyvDeserialize,
)]
pub struct CurvePoint {
    pub x: i32,
    pub y: i32,
}

impl CurvePoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

pub type EdgeCurve = Vec<CurvePoint>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceEdges {
    pub top: EdgeCurve,
    pub bottom: EdgeCurve,
    pub left: EdgeCurve,
    pub right: EdgeCurve,
}

impl PieceEdges {
    pub fn side(&self, side: Side) -> &EdgeCurve {
        match side {
            Side::Top => &self.top,
            Side::Bottom => &self.bottom,
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }
}

pub fn flat_curve() -> EdgeCurve {
    vec![CurvePoint::new(0, 0), CurvePoint::new(EDGE_SPAN, 0)]
}

/// Jitters the base template and flips it across its baseline on a coin toss.
pub fn random_curve<R: Rng>(rng: &mut R) -> EdgeCurve {
    let mut points = Vec::with_capacity(BASE_TEMPLATE.len());
    for (index, &(x, y)) in BASE_TEMPLATE.iter().enumerate() {
        let interior = index.checked_sub(1).and_then(|slot| JITTER.get(slot));
        let point = match interior {
            Some(&((x_lo, x_hi), (y_lo, y_hi))) => {
                let jx = if rng.random_bool(0.5) {
                    rng.random_range(x_lo..x_hi)
                } else {
                    0
                };
                let jy = if rng.random_bool(0.5) {
                    rng.random_range(y_lo..y_hi)
                } else {
                    0
                };
                CurvePoint::new(x + jx, y + jy)
            }
            None => CurvePoint::new(x, y),
        };
        points.push(point);
    }
    if rng.random_bool(0.5) {
        points = flip_vertical(&points);
    }
    points
}

pub fn reversed(curve: &[CurvePoint]) -> EdgeCurve {
    curve.iter().rev().copied().collect()
}

pub fn swapped(curve: &[CurvePoint]) -> EdgeCurve {
    curve.iter().map(|p| CurvePoint::new(p.y, p.x)).collect()
}

pub fn flip_vertical(curve: &[CurvePoint]) -> EdgeCurve {
    curve.iter().map(|p| CurvePoint::new(p.x, -p.y)).collect()
}

pub fn offset(curve: &[CurvePoint], dx: i32, dy: i32) -> EdgeCurve {
    curve
        .iter()
        .map(|p| CurvePoint::new(p.x + dx, p.y + dy))
        .collect()
}

/// Places a canonical left-to-right curve on `side` of a piece frame.
pub fn place_on_side(canonical: &[CurvePoint], side: Side) -> EdgeCurve {
    let far = EDGE_MARGIN + EDGE_SPAN;
    match side {
        Side::Top => offset(canonical, EDGE_MARGIN, EDGE_MARGIN),
        Side::Bottom => offset(&reversed(canonical), EDGE_MARGIN, far),
        Side::Right => offset(&swapped(canonical), far, EDGE_MARGIN),
        Side::Left => offset(&reversed(&swapped(canonical)), EDGE_MARGIN, EDGE_MARGIN),
    }
}

/// Derives the curve a neighbor sees on its opposite side from the curve on
/// `side` of this piece: same points, reverse order, shifted one span.
pub fn neighbor_curve(curve: &[CurvePoint], side: Side) -> EdgeCurve {
    let (ux, uy) = side.unit();
    let dx = -(ux as i32) * EDGE_SPAN;
    let dy = -(uy as i32) * EDGE_SPAN;
    offset(&reversed(curve), dx, dy)
}

pub fn is_flat(curve: &[CurvePoint]) -> bool {
    curve.len() == 2
}

/// Builds every piece's four curves for a `rows` x `cols` grid.
///
/// The first pass walks rows and resolves bottom/top pairs, the second walks
/// columns and resolves right/left pairs. Each interior curve is drawn once
/// on the piece nearer the origin and mirrored onto its neighbor.
pub fn generate_edges<R: Rng>(
    rows: usize,
    cols: usize,
    rng: &mut R,
) -> Result<Vec<PieceEdges>, SetupError> {
    let total = rows * cols;
    let mut slots: Vec<[Option<EdgeCurve>; 4]> = vec![[None, None, None, None]; total];
    let flat = flat_curve();

    for row in 0..rows {
        for col in 0..cols {
            let id = row * cols + col;
            if row == 0 {
                slots[id][Side::Top.index()] = Some(place_on_side(&flat, Side::Top));
            }
            if row + 1 == rows {
                slots[id][Side::Bottom.index()] = Some(place_on_side(&flat, Side::Bottom));
            } else {
                let bottom = place_on_side(&random_curve(rng), Side::Bottom);
                slots[id + cols][Side::Top.index()] = Some(neighbor_curve(&bottom, Side::Bottom));
                slots[id][Side::Bottom.index()] = Some(bottom);
            }
        }
    }

    for col in 0..cols {
        for row in 0..rows {
            let id = row * cols + col;
            if col == 0 {
                slots[id][Side::Left.index()] = Some(place_on_side(&flat, Side::Left));
            }
            if col + 1 == cols {
                slots[id][Side::Right.index()] = Some(place_on_side(&flat, Side::Right));
            } else {
                let right = place_on_side(&random_curve(rng), Side::Right);
                slots[id + 1][Side::Left.index()] = Some(neighbor_curve(&right, Side::Right));
                slots[id][Side::Right.index()] = Some(right);
            }
        }
    }

    let mut edges = Vec::with_capacity(total);
    for (id, slot) in slots.into_iter().enumerate() {
        let [top, bottom, left, right] = slot;
        let resolve = |curve: Option<EdgeCurve>, side: Side| {
            curve.ok_or(SetupError::UnresolvedEdge {
                id,
                side: side.name(),
            })
        };
        edges.push(PieceEdges {
            top: resolve(top, Side::Top)?,
            bottom: resolve(bottom, Side::Bottom)?,
            left: resolve(left, Side::Left)?,
            right: resolve(right, Side::Right)?,
        });
    }
    Ok(edges)
}
