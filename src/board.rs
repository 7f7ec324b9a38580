//! Cell grid: maps continuous coordinates onto canonical cells.
//!
//! Every lookup goes through one table so the same `(i, j)` always yields
//! the same `Arc<Cell>`; callers may compare with `Arc::ptr_eq`.
//!
//! Indices are confined to `±MAX_CELL_INDEX` so differences between any
//! two cells, and a window of any radius around one, stay inside `i32`.

use crate::error::{GameError, Result};
use crate::types::{Cell, CellBounds, LatLng};
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

/// Largest cell index magnitude a position may map to.
pub const MAX_CELL_INDEX: i32 = 1 << 30;

pub struct Board {
    /// Side of a cell in degrees.
    pub tile_width: f64,
    known_cells: RwLock<HashMap<(i32, i32), Arc<Cell>>>,
}

impl Board {
    pub fn new(tile_width: f64) -> Self {
        Self {
            tile_width,
            known_cells: RwLock::new(HashMap::new()),
        }
    }

    /// Raw indices of the cell containing `point`, clamped to
    /// `±MAX_CELL_INDEX`. Use [`Board::locate`] to reject such points.
    pub fn indices_for(&self, point: LatLng) -> (i32, i32) {
        (
            clamp_index(point.lat / self.tile_width),
            clamp_index(point.lng / self.tile_width),
        )
    }

    /// Indices of the cell containing `point`, or `InvalidPosition` when a
    /// coordinate is not finite or lands past `MAX_CELL_INDEX`.
    pub fn locate(&self, point: LatLng) -> Result<(i32, i32)> {
        let invalid = |reason: &str| GameError::InvalidPosition {
            position: point,
            reason: reason.to_string(),
        };
        if !point.lat.is_finite() || !point.lng.is_finite() {
            return Err(invalid("non-finite coordinate"));
        }

        let limit = f64::from(MAX_CELL_INDEX);
        let i = (point.lat / self.tile_width).floor();
        let j = (point.lng / self.tile_width).floor();
        if !(-limit..=limit).contains(&i) || !(-limit..=limit).contains(&j) {
            return Err(invalid("outside the cell grid"));
        }
        Ok((i as i32, j as i32))
    }

    /// The canonical cell containing `point` (see [`Board::indices_for`]).
    ///
    /// Identity holds while someone keeps the returned `Arc` or the cell
    /// stays in the table; see [`Board::forget_distant_cells`].
    pub fn cell_at(&self, point: LatLng) -> Arc<Cell> {
        let (i, j) = self.indices_for(point);
        self.canonical(i, j)
    }

    pub fn cell_by_indices(&self, i: i32, j: i32) -> Arc<Cell> {
        self.canonical(i, j)
    }

    pub fn bounds_of(&self, cell: &Cell) -> CellBounds {
        CellBounds {
            south_west: LatLng::new(
                f64::from(cell.i) * self.tile_width,
                f64::from(cell.j) * self.tile_width,
            ),
            north_east: LatLng::new(
                (f64::from(cell.i) + 1.0) * self.tile_width,
                (f64::from(cell.j) + 1.0) * self.tile_width,
            ),
        }
    }

    /// The `(2r+1)^2` square of cells around the cell containing `point`,
    /// row by row from the south-west corner.
    pub fn cells_near(&self, point: LatLng, radius: i32) -> Vec<Arc<Cell>> {
        let (oi, oj) = self.indices_for(point);
        let radius = radius.clamp(0, MAX_CELL_INDEX);
        let side = 2 * radius as usize + 1;
        let mut cells = Vec::with_capacity(side * side);

        for di in -radius..=radius {
            for dj in -radius..=radius {
                cells.push(self.canonical(oi.saturating_add(di), oj.saturating_add(dj)));
            }
        }

        cells
    }

    pub fn known_cells(&self) -> usize {
        self.known_cells.read().len()
    }

    /// Forget every canonical cell further than `max_cells` (Chebyshev)
    /// from `origin` that nobody outside the table still holds. Held cells
    /// stay, so an `Arc` handed out earlier remains the canonical instance.
    pub fn forget_distant_cells(&self, origin: &Cell, max_cells: i32) {
        let max_cells = max_cells.unsigned_abs();
        let mut known = self.known_cells.write();
        known.retain(|(i, j), cell| {
            Arc::strong_count(cell) > 1
                || (i.abs_diff(origin.i) <= max_cells && j.abs_diff(origin.j) <= max_cells)
        });
    }

    fn canonical(&self, i: i32, j: i32) -> Arc<Cell> {
        if let Some(cell) = self.known_cells.read().get(&(i, j)) {
            return cell.clone();
        }

        let mut known = self.known_cells.write();
        match known.entry((i, j)) {
            Entry::Occupied(e) => e.get().clone(),
            Entry::Vacant(v) => {
                let cell = Arc::new(Cell::new(i, j));
                v.insert(cell.clone());
                cell
            }
        }
    }
}

fn clamp_index(scaled: f64) -> i32 {
    let limit = f64::from(MAX_CELL_INDEX);
    // NaN survives `clamp` and casts to 0.
    scaled.floor().clamp(-limit, limit) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_handles_negative_coordinates() {
        let board = Board::new(1.0);
        assert_eq!(board.indices_for(LatLng::new(-0.5, 2.5)), (-1, 2));
        assert_eq!(board.indices_for(LatLng::new(0.0, -0.0001)), (0, -1));
    }

    #[test]
    fn bounds_contain_their_points() {
        let board = Board::new(0.5);
        let point = LatLng::new(1.2, -0.7);
        let cell = board.cell_at(point);
        assert!(board.bounds_of(&cell).contains(point));
    }

    #[test]
    fn far_points_are_rejected_not_merged() {
        let board = Board::new(1e-4);
        for point in [
            LatLng::new(1e6, 0.0),
            LatLng::new(0.0, -2e6),
            LatLng::new(f64::NAN, 0.0),
            LatLng::new(0.0, f64::INFINITY),
        ] {
            let err = board.locate(point).unwrap_err();
            assert!(matches!(err, GameError::InvalidPosition { .. }), "{point:?}");
        }
        assert_eq!(board.locate(LatLng::new(0.00025, -0.00015)).unwrap(), (2, -2));
    }

    #[test]
    fn edge_of_grid_window_does_not_overflow() {
        let board = Board::new(1e-4);
        let near = board.cells_near(LatLng::new(1e6, -1e6), 1);
        assert_eq!(near.len(), 9);
        assert!(near
            .iter()
            .all(|c| c.i.abs() <= MAX_CELL_INDEX + 1 && c.j.abs() <= MAX_CELL_INDEX + 1));

        let corner = Cell::new(i32::MAX, i32::MIN);
        let bounds = board.bounds_of(&corner);
        assert!(bounds.north_east.lat > bounds.south_west.lat);
    }

    #[test]
    fn table_grows_lazily() {
        let board = Board::new(1.0);
        assert_eq!(board.known_cells(), 0);
        board.cell_by_indices(0, 0);
        board.cell_by_indices(0, 0);
        assert_eq!(board.known_cells(), 1);
    }
}
