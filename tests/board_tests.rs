//! Board unit tests

#[cfg(test)]
mod tests {
    use geocoin_world::board::Board;
    use geocoin_world::types::{Cell, LatLng};
    use std::collections::HashSet;
    use std::sync::Arc;

    fn make_board() -> Board {
        Board::new(1e-4)
    }

    // -----------------------------------------------------------------------
    // Canonical cells
    // -----------------------------------------------------------------------

    #[test]
    fn same_point_returns_same_instance() {
        let board = make_board();
        let p = LatLng::new(36.98949379578401, -122.06277128548504);
        let a = board.cell_at(p);
        let b = board.cell_at(p);
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn indices_and_points_share_instances() {
        let board = make_board();
        let by_point = board.cell_at(LatLng::new(0.00025, -0.00015));
        assert_eq!(*by_point, Cell::new(2, -2));

        let by_indices = board.cell_by_indices(2, -2);
        assert!(Arc::ptr_eq(&by_point, &by_indices));
    }

    #[test]
    fn different_points_in_one_tile_share_instance() {
        let board = Board::new(1.0);
        let a = board.cell_at(LatLng::new(3.01, 4.01));
        let b = board.cell_at(LatLng::new(3.99, 4.99));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn neighborhood_reuses_instances() {
        let board = Board::new(1.0);
        let near = board.cells_near(LatLng::new(0.5, 0.5), 1);
        let corner = board.cell_by_indices(-1, -1);
        assert!(near.iter().any(|c| Arc::ptr_eq(c, &corner)));
    }

    // -----------------------------------------------------------------------
    // Bounds
    // -----------------------------------------------------------------------

    #[test]
    fn bounds_span_one_tile() {
        let board = Board::new(0.5);
        let bounds = board.bounds_of(&Cell::new(-2, 3));
        assert_eq!(bounds.south_west, LatLng::new(-1.0, 1.5));
        assert_eq!(bounds.north_east, LatLng::new(-0.5, 2.0));
    }

    // -----------------------------------------------------------------------
    // Neighborhood
    // -----------------------------------------------------------------------

    #[test]
    fn neighborhood_is_a_square() {
        let board = Board::new(1.0);
        let cells: HashSet<Cell> = board
            .cells_near(LatLng::new(0.5, 0.5), 1)
            .iter()
            .map(|c| **c)
            .collect();

        let expected: HashSet<Cell> = (-1..=1)
            .flat_map(|i| (-1..=1).map(move |j| Cell::new(i, j)))
            .collect();
        assert_eq!(cells, expected);
    }

    #[test]
    fn neighborhood_size_grows_with_radius() {
        let board = Board::new(1.0);
        for r in 0..5 {
            let n = board.cells_near(LatLng::new(10.5, -3.5), r).len();
            assert_eq!(n, ((2 * r + 1) * (2 * r + 1)) as usize);
        }
    }

    // -----------------------------------------------------------------------
    // Table bounding
    // -----------------------------------------------------------------------

    #[test]
    fn forget_keeps_nearby_cells() {
        let board = Board::new(1.0);
        board.cells_near(LatLng::new(0.5, 0.5), 5);
        assert_eq!(board.known_cells(), 121);

        let kept = board.cell_by_indices(1, 1);
        board.forget_distant_cells(&Cell::new(0, 0), 1);
        assert_eq!(board.known_cells(), 9);

        assert!(Arc::ptr_eq(&kept, &board.cell_by_indices(1, 1)));
        // Nobody held (5, 5): it comes back as an equal value.
        assert_eq!(*board.cell_by_indices(5, 5), Cell::new(5, 5));
    }

    #[test]
    fn held_cells_stay_canonical_across_forget() {
        let board = Board::new(1.0);
        board.cells_near(LatLng::new(0.5, 0.5), 5);
        let held = board.cell_by_indices(5, 5);

        board.forget_distant_cells(&Cell::new(0, 0), 1);
        assert_eq!(board.known_cells(), 10);
        assert!(Arc::ptr_eq(&held, &board.cell_by_indices(5, 5)));
        assert!(Arc::ptr_eq(&held, &board.cell_at(LatLng::new(5.5, 5.5))));

        drop(held);
        board.forget_distant_cells(&Cell::new(0, 0), 1);
        assert_eq!(board.known_cells(), 9);
    }
}
