//! Uniform spatial hashing used to prune fixed-radius neighbor searches.
//!
//! The [`Grid`] bins points into cubic cells whose edge equals the query radius, so every
//! candidate within the radius lives in the 27 cells surrounding the query point.

use super::types::Point;
use std::collections::HashMap;

type CellKey = (i64, i64, i64);

/// Sparse cubic-cell bucketing of `(position, item)` pairs.
#[derive(Debug, Clone)]
pub struct Grid<T> {
    cell_size: f64,
    cells: HashMap<CellKey, Vec<usize>>,
    items: Vec<(Point, T)>,
}

impl<T> Grid<T> {
    /// Bins every item by its position.
    ///
    /// # Panics
    ///
    /// Panics if `cell_size` is not strictly positive.
    pub fn new(items: impl IntoIterator<Item = (Point, T)>, cell_size: f64) -> Self {
        assert!(cell_size > 0.0, "Cell size must be positive");

        let items: Vec<(Point, T)> = items.into_iter().collect();
        let mut cells: HashMap<CellKey, Vec<usize>> = HashMap::new();
        for (slot, (pos, _)) in items.iter().enumerate() {
            cells.entry(cell_key(pos, cell_size)).or_default().push(slot);
        }

        Self {
            cell_size,
            cells,
            items,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Yields every item whose position lies within `radius` (inclusive) of `center`.
    ///
    /// `radius` may exceed the cell size; the scan widens to cover it.
    pub fn within<'a>(&'a self, center: &Point, radius: f64) -> impl Iterator<Item = &'a T> + 'a {
        let reach = (radius / self.cell_size).ceil().max(1.0) as i64;
        let (cx, cy, cz) = cell_key(center, self.cell_size);
        let center = *center;
        let radius_sq = radius * radius;

        (-reach..=reach)
            .flat_map(move |dx| {
                (-reach..=reach)
                    .flat_map(move |dy| (-reach..=reach).map(move |dz| (cx + dx, cy + dy, cz + dz)))
            })
            .filter_map(move |key| self.cells.get(&key))
            .flatten()
            .filter_map(move |&slot| {
                let (pos, item) = &self.items[slot];
                (nalgebra::distance_squared(pos, &center) <= radius_sq).then_some(item)
            })
    }
}

fn cell_key(pos: &Point, cell_size: f64) -> CellKey {
    (
        (pos.x / cell_size).floor() as i64,
        (pos.y / cell_size).floor() as i64,
        (pos.z / cell_size).floor() as i64,
    )
}
