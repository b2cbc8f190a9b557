use std::collections::HashMap;

use crate::geometry::Vec3;

type CellCoord = (i64, i64);

/// A bucketed nearest-neighbor index over the XY projection of a point set.
///
/// Points are placed in square cells of side `cell_size`; queries scan the
/// block of cells covering the query radius rather than every bucket,
/// trading a small amount of over-scanning at cell boundaries for O(1)
/// insertion and roughly O(1) bounded-radius queries on data with uniform
/// density.
#[derive(Clone)]
pub struct SpatialHash2D<T> {
    cell_size: f32,
    cells: HashMap<CellCoord, Vec<(Vec3, T)>>,
}

impl<T: Copy> SpatialHash2D<T> {
    pub fn new(cell_size: f32) -> Self {
        assert!(cell_size > 0.0, "cell size must be positive");
        SpatialHash2D {
            cell_size,
            cells: HashMap::new(),
        }
    }

    #[inline]
    fn cell_of(&self, point: &Vec3) -> CellCoord {
        (
            (point.x / self.cell_size).floor() as i64,
            (point.y / self.cell_size).floor() as i64,
        )
    }

    pub fn add(&mut self, point: Vec3, payload: T) {
        let cell = self.cell_of(&point);
        self.cells.entry(cell).or_default().push((point, payload));
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.cells.values().all(|bucket| bucket.is_empty())
    }

    fn cells_within_radius(&self, query: &Vec3, radius: f32) -> impl Iterator<Item = CellCoord> {
        let (cx, cy) = self.cell_of(query);
        let span = (radius / self.cell_size).ceil() as i64 + 1;
        (cx - span..=cx + span).flat_map(move |x| (cy - span..=cy + span).map(move |y| (x, y)))
    }

    /// Returns the nearest point to `query` within `radius` (3-D distance),
    /// or `None` if no such point exists.
    pub fn find_nearest(&self, query: &Vec3, radius: f32) -> Option<(Vec3, T)> {
        let mut best: Option<(f32, Vec3, T)> = None;
        for cell in self.cells_within_radius(query, radius) {
            let Some(bucket) = self.cells.get(&cell) else {
                continue;
            };
            for &(point, payload) in bucket {
                let d = (point - query).norm();
                if d > radius {
                    continue;
                }
                let better = match best {
                    Some((best_d, _, _)) => d < best_d,
                    None => true,
                };
                if better {
                    best = Some((d, point, payload));
                }
            }
        }
        best.map(|(_, point, payload)| (point, payload))
    }

    /// Appends every point within `radius` of `query` to `out`, in bucket
    /// scan order (undefined relative order across buckets).
    pub fn find_within_radius(&self, query: &Vec3, radius: f32, out: &mut Vec<(Vec3, T)>) {
        out.clear();
        for cell in self.cells_within_radius(query, radius) {
            let Some(bucket) = self.cells.get(&cell) else {
                continue;
            };
            for &(point, payload) in bucket {
                if (point - query).norm() <= radius {
                    out.push((point, payload));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_nearest_within_radius() {
        let mut hash = SpatialHash2D::new(1.0);
        hash.add(Vec3::new(0.8, 0.9, 0.0), 0usize);
        hash.add(Vec3::new(5.0, 5.0, 0.0), 1usize);
        hash.add(Vec3::new(0.2, 0.1, 0.0), 2usize);

        let (point, payload) = hash.find_nearest(&Vec3::new(0.0, 0.0, 0.0), 1.0).unwrap();
        assert_eq!(payload, 2);
        assert_eq!(point, Vec3::new(0.2, 0.1, 0.0));
    }

    #[test]
    fn returns_none_outside_radius() {
        let mut hash = SpatialHash2D::new(1.0);
        hash.add(Vec3::new(10.0, 10.0, 0.0), 0usize);
        assert!(hash.find_nearest(&Vec3::new(0.0, 0.0, 0.0), 1.0).is_none());
    }

    #[test]
    fn radius_query_collects_all_matches() {
        let mut hash = SpatialHash2D::new(2.0);
        for i in 0..5 {
            hash.add(Vec3::new(i as f32 * 0.5, 0.0, 0.0), i);
        }
        hash.add(Vec3::new(100.0, 100.0, 0.0), 99);

        let mut out = Vec::new();
        hash.find_within_radius(&Vec3::new(1.0, 0.0, 0.0), 1.0, &mut out);
        assert_eq!(out.len(), 5);
    }

    #[test]
    fn clear_empties_the_index() {
        let mut hash = SpatialHash2D::new(1.0);
        hash.add(Vec3::new(0.0, 0.0, 0.0), 0usize);
        hash.clear();
        assert!(hash.is_empty());
        assert!(hash.find_nearest(&Vec3::new(0.0, 0.0, 0.0), 5.0).is_none());
    }
}
