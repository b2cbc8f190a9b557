use crate::geometry::Vec3;

/// A rectangular array of cells indexed by world position, with the min
/// corner of cell `(0, 0)` anchored at `bbox_min`.
#[derive(Debug, Clone)]
pub struct Grid2D<T> {
    width: usize,
    height: usize,
    res: f32,
    bbox_min: Vec3,
    cells: Vec<T>,
}

impl<T: Clone + Default> Grid2D<T> {
    pub fn new(width: usize, height: usize, bbox_min: Vec3, res: f32) -> Self {
        assert!(res > 0.0);
        Grid2D {
            width,
            height,
            res,
            bbox_min,
            cells: vec![T::default(); width * height],
        }
    }

    pub fn reset(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = T::default());
    }
}

impl<T> Grid2D<T> {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn res(&self) -> f32 {
        self.res
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        x + y * self.width
    }

    pub fn get(&self, x: usize, y: usize) -> &T {
        &self.cells[self.index(x, y)]
    }

    pub fn get_mut(&mut self, x: usize, y: usize) -> &mut T {
        let i = self.index(x, y);
        &mut self.cells[i]
    }

    /// World position of a cell's min corner.
    pub fn cell_pos(&self, x: usize, y: usize) -> Vec3 {
        self.bbox_min + Vec3::new(x as f32, y as f32, 0.0) * self.res
    }

    /// Cell coordinates covering `pos`, clamped to the grid bounds.
    pub fn world_to_cell_clamped(&self, pos: &Vec3) -> (usize, usize) {
        let local = (pos - self.bbox_min) / self.res;
        let x = (local.x.floor().max(0.0) as usize).min(self.width.saturating_sub(1));
        let y = (local.y.floor().max(0.0) as usize).min(self.height.saturating_sub(1));
        (x, y)
    }
}
