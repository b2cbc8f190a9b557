use nalgebra::Vector3;

/// A point or direction in world space.
pub type Vec3 = Vector3<f32>;

#[inline]
pub fn dist(a: &Vec3, b: &Vec3) -> f32 {
    (a - b).norm()
}

#[inline]
pub fn dist2d(a: &Vec3, b: &Vec3) -> f32 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

/// A rigid pose, stored as a row-vector frame: points are transformed as
/// `p' = p * basis + translation`, i.e. each axis is a *row* of the implied
/// 4x4 matrix rather than a column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub x_axis: Vec3,
    pub y_axis: Vec3,
    pub z_axis: Vec3,
    pub translation: Vec3,
}

impl Pose {
    pub fn identity() -> Self {
        Pose {
            x_axis: Vec3::new(1.0, 0.0, 0.0),
            y_axis: Vec3::new(0.0, 1.0, 0.0),
            z_axis: Vec3::new(0.0, 0.0, 1.0),
            translation: Vec3::zeros(),
        }
    }

    pub fn from_basis(x_axis: Vec3, y_axis: Vec3, z_axis: Vec3, translation: Vec3) -> Self {
        Pose {
            x_axis,
            y_axis,
            z_axis,
            translation,
        }
    }

    #[inline]
    pub fn translation(&self) -> Vec3 {
        self.translation
    }

    /// Maps a point from this pose's local frame into world space.
    #[inline]
    pub fn transform_point(&self, local: &Vec3) -> Vec3 {
        self.transform_direction(local) + self.translation
    }

    /// Maps a point from world space into this pose's local frame.
    #[inline]
    pub fn inverse_transform_point(&self, world: &Vec3) -> Vec3 {
        self.inverse_transform_direction(&(world - self.translation))
    }

    /// Maps a direction (no translation) from local to world space.
    #[inline]
    pub fn transform_direction(&self, local: &Vec3) -> Vec3 {
        self.x_axis * local.x + self.y_axis * local.y + self.z_axis * local.z
    }

    /// Maps a direction (no translation) from world to local space, relying
    /// on the basis being orthonormal.
    #[inline]
    pub fn inverse_transform_direction(&self, world: &Vec3) -> Vec3 {
        Vec3::new(
            self.x_axis.dot(world),
            self.y_axis.dot(world),
            self.z_axis.dot(world),
        )
    }

    /// Composes a local rotation (given as its three orthonormal rows,
    /// expressed in this pose's own frame) onto this pose, carrying the
    /// rotated basis but leaving the translation untouched. Used to rotate a
    /// dictionary entry's frame about its own local Z axis by a recovered
    /// azimuth offset.
    pub fn compose_local_rotation(&self, rotation_rows: [Vec3; 3]) -> Pose {
        let apply = |row: &Vec3| self.transform_direction(row);
        Pose {
            x_axis: apply(&rotation_rows[0]),
            y_axis: apply(&rotation_rows[1]),
            z_axis: apply(&rotation_rows[2]),
            translation: self.translation,
        }
    }

    pub fn is_orthonormal(&self, tol: f32) -> bool {
        let unit = |v: &Vec3| (v.norm() - 1.0).abs() <= tol;
        let perp = |a: &Vec3, b: &Vec3| a.dot(b).abs() <= tol;
        unit(&self.x_axis)
            && unit(&self.y_axis)
            && unit(&self.z_axis)
            && perp(&self.x_axis, &self.y_axis)
            && perp(&self.y_axis, &self.z_axis)
            && perp(&self.x_axis, &self.z_axis)
    }
}

/// Builds a rotation (as row vectors) about the local Z axis by `theta`
/// radians, for use with [`Pose::compose_local_rotation`].
pub fn rotation_rows_about_z(theta: f32) -> [Vec3; 3] {
    let (s, c) = theta.sin_cos();
    [
        Vec3::new(c, s, 0.0),
        Vec3::new(-s, c, 0.0),
        Vec3::new(0.0, 0.0, 1.0),
    ]
}
