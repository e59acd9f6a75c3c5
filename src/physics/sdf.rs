//! Signed distance fields used as collision obstacles.

use nalgebra::Vector3;

/// Obstacle described by a signed distance
///
/// `projection` returns the signed distance of `p` (positive in free space)
/// and the unit direction that points from the obstacle into free space.
pub trait SignedDistanceField: Send + Sync {
    fn projection(&self, p: &Vector3<f64>) -> (f64, Vector3<f64>);
}

/// Ball obstacle, or a spherical container when `is_out` is false
#[derive(Debug, Clone, Copy)]
pub struct Sphere {
    pub center: Vector3<f64>,
    pub radius: f64,
    /// Free space is outside the sphere
    pub is_out: bool,
}

impl Sphere {
    pub fn new(center: [f64; 3], radius: f64, is_out: bool) -> Self {
        Self {
            center: Vector3::from(center),
            radius,
            is_out,
        }
    }
}

impl SignedDistanceField for Sphere {
    fn projection(&self, p: &Vector3<f64>) -> (f64, Vector3<f64>) {
        let d = p - self.center;
        let len = d.norm();
        // the center has no well defined direction; pick +z
        let radial = if len > 1e-12 { d / len } else { Vector3::z() };
        if self.is_out {
            (len - self.radius, radial)
        } else {
            (self.radius - len, -radial)
        }
    }
}

/// Half space below a plane; free space is on the side `normal` points to
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    pub origin: Vector3<f64>,
    pub normal: Vector3<f64>,
}

impl Plane {
    /// `normal` is normalized here
    pub fn new(origin: [f64; 3], normal: [f64; 3]) -> Self {
        let n = Vector3::from(normal);
        let len = n.norm();
        Self {
            origin: Vector3::from(origin),
            normal: if len > 0.0 { n / len } else { Vector3::z() },
        }
    }
}

impl SignedDistanceField for Plane {
    fn projection(&self, p: &Vector3<f64>) -> (f64, Vector3<f64>) {
        ((p - self.origin).dot(&self.normal), self.normal)
    }
}

/// Set of obstacles a cloth collides with
#[derive(Default)]
pub struct SdfList {
    items: Vec<Box<dyn SignedDistanceField>>,
}

impl SdfList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<S: SignedDistanceField + 'static>(&mut self, sdf: S) {
        self.items.push(Box::new(sdf));
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn SignedDistanceField> {
        self.items.iter().map(|b| b.as_ref())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sphere_distance() {
        let ball = Sphere::new([0.0, 0.0, 0.0], 1.0, true);
        let (d, n) = ball.projection(&Vector3::new(2.0, 0.0, 0.0));
        assert_relative_eq!(d, 1.0);
        assert_relative_eq!(n, Vector3::x());

        let container = Sphere::new([0.0, 0.0, 0.0], 1.0, false);
        let (d, n) = container.projection(&Vector3::new(0.5, 0.0, 0.0));
        assert_relative_eq!(d, 0.5);
        assert_relative_eq!(n, -Vector3::x());
    }

    #[test]
    fn test_plane_distance() {
        let floor = Plane::new([0.0, 0.0, -1.0], [0.0, 0.0, 2.0]);
        let (d, n) = floor.projection(&Vector3::new(3.0, 1.0, -1.5));
        assert_relative_eq!(d, -0.5);
        assert_relative_eq!(n, Vector3::z());
    }

    #[test]
    fn test_list() {
        let mut list = SdfList::new();
        assert!(list.is_empty());
        list.push(Sphere::new([0.0; 3], 0.3, true));
        list.push(Plane::new([0.0; 3], [0.0, 0.0, 1.0]));
        assert_eq!(list.len(), 2);
        assert_eq!(list.iter().count(), 2);
    }
}
