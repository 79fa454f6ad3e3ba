use crate::DVec3;

/// Axis-aligned bounding box in double precision.
///
/// An empty box has `min > max` on every axis, so expanding it by the
/// first point collapses it onto that point.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

impl Aabb {
    #[inline]
    pub const fn empty() -> Self {
        Self {
            min: DVec3::INFINITY,
            max: DVec3::NEG_INFINITY,
        }
    }

    pub fn from_points<'a>(points: impl Iterator<Item = &'a DVec3>) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.expand_to_include(*p);
        }
        aabb
    }

    #[inline]
    pub fn expand_to_include(&mut self, p: DVec3) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Extent per axis; zero for an empty box.
    #[inline]
    pub fn size(&self) -> DVec3 {
        if self.is_empty() {
            DVec3::ZERO
        } else {
            self.max - self.min
        }
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}
