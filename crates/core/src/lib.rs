//! Core types: math re-exports, bounding box, RGBA colors.

pub use glam::{DVec2, DVec3, Vec2, Vec3, Vec4, dvec2, dvec3, vec3};

pub mod bounds;
pub mod color;

pub use bounds::Aabb;
pub use color::Rgba;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounds_of_unit_cube_corners() {
        let pts = [dvec3(0.0, 0.0, 0.0), dvec3(1.0, 2.0, 3.0), dvec3(-1.0, 0.5, 0.0)];
        let aabb = Aabb::from_points(pts.iter());
        assert_eq!(aabb.min, dvec3(-1.0, 0.0, 0.0));
        assert_eq!(aabb.max, dvec3(1.0, 2.0, 3.0));
    }

    #[test]
    fn hue_ramp_endpoints() {
        let blue = color::hsv_to_rgb(0.667, 1.0, 1.0);
        assert!(blue[2] > 0.99 && blue[0] < 0.01 && blue[1] < 0.01);
        let red = color::hsv_to_rgb(0.0, 1.0, 1.0);
        assert_eq!(red, [1.0, 0.0, 0.0]);
    }
}
