/// SIMD-accelerated math types from [`glam`].
///
/// World transforms are [`Mat4`] and vertex positions are transformed as [`Vec3`] points:
///
/// ```
/// use strata_core::math::{Mat4, Vec3};
///
/// let world = Mat4::from_translation(Vec3::new(10.0, 20.0, 0.0));
/// let p = world.transform_point3(Vec3::new(1.0, 1.0, 0.0));
/// assert_eq!(p, Vec3::new(11.0, 21.0, 0.0));
/// ```
///
/// [`glam`]: https://docs.rs/glam
pub mod fast {
    pub use glam::*;
}

pub use fast::*;
