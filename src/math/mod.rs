/// All simulation math happens in 2D single precision.
pub type Vec2 = nalgebra::Vector2<f32>;

/// Shorthand for building a [Vec2].
#[inline]
pub fn vec2(x: f32, y: f32) -> Vec2 {
    Vec2::new(x, y)
}

/// Normalize the vector, or return `fallback` when the vector is too short
/// to produce a meaningful direction.
///
/// Used anywhere two points may coincide exactly (overlapping particle
/// centers, a particle sitting on an obstacle's centerline) so the result
/// is never NaN.
#[inline]
pub fn normalize_or(v: Vec2, fallback: Vec2) -> Vec2 {
    let length = v.norm();
    if length > f32::EPSILON && length.is_finite() {
        v / length
    } else {
        fallback
    }
}

/// The right-hand perpendicular, `(-y, x)`.
#[inline]
pub fn right_perpendicular(v: Vec2) -> Vec2 {
    Vec2::new(-v.y, v.x)
}
