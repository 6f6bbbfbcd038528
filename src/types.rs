/// Index into a homogeneous element store (points or springs).
pub type ElementIndex = u32;

/// Sentinel marking "no element", used in padding slots and optional links.
pub const NONE: ElementIndex = u32::MAX;

/// Two-dimensional point, reused throughout for position/velocity/force.
pub type Vec2 = cgmath::Vector2<f32>;

/// SIMD word width used to size aligned buffers and vectorized loops.
pub const SIMD_WIDTH: usize = 4;

/// Rounds `n` up to the next multiple of `SIMD_WIDTH`.
pub const fn round_up_to_simd_word(n: usize) -> usize {
    n.div_ceil(SIMD_WIDTH) * SIMD_WIDTH
}
