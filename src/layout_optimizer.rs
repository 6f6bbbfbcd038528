use crate::builder_types::{BuildPoint, BuildSpring, PointIndexMatrix};
use crate::object::SimulatorSpecificStructure;
use crate::types::ElementIndex;
use std::collections::HashMap;

/// Output of a layout optimizer: how to reorder points and springs, which
/// springs need their endpoints swapped, and the simulator-specific
/// structure block the reordering makes possible.
pub struct LayoutRemap {
    /// `point_remap[new_index] = old_index`.
    pub point_remap: Vec<ElementIndex>,
    /// `spring_remap[new_index] = old_index`.
    pub spring_remap: Vec<ElementIndex>,
    /// `spring_flip_mask[new_index]`: swap endpoints A/B of this spring.
    /// Empty (not all-false) for optimizers that never flip, per the
    /// remap-idempotence property.
    pub spring_flip_mask: Vec<bool>,
    pub structure: SimulatorSpecificStructure,
}

/// Detects and reorders recurring structure in the object graph so the
/// simulator's inner loop can exploit it. `width`/`height` are the source
/// image's structural-layer dimensions.
pub trait LayoutOptimizer {
    fn remap(
        &self,
        matrix: &PointIndexMatrix,
        points: &[BuildPoint],
        springs: &[BuildSpring],
        width: i32,
        height: i32,
    ) -> LayoutRemap;
}

/// The default, no-op optimizer: `new_index == old_index` everywhere.
pub struct IdentityLayoutOptimizer;

impl LayoutOptimizer for IdentityLayoutOptimizer {
    fn remap(
        &self,
        _matrix: &PointIndexMatrix,
        points: &[BuildPoint],
        springs: &[BuildSpring],
        _width: i32,
        _height: i32,
    ) -> LayoutRemap {
        LayoutRemap {
            point_remap: (0..points.len() as ElementIndex).collect(),
            spring_remap: (0..springs.len() as ElementIndex).collect(),
            spring_flip_mask: Vec::new(),
            structure: SimulatorSpecificStructure::default(),
        }
    }
}

/// Detects "perfect squares" — four coplanar springs sharing four points —
/// and groups their spring indices into vectorizable quadruples, so the
/// SIMD inner loop can gather all four endpoints with a single 4-wide load
/// of the shared corner points.
///
/// The sweep is greedy and row-major (matching the original engine): once a
/// spring is consumed by a square it cannot join another one, which makes
/// the result order-dependent by design (see the crate's design notes).
pub struct StructuralLayoutOptimizer;

impl LayoutOptimizer for StructuralLayoutOptimizer {
    fn remap(
        &self,
        matrix: &PointIndexMatrix,
        points: &[BuildPoint],
        springs: &[BuildSpring],
        width: i32,
        height: i32,
    ) -> LayoutRemap {
        let n_points = points.len();
        let n_springs = springs.len();

        let mut spring_of_pair: HashMap<(ElementIndex, ElementIndex), ElementIndex> =
            HashMap::with_capacity(n_springs);
        for (i, s) in springs.iter().enumerate() {
            let key = (
                s.point_a_index.min(s.point_b_index),
                s.point_a_index.max(s.point_b_index),
            );
            spring_of_pair.insert(key, i as ElementIndex);
        }
        let lookup = |a: ElementIndex, b: ElementIndex| -> Option<ElementIndex> {
            spring_of_pair.get(&(a.min(b), a.max(b))).copied()
        };

        let mut point_mapped = vec![false; n_points];
        let mut spring_mapped = vec![false; n_springs];
        let mut point_remap = Vec::with_capacity(n_points);
        let mut spring_remap = Vec::with_capacity(n_springs);
        let mut spring_flip = Vec::with_capacity(n_springs);
        let mut perfect_square_count: usize = 0;

        for y in 0..(height - 1).max(0) {
            for x in 0..(width - 1).max(0) {
                let (a_idx, b_idx, c_idx, d_idx) = match (
                    matrix.get(x, y),
                    matrix.get(x + 1, y),
                    matrix.get(x + 1, y + 1),
                    matrix.get(x, y + 1),
                ) {
                    (Some(a), Some(b), Some(c), Some(d)) => (a, b, c, d),
                    _ => continue,
                };

                let even_parity = (x + y) % 2 == 0;

                // J = A, L = C always; K/M swap with parity so the side
                // springs (J-K, M-L) match the pair that actually exists.
                let (j, l) = (a_idx, c_idx);
                let (k, m) = if even_parity {
                    (d_idx, b_idx) // sides: A-D, B-C (vertical)
                } else {
                    (b_idx, d_idx) // sides: A-B, D-C (horizontal)
                };

                let diag_jl = lookup(j, l);
                let diag_mk = lookup(m, k);
                let side_jk = lookup(j, k);
                let side_ml = lookup(m, l);

                let (s0, s1, s2, s3) = match (diag_jl, diag_mk, side_jk, side_ml) {
                    (Some(s0), Some(s1), Some(s2), Some(s3)) => (s0, s1, s2, s3),
                    _ => continue,
                };

                if spring_mapped[s0 as usize]
                    || spring_mapped[s1 as usize]
                    || spring_mapped[s2 as usize]
                    || spring_mapped[s3 as usize]
                {
                    continue;
                }

                let canonical = [(s0, j, l), (s1, m, k), (s2, j, k), (s3, m, l)];
                for &(sidx, want_a, want_b) in &canonical {
                    let flip = !(springs[sidx as usize].point_a_index == want_a
                        && springs[sidx as usize].point_b_index == want_b);
                    spring_remap.push(sidx);
                    spring_flip.push(flip);
                    spring_mapped[sidx as usize] = true;
                }

                for &pidx in &[a_idx, b_idx, c_idx, d_idx] {
                    if !point_mapped[pidx as usize] {
                        point_mapped[pidx as usize] = true;
                        point_remap.push(pidx);
                    }
                }

                perfect_square_count += 1;
            }
        }

        for i in 0..n_springs {
            let i = i as ElementIndex;
            if !spring_mapped[i as usize] {
                spring_remap.push(i);
                spring_flip.push(false);
            }
        }
        for i in 0..n_points {
            let i = i as ElementIndex;
            if !point_mapped[i as usize] {
                point_remap.push(i);
            }
        }

        LayoutRemap {
            point_remap,
            spring_remap,
            spring_flip_mask: spring_flip,
            structure: SimulatorSpecificStructure {
                spring_processing_block_sizes: vec![perfect_square_count * 4],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vec2;

    fn make_point(x: i32, y: i32) -> BuildPoint {
        BuildPoint {
            position: Vec2::new(x as f32, y as f32),
            mass: 1.0,
            material_stiffness: 1.0,
            frozen_coefficient: 1.0,
            render_color: [1.0, 1.0, 1.0],
            is_bending_probe: false,
            grid_x: x,
            grid_y: y,
            connected_springs: Vec::new(),
        }
    }

    /// Builds a `size x size` fully connected grid (every E/SE/S/SW neighbour
    /// pair has a spring), as the object builder would for a filled square
    /// image.
    fn make_grid(size: i32) -> (PointIndexMatrix, Vec<BuildPoint>, Vec<BuildSpring>) {
        let mut matrix = PointIndexMatrix::new(size as usize, size as usize);
        let mut points = Vec::new();
        for y in 0..size {
            for x in 0..size {
                let idx = points.len() as ElementIndex;
                matrix.set(x, y, idx);
                points.push(make_point(x, y));
            }
        }

        let directions = [(1, 0), (1, -1), (0, -1), (-1, -1)];
        let mut springs = Vec::new();
        for y in 0..size {
            for x in 0..size {
                let this = matrix.get(x, y).unwrap();
                for (dx, dy) in directions {
                    if let Some(other) = matrix.get(x + dx, y + dy) {
                        springs.push(BuildSpring {
                            point_a_index: this,
                            point_b_index: other,
                        });
                    }
                }
            }
        }

        (matrix, points, springs)
    }

    #[test]
    fn identity_is_a_no_op() {
        let (matrix, points, springs) = make_grid(3);
        let remap = IdentityLayoutOptimizer.remap(&matrix, &points, &springs, 3, 3);
        assert!(remap
            .point_remap
            .iter()
            .enumerate()
            .all(|(i, &old)| i as ElementIndex == old));
        assert!(remap
            .spring_remap
            .iter()
            .enumerate()
            .all(|(i, &old)| i as ElementIndex == old));
        assert!(remap.spring_flip_mask.is_empty());
    }

    #[test]
    fn structural_finds_9_perfect_squares_in_a_4x4_grid() {
        let (matrix, points, springs) = make_grid(4);
        let remap = StructuralLayoutOptimizer.remap(&matrix, &points, &springs, 4, 4);
        assert_eq!(remap.structure.perfect_square_count(), 9);
        assert_eq!(remap.structure.spring_processing_block_sizes, vec![36]);
    }

    #[test]
    fn structural_quadruples_share_exactly_four_points() {
        let (matrix, points, springs) = make_grid(4);
        let remap = StructuralLayoutOptimizer.remap(&matrix, &points, &springs, 4, 4);
        let block = remap.structure.spring_processing_block_sizes[0];

        for quad in remap.spring_remap[..block].chunks(4) {
            let mut endpoints = std::collections::HashSet::new();
            for &old_spring in quad {
                let s = springs[old_spring as usize];
                endpoints.insert(s.point_a_index);
                endpoints.insert(s.point_b_index);
            }
            assert_eq!(endpoints.len(), 4, "quadruple should span exactly 4 points");
        }
    }

    #[test]
    fn structural_remap_is_a_permutation() {
        let (matrix, points, springs) = make_grid(4);
        let remap = StructuralLayoutOptimizer.remap(&matrix, &points, &springs, 4, 4);
        let mut sorted_points = remap.point_remap.clone();
        sorted_points.sort();
        assert_eq!(sorted_points, (0..points.len() as ElementIndex).collect::<Vec<_>>());

        let mut sorted_springs = remap.spring_remap.clone();
        sorted_springs.sort();
        assert_eq!(sorted_springs, (0..springs.len() as ElementIndex).collect::<Vec<_>>());
    }
}
