use crate::builder_types::{BuildPoint, BuildSpring, PointIndexMatrix};
use crate::error::{SLabResult, SpringLabError};
use crate::layout_optimizer::LayoutOptimizer;
use crate::materials::{ColorKey, MaterialDatabase};
use crate::object::Object;
use crate::points::{BendingProbe, PointStore};
use crate::springs::SpringStore;
use crate::types::{ElementIndex, Vec2};
use image::RgbImage;

/// The four half-directions the builder probes from every occupied pixel;
/// together with the reverse direction implied by visiting every pixel,
/// this yields each undirected neighbour pair exactly once.
const HALF_DIRECTIONS: [(i32, i32); 4] = [(1, 0), (1, -1), (0, -1), (-1, -1)];

/// Builds an [`Object`] from an RGB raster and a material table.
///
/// Pixels are visited in row-major order, bottom-to-top (image row 0 is the
/// bottom of the object, matching the lower-left coordinate origin of the
/// source PNG).
pub fn build_object(
    image: &RgbImage,
    materials: &MaterialDatabase,
    layout_optimizer: &dyn LayoutOptimizer,
) -> SLabResult<Object> {
    let width = image.width() as i32;
    let height = image.height() as i32;
    let half_width = width as f32 / 2.0;
    let half_height = height as f32 / 2.0;

    let mut matrix = PointIndexMatrix::new(width as usize, height as usize);
    let mut build_points: Vec<BuildPoint> = Vec::new();
    let mut build_springs: Vec<BuildSpring> = Vec::new();
    let mut bending_probe_point: Option<ElementIndex> = None;

    // Image row 0 is conventionally the bottom row for a lower-left origin;
    // `image::RgbImage` stores row 0 first, which is exactly that row.
    for y in 0..height {
        for x in 0..width {
            let pixel = image.get_pixel(x as u32, y as u32);
            let color = ColorKey(pixel[0], pixel[1], pixel[2]);

            if let Some(material) = materials.find(color) {
                let point_index = build_points.len() as ElementIndex;
                matrix.set(x, y, point_index);

                if material.is_bending_probe {
                    if bending_probe_point.is_some() {
                        return Err(SpringLabError::MultipleBendingProbes);
                    }
                    bending_probe_point = Some(point_index);
                }

                build_points.push(BuildPoint {
                    position: Vec2::new(x as f32 - half_width, y as f32 - half_height),
                    mass: material.mass(),
                    material_stiffness: material.stiffness,
                    frozen_coefficient: material.frozen_coefficient(),
                    render_color: [
                        color.0 as f32 / 255.0,
                        color.1 as f32 / 255.0,
                        color.2 as f32 / 255.0,
                    ],
                    is_bending_probe: material.is_bending_probe,
                    grid_x: x,
                    grid_y: y,
                    connected_springs: Vec::new(),
                });
            } else if color != ColorKey::WHITE {
                return Err(SpringLabError::UnrecognizedMaterial {
                    x: x as i64,
                    y: y as i64,
                });
            }
        }
    }

    detect_springs(&matrix, width, height, &mut build_points, &mut build_springs);

    let remap = layout_optimizer.remap(&matrix, &build_points, &build_springs, width, height);

    // old_point_index -> new_point_index, needed to re-index endpoints and
    // the bending probe.
    let mut point_old_to_new = vec![0 as ElementIndex; build_points.len()];
    for (new_idx, &old_idx) in remap.point_remap.iter().enumerate() {
        point_old_to_new[old_idx as usize] = new_idx as ElementIndex;
    }
    let mut spring_old_to_new = vec![0 as ElementIndex; build_springs.len()];
    for (new_idx, &old_idx) in remap.spring_remap.iter().enumerate() {
        spring_old_to_new[old_idx as usize] = new_idx as ElementIndex;
    }

    let point_count = build_points.len();
    let mut points = PointStore::new(point_count);
    for (new_idx, &old_idx) in remap.point_remap.iter().enumerate() {
        let p = &build_points[old_idx as usize];
        points.set(
            new_idx,
            p.position,
            p.mass,
            p.material_stiffness,
            p.frozen_coefficient,
            p.render_color,
        );
    }

    let spring_count = build_springs.len();
    let mut springs = SpringStore::new(spring_count);
    for (new_idx, &old_idx) in remap.spring_remap.iter().enumerate() {
        let s = &build_springs[old_idx as usize];
        let mut a = point_old_to_new[s.point_a_index as usize];
        let mut b = point_old_to_new[s.point_b_index as usize];

        let should_flip = remap
            .spring_flip_mask
            .get(new_idx)
            .copied()
            .unwrap_or(false);
        if should_flip {
            std::mem::swap(&mut a, &mut b);
        }

        springs.set(new_idx, a, b, &points);
        points.add_connected_spring(a as usize, new_idx as ElementIndex, b);
        points.add_connected_spring(b as usize, new_idx as ElementIndex, a);
    }

    let bending_probe = bending_probe_point.map(|old_idx| {
        let new_idx = point_old_to_new[old_idx as usize];
        BendingProbe {
            point_index: new_idx,
            original_world_coordinates: points.position(new_idx as usize),
        }
    });

    log::info!(
        "built object: {}x{} image, {} points ({} buffer), {} springs, {} perfect squares",
        width,
        height,
        points.count(),
        points.buffer_capacity(),
        springs.count(),
        remap.structure.perfect_square_count(),
    );

    Object::new(points, springs, remap.structure, bending_probe)
}

/// Probes the four half-directions {E, SE, S, SW} from every occupied cell,
/// which together cover each undirected neighbour pair exactly once.
fn detect_springs(
    matrix: &PointIndexMatrix,
    width: i32,
    height: i32,
    build_points: &mut [BuildPoint],
    build_springs: &mut Vec<BuildSpring>,
) {
    for y in 0..height {
        for x in 0..width {
            let Some(this_index) = matrix.get(x, y) else {
                continue;
            };

            for (dx, dy) in HALF_DIRECTIONS {
                if let Some(other_index) = matrix.get(x + dx, y + dy) {
                    let spring_index = build_springs.len() as ElementIndex;
                    build_springs.push(BuildSpring {
                        point_a_index: this_index,
                        point_b_index: other_index,
                    });
                    build_points[this_index as usize]
                        .connected_springs
                        .push(spring_index);
                    build_points[other_index as usize]
                        .connected_springs
                        .push(spring_index);
                }
            }
        }
    }
}
