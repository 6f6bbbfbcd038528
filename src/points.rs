use crate::aligned_buffer::AlignedBuffer;
use crate::types::{ElementIndex, Vec2, NONE};

/// 8 neighbours plus 1 rope spring, matching the original engine's budget.
pub const MAX_SPRINGS_PER_POINT: usize = 9;

/// One entry of a point's adjacency list: which spring, and who is on the
/// other end of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectedSpring {
    pub spring_index: ElementIndex,
    pub other_endpoint_index: ElementIndex,
}

impl ConnectedSpring {
    const NONE: ConnectedSpring = ConnectedSpring {
        spring_index: NONE,
        other_endpoint_index: NONE,
    };
}

/// Bounded adjacency list, capacity [`MAX_SPRINGS_PER_POINT`].
#[derive(Debug, Clone, Copy)]
pub struct ConnectedSprings {
    items: [ConnectedSpring; MAX_SPRINGS_PER_POINT],
    count: u8,
}

impl Default for ConnectedSprings {
    fn default() -> Self {
        ConnectedSprings {
            items: [ConnectedSpring::NONE; MAX_SPRINGS_PER_POINT],
            count: 0,
        }
    }
}

impl ConnectedSprings {
    pub fn as_slice(&self) -> &[ConnectedSpring] {
        &self.items[..self.count as usize]
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn contains_spring(&self, spring_index: ElementIndex) -> bool {
        self.as_slice()
            .iter()
            .any(|cs| cs.spring_index == spring_index)
    }

    /// Appends a connected spring. Panics if the point already has
    /// [`MAX_SPRINGS_PER_POINT`] springs or the spring is already present —
    /// both are builder bugs, not user-facing errors.
    pub fn push(&mut self, spring_index: ElementIndex, other_endpoint_index: ElementIndex) {
        debug_assert!(!self.contains_spring(spring_index), "duplicate spring in adjacency list");
        assert!(
            (self.count as usize) < MAX_SPRINGS_PER_POINT,
            "point exceeds {MAX_SPRINGS_PER_POINT} connected springs"
        );
        self.items[self.count as usize] = ConnectedSpring {
            spring_index,
            other_endpoint_index,
        };
        self.count += 1;
    }

    /// Rewrites every spring index through a remap table (new_index_of_old).
    pub fn remap_spring_indices(&mut self, spring_old_to_new: &[ElementIndex]) {
        for i in 0..self.count as usize {
            self.items[i].spring_index = spring_old_to_new[self.items[i].spring_index as usize];
        }
    }

    pub fn remap_other_endpoints(&mut self, point_old_to_new: &[ElementIndex]) {
        for i in 0..self.count as usize {
            self.items[i].other_endpoint_index =
                point_old_to_new[self.items[i].other_endpoint_index as usize];
        }
    }
}

/// A designated point whose displacement from its factory position is
/// published as a measurement.
#[derive(Debug, Clone, Copy)]
pub struct BendingProbe {
    pub point_index: ElementIndex,
    pub original_world_coordinates: Vec2,
}

/// Structure-of-arrays store for every point in an object.
#[derive(Debug)]
pub struct PointStore {
    count: usize,
    position: AlignedBuffer<Vec2>,
    velocity: AlignedBuffer<Vec2>,
    assigned_force: AlignedBuffer<Vec2>,
    mass: AlignedBuffer<f32>,
    material_stiffness: AlignedBuffer<f32>,
    frozen_coefficient: AlignedBuffer<f32>,
    connected_springs: AlignedBuffer<ConnectedSprings>,
    render_color: AlignedBuffer<[f32; 3]>,
    render_highlight: AlignedBuffer<f32>,
}

impl PointStore {
    pub fn new(count: usize) -> Self {
        PointStore {
            count,
            position: AlignedBuffer::new(count, count, Vec2::new(0.0, 0.0)),
            velocity: AlignedBuffer::new(count, count, Vec2::new(0.0, 0.0)),
            assigned_force: AlignedBuffer::new(count, count, Vec2::new(0.0, 0.0)),
            mass: AlignedBuffer::new(count, count, 0.0),
            material_stiffness: AlignedBuffer::new(count, count, 0.0),
            frozen_coefficient: AlignedBuffer::new(count, count, 0.0),
            connected_springs: AlignedBuffer::new(count, 0, ConnectedSprings::default()),
            render_color: AlignedBuffer::new(count, count, [0.0, 0.0, 0.0]),
            render_highlight: AlignedBuffer::new(count, 0, 0.0),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn buffer_capacity(&self) -> usize {
        self.position.capacity()
    }

    pub fn set(
        &mut self,
        index: usize,
        position: Vec2,
        mass: f32,
        material_stiffness: f32,
        frozen_coefficient: f32,
        render_color: [f32; 3],
    ) {
        self.position.set(index, position);
        self.velocity.set(index, Vec2::new(0.0, 0.0));
        self.assigned_force.set(index, Vec2::new(0.0, 0.0));
        self.mass.set(index, mass);
        self.material_stiffness.set(index, material_stiffness);
        self.frozen_coefficient.set(index, frozen_coefficient);
        self.render_color.set(index, render_color);
    }

    pub fn add_connected_spring(
        &mut self,
        point_index: usize,
        spring_index: ElementIndex,
        other_endpoint_index: ElementIndex,
    ) {
        self.connected_springs[point_index].push(spring_index, other_endpoint_index);
    }

    #[inline]
    pub fn position(&self, i: usize) -> Vec2 {
        self.position.get(i)
    }
    #[inline]
    pub fn set_position(&mut self, i: usize, v: Vec2) {
        self.position.set(i, v)
    }
    #[inline]
    pub fn velocity(&self, i: usize) -> Vec2 {
        self.velocity.get(i)
    }
    #[inline]
    pub fn set_velocity(&mut self, i: usize, v: Vec2) {
        self.velocity.set(i, v)
    }
    #[inline]
    pub fn assigned_force(&self, i: usize) -> Vec2 {
        self.assigned_force.get(i)
    }
    #[inline]
    pub fn mass(&self, i: usize) -> f32 {
        self.mass.get(i)
    }
    #[inline]
    pub fn material_stiffness(&self, i: usize) -> f32 {
        self.material_stiffness.get(i)
    }
    #[inline]
    pub fn frozen_coefficient(&self, i: usize) -> f32 {
        self.frozen_coefficient.get(i)
    }
    #[inline]
    pub fn set_frozen_coefficient(&mut self, i: usize, v: f32) {
        self.frozen_coefficient.set(i, v)
    }
    #[inline]
    pub fn connected_springs(&self, i: usize) -> &ConnectedSprings {
        &self.connected_springs[i]
    }

    pub fn position_buffer(&self) -> &AlignedBuffer<Vec2> {
        &self.position
    }
    pub fn position_buffer_mut(&mut self) -> &mut AlignedBuffer<Vec2> {
        &mut self.position
    }
    pub fn velocity_buffer(&self) -> &AlignedBuffer<Vec2> {
        &self.velocity
    }
    pub fn velocity_buffer_mut(&mut self) -> &mut AlignedBuffer<Vec2> {
        &mut self.velocity
    }

    /// Axis-aligned bounding box of every live point's position.
    pub fn aabb(&self) -> (Vec2, Vec2) {
        let mut min = Vec2::new(f32::INFINITY, f32::INFINITY);
        let mut max = Vec2::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
        for i in 0..self.count {
            let p = self.position(i);
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        (min, max)
    }
}
