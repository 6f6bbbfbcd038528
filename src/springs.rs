use crate::aligned_buffer::AlignedBuffer;
use crate::points::PointStore;
use crate::types::ElementIndex;
use cgmath::InnerSpace;

/// Structure-of-arrays store for every spring in an object.
#[derive(Debug)]
pub struct SpringStore {
    count: usize,
    endpoint_a: AlignedBuffer<ElementIndex>,
    endpoint_b: AlignedBuffer<ElementIndex>,
    rest_length: AlignedBuffer<f32>,
    material_stiffness: AlignedBuffer<f32>,
}

impl SpringStore {
    pub fn new(count: usize) -> Self {
        SpringStore {
            count,
            endpoint_a: AlignedBuffer::new(count, count, crate::types::NONE),
            endpoint_b: AlignedBuffer::new(count, count, crate::types::NONE),
            rest_length: AlignedBuffer::new(count, count, 0.0),
            material_stiffness: AlignedBuffer::new(count, count, 0.0),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn buffer_capacity(&self) -> usize {
        self.endpoint_a.capacity()
    }

    /// Sets endpoints `(a, b)` and derives `rest_length` from the current
    /// point positions and `material_stiffness` as the average of the
    /// endpoints' stiffness.
    pub fn set(&mut self, index: usize, a: ElementIndex, b: ElementIndex, points: &PointStore) {
        debug_assert_ne!(a, b);
        self.endpoint_a.set(index, a);
        self.endpoint_b.set(index, b);
        let rest_length = (points.position(a as usize) - points.position(b as usize)).magnitude();
        self.rest_length.set(index, rest_length);
        let stiffness =
            (points.material_stiffness(a as usize) + points.material_stiffness(b as usize)) * 0.5;
        self.material_stiffness.set(index, stiffness);
    }

    pub fn flip_endpoints(&mut self, index: usize) {
        let a = self.endpoint_a.get(index);
        let b = self.endpoint_b.get(index);
        self.endpoint_a.set(index, b);
        self.endpoint_b.set(index, a);
    }

    #[inline]
    pub fn endpoint_a(&self, i: usize) -> ElementIndex {
        self.endpoint_a.get(i)
    }
    #[inline]
    pub fn endpoint_b(&self, i: usize) -> ElementIndex {
        self.endpoint_b.get(i)
    }
    #[inline]
    pub fn rest_length(&self, i: usize) -> f32 {
        self.rest_length.get(i)
    }
    #[inline]
    pub fn material_stiffness(&self, i: usize) -> f32 {
        self.material_stiffness.get(i)
    }

    pub fn endpoint_a_buffer(&self) -> &AlignedBuffer<ElementIndex> {
        &self.endpoint_a
    }
    pub fn endpoint_b_buffer(&self) -> &AlignedBuffer<ElementIndex> {
        &self.endpoint_b
    }
}
