//! Packs each point's adjacency into a contiguous `{stiffness, damping,
//! rest, other}` table so the spring phase never follows an indirection
//! into the spring store — grounded on spec §4.5.1's "packed per-point
//! spring table" description, since `Points.h`'s own `ConnectedSprings` is
//! already close to this shape.

use super::fs_common::{global_damping_coefficient, PointPrecomputed};
use super::Simulator;
use crate::object::Object;
use crate::points::MAX_SPRINGS_PER_POINT;
use crate::simulation_parameters::SimulationParameters;
use crate::types::{ElementIndex, Vec2};
use crate::worker_pool::WorkerPool;

#[derive(Clone, Copy)]
struct CompactEntry {
    k_eff: f32,
    c_damp: f32,
    rest_length: f32,
    other: ElementIndex,
}

struct CompactTable {
    /// `entries[p]` holds up to [`MAX_SPRINGS_PER_POINT`] entries.
    entries: Vec<Vec<CompactEntry>>,
}

impl CompactTable {
    fn build(
        object: &Object,
        spring_reduction_fraction: f32,
        spring_damping_coefficient: f32,
        dt: f32,
    ) -> Self {
        let points = object.points();
        let springs = object.springs();
        let n = points.count();

        let mut entries: Vec<Vec<CompactEntry>> = Vec::with_capacity(n);
        for p in 0..n {
            let mut row = Vec::with_capacity(MAX_SPRINGS_PER_POINT);
            for cs in points.connected_springs(p).as_slice() {
                let s = cs.spring_index as usize;
                let a = springs.endpoint_a(s) as usize;
                let b = springs.endpoint_b(s) as usize;
                let ma = points.mass(a);
                let mb = points.mass(b);
                let denom = ma + mb;
                let mu = if denom > 0.0 { ma * mb / denom } else { 0.0 };
                row.push(CompactEntry {
                    k_eff: spring_reduction_fraction * springs.material_stiffness(s) * mu / (dt * dt),
                    c_damp: spring_damping_coefficient * mu / dt,
                    rest_length: springs.rest_length(s),
                    other: cs.other_endpoint_index,
                });
            }
            entries.push(row);
        }
        CompactTable { entries }
    }
}

fn spring_phase_total(points: &crate::points::PointStore, p: usize, row: &[CompactEntry]) -> Vec2 {
    use cgmath::InnerSpace;

    let pos_p = points.position(p);
    let vel_p = points.velocity(p);
    let mut total = Vec2::new(0.0, 0.0);
    for e in row {
        let other = e.other as usize;
        let d = points.position(other) - pos_p;
        let length = d.magnitude();
        let unit = if length > 0.0 { d / length } else { Vec2::new(0.0, 0.0) };
        let hooke = (length - e.rest_length) * e.k_eff;
        let damping = cgmath::dot(points.velocity(other) - vel_p, unit) * e.c_damp;
        total += unit * (hooke + damping);
    }
    total
}

fn micro_step_dt(params: &SimulationParameters) -> f32 {
    params.common.time_step_duration / params.fs.num_mechanical_dynamics_iterations as f32
}

/// Two-pass compact variant: spring phase writes into a shared force
/// buffer, a separate integration pass (identical to the other FS variants)
/// consumes it.
pub struct FsByPointCompactSimulator {
    table: CompactTable,
    points: PointPrecomputed,
    spring_force: Vec<Vec2>,
}

impl FsByPointCompactSimulator {
    pub fn new(object: &Object, params: &SimulationParameters, pool: &WorkerPool) -> Self {
        let mut s = FsByPointCompactSimulator {
            table: CompactTable::build(object, 0.0, 0.0, 1.0),
            points: PointPrecomputed::compute(object, &params.common),
            spring_force: vec![Vec2::new(0.0, 0.0); object.points().count()],
        };
        s.on_state_changed(object, params, pool);
        s
    }
}

impl Simulator for FsByPointCompactSimulator {
    fn on_state_changed(&mut self, object: &Object, params: &SimulationParameters, _pool: &WorkerPool) {
        let dt = micro_step_dt(params);
        self.table = CompactTable::build(
            object,
            params.fs.spring_reduction_fraction,
            params.fs.spring_damping_coefficient,
            dt,
        );
        self.points = PointPrecomputed::with_dt(object, &params.common, dt);
        self.spring_force = vec![Vec2::new(0.0, 0.0); object.points().count()];
    }

    fn update(
        &mut self,
        object: &mut Object,
        _current_simulation_time: f32,
        params: &SimulationParameters,
        _pool: &WorkerPool,
    ) {
        let dt = micro_step_dt(params);
        let iterations = params.fs.num_mechanical_dynamics_iterations;
        let g_damp = global_damping_coefficient(params.common.global_damping, iterations);
        let velocity_factor = (1.0 - g_damp) / dt;

        for _ in 0..iterations {
            {
                let points = object.points();
                for p in 0..points.count() {
                    self.spring_force[p] = spring_phase_total(points, p, &self.table.entries[p]);
                }
            }
            super::fs_common::integrate(object, dt, velocity_factor, &self.points, &mut self.spring_force);
        }
    }
}

/// Single-pass compact variant: spring phase and integration are fused per
/// point, writing into a double buffer so every point in the pass reads the
/// *previous* iteration's positions (preserving Jacobi semantics despite
/// the fused loop).
pub struct FsByPointCompactIntegratingSimulator {
    table: CompactTable,
    points: PointPrecomputed,
    next_position: Vec<Vec2>,
    next_velocity: Vec<Vec2>,
}

impl FsByPointCompactIntegratingSimulator {
    pub fn new(object: &Object, params: &SimulationParameters, pool: &WorkerPool) -> Self {
        let n = object.points().count();
        let mut s = FsByPointCompactIntegratingSimulator {
            table: CompactTable::build(object, 0.0, 0.0, 1.0),
            points: PointPrecomputed::compute(object, &params.common),
            next_position: vec![Vec2::new(0.0, 0.0); n],
            next_velocity: vec![Vec2::new(0.0, 0.0); n],
        };
        s.on_state_changed(object, params, pool);
        s
    }
}

impl Simulator for FsByPointCompactIntegratingSimulator {
    fn on_state_changed(&mut self, object: &Object, params: &SimulationParameters, _pool: &WorkerPool) {
        let dt = micro_step_dt(params);
        self.table = CompactTable::build(
            object,
            params.fs.spring_reduction_fraction,
            params.fs.spring_damping_coefficient,
            dt,
        );
        self.points = PointPrecomputed::with_dt(object, &params.common, dt);
        let n = object.points().count();
        self.next_position = vec![Vec2::new(0.0, 0.0); n];
        self.next_velocity = vec![Vec2::new(0.0, 0.0); n];
    }

    fn update(
        &mut self,
        object: &mut Object,
        _current_simulation_time: f32,
        params: &SimulationParameters,
        _pool: &WorkerPool,
    ) {
        let dt = micro_step_dt(params);
        let iterations = params.fs.num_mechanical_dynamics_iterations;
        let g_damp = global_damping_coefficient(params.common.global_damping, iterations);
        let velocity_factor = (1.0 - g_damp) / dt;

        for _ in 0..iterations {
            {
                let points = object.points();
                for p in 0..points.count() {
                    let force = spring_phase_total(points, p, &self.table.entries[p]);
                    let delta = points.velocity(p) * dt
                        + (force + self.points.external_force[p]) * self.points.integration_factor[p];
                    self.next_position[p] = points.position(p) + delta;
                    self.next_velocity[p] = delta * velocity_factor;
                }
            }

            let points = object.points_mut();
            for p in 0..points.count() {
                points.set_position(p, self.next_position[p]);
                points.set_velocity(p, self.next_velocity[p]);
            }
        }
    }
}
