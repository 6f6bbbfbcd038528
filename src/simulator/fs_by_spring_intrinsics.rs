//! FS variant that processes springs four at a time, gathering the (possibly
//! non-contiguous) endpoint data for each lane before computing the Hooke +
//! damping modulus — the "4-wide SIMD gather" variant from spec §4.5.1.
//! Platform SIMD intrinsics are treated as a deployment detail (spec §9):
//! this gathers into plain `[f32; 4]` lanes and lets the optimizer
//! autovectorize, rather than reaching for `std::arch`.

use super::fs_common::{global_damping_coefficient, PointPrecomputed, SpringPrecomputed};
use super::Simulator;
use crate::object::Object;
use crate::simulation_parameters::SimulationParameters;
use crate::types::Vec2;
use crate::worker_pool::WorkerPool;

const LANES: usize = 4;

pub struct FsBySpringIntrinsicsSimulator {
    points: PointPrecomputed,
    springs: SpringPrecomputed,
    spring_force: Vec<Vec2>,
}

impl FsBySpringIntrinsicsSimulator {
    pub fn new(object: &Object, params: &SimulationParameters, pool: &WorkerPool) -> Self {
        let mut s = FsBySpringIntrinsicsSimulator {
            points: PointPrecomputed::compute(object, &params.common),
            springs: SpringPrecomputed {
                k_eff: Vec::new(),
                c_damp: Vec::new(),
            },
            spring_force: vec![Vec2::new(0.0, 0.0); object.points().count()],
        };
        s.on_state_changed(object, params, pool);
        s
    }

    fn micro_step_dt(params: &SimulationParameters) -> f32 {
        params.common.time_step_duration / params.fs.num_mechanical_dynamics_iterations as f32
    }
}

impl Simulator for FsBySpringIntrinsicsSimulator {
    fn on_state_changed(&mut self, object: &Object, params: &SimulationParameters, _pool: &WorkerPool) {
        let dt = Self::micro_step_dt(params);
        self.points = PointPrecomputed::with_dt(object, &params.common, dt);
        self.springs = SpringPrecomputed::compute(
            object,
            params.fs.spring_reduction_fraction,
            params.fs.spring_damping_coefficient,
            dt,
        );
        self.spring_force = vec![Vec2::new(0.0, 0.0); object.points().count()];
    }

    fn update(
        &mut self,
        object: &mut Object,
        _current_simulation_time: f32,
        params: &SimulationParameters,
        _pool: &WorkerPool,
    ) {
        let dt = Self::micro_step_dt(params);
        let iterations = params.fs.num_mechanical_dynamics_iterations;
        let g_damp = global_damping_coefficient(params.common.global_damping, iterations);
        let velocity_factor = (1.0 - g_damp) / dt;

        for _ in 0..iterations {
            {
                let points = object.points();
                let springs = object.springs();
                let n = springs.count();
                let mut s = 0;
                while s < n {
                    let width = (n - s).min(LANES);

                    let mut dx = [0.0f32; LANES];
                    let mut dy = [0.0f32; LANES];
                    let mut length = [0.0f32; LANES];
                    let mut rel_vel_dot = [0.0f32; LANES];

                    for lane in 0..width {
                        let idx = s + lane;
                        let a = springs.endpoint_a(idx) as usize;
                        let b = springs.endpoint_b(idx) as usize;
                        let d = points.position(b) - points.position(a);
                        let len = (d.x * d.x + d.y * d.y).sqrt();
                        dx[lane] = if len > 0.0 { d.x / len } else { 0.0 };
                        dy[lane] = if len > 0.0 { d.y / len } else { 0.0 };
                        length[lane] = len;
                        let rv = points.velocity(b) - points.velocity(a);
                        rel_vel_dot[lane] = rv.x * dx[lane] + rv.y * dy[lane];
                    }

                    for lane in 0..width {
                        let idx = s + lane;
                        let a = springs.endpoint_a(idx) as usize;
                        let b = springs.endpoint_b(idx) as usize;
                        let hooke = (length[lane] - springs.rest_length(idx)) * self.springs.k_eff[idx];
                        let damping = rel_vel_dot[lane] * self.springs.c_damp[idx];
                        let modulus = hooke + damping;
                        let force = Vec2::new(dx[lane] * modulus, dy[lane] * modulus);
                        self.spring_force[a] += force;
                        self.spring_force[b] -= force;
                    }

                    s += LANES;
                }
            }

            super::fs_common::integrate(object, dt, velocity_factor, &self.points, &mut self.spring_force);
        }
    }
}
