//! Jacobi→Gauss-Seidel schedule change on top of the FS force model (spec
//! §4.5.2): external forces integrate first into a tentative position, then
//! each point is visited in order and its spring contribution is folded in
//! immediately, so later points in the sweep already see earlier points'
//! updated positions.

use super::fs_common::{global_damping_coefficient, spring_force_contribution, PointPrecomputed, SpringPrecomputed};
use super::Simulator;
use crate::object::Object;
use crate::simulation_parameters::SimulationParameters;
use crate::types::Vec2;
use crate::worker_pool::WorkerPool;

pub struct GaussSeidelByPointSimulator {
    points: PointPrecomputed,
    springs: SpringPrecomputed,
    base_delta: Vec<Vec2>,
}

impl GaussSeidelByPointSimulator {
    pub fn new(object: &Object, params: &SimulationParameters, pool: &WorkerPool) -> Self {
        let mut s = GaussSeidelByPointSimulator {
            points: PointPrecomputed::compute(object, &params.common),
            springs: SpringPrecomputed { k_eff: Vec::new(), c_damp: Vec::new() },
            base_delta: vec![Vec2::new(0.0, 0.0); object.points().count()],
        };
        s.on_state_changed(object, params, pool);
        s
    }

    fn micro_step_dt(params: &SimulationParameters) -> f32 {
        params.common.time_step_duration / params.fs.num_mechanical_dynamics_iterations as f32
    }
}

impl Simulator for GaussSeidelByPointSimulator {
    fn on_state_changed(&mut self, object: &Object, params: &SimulationParameters, _pool: &WorkerPool) {
        let dt = Self::micro_step_dt(params);
        self.points = PointPrecomputed::with_dt(object, &params.common, dt);
        self.springs = SpringPrecomputed::compute(
            object,
            params.fs.spring_reduction_fraction,
            params.fs.spring_damping_coefficient,
            dt,
        );
        self.base_delta = vec![Vec2::new(0.0, 0.0); object.points().count()];
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
                let points = object.points_mut();
                let n = points.count();
                for p in 0..n {
                    let delta = points.velocity(p) * dt + self.points.external_force[p] * self.points.integration_factor[p];
                    self.base_delta[p] = delta;
                    points.set_position(p, points.position(p) + delta);
                }
            }

            for p in 0..object.points().count() {
                let spring_force = {
                    let points = object.points();
                    let pos_p = points.position(p);
                    let vel_p = points.velocity(p);
                    let mut total = Vec2::new(0.0, 0.0);
                    for cs in points.connected_springs(p).as_slice() {
                        let s = cs.spring_index as usize;
                        let other = cs.other_endpoint_index as usize;
                        total += spring_force_contribution(
                            pos_p,
                            points.position(other),
                            vel_p,
                            points.velocity(other),
                            object.springs().rest_length(s),
                            self.springs.k_eff[s],
                            self.springs.c_damp[s],
                        );
                    }
                    total
                };

                let points = object.points_mut();
                let spring_delta = spring_force * self.points.integration_factor[p];
                points.set_position(p, points.position(p) + spring_delta);
                let total_delta = self.base_delta[p] + spring_delta;
                points.set_velocity(p, total_delta * velocity_factor);
            }
        }
    }
}
