//! FS variant that traverses each point's full adjacency list instead of the
//! spring list, recomputing the same force from the point's own side of
//! each spring (the pairwise formula is antisymmetric in the endpoint
//! labelling, so no shared accumulator buffer or phase barrier is needed).

use super::fs_common::{global_damping_coefficient, spring_force_contribution, PointPrecomputed, SpringPrecomputed};
use super::Simulator;
use crate::object::Object;
use crate::simulation_parameters::SimulationParameters;
use crate::types::Vec2;
use crate::worker_pool::WorkerPool;

pub struct FsByPointSimulator {
    points: PointPrecomputed,
    springs: SpringPrecomputed,
    spring_force: Vec<Vec2>,
}

impl FsByPointSimulator {
    pub fn new(object: &Object, params: &SimulationParameters, pool: &WorkerPool) -> Self {
        let mut s = FsByPointSimulator {
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

impl Simulator for FsByPointSimulator {
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
                for p in 0..points.count() {
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
                            springs.rest_length(s),
                            self.springs.k_eff[s],
                            self.springs.c_damp[s],
                        );
                    }
                    self.spring_force[p] = total;
                }
            }

            super::fs_common::integrate(object, dt, velocity_factor, &self.points, &mut self.spring_force);
        }
    }
}
