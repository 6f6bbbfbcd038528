//! Reference FS variant: one scalar pass over the spring list per
//! micro-iteration, no vectorization, no parallelism. Every other FS variant
//! computes the identical force, only by a different traversal.

use super::fs_common::{
    global_damping_coefficient, spring_force_contribution, PointPrecomputed, SpringPrecomputed,
};
use super::Simulator;
use crate::object::Object;
use crate::simulation_parameters::SimulationParameters;
use crate::types::Vec2;
use crate::worker_pool::WorkerPool;

pub struct FsBaseSimulator {
    points: PointPrecomputed,
    springs: SpringPrecomputed,
    spring_force: Vec<Vec2>,
}

impl FsBaseSimulator {
    pub fn new(object: &Object, params: &SimulationParameters, pool: &WorkerPool) -> Self {
        let mut s = FsBaseSimulator {
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

impl Simulator for FsBaseSimulator {
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
                for s in 0..springs.count() {
                    let a = springs.endpoint_a(s) as usize;
                    let b = springs.endpoint_b(s) as usize;
                    let force = spring_force_contribution(
                        points.position(a),
                        points.position(b),
                        points.velocity(a),
                        points.velocity(b),
                        springs.rest_length(s),
                        self.springs.k_eff[s],
                        self.springs.c_damp[s],
                    );
                    self.spring_force[a] += force;
                    self.spring_force[b] -= force;
                }
            }

            super::fs_common::integrate(object, dt, velocity_factor, &self.points, &mut self.spring_force);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout_optimizer::IdentityLayoutOptimizer;
    use crate::materials::MaterialDatabase;
    use crate::object_builder::build_object;
    use image::RgbImage;

    fn two_point_object() -> Object {
        let img = RgbImage::from_fn(2, 1, |_, _| image::Rgb([255, 0, 0]));
        let materials = MaterialDatabase::load_from_str(
            r#"[{"color_key":"FF0000","name":"Red","mass":{"nominal_mass":1.0,"density":1.0},"stiffness":1.0}]"#,
        )
        .unwrap();
        build_object(&img, &materials, &IdentityLayoutOptimizer).unwrap()
    }

    #[test]
    fn gravity_free_equilibrium_one_step_is_stable() {
        let mut object = two_point_object();
        let mut params = SimulationParameters::default();
        params.common.gravity_adjustment = 0.0;
        params.common.global_damping = 0.0;
        let pool = WorkerPool::new(1);
        let mut sim = FsBaseSimulator::new(&object, &params, &pool);

        let before = object.points().position(0);
        sim.update(&mut object, 0.0, &params, &pool);
        let after = object.points().position(0);
        assert!((before.x - after.x).abs() <= 1e-5);
        assert!((before.y - after.y).abs() <= 1e-5);
    }

    #[test]
    fn frozen_point_never_moves() {
        let img = RgbImage::from_fn(3, 1, |_, _| image::Rgb([255, 0, 0]));
        let materials = MaterialDatabase::load_from_str(
            r#"[{"color_key":"FF0000","name":"Red","mass":{"nominal_mass":1.0,"density":1.0},"stiffness":1.0,"is_fixed":true}]"#,
        )
        .unwrap();
        let mut object = build_object(&img, &materials, &IdentityLayoutOptimizer).unwrap();
        let params = SimulationParameters::default();
        let pool = WorkerPool::new(1);
        let mut sim = FsBaseSimulator::new(&object, &params, &pool);

        let frozen_pos = object.points().position(0);
        for _ in 0..1000 {
            sim.update(&mut object, 0.0, &params, &pool);
        }
        assert_eq!(object.points().position(0), frozen_pos);
        assert_eq!(object.points().velocity(0), Vec2::new(0.0, 0.0));
    }
}
