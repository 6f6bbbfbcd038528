//! Unreduced-mass baseline: every spring uses the same global stiffness and
//! damping coefficients rather than a per-spring, reduced-mass one, matching
//! the "pure and simple" coefficients on `ClassicSimulatorParameters` in the
//! original engine (the Update body there was an unfinished stub, so the
//! force/integration math itself follows spec §4.5.1's shared Verlet scheme).

use super::fs_common::{global_damping_coefficient, PointPrecomputed};
use super::Simulator;
use crate::object::Object;
use crate::simulation_parameters::SimulationParameters;
use crate::types::Vec2;
use crate::worker_pool::WorkerPool;

pub struct ClassicSimulator {
    precomputed: PointPrecomputed,
    spring_force: Vec<Vec2>,
}

impl ClassicSimulator {
    pub fn new(object: &Object, params: &SimulationParameters, pool: &WorkerPool) -> Self {
        let mut s = ClassicSimulator {
            precomputed: PointPrecomputed::compute(object, &params.common),
            spring_force: vec![Vec2::new(0.0, 0.0); object.points().count()],
        };
        s.on_state_changed(object, params, pool);
        s
    }
}

impl Simulator for ClassicSimulator {
    fn on_state_changed(&mut self, object: &Object, params: &SimulationParameters, _pool: &WorkerPool) {
        let dt = params.common.time_step_duration;
        self.precomputed = PointPrecomputed::with_dt(object, &params.common, dt);
        self.spring_force = vec![Vec2::new(0.0, 0.0); object.points().count()];
    }

    fn update(
        &mut self,
        object: &mut Object,
        _current_simulation_time: f32,
        params: &SimulationParameters,
        _pool: &WorkerPool,
    ) {
        use cgmath::InnerSpace;

        let dt = params.common.time_step_duration;
        let g_damp = global_damping_coefficient(params.common.global_damping, 1);
        let velocity_factor = (1.0 - g_damp) / dt;
        let stiffness = params.classic.spring_stiffness_coefficient;
        let damping = params.classic.spring_damping_coefficient;

        {
            let points = object.points();
            let springs = object.springs();
            for s in 0..springs.count() {
                let a = springs.endpoint_a(s) as usize;
                let b = springs.endpoint_b(s) as usize;

                let pos_a = points.position(a);
                let pos_b = points.position(b);
                let d = pos_b - pos_a;
                let length = d.magnitude();
                let unit = if length > 0.0 { d / length } else { Vec2::new(0.0, 0.0) };

                let hooke = (length - springs.rest_length(s)) * stiffness;
                let damp = cgmath::dot(points.velocity(b) - points.velocity(a), unit) * damping;
                let force = unit * (hooke + damp);

                self.spring_force[a] += force;
                self.spring_force[b] -= force;
            }
        }

        super::fs_common::integrate(object, dt, velocity_factor, &self.precomputed, &mut self.spring_force);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::materials::MaterialDatabase;
    use crate::object_builder::build_object;
    use crate::layout_optimizer::IdentityLayoutOptimizer;
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
    fn gravity_free_resting_spring_stays_put() {
        let mut object = two_point_object();
        let mut params = SimulationParameters::default();
        params.common.gravity_adjustment = 0.0;
        params.common.global_damping = 0.0;
        let pool = WorkerPool::new(1);
        let mut sim = ClassicSimulator::new(&object, &params, &pool);

        let before = object.points().position(0);
        sim.update(&mut object, 0.0, &params, &pool);
        let after = object.points().position(0);
        assert!((before.x - after.x).abs() < 1e-5);
        assert!((before.y - after.y).abs() < 1e-5);
    }
}
