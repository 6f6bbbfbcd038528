//! Position-Based Dynamics (spec §4.5.3): predict, project, reconcile.
//! Each of the `U` update iterations runs at `dt = Δt_macro / U`, mirroring
//! the FS family's micro-iteration convention since the spec leaves the
//! per-iteration step size implicit (recorded in the design notes).

use super::Simulator;
use crate::object::Object;
use crate::simulation_parameters::SimulationParameters;
use crate::types::Vec2;
use crate::worker_pool::WorkerPool;

pub struct PositionBasedBasicSimulator {
    external_force: Vec<Vec2>,
    predicted_position: Vec<Vec2>,
}

impl PositionBasedBasicSimulator {
    pub fn new(object: &Object, params: &SimulationParameters, pool: &WorkerPool) -> Self {
        let mut s = PositionBasedBasicSimulator {
            external_force: Vec::new(),
            predicted_position: vec![Vec2::new(0.0, 0.0); object.points().count()],
        };
        s.on_state_changed(object, params, pool);
        s
    }

    fn recompute_external_force(&mut self, object: &Object, params: &SimulationParameters) {
        let points = object.points();
        let gravity = params.common.assigned_gravity();
        self.external_force = (0..points.count())
            .map(|i| gravity * (points.mass(i) * params.common.mass_adjustment) + points.assigned_force(i))
            .collect();
    }
}

impl Simulator for PositionBasedBasicSimulator {
    fn on_state_changed(&mut self, object: &Object, params: &SimulationParameters, _pool: &WorkerPool) {
        self.recompute_external_force(object, params);
        self.predicted_position = vec![Vec2::new(0.0, 0.0); object.points().count()];
    }

    fn update(
        &mut self,
        object: &mut Object,
        _current_simulation_time: f32,
        params: &SimulationParameters,
        _pool: &WorkerPool,
    ) {
        use cgmath::InnerSpace;

        let pb = &params.position_based;
        let dt = params.common.time_step_duration / pb.num_update_iterations as f32;
        let g_damp_pb = 1.0 - (1.0 - pb.global_damping).powf(0.4);

        for _ in 0..pb.num_update_iterations {
            {
                let points = object.points_mut();
                for i in 0..points.count() {
                    let mass = points.mass(i) * params.common.mass_adjustment;
                    let v = (points.velocity(i) + self.external_force[i] * (dt / mass) * points.frozen_coefficient(i))
                        * (1.0 - g_damp_pb);
                    points.set_velocity(i, v);
                    self.predicted_position[i] = points.position(i) + v * dt;
                }
            }

            for _ in 0..pb.num_solver_iterations {
                let points = object.points();
                let springs = object.springs();
                let mut corrections = vec![Vec2::new(0.0, 0.0); points.count()];

                for s in 0..springs.count() {
                    let a = springs.endpoint_a(s) as usize;
                    let b = springs.endpoint_b(s) as usize;
                    let wa = points.frozen_coefficient(a) / points.mass(a);
                    let wb = points.frozen_coefficient(b) / points.mass(b);
                    let denom = if wa + wb > 0.0 { wa + wb } else { 1.0 };

                    let d = self.predicted_position[a] - self.predicted_position[b];
                    let length = d.magnitude();
                    let unit = if length > 0.0 { d / length } else { Vec2::new(0.0, 0.0) };
                    let stretch = length - springs.rest_length(s);

                    corrections[a] -= unit * (wa / denom) * pb.spring_stiffness * stretch;
                    corrections[b] += unit * (wb / denom) * pb.spring_stiffness * stretch;
                }

                for (i, c) in corrections.into_iter().enumerate() {
                    self.predicted_position[i] += c;
                }
            }

            let points = object.points_mut();
            for i in 0..points.count() {
                let v = (self.predicted_position[i] - points.position(i)) / dt;
                points.set_velocity(i, v);
                points.set_position(i, self.predicted_position[i]);
            }
        }
    }
}
