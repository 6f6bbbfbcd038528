//! Fast Mass-Spring System (Liu et al.), spec §4.5.4. The system matrix
//! decouples per axis for an isotropic Laplacian, so the 2n×2n block system
//! in the spec reduces to one n×n linear system solved independently for
//! the x and y components, sharing a single factorization. No sparse
//! Cholesky crate was available in the reference corpus, so this factors
//! the (small, dense) system with `nalgebra`'s dense Cholesky — recorded as
//! an open-question decision in the design notes.

use super::Simulator;
use crate::object::Object;
use crate::simulation_parameters::SimulationParameters;
use crate::types::Vec2;
use crate::worker_pool::WorkerPool;
use nalgebra::{Cholesky, DMatrix, DVector};

pub struct FastMssSimulator {
    external_force: Vec<Vec2>,
    factorization: Option<Cholesky<f32, nalgebra::Dyn>>,
    mass: Vec<f32>,
}

impl FastMssSimulator {
    pub fn new(object: &Object, params: &SimulationParameters, pool: &WorkerPool) -> Self {
        let mut s = FastMssSimulator {
            external_force: Vec::new(),
            factorization: None,
            mass: Vec::new(),
        };
        s.on_state_changed(object, params, pool);
        s
    }

    fn assemble(object: &Object, params: &SimulationParameters) -> (DMatrix<f32>, Vec<f32>) {
        let points = object.points();
        let springs = object.springs();
        let n = points.count();
        let dt = params.common.time_step_duration;
        let k_s = params.fast_mss.spring_stiffness_coefficient;

        let mass: Vec<f32> = (0..n).map(|i| points.mass(i) * params.common.mass_adjustment).collect();

        let mut a = DMatrix::<f32>::zeros(n, n);
        for i in 0..n {
            a[(i, i)] = mass[i];
        }
        for s in 0..springs.count() {
            let i = springs.endpoint_a(s) as usize;
            let j = springs.endpoint_b(s) as usize;
            let w = dt * dt * k_s;
            a[(i, i)] += w;
            a[(j, j)] += w;
            a[(i, j)] -= w;
            a[(j, i)] -= w;
        }
        (a, mass)
    }
}

impl Simulator for FastMssSimulator {
    fn on_state_changed(&mut self, object: &Object, params: &SimulationParameters, _pool: &WorkerPool) {
        let points = object.points();
        let gravity = params.common.assigned_gravity();
        self.external_force = (0..points.count())
            .map(|i| gravity * (points.mass(i) * params.common.mass_adjustment) + points.assigned_force(i))
            .collect();

        let (a, mass) = Self::assemble(object, params);
        self.mass = mass;
        self.factorization = Cholesky::new(a);
        if self.factorization.is_none() {
            log::error!("Fast-MSS system matrix is not positive-definite; skipping integration until reset");
        }
    }

    fn update(
        &mut self,
        object: &mut Object,
        _current_simulation_time: f32,
        params: &SimulationParameters,
        _pool: &WorkerPool,
    ) {
        use cgmath::InnerSpace;

        let Some(factorization) = &self.factorization else {
            return;
        };

        let springs_count = object.springs().count();
        let n = object.points().count();
        let dt = params.common.time_step_duration;
        let damping = params.fast_mss.global_damping;

        let x0: Vec<Vec2> = (0..n).map(|i| object.points().position(i)).collect();
        let v0: Vec<Vec2> = (0..n).map(|i| object.points().velocity(i)).collect();

        let y: Vec<Vec2> = (0..n)
            .map(|i| (x0[i] + v0[i] * (damping * dt)) * self.mass[i])
            .collect();

        let mut x = x0.clone();

        for _ in 0..params.fast_mss.num_local_global_step_iterations {
            let mut rhs_x = DVector::<f32>::zeros(n);
            let mut rhs_y = DVector::<f32>::zeros(n);
            for i in 0..n {
                rhs_x[i] = y[i].x + dt * dt * self.external_force[i].x;
                rhs_y[i] = y[i].y + dt * dt * self.external_force[i].y;
            }

            let k_s = params.fast_mss.spring_stiffness_coefficient;
            for s in 0..springs_count {
                let a = object.springs().endpoint_a(s) as usize;
                let b = object.springs().endpoint_b(s) as usize;
                let d = x[a] - x[b];
                let len = d.magnitude();
                let unit = if len > 0.0 { d / len } else { Vec2::new(0.0, 0.0) };
                let d_s = unit * object.springs().rest_length(s) * k_s * dt * dt;
                rhs_x[a] += d_s.x;
                rhs_x[b] -= d_s.x;
                rhs_y[a] += d_s.y;
                rhs_y[b] -= d_s.y;
            }

            let solved_x = factorization.solve(&rhs_x);
            let solved_y = factorization.solve(&rhs_y);

            for i in 0..n {
                let frozen = object.points().frozen_coefficient(i);
                let new_x = frozen * solved_x[i] + (1.0 - frozen) * x0[i].x;
                let new_y = frozen * solved_y[i] + (1.0 - frozen) * x0[i].y;
                x[i] = Vec2::new(new_x, new_y);
            }
        }

        let points = object.points_mut();
        for i in 0..n {
            let v = (x[i] - x0[i]) / dt;
            points.set_velocity(i, v);
            points.set_position(i, x[i]);
        }
    }
}
