//! The structural layout optimizer groups up to `K` perfect squares into
//! leading quadruples of springs that share exactly four points (J, K, L,
//! M per spec §4.3). This file contains the three variants built on that
//! prefix: a single-threaded structural pass, a single-threaded "MT"
//! placeholder (spec table: "wrapper", i.e. it exists to be selected by name
//! but adds no parallelism), and the actual fork-join, per-thread-accumulator
//! vectorized variant.

use super::fs_common::{global_damping_coefficient, PointPrecomputed, SpringPrecomputed};
use super::Simulator;
use crate::object::Object;
use crate::simulation_parameters::SimulationParameters;
use crate::types::Vec2;
use crate::worker_pool::{Task, WorkerPool};

fn micro_step_dt(params: &SimulationParameters) -> f32 {
    params.common.time_step_duration / params.fs.num_mechanical_dynamics_iterations as f32
}

/// Computes the Hooke + damping force contributed at `a` by one spring,
/// given already-loaded position/velocity pairs.
#[inline]
fn lane_force(pos_a: Vec2, pos_b: Vec2, vel_a: Vec2, vel_b: Vec2, rest_length: f32, k_eff: f32, c_damp: f32) -> Vec2 {
    use cgmath::InnerSpace;
    let d = pos_b - pos_a;
    let length = d.magnitude();
    let unit = if length > 0.0 { d / length } else { Vec2::new(0.0, 0.0) };
    let hooke = (length - rest_length) * k_eff;
    let damping = cgmath::dot(vel_b - vel_a, unit) * c_damp;
    unit * (hooke + damping)
}

/// Accumulates the force of spring-range `[start, end)` into `spring_force`,
/// processing the leading perfect-square prefix four springs at a time
/// (loading J, K, L, M once per quadruple) and the remainder one at a time.
fn accumulate_range(
    object: &Object,
    springs_pre: &SpringPrecomputed,
    start: usize,
    end: usize,
    spring_force: &mut [Vec2],
) {
    let points = object.points();
    let springs = object.springs();
    let block = object.structure().spring_processing_block_sizes.first().copied().unwrap_or(0);

    let mut s = start;
    while s < end {
        if s + 4 <= block.min(end) && s.is_multiple_of(4) {
            let (s0, s1, s2, s3) = (s, s + 1, s + 2, s + 3);
            let j = springs.endpoint_a(s0) as usize;
            let l = springs.endpoint_b(s0) as usize;
            let m = springs.endpoint_a(s1) as usize;
            let k = springs.endpoint_b(s1) as usize;

            let (pos_j, pos_k, pos_l, pos_m) = (
                points.position(j),
                points.position(k),
                points.position(l),
                points.position(m),
            );
            let (vel_j, vel_k, vel_l, vel_m) = (
                points.velocity(j),
                points.velocity(k),
                points.velocity(l),
                points.velocity(m),
            );

            let quad = [(s0, j, l, pos_j, pos_l, vel_j, vel_l), (s1, m, k, pos_m, pos_k, vel_m, vel_k),
                (s2, j, k, pos_j, pos_k, vel_j, vel_k), (s3, m, l, pos_m, pos_l, vel_m, vel_l)];

            for (sidx, a, b, pa, pb, va, vb) in quad {
                let force = lane_force(
                    pa,
                    pb,
                    va,
                    vb,
                    springs.rest_length(sidx),
                    springs_pre.k_eff[sidx],
                    springs_pre.c_damp[sidx],
                );
                spring_force[a] += force;
                spring_force[b] -= force;
            }
            s += 4;
        } else {
            let a = springs.endpoint_a(s) as usize;
            let b = springs.endpoint_b(s) as usize;
            let force = lane_force(
                points.position(a),
                points.position(b),
                points.velocity(a),
                points.velocity(b),
                springs.rest_length(s),
                springs_pre.k_eff[s],
                springs_pre.c_damp[s],
            );
            spring_force[a] += force;
            spring_force[b] -= force;
            s += 1;
        }
    }
}

pub struct FsBySpringStructuralIntrinsicsSimulator {
    points: PointPrecomputed,
    springs: SpringPrecomputed,
    spring_force: Vec<Vec2>,
}

impl FsBySpringStructuralIntrinsicsSimulator {
    pub fn new(object: &Object, params: &SimulationParameters, pool: &WorkerPool) -> Self {
        let mut s = FsBySpringStructuralIntrinsicsSimulator {
            points: PointPrecomputed::compute(object, &params.common),
            springs: SpringPrecomputed { k_eff: Vec::new(), c_damp: Vec::new() },
            spring_force: vec![Vec2::new(0.0, 0.0); object.points().count()],
        };
        s.on_state_changed(object, params, pool);
        s
    }
}

impl Simulator for FsBySpringStructuralIntrinsicsSimulator {
    fn on_state_changed(&mut self, object: &Object, params: &SimulationParameters, _pool: &WorkerPool) {
        let dt = micro_step_dt(params);
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
        let dt = micro_step_dt(params);
        let iterations = params.fs.num_mechanical_dynamics_iterations;
        let g_damp = global_damping_coefficient(params.common.global_damping, iterations);
        let velocity_factor = (1.0 - g_damp) / dt;

        for _ in 0..iterations {
            let n_springs = object.springs().count();
            accumulate_range(object, &self.springs, 0, n_springs, &mut self.spring_force);
            super::fs_common::integrate(object, dt, velocity_factor, &self.points, &mut self.spring_force);
        }
    }
}

/// Single-threaded placeholder: selectable by name like the real MT variant,
/// but delegates to the structural pass without touching the worker pool
/// (spec §4.5.1 marks this row "wrapper").
pub struct FsBySpringStructuralMtSimulator {
    inner: FsBySpringStructuralIntrinsicsSimulator,
}

impl FsBySpringStructuralMtSimulator {
    pub fn new(object: &Object, params: &SimulationParameters, pool: &WorkerPool) -> Self {
        FsBySpringStructuralMtSimulator {
            inner: FsBySpringStructuralIntrinsicsSimulator::new(object, params, pool),
        }
    }
}

impl Simulator for FsBySpringStructuralMtSimulator {
    fn on_state_changed(&mut self, object: &Object, params: &SimulationParameters, pool: &WorkerPool) {
        self.inner.on_state_changed(object, params, pool);
    }
    fn update(&mut self, object: &mut Object, t: f32, params: &SimulationParameters, pool: &WorkerPool) {
        self.inner.update(object, t, params, pool);
    }
}

/// Splits the spring range into `P` contiguous, 4-aligned chunks (last chunk
/// absorbs the tail), runs them on the worker pool with one accumulator
/// buffer per worker, then reduces the `P` buffers with specialized code
/// paths for `P ∈ {1, 2, 4}` and a generic fallback otherwise.
pub struct FsBySpringStructuralMtVectorizedSimulator {
    points: PointPrecomputed,
    springs: SpringPrecomputed,
    accumulators: Vec<Vec<Vec2>>,
    spring_force: Vec<Vec2>,
}

impl FsBySpringStructuralMtVectorizedSimulator {
    pub fn new(object: &Object, params: &SimulationParameters, pool: &WorkerPool) -> Self {
        let n_points = object.points().count();
        let mut s = FsBySpringStructuralMtVectorizedSimulator {
            points: PointPrecomputed::compute(object, &params.common),
            springs: SpringPrecomputed { k_eff: Vec::new(), c_damp: Vec::new() },
            accumulators: vec![vec![Vec2::new(0.0, 0.0); n_points]; pool.parallelism()],
            spring_force: vec![Vec2::new(0.0, 0.0); n_points],
        };
        s.on_state_changed(object, params, pool);
        s
    }

    fn chunk_bounds(n_springs: usize, parallelism: usize) -> Vec<(usize, usize)> {
        if n_springs == 0 {
            return vec![(0, 0); parallelism];
        }
        let base = (n_springs / parallelism / 4) * 4;
        let mut bounds = Vec::with_capacity(parallelism);
        let mut start = 0;
        for p in 0..parallelism {
            let end = if p == parallelism - 1 { n_springs } else { (start + base).min(n_springs) };
            bounds.push((start, end));
            start = end;
        }
        bounds
    }

    fn reduce_accumulators(&mut self) {
        let p = self.accumulators.len();
        let n = self.spring_force.len();
        match p {
            1 => {
                for i in 0..n {
                    self.spring_force[i] = self.accumulators[0][i];
                    self.accumulators[0][i] = Vec2::new(0.0, 0.0);
                }
            }
            2 => {
                for i in 0..n {
                    self.spring_force[i] = self.accumulators[0][i] + self.accumulators[1][i];
                    self.accumulators[0][i] = Vec2::new(0.0, 0.0);
                    self.accumulators[1][i] = Vec2::new(0.0, 0.0);
                }
            }
            4 => {
                for i in 0..n {
                    self.spring_force[i] =
                        self.accumulators[0][i] + self.accumulators[1][i] + self.accumulators[2][i] + self.accumulators[3][i];
                    for a in self.accumulators.iter_mut() {
                        a[i] = Vec2::new(0.0, 0.0);
                    }
                }
            }
            _ => {
                for i in 0..n {
                    let mut total = Vec2::new(0.0, 0.0);
                    for a in self.accumulators.iter_mut() {
                        total += a[i];
                        a[i] = Vec2::new(0.0, 0.0);
                    }
                    self.spring_force[i] = total;
                }
            }
        }
    }
}

impl Simulator for FsBySpringStructuralMtVectorizedSimulator {
    fn on_state_changed(&mut self, object: &Object, params: &SimulationParameters, pool: &WorkerPool) {
        let dt = micro_step_dt(params);
        self.points = PointPrecomputed::with_dt(object, &params.common, dt);
        self.springs = SpringPrecomputed::compute(
            object,
            params.fs.spring_reduction_fraction,
            params.fs.spring_damping_coefficient,
            dt,
        );
        let n_points = object.points().count();
        self.accumulators = vec![vec![Vec2::new(0.0, 0.0); n_points]; pool.parallelism()];
        self.spring_force = vec![Vec2::new(0.0, 0.0); n_points];
    }

    fn update(
        &mut self,
        object: &mut Object,
        _current_simulation_time: f32,
        params: &SimulationParameters,
        pool: &WorkerPool,
    ) {
        let dt = micro_step_dt(params);
        let iterations = params.fs.num_mechanical_dynamics_iterations;
        let g_damp = global_damping_coefficient(params.common.global_damping, iterations);
        let velocity_factor = (1.0 - g_damp) / dt;

        for _ in 0..iterations {
            let n_springs = object.springs().count();
            let bounds = Self::chunk_bounds(n_springs, pool.parallelism());

            let object_ref: &Object = &*object;
            let springs_pre: &SpringPrecomputed = &self.springs;
            let mut tasks: Vec<Box<Task<'_>>> = self
                .accumulators
                .iter_mut()
                .zip(bounds.iter())
                .map(|(accumulator, &(start, end))| -> Box<Task<'_>> {
                    Box::new(move || {
                        accumulate_range(object_ref, springs_pre, start, end, accumulator);
                    })
                })
                .collect();
            if !tasks.is_empty() {
                pool.run(&mut tasks);
            }
            drop(tasks);

            self.reduce_accumulators();
            super::fs_common::integrate(object, dt, velocity_factor, &self.points, &mut self.spring_force);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::fs_base::FsBaseSimulator;
    use crate::layout_optimizer::{IdentityLayoutOptimizer, StructuralLayoutOptimizer};
    use crate::materials::MaterialDatabase;
    use crate::object_builder::build_object;
    use image::RgbImage;

    fn grid_object(size: u32, optimizer: &dyn crate::layout_optimizer::LayoutOptimizer) -> Object {
        let img = RgbImage::from_fn(size, size, |_, _| image::Rgb([255, 0, 0]));
        let materials = MaterialDatabase::load_from_str(
            r#"[{"color_key":"FF0000","name":"Red","mass":{"nominal_mass":1.0,"density":1.0},"stiffness":1.0}]"#,
        )
        .unwrap();
        build_object(&img, &materials, optimizer).unwrap()
    }

    #[test]
    fn structural_matches_base_within_tolerance() {
        let mut structural = grid_object(4, &StructuralLayoutOptimizer);
        let mut base = grid_object(4, &IdentityLayoutOptimizer);
        let params = SimulationParameters::default();
        let pool = WorkerPool::new(1);

        let mut sim_a = FsBySpringStructuralIntrinsicsSimulator::new(&structural, &params, &pool);
        let mut sim_b = FsBaseSimulator::new(&base, &params, &pool);

        for _ in 0..20 {
            sim_a.update(&mut structural, 0.0, &params, &pool);
            sim_b.update(&mut base, 0.0, &params, &pool);
        }

        let (min_a, max_a) = structural.points().aabb();
        let (min_b, max_b) = base.points().aabb();
        assert!((min_a.x - min_b.x).abs() < 1e-2);
        assert!((max_a.y - max_b.y).abs() < 1e-2);
    }

    #[test]
    fn mt_vectorized_matches_single_threaded_within_tolerance() {
        let mut mt = grid_object(4, &StructuralLayoutOptimizer);
        let mut st = grid_object(4, &StructuralLayoutOptimizer);
        let params = SimulationParameters::default();
        let pool_mt = WorkerPool::new(4);
        let pool_st = WorkerPool::new(1);

        let mut sim_a = FsBySpringStructuralMtVectorizedSimulator::new(&mt, &params, &pool_mt);
        let mut sim_b = FsBySpringStructuralIntrinsicsSimulator::new(&st, &params, &pool_st);

        for _ in 0..100 {
            sim_a.update(&mut mt, 0.0, &params, &pool_mt);
            sim_b.update(&mut st, 0.0, &params, &pool_st);
        }

        for i in 0..mt.points().count() {
            let a = mt.points().position(i);
            let b = st.points().position(i);
            assert!((a.x - b.x).abs() < 1e-3, "point {i} diverged");
            assert!((a.y - b.y).abs() < 1e-3, "point {i} diverged");
        }
    }
}
