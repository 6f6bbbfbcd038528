//! Precomputation and integration phase shared by every FS-family variant
//! (and, for the per-point terms, by [`super::classic::ClassicSimulator`]
//! too) — grounded on spec §4.5.1's "explicit position Verlet + damped
//! Hooke" description, since the original engine's per-variant translation
//! units (`FSBaseSimulator.cpp` etc.) were not present in the reference
//! corpus to copy directly.

use crate::object::Object;
use crate::simulation_parameters::CommonSimulatorParameters;
use crate::types::Vec2;

/// Per-point terms that depend only on mass, gravity and the frozen mask —
/// recomputed in `on_state_changed`, read every micro-iteration.
pub struct PointPrecomputed {
    pub external_force: Vec<Vec2>,
    pub integration_factor: Vec<f32>,
}

impl PointPrecomputed {
    pub fn compute(object: &Object, common: &CommonSimulatorParameters) -> Self {
        let points = object.points();
        let n = points.count();
        let gravity = common.assigned_gravity();
        let dt_micro_sq_placeholder = 1.0; // overwritten below once dt is known per simulator

        let mut external_force = Vec::with_capacity(n);
        let mut integration_factor = Vec::with_capacity(n);
        for i in 0..n {
            let mass = points.mass(i) * common.mass_adjustment;
            external_force.push(gravity * mass + points.assigned_force(i));
            integration_factor.push(dt_micro_sq_placeholder / mass * points.frozen_coefficient(i));
        }
        PointPrecomputed {
            external_force,
            integration_factor,
        }
    }

    /// Rescales `integration_factor` for the micro-step `dt` actually used;
    /// `compute` above stores a mass-only factor so this can be called once
    /// per `on_state_changed` without knowing `dt` ahead of time:
    /// `integration_factor = dt² / (mass · mass_adjustment) · frozen_coefficient`
    /// (spec §4.5.1; matches `FSBaseSimulator.cpp::CreateState()`).
    pub fn with_dt(object: &Object, common: &CommonSimulatorParameters, dt: f32) -> Self {
        let mut p = Self::compute(object, common);
        for f in p.integration_factor.iter_mut() {
            *f *= dt * dt;
        }
        p
    }
}

/// Per-spring terms for the FS family: reduced-mass stiffness and damping,
/// normalized by `dt` so the spring phase emits an already-scaled force.
pub struct SpringPrecomputed {
    pub k_eff: Vec<f32>,
    pub c_damp: Vec<f32>,
}

impl SpringPrecomputed {
    pub fn compute(
        object: &Object,
        spring_reduction_fraction: f32,
        spring_damping_coefficient: f32,
        dt: f32,
    ) -> Self {
        let points = object.points();
        let springs = object.springs();
        let n = springs.count();

        let mut k_eff = Vec::with_capacity(n);
        let mut c_damp = Vec::with_capacity(n);
        for s in 0..n {
            let a = springs.endpoint_a(s) as usize;
            let b = springs.endpoint_b(s) as usize;
            let ma = points.mass(a);
            let mb = points.mass(b);
            let denom = ma + mb;
            let mu = if denom > 0.0 { ma * mb / denom } else { 0.0 };

            k_eff.push(spring_reduction_fraction * springs.material_stiffness(s) * mu / (dt * dt));
            c_damp.push(spring_damping_coefficient * mu / dt);
        }
        SpringPrecomputed { k_eff, c_damp }
    }
}

/// `g_damp = 1 - (1 - GlobalDamping)^(12/I)`, applied once per micro-iteration.
pub fn global_damping_coefficient(global_damping: f32, num_iterations: u32) -> f32 {
    1.0 - (1.0 - global_damping).powf(12.0 / num_iterations as f32)
}

/// Computes the Hooke + damping modulus contribution of one spring and
/// returns the force applied at endpoint `a` (the force at `b` is its
/// negation).
#[inline]
pub fn spring_force_contribution(
    pos_a: Vec2,
    pos_b: Vec2,
    vel_a: Vec2,
    vel_b: Vec2,
    rest_length: f32,
    k_eff: f32,
    c_damp: f32,
) -> Vec2 {
    use cgmath::InnerSpace;

    let d = pos_b - pos_a;
    let length = d.magnitude();
    let unit = if length > 0.0 { d / length } else { Vec2::new(0.0, 0.0) };

    let hooke = (length - rest_length) * k_eff;
    let damping = cgmath::dot(vel_b - vel_a, unit) * c_damp;
    unit * (hooke + damping)
}

/// Applies the shared integration phase to every point, in place, and zeros
/// `spring_force` for the next micro-iteration.
pub fn integrate(
    object: &mut Object,
    dt: f32,
    velocity_factor: f32,
    precomputed: &PointPrecomputed,
    spring_force: &mut [Vec2],
) {
    let points = object.points_mut();
    let n = points.count();
    for (i, force) in spring_force.iter_mut().enumerate().take(n) {
        let delta = points.velocity(i) * dt + (*force + precomputed.external_force[i]) * precomputed.integration_factor[i];
        points.set_position(i, points.position(i) + delta);
        points.set_velocity(i, delta * velocity_factor);
        *force = Vec2::new(0.0, 0.0);
    }
}
