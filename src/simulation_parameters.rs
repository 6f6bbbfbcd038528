//! Tunable parameters, grouped the way the controller hands them out:
//! [`CommonSimulatorParameters`] apply to every simulator family, the rest
//! are per-family and only consulted by the simulator that asked for them.

use crate::error::{SLabResult, SpringLabError};
use crate::types::Vec2;

/// Standard gravity, matching the reference engine's constant.
pub const GRAVITY: Vec2 = Vec2::new(0.0, -9.80);
pub const GRAVITY_MAGNITUDE: f32 = 9.80;

/// Parameters every simulator family reads: time step, mass/gravity scaling,
/// global damping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CommonSimulatorParameters {
    pub time_step_duration: f32,
    pub mass_adjustment: f32,
    pub gravity_adjustment: f32,
    pub global_damping: f32,
}

impl CommonSimulatorParameters {
    pub const MIN_TIME_STEP_DURATION: f32 = 0.0003;
    pub const MAX_TIME_STEP_DURATION: f32 = 1.3;
    pub const MIN_MASS_ADJUSTMENT: f32 = 0.0001;
    pub const MAX_MASS_ADJUSTMENT: f32 = 1000.0;
    pub const MIN_GRAVITY_ADJUSTMENT: f32 = 0.0;
    pub const MAX_GRAVITY_ADJUSTMENT: f32 = 1000.0;
    pub const MIN_GLOBAL_DAMPING: f32 = 0.0;
    pub const MAX_GLOBAL_DAMPING: f32 = 1.0;

    pub fn assigned_gravity(&self) -> Vec2 {
        GRAVITY * self.gravity_adjustment
    }
}

impl Default for CommonSimulatorParameters {
    fn default() -> Self {
        CommonSimulatorParameters {
            time_step_duration: 1.0 / 64.0,
            mass_adjustment: 1.0,
            gravity_adjustment: 1.0,
            global_damping: 0.0,
        }
    }
}

/// Classic simulator: unreduced-mass Hooke's law plus linear damping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassicParameters {
    pub spring_stiffness_coefficient: f32,
    pub spring_damping_coefficient: f32,
}

impl ClassicParameters {
    pub const MIN_SPRING_STIFFNESS_COEFFICIENT: f32 = 0.0;
    pub const MAX_SPRING_STIFFNESS_COEFFICIENT: f32 = 500_000.0;
    pub const MIN_SPRING_DAMPING_COEFFICIENT: f32 = 0.0;
    pub const MAX_SPRING_DAMPING_COEFFICIENT: f32 = 10_000.0;
}

impl Default for ClassicParameters {
    fn default() -> Self {
        ClassicParameters {
            spring_stiffness_coefficient: 36_700.0,
            spring_damping_coefficient: 55.05,
        }
    }
}

/// Shared by every FS-family simulator (by-spring, by-point, structural, MT).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FsParameters {
    pub num_mechanical_dynamics_iterations: u32,
    pub spring_reduction_fraction: f32,
    pub spring_damping_coefficient: f32,
    pub global_damping: f32,
}

impl FsParameters {
    pub const MIN_NUM_MECHANICAL_DYNAMICS_ITERATIONS: u32 = 1;
    pub const MAX_NUM_MECHANICAL_DYNAMICS_ITERATIONS: u32 = 200;
}

impl Default for FsParameters {
    fn default() -> Self {
        FsParameters {
            num_mechanical_dynamics_iterations: 30,
            spring_reduction_fraction: 0.5,
            spring_damping_coefficient: 0.03,
            global_damping: 0.000_107_496_53,
        }
    }
}

/// Gauss-Seidel-ByPoint reuses the FS family's parameter shape; only its
/// per-iteration update order differs (spec §4.5.2).
pub type GaussSeidelParameters = FsParameters;

/// Position-Based Dynamics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionBasedParameters {
    pub num_update_iterations: u32,
    pub num_solver_iterations: u32,
    pub spring_stiffness: f32,
    pub global_damping: f32,
}

impl PositionBasedParameters {
    pub const MIN_NUM_UPDATE_ITERATIONS: u32 = 1;
    pub const MAX_NUM_UPDATE_ITERATIONS: u32 = 100;
    pub const MIN_NUM_SOLVER_ITERATIONS: u32 = 1;
    pub const MAX_NUM_SOLVER_ITERATIONS: u32 = 100;
    pub const MIN_SPRING_STIFFNESS: f32 = 0.0;
    pub const MAX_SPRING_STIFFNESS: f32 = 1.0;
}

impl Default for PositionBasedParameters {
    fn default() -> Self {
        PositionBasedParameters {
            num_update_iterations: 1,
            num_solver_iterations: 1,
            spring_stiffness: 1.0,
            global_damping: 0.99983998,
        }
    }
}

/// Fast Mass-Spring System: global-local solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FastMssParameters {
    pub spring_stiffness_coefficient: f32,
    pub global_damping: f32,
    pub num_local_global_step_iterations: u32,
}

impl FastMssParameters {
    pub const MIN_SPRING_STIFFNESS_COEFFICIENT: f32 = 0.0;
    pub const MAX_SPRING_STIFFNESS_COEFFICIENT: f32 = 500_000.0;
}

impl Default for FastMssParameters {
    fn default() -> Self {
        FastMssParameters {
            spring_stiffness_coefficient: 36_700.0,
            global_damping: 1.0,
            num_local_global_step_iterations: 10,
        }
    }
}

/// The full parameter set the controller owns, one block per family plus
/// the common block every family reads.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimulationParameters {
    pub common: CommonSimulatorParameters,
    pub classic: ClassicParameters,
    pub fs: FsParameters,
    pub position_based: PositionBasedParameters,
    pub fast_mss: FastMssParameters,
}

/// Checks `value` against `[min, max]`, returning the out-of-range error the
/// controller's `set_parameter` surfaces.
pub fn check_range(name: &'static str, value: f32, min: f32, max: f32) -> SLabResult<f32> {
    if value < min || value > max {
        Err(SpringLabError::ParameterOutOfRange {
            name,
            value,
            min,
            max,
        })
    } else {
        Ok(value)
    }
}

impl SimulationParameters {
    /// Applies a `key=value` parameter override, per the recognized key
    /// table in the controller's external interface.
    pub fn set_parameter(&mut self, key: &str, value: f32) -> SLabResult<()> {
        match key {
            "time_step_duration" => {
                self.common.time_step_duration = check_range(
                    "time_step_duration",
                    value,
                    CommonSimulatorParameters::MIN_TIME_STEP_DURATION,
                    CommonSimulatorParameters::MAX_TIME_STEP_DURATION,
                )?;
            }
            "mass_adjustment" => {
                self.common.mass_adjustment = check_range(
                    "mass_adjustment",
                    value,
                    CommonSimulatorParameters::MIN_MASS_ADJUSTMENT,
                    CommonSimulatorParameters::MAX_MASS_ADJUSTMENT,
                )?;
            }
            "gravity_adjustment" => {
                self.common.gravity_adjustment = check_range(
                    "gravity_adjustment",
                    value,
                    CommonSimulatorParameters::MIN_GRAVITY_ADJUSTMENT,
                    CommonSimulatorParameters::MAX_GRAVITY_ADJUSTMENT,
                )?;
            }
            "global_damping" => {
                let v = check_range(
                    "global_damping",
                    value,
                    CommonSimulatorParameters::MIN_GLOBAL_DAMPING,
                    CommonSimulatorParameters::MAX_GLOBAL_DAMPING,
                )?;
                self.common.global_damping = v;
                self.fs.global_damping = v;
                self.position_based.global_damping = v;
                self.fast_mss.global_damping = v;
            }
            "spring_stiffness_coefficient" => {
                let v = check_range(
                    "spring_stiffness_coefficient",
                    value,
                    ClassicParameters::MIN_SPRING_STIFFNESS_COEFFICIENT,
                    ClassicParameters::MAX_SPRING_STIFFNESS_COEFFICIENT,
                )?;
                self.classic.spring_stiffness_coefficient = v;
                self.fast_mss.spring_stiffness_coefficient = v;
            }
            "spring_damping_coefficient" => {
                let v = check_range(
                    "spring_damping_coefficient",
                    value,
                    ClassicParameters::MIN_SPRING_DAMPING_COEFFICIENT,
                    ClassicParameters::MAX_SPRING_DAMPING_COEFFICIENT,
                )?;
                self.classic.spring_damping_coefficient = v;
                self.fs.spring_damping_coefficient = v;
            }
            "num_mechanical_dynamics_iterations" => {
                let v = check_range(
                    "num_mechanical_dynamics_iterations",
                    value,
                    FsParameters::MIN_NUM_MECHANICAL_DYNAMICS_ITERATIONS as f32,
                    FsParameters::MAX_NUM_MECHANICAL_DYNAMICS_ITERATIONS as f32,
                )?;
                self.fs.num_mechanical_dynamics_iterations = v as u32;
            }
            "spring_reduction_fraction" => {
                self.fs.spring_reduction_fraction = value;
            }
            "num_update_iterations" => {
                let v = check_range(
                    "num_update_iterations",
                    value,
                    PositionBasedParameters::MIN_NUM_UPDATE_ITERATIONS as f32,
                    PositionBasedParameters::MAX_NUM_UPDATE_ITERATIONS as f32,
                )?;
                self.position_based.num_update_iterations = v as u32;
            }
            "num_solver_iterations" => {
                let v = check_range(
                    "num_solver_iterations",
                    value,
                    PositionBasedParameters::MIN_NUM_SOLVER_ITERATIONS as f32,
                    PositionBasedParameters::MAX_NUM_SOLVER_ITERATIONS as f32,
                )?;
                self.position_based.num_solver_iterations = v as u32;
            }
            "spring_stiffness" => {
                self.position_based.spring_stiffness = check_range(
                    "spring_stiffness",
                    value,
                    PositionBasedParameters::MIN_SPRING_STIFFNESS,
                    PositionBasedParameters::MAX_SPRING_STIFFNESS,
                )?;
            }
            "num_local_global_step_iterations" => {
                self.fast_mss.num_local_global_step_iterations = value as u32;
            }
            _ => return Err(SpringLabError::UnknownParameter(key.to_string())),
        }
        Ok(())
    }
}
