//! Simulator family implementations. Every concrete simulator implements
//! [`Simulator`]; [`SimulatorKind`] replaces the name-keyed factory registry
//! the original engine used, since a closed `enum` is the idiomatic Rust
//! equivalent for a fixed set of interchangeable strategies.

mod classic;
mod fast_mss;
mod fs_base;
mod fs_by_point;
mod fs_by_point_compact;
mod fs_by_spring_intrinsics;
mod fs_by_spring_structural;
pub mod fs_common;
mod gauss_seidel;
mod position_based;

pub use classic::ClassicSimulator;
pub use fast_mss::FastMssSimulator;
pub use fs_base::FsBaseSimulator;
pub use fs_by_point::FsByPointSimulator;
pub use fs_by_point_compact::{FsByPointCompactIntegratingSimulator, FsByPointCompactSimulator};
pub use fs_by_spring_intrinsics::FsBySpringIntrinsicsSimulator;
pub use fs_by_spring_structural::{
    FsBySpringStructuralIntrinsicsSimulator, FsBySpringStructuralMtSimulator,
    FsBySpringStructuralMtVectorizedSimulator,
};
pub use gauss_seidel::GaussSeidelByPointSimulator;
pub use position_based::PositionBasedBasicSimulator;

use crate::object::Object;
use crate::simulation_parameters::SimulationParameters;
use crate::worker_pool::WorkerPool;

/// A mass-spring integration strategy.
///
/// `new` is intentionally not part of this trait (it would make the trait
/// non-object-safe); each concrete simulator exposes its own `new`, and
/// [`SimulatorKind::create`] is the uniform entry point.
pub trait Simulator {
    /// Called whenever a parameter changes or an object attribute other than
    /// position/velocity changes. Never called mid-step.
    fn on_state_changed(&mut self, object: &Object, params: &SimulationParameters, pool: &WorkerPool);

    /// Advances the simulation by one macro step `Δt_macro = params.common.time_step_duration`.
    fn update(
        &mut self,
        object: &mut Object,
        current_simulation_time: f32,
        params: &SimulationParameters,
        pool: &WorkerPool,
    );
}

/// The set of simulator families a caller can select by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulatorKind {
    Classic,
    FsBase,
    FsByPoint,
    FsByPointCompact,
    FsByPointCompactIntegrating,
    FsBySpringIntrinsics,
    FsBySpringStructuralIntrinsics,
    FsBySpringStructuralMt,
    FsBySpringStructuralMtVectorized,
    GaussSeidelByPoint,
    PositionBasedBasic,
    FastMssBasic,
}

impl SimulatorKind {
    pub const ALL: [SimulatorKind; 12] = [
        SimulatorKind::Classic,
        SimulatorKind::FsBase,
        SimulatorKind::FsByPoint,
        SimulatorKind::FsByPointCompact,
        SimulatorKind::FsByPointCompactIntegrating,
        SimulatorKind::FsBySpringIntrinsics,
        SimulatorKind::FsBySpringStructuralIntrinsics,
        SimulatorKind::FsBySpringStructuralMt,
        SimulatorKind::FsBySpringStructuralMtVectorized,
        SimulatorKind::GaussSeidelByPoint,
        SimulatorKind::PositionBasedBasic,
        SimulatorKind::FastMssBasic,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SimulatorKind::Classic => "Classic",
            SimulatorKind::FsBase => "FS-Base",
            SimulatorKind::FsByPoint => "FS-ByPoint",
            SimulatorKind::FsByPointCompact => "FS-ByPointCompact",
            SimulatorKind::FsByPointCompactIntegrating => "FS-ByPointCompactIntegrating",
            SimulatorKind::FsBySpringIntrinsics => "FS-BySpringIntrinsics",
            SimulatorKind::FsBySpringStructuralIntrinsics => "FS-BySpringStructuralIntrinsics",
            SimulatorKind::FsBySpringStructuralMt => "FS-BySpringStructuralMT",
            SimulatorKind::FsBySpringStructuralMtVectorized => "FS-BySpringStructuralMTVectorized",
            SimulatorKind::GaussSeidelByPoint => "Gauss-Seidel-ByPoint",
            SimulatorKind::PositionBasedBasic => "Position-Based-Basic",
            SimulatorKind::FastMssBasic => "Fast-MSS-Basic",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.name() == name)
    }

    /// Constructs the simulator, running its initial `on_state_changed`.
    pub fn create(
        &self,
        object: &Object,
        params: &SimulationParameters,
        pool: &WorkerPool,
    ) -> Box<dyn Simulator> {
        match self {
            SimulatorKind::Classic => Box::new(ClassicSimulator::new(object, params, pool)),
            SimulatorKind::FsBase => Box::new(FsBaseSimulator::new(object, params, pool)),
            SimulatorKind::FsByPoint => Box::new(FsByPointSimulator::new(object, params, pool)),
            SimulatorKind::FsByPointCompact => {
                Box::new(FsByPointCompactSimulator::new(object, params, pool))
            }
            SimulatorKind::FsByPointCompactIntegrating => {
                Box::new(FsByPointCompactIntegratingSimulator::new(object, params, pool))
            }
            SimulatorKind::FsBySpringIntrinsics => {
                Box::new(FsBySpringIntrinsicsSimulator::new(object, params, pool))
            }
            SimulatorKind::FsBySpringStructuralIntrinsics => {
                Box::new(FsBySpringStructuralIntrinsicsSimulator::new(object, params, pool))
            }
            SimulatorKind::FsBySpringStructuralMt => {
                Box::new(FsBySpringStructuralMtSimulator::new(object, params, pool))
            }
            SimulatorKind::FsBySpringStructuralMtVectorized => {
                Box::new(FsBySpringStructuralMtVectorizedSimulator::new(object, params, pool))
            }
            SimulatorKind::GaussSeidelByPoint => {
                Box::new(GaussSeidelByPointSimulator::new(object, params, pool))
            }
            SimulatorKind::PositionBasedBasic => {
                Box::new(PositionBasedBasicSimulator::new(object, params, pool))
            }
            SimulatorKind::FastMssBasic => Box::new(FastMssSimulator::new(object, params, pool)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_round_trips_through_its_name() {
        for kind in SimulatorKind::ALL {
            assert_eq!(SimulatorKind::from_name(kind.name()), Some(kind));
        }
    }
}
