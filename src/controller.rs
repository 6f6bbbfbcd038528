//! Simulation controller (spec §4.6): owns the loaded object, the selected
//! simulator, the parameter set, and the clock, and drives `run_iteration`
//! plus the interaction commands (§6). Grounded on `SimulationController.h`
//! /`.cpp` and `SimulationController_Interactions.cpp`, stripped of the
//! render-context, pan/zoom, and screenshot members that are out of scope.

use crate::error::{SLabResult, SpringLabError};
use crate::layout_optimizer::{IdentityLayoutOptimizer, LayoutOptimizer, StructuralLayoutOptimizer};
use crate::materials::MaterialDatabase;
use crate::object::Object;
use crate::object_builder::build_object;
use crate::simulation_parameters::SimulationParameters;
use crate::simulator::{Simulator, SimulatorKind};
use crate::types::{ElementIndex, Vec2};
use crate::worker_pool::WorkerPool;
use cgmath::InnerSpace;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// How many past step durations the rolling timing window averages over.
const TIMING_WINDOW_SIZE: usize = 60;

/// Which layout optimizer to apply when (re)building the object from its
/// source files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutOptimizerKind {
    Identity,
    Structural,
}

impl LayoutOptimizerKind {
    fn as_trait_object(self) -> &'static dyn LayoutOptimizer {
        match self {
            LayoutOptimizerKind::Identity => &IdentityLayoutOptimizer,
            LayoutOptimizerKind::Structural => &StructuralLayoutOptimizer,
        }
    }
}

/// The on-disk files `reset()` re-reads to rebuild the current object.
struct ObjectSource {
    image_path: PathBuf,
    material_path: PathBuf,
    layout: LayoutOptimizerKind,
}

impl ObjectSource {
    fn load(&self) -> SLabResult<Object> {
        let image = image::open(&self.image_path)
            .map_err(SpringLabError::ImageDecode)?
            .into_rgb8();
        let materials = MaterialDatabase::load_from_file(&self.material_path)?;
        build_object(&image, &materials, self.layout.as_trait_object())
    }
}

/// Per-step measurements published to every registered event handler,
/// matching the `(step_duration, avg_duration, kinetic_energy,
/// potential_energy, optional bending_probe_offset)` tuple from §4.6.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepStats {
    pub step_duration: Duration,
    pub avg_step_duration: Duration,
    pub kinetic_energy: f32,
    pub potential_energy: f32,
    pub bending_probe_offset: Option<f32>,
}

/// Receives [`StepStats`] after every `run_iteration`. A closure-based
/// callback list stands in for the original's `ISimulationEventHandler`
/// registry; the shell out-of-scope of this crate is the only real
/// subscriber.
pub type EventHandler = Box<dyn FnMut(&StepStats) + Send>;

/// Owns the simulation's entire mutable state: object, simulator, parameters,
/// clock, and timing history. Not `Sync` (a controller is driven by one
/// thread; the simulators it dispatches to use the worker pool internally).
pub struct SimulationController {
    pool: WorkerPool,
    source: ObjectSource,
    object: Object,
    simulator_kind: SimulatorKind,
    simulator: Box<dyn Simulator>,
    parameters: SimulationParameters,
    current_simulation_time: f32,
    total_simulation_steps: u64,
    timing_window: VecDeque<Duration>,
    event_handlers: Vec<EventHandler>,
}

impl SimulationController {
    /// Loads `image_path`/`material_path` through `layout`, selects
    /// `simulator_kind` with default parameters, and spins up a worker pool
    /// with `parallelism` threads (the caller thread counts as one).
    pub fn new(
        image_path: impl AsRef<Path>,
        material_path: impl AsRef<Path>,
        layout: LayoutOptimizerKind,
        simulator_kind: SimulatorKind,
        parallelism: usize,
    ) -> SLabResult<Self> {
        let source = ObjectSource {
            image_path: image_path.as_ref().to_path_buf(),
            material_path: material_path.as_ref().to_path_buf(),
            layout,
        };
        let object = source.load()?;
        let pool = WorkerPool::new(parallelism);
        let parameters = SimulationParameters::default();
        let simulator = simulator_kind.create(&object, &parameters, &pool);

        Ok(SimulationController {
            pool,
            source,
            object,
            simulator_kind,
            simulator,
            parameters,
            current_simulation_time: 0.0,
            total_simulation_steps: 0,
            timing_window: VecDeque::with_capacity(TIMING_WINDOW_SIZE),
            event_handlers: Vec::new(),
        })
    }

    pub fn register_event_handler(&mut self, handler: EventHandler) {
        self.event_handlers.push(handler);
    }

    pub fn object(&self) -> &Object {
        &self.object
    }

    pub fn parameters(&self) -> &SimulationParameters {
        &self.parameters
    }

    pub fn current_simulation_time(&self) -> f32 {
        self.current_simulation_time
    }

    pub fn total_simulation_steps(&self) -> u64 {
        self.total_simulation_steps
    }

    pub fn simulator_kind(&self) -> SimulatorKind {
        self.simulator_kind
    }

    /// Re-loads the object from the same source files and zeros the clock,
    /// matching `reset()`'s re-load-and-restart semantics.
    pub fn reset(&mut self) -> SLabResult<()> {
        self.object = self.source.load()?;
        self.current_simulation_time = 0.0;
        self.total_simulation_steps = 0;
        self.timing_window.clear();
        self.simulator = self.simulator_kind.create(&self.object, &self.parameters, &self.pool);
        Ok(())
    }

    /// Switches to a different simulator family, re-running its initial
    /// `on_state_changed` against the current object and parameters.
    pub fn select_simulator(&mut self, kind: SimulatorKind) {
        self.simulator_kind = kind;
        self.simulator = kind.create(&self.object, &self.parameters, &self.pool);
    }

    /// Applies a `key=value` override and notifies the current simulator
    /// that its state changed.
    pub fn set_parameter(&mut self, key: &str, value: f32) -> SLabResult<()> {
        self.parameters.set_parameter(key, value)?;
        self.simulator.on_state_changed(&self.object, &self.parameters, &self.pool);
        Ok(())
    }

    /// Advances the simulation by one macro step: times the simulator's
    /// `update`, advances the clock, and publishes the resulting stats to
    /// every registered event handler.
    pub fn run_iteration(&mut self) {
        let started_at = Instant::now();
        self.simulator.update(
            &mut self.object,
            self.current_simulation_time,
            &self.parameters,
            &self.pool,
        );
        let step_duration = started_at.elapsed();

        if self.timing_window.len() == TIMING_WINDOW_SIZE {
            self.timing_window.pop_front();
        }
        self.timing_window.push_back(step_duration);
        let avg_step_duration = self.timing_window.iter().sum::<Duration>() / self.timing_window.len() as u32;

        let stats = StepStats {
            step_duration,
            avg_step_duration,
            kinetic_energy: self.kinetic_energy(),
            potential_energy: self.potential_energy(),
            bending_probe_offset: self.bending_probe_offset(),
        };

        self.current_simulation_time += self.parameters.common.time_step_duration;
        self.total_simulation_steps += 1;

        for handler in &mut self.event_handlers {
            handler(&stats);
        }
    }

    fn kinetic_energy(&self) -> f32 {
        let points = self.object.points();
        (0..points.count())
            .map(|i| 0.5 * points.mass(i) * points.velocity(i).magnitude2())
            .sum()
    }

    /// Elastic potential energy under the Classic family's coefficients,
    /// independent of which simulator is actually selected — a fixed yardstick
    /// so `run_iteration`'s published energy is comparable across simulators.
    fn potential_energy(&self) -> f32 {
        let points = self.object.points();
        let springs = self.object.springs();
        let k = self.parameters.classic.spring_stiffness_coefficient;
        (0..springs.count())
            .map(|s| {
                let a = springs.endpoint_a(s) as usize;
                let b = springs.endpoint_b(s) as usize;
                let stretch = (points.position(b) - points.position(a)).magnitude() - springs.rest_length(s);
                let k_spring = k * springs.material_stiffness(s);
                0.5 * k_spring * stretch * stretch
            })
            .sum()
    }

    fn bending_probe_offset(&self) -> Option<f32> {
        self.object.bending_probe().map(|probe| {
            let current = self.object.points().position(probe.point_index as usize);
            (current - probe.original_world_coordinates).magnitude()
        })
    }

    /// Finds the live point nearest `world_xy`, matching `GetNearestPointAt`'s
    /// fixed search radius.
    pub fn probe_nearest_point(&self, world_xy: Vec2) -> Option<ElementIndex> {
        const SEARCH_RADIUS: f32 = 0.5;
        let square_radius = SEARCH_RADIUS * SEARCH_RADIUS;

        let points = self.object.points();
        let mut best: Option<(ElementIndex, f32)> = None;
        for i in 0..points.count() {
            let d2 = (points.position(i) - world_xy).magnitude2();
            if d2 < square_radius && best.is_none_or(|(_, best_d2)| d2 < best_d2) {
                best = Some((i as ElementIndex, d2));
            }
        }
        best.map(|(index, _)| index)
    }

    /// Displaces `index` by `world_offset`, zeroing its velocity so the
    /// interaction doesn't inject spurious kinetic energy.
    pub fn move_point(&mut self, index: ElementIndex, world_offset: Vec2) {
        let points = self.object.points_mut();
        let i = index as usize;
        points.set_position(i, points.position(i) + world_offset);
        points.set_velocity(i, Vec2::new(0.0, 0.0));
    }

    /// Flips `index`'s frozen coefficient between 0 and 1. Calling this twice
    /// in a row restores the original state (invariant #10). Several
    /// simulators (the FS family, Position-Based) precompute a per-point
    /// integration factor from the frozen coefficient in `on_state_changed`,
    /// so the change is only picked up once that runs again.
    pub fn toggle_freeze(&mut self, index: ElementIndex) {
        let points = self.object.points_mut();
        let i = index as usize;
        let flipped = 1.0 - points.frozen_coefficient(i);
        points.set_frozen_coefficient(i, flipped);
        self.simulator.on_state_changed(&self.object, &self.parameters, &self.pool);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_fixture(dir: &Path) -> (PathBuf, PathBuf) {
        let image_path = dir.join("object.png");
        let image = image::RgbImage::from_fn(2, 1, |_, _| image::Rgb([255, 0, 0]));
        image.save(&image_path).unwrap();

        let material_path = dir.join("materials.json");
        let mut f = std::fs::File::create(&material_path).unwrap();
        write!(
            f,
            r#"[{{"color_key":"FF0000","name":"Red","mass":{{"nominal_mass":1.0,"density":1.0}},"stiffness":1.0}}]"#
        )
        .unwrap();

        (image_path, material_path)
    }

    #[test]
    fn run_iteration_advances_clock_and_publishes_stats() {
        let dir = std::env::temp_dir().join("springlab_controller_test_advances");
        std::fs::create_dir_all(&dir).unwrap();
        let (image_path, material_path) = write_fixture(&dir);

        let mut controller = SimulationController::new(
            &image_path,
            &material_path,
            LayoutOptimizerKind::Identity,
            SimulatorKind::FsBase,
            1,
        )
        .unwrap();
        controller.parameters.common.gravity_adjustment = 0.0;
        controller.set_parameter("global_damping", 0.0).unwrap();

        let published = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        let published_clone = published.clone();
        controller.register_event_handler(Box::new(move |stats: &StepStats| {
            published_clone.lock().unwrap().push(*stats);
        }));

        assert_eq!(controller.total_simulation_steps(), 0);
        controller.run_iteration();
        assert_eq!(controller.total_simulation_steps(), 1);
        assert!(controller.current_simulation_time() > 0.0);
        assert_eq!(published.lock().unwrap().len(), 1);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn reset_reloads_object_and_zeros_clock() {
        let dir = std::env::temp_dir().join("springlab_controller_test_reset");
        std::fs::create_dir_all(&dir).unwrap();
        let (image_path, material_path) = write_fixture(&dir);

        let mut controller = SimulationController::new(
            &image_path,
            &material_path,
            LayoutOptimizerKind::Identity,
            SimulatorKind::FsBase,
            1,
        )
        .unwrap();
        controller.run_iteration();
        controller.run_iteration();
        assert_eq!(controller.total_simulation_steps(), 2);

        controller.reset().unwrap();
        assert_eq!(controller.total_simulation_steps(), 0);
        assert_eq!(controller.current_simulation_time(), 0.0);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn toggle_freeze_twice_restores_frozen_coefficient() {
        let dir = std::env::temp_dir().join("springlab_controller_test_toggle");
        std::fs::create_dir_all(&dir).unwrap();
        let (image_path, material_path) = write_fixture(&dir);

        let mut controller = SimulationController::new(
            &image_path,
            &material_path,
            LayoutOptimizerKind::Identity,
            SimulatorKind::FsBase,
            1,
        )
        .unwrap();

        let before = controller.object().points().frozen_coefficient(0);
        controller.toggle_freeze(0);
        assert_ne!(controller.object().points().frozen_coefficient(0), before);
        controller.toggle_freeze(0);
        assert_eq!(controller.object().points().frozen_coefficient(0), before);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn probe_nearest_point_finds_closest_within_radius() {
        let dir = std::env::temp_dir().join("springlab_controller_test_probe");
        std::fs::create_dir_all(&dir).unwrap();
        let (image_path, material_path) = write_fixture(&dir);

        let controller = SimulationController::new(
            &image_path,
            &material_path,
            LayoutOptimizerKind::Identity,
            SimulatorKind::FsBase,
            1,
        )
        .unwrap();

        let p0 = controller.object().points().position(0);
        assert_eq!(controller.probe_nearest_point(p0), Some(0));
        assert_eq!(controller.probe_nearest_point(p0 + Vec2::new(10.0, 10.0)), None);

        std::fs::remove_dir_all(&dir).ok();
    }
}
