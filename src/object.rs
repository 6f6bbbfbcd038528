use crate::error::{SLabResult, SpringLabError};
use crate::points::{BendingProbe, PointStore};
use crate::springs::SpringStore;
use crate::types::ElementIndex;

/// Simulator-specific structure the layout optimizer hands back, opaque to
/// everything except the simulator that asked for it.
#[derive(Debug, Clone, Default)]
pub struct SimulatorSpecificStructure {
    /// Sizes of the leading spring-index ranges the structural layout
    /// optimizer packed into vectorizable perfect-square quadruples.
    /// `spring_processing_block_sizes = [4*K]` where `K` is the number of
    /// perfect squares found.
    pub spring_processing_block_sizes: Vec<usize>,
}

impl SimulatorSpecificStructure {
    pub fn perfect_square_count(&self) -> usize {
        self.spring_processing_block_sizes.first().copied().unwrap_or(0) / 4
    }
}

/// A loaded mass-spring object: one point store, one spring store, and the
/// structural metadata the layout optimizer produced.
#[derive(Debug)]
pub struct Object {
    points: PointStore,
    springs: SpringStore,
    structure: SimulatorSpecificStructure,
    bending_probe: Option<BendingProbe>,
}

impl Object {
    pub fn new(
        points: PointStore,
        springs: SpringStore,
        structure: SimulatorSpecificStructure,
        bending_probe: Option<BendingProbe>,
    ) -> SLabResult<Self> {
        let object = Object {
            points,
            springs,
            structure,
            bending_probe,
        };
        object.validate()?;
        Ok(object)
    }

    pub fn points(&self) -> &PointStore {
        &self.points
    }
    pub fn points_mut(&mut self) -> &mut PointStore {
        &mut self.points
    }
    pub fn springs(&self) -> &SpringStore {
        &self.springs
    }
    pub fn structure(&self) -> &SimulatorSpecificStructure {
        &self.structure
    }
    pub fn bending_probe(&self) -> Option<BendingProbe> {
        self.bending_probe
    }

    /// Checks the object invariants (spec §3): endpoints in range, adjacency
    /// symmetry, no duplicate adjacency entries.
    fn validate(&self) -> SLabResult<()> {
        let point_count = self.points.count();

        for s in 0..self.springs.count() {
            let a = self.springs.endpoint_a(s);
            let b = self.springs.endpoint_b(s);

            if a as usize >= point_count {
                return Err(SpringLabError::EndpointOutOfBounds {
                    index: a,
                    point_count,
                });
            }
            if b as usize >= point_count {
                return Err(SpringLabError::EndpointOutOfBounds {
                    index: b,
                    point_count,
                });
            }

            let s = s as ElementIndex;
            let a_has = self
                .points
                .connected_springs(a as usize)
                .as_slice()
                .iter()
                .any(|cs| cs.spring_index == s && cs.other_endpoint_index == b);
            let b_has = self
                .points
                .connected_springs(b as usize)
                .as_slice()
                .iter()
                .any(|cs| cs.spring_index == s && cs.other_endpoint_index == a);

            debug_assert!(a_has, "spring {s} missing from endpoint {a}'s adjacency list");
            debug_assert!(b_has, "spring {s} missing from endpoint {b}'s adjacency list");
            if !a_has || !b_has {
                return Err(SpringLabError::AdjacencyMismatch { spring: s });
            }
        }

        Ok(())
    }
}
