pub mod aligned_buffer;
pub mod builder_types;
pub mod controller;
pub mod error;
pub mod layout_optimizer;
pub mod materials;
pub mod object;
pub mod object_builder;
pub mod points;
pub mod simulation_parameters;
pub mod simulator;
pub mod springs;
pub mod types;
pub mod worker_pool;

pub use error::{SLabResult, SpringLabError};
pub use object::Object;
pub use object_builder::build_object;
pub use types::Vec2;
