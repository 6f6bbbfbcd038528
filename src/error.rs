use thiserror::Error;

/// Every fatal condition the simulation core can raise.
///
/// Numeric blow-up inside an integrator (NaN/Inf positions) is deliberately
/// *not* represented here: per the error-handling policy, an unstable
/// parameter set is allowed to diverge and the caller is not notified.
#[derive(Debug, Error)]
pub enum SpringLabError {
    #[error("pixel at coordinate ({x}, {y}) is not a recognized material")]
    UnrecognizedMaterial { x: i64, y: i64 },

    #[error("more than one material is marked as the bending probe")]
    MultipleBendingProbes,

    #[error("material table entry has an invalid color_key: {0}")]
    InvalidColorKey(String),

    #[error("spring endpoint index {index} is out of bounds for {point_count} points")]
    EndpointOutOfBounds { index: u32, point_count: usize },

    #[error("point {point} already has {max} connected springs")]
    TooManyConnectedSprings { point: u32, max: usize },

    #[error("spring {spring}'s endpoints disagree with the adjacency list")]
    AdjacencyMismatch { spring: u32 },

    #[error("failed to decode object image: {0}")]
    ImageDecode(#[from] image::ImageError),

    #[error("failed to read or parse material table: {0}")]
    MaterialTable(#[from] serde_json::Error),

    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parameter {name} value {value} is outside the allowed range [{min}, {max}]")]
    ParameterOutOfRange {
        name: &'static str,
        value: f32,
        min: f32,
        max: f32,
    },

    #[error("unknown simulator name: {0}")]
    UnknownSimulator(String),

    #[error("unknown parameter key: {0}")]
    UnknownParameter(String),

    #[error("the sparse system in the Fast-MSS solver could not be factored")]
    FactorizationFailed,
}

pub type SLabResult<T> = Result<T, SpringLabError>;
