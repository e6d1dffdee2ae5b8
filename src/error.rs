//! Error taxonomy for the choreography layer.
//!
//! Only construction-time problems (bad config, bad layout) surface as
//! `Err`. Runtime problems such as a missing WebGL context are logged by the
//! component that hits them and the page keeps running in a degraded mode.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChoreoError {
    #[error("config is not valid JSON: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("phase cuts must be strictly increasing inside (0, 1), got {0:?}")]
    InvalidPhaseCuts([f64; 3]),

    #[error("zones `{first}` and `{second}` overlap")]
    OverlappingZones { first: String, second: String },

    #[error("zone `{0}` is declared more than once")]
    DuplicateZone(String),

    #[error("surface for zone `{zone}` unavailable: {reason}")]
    SurfaceUnavailable { zone: String, reason: String },

    #[error("ready signal already resolved")]
    AlreadyResolved,
}

pub type Result<T, E = ChoreoError> = std::result::Result<T, E>;
