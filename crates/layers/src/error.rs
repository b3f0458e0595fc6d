use std::fmt;

use formats::{CountryParseError, TabularError};
use scene::SceneError;

use crate::fetch::FetchError;
use crate::layer::LayerKind;

#[derive(Debug)]
pub enum LayerError {
    /// The source could not be fetched.
    Fetch(FetchError),
    /// The source has the wrong shape.
    Malformed(String),
    /// The source parsed but held no usable records.
    Empty,
    /// The renderable group could not be built.
    Build(SceneError),
    /// A load result arrived for a load that is no longer in flight.
    StaleTicket(LayerKind),
    /// The projection cannot change while this layer is loading or loaded.
    ProjectionLocked(LayerKind),
}

impl fmt::Display for LayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayerError::Fetch(err) => write!(f, "failed to fetch data: {err}"),
            LayerError::Malformed(reason) => write!(f, "data source is malformed: {reason}"),
            LayerError::Empty => write!(f, "data source has no valid records"),
            LayerError::Build(err) => write!(f, "failed to build layer: {err}"),
            LayerError::StaleTicket(kind) => write!(f, "stale load result for {kind}"),
            LayerError::ProjectionLocked(kind) => {
                write!(f, "longitude offset cannot change while {kind} is loaded")
            }
        }
    }
}

impl std::error::Error for LayerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LayerError::Fetch(err) => Some(err),
            LayerError::Build(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FetchError> for LayerError {
    fn from(err: FetchError) -> Self {
        LayerError::Fetch(err)
    }
}

impl From<TabularError> for LayerError {
    fn from(err: TabularError) -> Self {
        LayerError::Malformed(err.to_string())
    }
}

impl From<CountryParseError> for LayerError {
    fn from(err: CountryParseError) -> Self {
        LayerError::Malformed(err.to_string())
    }
}

impl From<SceneError> for LayerError {
    fn from(err: SceneError) -> Self {
        LayerError::Build(err)
    }
}
