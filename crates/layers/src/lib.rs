pub mod annotation;
pub mod borders;
pub mod config;
pub mod control;
pub mod earthquakes;
pub mod error;
pub mod fetch;
pub mod layer;
pub mod lifecycle;
pub mod markers;
pub mod snapshot;
pub mod symbology;
pub mod viewer;
pub mod volcanoes;

pub use error::LayerError;
pub use fetch::{DataFetcher, FetchError};
pub use layer::*;
pub use lifecycle::*;
pub use viewer::Viewer;
