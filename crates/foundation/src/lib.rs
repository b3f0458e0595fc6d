pub mod geo;
pub mod handles;
pub mod math;

// Foundation crate: small, well-tested primitives only.
pub use geo::*;
pub use handles::*;
