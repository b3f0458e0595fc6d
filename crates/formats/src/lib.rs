pub mod countries;
pub mod earthquakes;
pub mod sampling;
pub mod tabular;
pub mod volcanoes;

pub use countries::*;
pub use earthquakes::*;
pub use sampling::*;
pub use tabular::*;
pub use volcanoes::*;
