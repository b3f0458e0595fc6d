pub mod drawable3d;
pub mod transform;
pub mod visibility;

pub use drawable3d::*;
pub use transform::*;
pub use visibility::*;
