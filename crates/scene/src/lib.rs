pub mod camera;
pub mod components;
pub mod entity;
pub mod picking;
pub mod prefabs;
pub mod resources;
pub mod world;

pub use world::*;
