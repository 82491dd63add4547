mod geometry;
mod item;
mod registry;

pub use geometry::*;
pub use item::*;
pub use registry::*;
