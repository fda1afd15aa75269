pub mod core;
pub mod map;
pub mod reduce;
