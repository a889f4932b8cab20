pub mod assets;
pub mod event;
pub mod map;
pub mod step;
pub mod world;
