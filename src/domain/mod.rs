pub mod entity;
pub mod interaction;
pub mod layer;
pub mod movement;
pub mod physics;
pub mod poi;
pub mod proximity;
