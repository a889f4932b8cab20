pub mod gamepad;
pub mod input;
pub mod overlay;
pub mod renderer;
pub mod sound;
pub mod source;
