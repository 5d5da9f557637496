pub mod capture;
pub mod engine;
pub mod playback;
