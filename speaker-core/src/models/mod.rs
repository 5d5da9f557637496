pub mod config;
pub mod device;
pub mod error;
pub mod sample;
pub mod state;
