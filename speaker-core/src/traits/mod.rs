pub mod backend;
pub mod streamer;
