pub mod manual;

pub use manual::ManualBackend;
