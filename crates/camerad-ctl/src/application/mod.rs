//! Application layer: the camera operation sequences built on top of the
//! broadcast engine.

pub mod camera;
pub mod magic;

pub use camera::{CameraError, CameraSession, OpenOptions};
pub use magic::BoardIo;
