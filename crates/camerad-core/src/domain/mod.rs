//! Pure domain state for one camera session.

pub mod session;

pub use session::{ImageType, SessionState};
