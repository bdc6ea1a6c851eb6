pub mod pitch;
pub mod storage;
pub mod types;

pub use pitch::*;
pub use storage::*;
pub use types::*;
