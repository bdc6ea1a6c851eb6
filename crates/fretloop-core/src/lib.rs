pub mod diagnostics;
pub mod ipc;
pub mod session;
pub mod transport;

pub use diagnostics::*;
pub use ipc::*;
pub use session::*;
pub use transport::*;
