pub mod dummy;
pub mod lane_map;
pub mod midi_import;
pub mod model;
pub mod pitch;

pub use dummy::*;
pub use lane_map::*;
pub use midi_import::*;
pub use model::*;
pub use pitch::*;
