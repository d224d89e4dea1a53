pub mod backend;
pub mod catalog;
pub mod constants;
pub mod engine;
pub mod mix;
pub mod state;
pub mod timer;

pub use backend::*;
pub use catalog::*;
pub use engine::*;
pub use mix::*;
pub use state::*;
pub use timer::*;
