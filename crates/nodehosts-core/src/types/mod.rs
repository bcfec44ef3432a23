mod event;
mod node;
mod table;

pub use event::*;
pub use node::*;
pub use table::*;
