pub mod filesystem;
pub mod path;

pub use filesystem::*;
pub use path::*;
