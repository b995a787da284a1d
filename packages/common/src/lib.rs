pub mod error;
pub mod filesystem;
pub mod id_generator;
pub mod visitor;

pub use error::*;
pub use filesystem::*;
pub use id_generator::*;
pub use visitor::*;
