pub mod address;
pub mod constants;
pub mod conversions;
pub(crate) mod logger;
pub mod memory;

pub use address::{Address, ObjectReference};
