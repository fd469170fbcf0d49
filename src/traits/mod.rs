//! Trait definitions.

pub mod forest;
pub mod transport;

pub use forest::{ElementScheme, ForestView};
pub use transport::{SerialComm, Transport};
