//! Writer implementations
//!
//! Each writer receives the serialized envelopes a buffered setter drains.

mod file;
mod log;
mod network;

pub use self::file::{FileWriter, FileWriterConfig};
pub use self::log::LogWriter;
pub use self::network::{NetworkFormat, NetworkWriter, NetworkWriterConfig};
