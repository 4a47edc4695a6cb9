pub mod config;
pub mod control;
pub mod downstream;
pub mod error;
pub mod flow;
pub mod logging;
pub mod producer;
pub mod response;
pub mod scheduler;
pub mod status;
pub mod tnetstring;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use error::SluiceError;
pub use flow::StreamId;
