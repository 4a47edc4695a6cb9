//! Concrete delivery server transports (feature `mongrel2`).

#[cfg(feature = "mongrel2")]
mod mongrel2;

#[cfg(feature = "mongrel2")]
pub use mongrel2::{connect_servers, ZmqDownstream};
