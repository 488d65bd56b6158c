//! Client and logger setup.
//!
//! - [`init_client`]: a [`Client`](crate::Client) over the reqwest transport
//! - [`init_logger_with`]: `env_logger` with plain or JSON output

mod client;
mod logger;

pub use client::init_client;
pub use logger::init_logger_with;
