pub mod attachment;
pub mod config;
pub mod error;
pub mod io;
pub mod order;
pub mod payment;
pub mod progress;
pub mod rider;
pub mod store;
pub mod types;

pub use error::{CourierError, Result};
