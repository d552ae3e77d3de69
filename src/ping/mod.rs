// src/ping/mod.rs
mod coordinator;
mod flight;
mod result;

pub use coordinator::PingCoordinator;
pub use flight::FlightGroup;
pub use result::{PingError, PingResult, SharedError};
