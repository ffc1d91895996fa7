//! Concrete stream transports for the live market view engine.

pub mod sim;
pub mod ws;
