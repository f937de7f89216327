//! Web layer for the journey-time planner.
//!
//! Provides HTTP endpoints for station lookup, single journey times and
//! meeting-point ranking over a loaded graph.

mod dto;
mod routes;
mod state;

pub use dto::*;
pub use routes::{AppError, create_router};
pub use state::AppState;
