//! API Module
//!
//! This module serves the explorer's HTTP API on top of the cache store.

mod error;
mod server;

pub use error::ApiError;
pub use server::{AppState, Server, router};
