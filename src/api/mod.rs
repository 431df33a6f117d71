//! HTTP API
//!
//! axum handlers translating requests into service calls and service results
//! into JSON responses.

pub mod error;
pub mod events;
pub mod routes;
pub mod rsvp;
pub mod state;

pub use error::{ApiError, ErrorBody};
pub use routes::build_router;
pub use state::AppState;
