//! Nestegg API Library
//!
//! Same-origin storage routes: upload-target issuance, the local upload and
//! file-serving routes, and the blob upload proxy.

mod handlers;
mod telemetry;

pub mod error;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;
