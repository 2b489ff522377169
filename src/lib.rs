//! Serves one directory tree over HTTP for browsing, previewing, and
//! downloading single files or whole folders as ZIP archives.

pub mod archive;
pub mod classify;
pub mod config;
pub mod error;
pub mod listing;
pub mod render;
pub mod resolve;
pub mod routes;

pub use config::ServeConfig;
pub use error::{AppError, AppResult};
pub use routes::router;
