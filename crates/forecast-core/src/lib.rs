//! # Forecast Core
//!
//! Domain types for Forecast Desk: the three forecast kinds, their field
//! schemas, request construction and the error taxonomy shared by the server.
//!
//! Nothing in this crate performs I/O. Store access and the remote prediction
//! call live in `forecast-server` behind traits.

pub mod auth;
pub mod builder;
pub mod error;
pub mod models;
pub mod schema;

pub use auth::*;
pub use builder::*;
pub use error::*;
pub use models::*;
pub use schema::*;
