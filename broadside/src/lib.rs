//! Broadside: bulk campaign email delivery and engagement tracking.
//!
//! The binary loads configuration, builds one [`AppContext`] holding every
//! component, spawns the send worker pool, and serves the HTTP surface
//! (tracking pixel/click, provider webhook, campaign analytics, job
//! submission) until shutdown.

mod context;
mod error;
mod routes;
mod server;

pub use context::AppContext;
pub use error::AppError;
pub use routes::{JobsState, SendRequest};
pub use server::Server;
