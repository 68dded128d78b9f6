//! Core messaging library for the EventFlow marketplace.
//!
//! Everything that keeps suppliers and customers talking lives here: the
//! unread badge manager and its convergence worker, the message composer,
//! contact search with direct-conversation resolution, the support ticket
//! desk, and the REST/WebSocket clients they run on. Front ends stay thin;
//! they register render surfaces and call operations.

pub mod api;
pub mod composer;
pub mod config;
pub mod contacts;
pub mod error;
pub mod events;
pub mod gateway;
pub mod models;
pub mod tickets;
pub mod unread;

pub use api::ApiClient;
pub use config::{ComposerLimits, CoreConfig};
pub use error::{CoreError, Result};
pub use events::{CoreEvent, EventBus, Notice, NoticeLevel};
