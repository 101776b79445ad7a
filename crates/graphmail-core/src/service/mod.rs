//! Mail sending service.
//!
//! Bridges the message model with the Graph REST API and the token
//! provider.

pub mod graph;
pub mod payload;

pub use graph::{GRAPH_BASE_URL, GraphMailer, SendResult, SendStatus};
pub use payload::SendMailRequest;
