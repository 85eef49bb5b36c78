//! Assignment review agent chat channel
//!
//! The agent streams typed messages (`agent`, `response`, `info`, `util`,
//! `error`, `user`, `code_exe`) back over a websocket after a submission.

pub mod message;
pub mod session;

pub use message::{extract_github_url, AgentMessage, MessageKind, Submission};
pub use session::AgentSession;
