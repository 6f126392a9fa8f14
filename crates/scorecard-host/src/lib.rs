//! HTTP server and publish-time verification orchestration for the
//! scorecard publication service.

pub mod http;
pub mod publish;
pub mod server;
pub mod state;

pub use publish::{PublishError, RejectReason, SubmittedReport, WORKFLOW_RESTRICTIONS_URL};
pub use server::{router, run};
pub use state::ServerState;
