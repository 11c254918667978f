mod request_tracing;
mod session;

pub(crate) use request_tracing::request_tracing_middleware;
pub(crate) use session::{session_gate_middleware, CurrentUser, SessionToken};
