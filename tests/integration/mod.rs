//! End-to-end command flows through the dispatcher

pub mod dispatch;
pub mod play_workflow;
pub mod session_lifecycle;
