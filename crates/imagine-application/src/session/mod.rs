//! Live session management.
//!
//! Each registered [`ChatSession`](imagine_core::session::ChatSession) is
//! moved into its own task; callers talk to it through a [`SessionHandle`].

mod registry;
mod task;

pub use registry::{SessionHandle, SessionRegistry};
