//! Interactive session management module
//!
//! This module provides the core components for managing interactive terminal sessions,
//! including session lifecycle, command routing, and event processing.

pub mod action_channel;
pub mod command_router;
pub mod session_manager;

pub use action_channel::{ActionChannel, SessionEvent};
pub use command_router::{COMMAND_SPECS, CommandRouter, CommandSpec, InteractiveCommand};
pub use session_manager::{SessionManager, SessionState, SessionStats};
