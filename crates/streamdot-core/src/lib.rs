//! Core state machine and collaborator seams for the streamdot applet.
//!
//! The applet binary supplies the real collaborators (mpv-backed engine,
//! terminal panel surface, dialog subprocess); this crate owns everything
//! with transition logic so it can be exercised against in-memory fakes.

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod panel;
pub mod platform;
pub mod session;
