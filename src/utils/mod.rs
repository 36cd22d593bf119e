//! This module aggregates various utility submodules used throughout the application.

/// Structured replies and their conversion into Discord embeds.
pub mod embeds;
