//! Command handlers for VoxChat
//!
//! One module per CLI subcommand.

pub mod personas;
pub mod serve;
