//! Shared runtime contracts for the Veil invisibility mechanic.
//!
//! This crate holds the Bevy-free vocabulary (team sides, reveal actions,
//! target selectors) and the text parsers for the admin command and the demo
//! host's line protocol, so tooling can use them without pulling in the ECS
//! runtime from `veil_core`.

pub mod command_text;
pub mod commands;

pub use command_text::{
    parse_host_command, parse_invis_target, parse_target_selector, CommandParseError, INVIS_USAGE,
};
pub use commands::{HostCommand, RevealAction, TargetSelector, TeamSide};
