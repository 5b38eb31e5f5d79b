//! formpilot command-line front end
//!
//! Loads form descriptions from disk and checks them against the engine
//! before any browser is involved.

pub mod cli;
pub mod config;
