//! # costar
//!
//! HTTP API, CLI, configuration and the TMDB client around `costar-core`.

pub mod api;
pub mod cli;
pub mod config;
pub mod tmdb;
