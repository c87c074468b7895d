//! shotmatch CLI library
//!
//! Exposes the command-line front end for integration testing

pub mod cli;
