//! # canongraph
//!
//! The command line around `canongraph-core`. This crate is the only place
//! that touches the filesystem; the core stays pure.

pub mod cli;
pub mod config;
