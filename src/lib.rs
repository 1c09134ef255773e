//! CloudSigma command-line client
//!
//! The binary in `main.rs` parses arguments and prints the output envelope;
//! everything that talks to the API or shapes its records lives here.

pub mod cloudsigma;
pub mod commands;
pub mod config;
pub mod error;
pub mod resource;
pub mod shell;
