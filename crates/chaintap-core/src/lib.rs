//! Core library for chaintap
//!
//! Configuration, the streaming transport, and the stream viewer
//! controller that the terminal UI drives.

pub mod config;
pub mod error;
pub mod stream;
pub mod viewer;
