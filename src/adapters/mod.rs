//! External integration adapters
//!
//! This module contains adapters for the systems tributary talks to: the
//! relational warehouse and the upstream record sources.

pub mod source;
pub mod warehouse;
