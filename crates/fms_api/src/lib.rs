//! Read-only client for the FMS REST API.

pub mod client;

pub use client::{FmsClient, extract_rows};
