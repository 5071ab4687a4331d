//! Domain types shared across the authorize and token flows.

pub mod client;

pub use client::Client;
