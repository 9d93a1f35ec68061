//! Remote paper-trading endpoint adapter.

mod client;
pub mod dto;

pub use client::SandboxClient;
