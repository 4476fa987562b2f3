//! Legacy provider that may answer inline.

mod client;

pub use client::PollingProvider;
