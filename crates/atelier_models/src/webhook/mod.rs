//! Provider that pushes completion to a webhook.

mod client;

pub use client::WebhookProvider;
