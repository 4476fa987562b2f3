//! HTTP surface for Atelier.
//!
//! Exposes submission, polling, quota and provider webhook endpoints over axum,
//! and wires an [`atelier_orchestrator::TaskOrchestrator`] from configuration.
//!
//! Callers are identified by `x-user-id` and `x-user-role` headers set by an
//! authenticating gateway. Run the server behind that gateway only; the `bot` role
//! is further limited to the ids in `server.bot_users`.
//!
//! # Example
//!
//! ```no_run
//! use atelier_rate_limit::AtelierConfig;
//! use atelier_server::{
//!     AppState, StoreBackend, build_admission, build_orchestrator, build_uploader, router,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AtelierConfig::load()?;
//! let (uploader, cdn) = build_uploader(&config)?;
//! let admission = build_admission(&config)?;
//! let orchestrator = build_orchestrator(&config, &StoreBackend::Memory, uploader, admission)?;
//! let state = AppState::new(Arc::new(orchestrator))
//!     .with_cdn(cdn)
//!     .with_bot_users(config.server.bot_users.clone());
//! let app = router(state);
//! let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod bootstrap;
mod caller;
mod observability;
mod response;
mod routes;

pub use bootstrap::{StoreBackend, build_admission, build_orchestrator, build_uploader};
pub use caller::{BotAllowlist, CallerIdentity, ClientAddr};
pub use observability::{ObservabilityConfig, init_observability, shutdown_observability};
pub use response::{ApiError, ErrorBody};
pub use routes::{AppState, router};
