//! # tradebook-service: Caller-Facing Facade for Tradebook
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Back-office UI / API server / scripts                                  │
//! │       │  Actor { user_id, role } + request                              │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                tradebook-service (THIS CRATE)                   │   │
//! │  │                                                                 │   │
//! │  │   backoffice.rs ──► authorize, price override, CommandResult    │   │
//! │  │   config.rs ─────► EngineConfig::from_env                       │   │
//! │  │   error.rs ──────► ApiError { code, message }                   │   │
//! │  │   telemetry.rs ──► tracing subscriber                           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  tradebook-db (orchestrator, projector) ──► SQLite                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Startup Sequence
//! 1. `init_tracing()`
//! 2. `EngineConfig::from_env()`
//! 3. `Backoffice::connect(&config)` (pool, migrations, default warehouse check)
//! 4. Serve operations
//!
//! ```rust,ignore
//! use tradebook_service::{init_tracing, Backoffice, EngineConfig};
//!
//! init_tracing()?;
//! let config = EngineConfig::from_env()?;
//! let office = Backoffice::connect(&config).await?;
//!
//! let result = office.create_sale(&actor, &request).await;
//! if !result.success {
//!     eprintln!("{}", result.error.unwrap_or_else(|| ApiError::internal("?")));
//! }
//! ```

pub mod backoffice;
pub mod config;
pub mod error;
pub mod response;
pub mod telemetry;

pub use backoffice::Backoffice;
pub use config::{ConfigError, EngineConfig};
pub use error::{ApiError, ErrorCode};
pub use response::CommandResult;
pub use telemetry::init_tracing;
