//! ============================================================================
//! Access Module - Device registration and periodic access validation
//! ============================================================================
//! Provides the controller that keeps a device's access to the app current.
//!
//! ## Lifecycle
//! - **Initializing**: registration sent, first check pending
//! - **Polling**: checks repeat every interval (default 5 minutes)
//! - **Denied**: server refused access; polling stops for good
//!
//! ## Usage
//! ```rust,ignore
//! use appctl_core::access::{AccessController, ConsoleView, HttpAccessApi};
//!
//! let api = Arc::new(HttpAccessApi::new(&config)?);
//! let controller = AccessController::new(api, Arc::new(ConsoleView::new()), identity, config);
//! controller.start().await?;
//! ```
//! ============================================================================

mod client;
mod controller;
mod schedule;
mod view;

// Re-export public types
pub use client::{AccessApi, HttpAccessApi, CHECK_ACCESS_PATH, REGISTER_PATH};
pub use controller::AccessController;
pub use schedule::PeriodicTask;
pub use view::{AccessView, ConsoleView};
