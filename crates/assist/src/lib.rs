//! Client core of the ride assistance app: who is signed in, which screen is
//! visible, and the passenger and volunteer workflows built on the gateway,
//! the mapping provider and the device position.

pub mod app;
pub mod auth;
pub mod config;
pub mod effect;
pub mod error;
pub mod location;
pub mod navigator;
pub mod passenger;
pub mod render;
pub mod runtime;
pub mod session;
pub mod volunteer;

#[cfg(test)]
mod testing;

pub use app::{App, Services};
pub use config::{AssistConfig, ConfigError, Features};
pub use error::{AppError, Denial, Result};
pub use runtime::AppHandle;
