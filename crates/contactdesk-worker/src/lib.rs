//! Multi-tenant contact management backend.
//!
//! Domain logic (actions, reads, import/export, media) compiles for any target and is
//! tested on the host against SQLite. The HTTP surface is only built for Cloudflare
//! Workers (wasm32-unknown-unknown).

pub mod actions;
pub mod caching;
pub mod config;
pub mod context;
pub mod crypto;
pub mod data;
pub mod error;
pub mod hrana;
pub mod mail;
pub mod media;
pub mod schemas;
pub mod session;
pub mod transfer;
pub mod util;

#[cfg(target_arch = "wasm32")]
mod worker_wasm;

#[cfg(target_arch = "wasm32")]
pub use worker_wasm::*;

pub use context::AppContext;
pub use error::{Error, Result};
pub use session::Session;
