//!# pyLoad API Client
//!
//! A Rust client library for interacting with the API of the [pyLoad](https://pyload.net) download manager.
//! Control the download queue programmatically with a strongly-typed interface.
//!
//! ## Features
//!
//! - Cookie-based authentication, logging in on demand
//! - Transparent re-login (once) when the server drops the session
//! - Server status, version and free disk space
//! - Queue control (pause, resume, toggle, stop all downloads)
//! - Restart failed downloads, delete finished ones, restart the pyLoad core
//! - Toggle auto-reconnect
//! - Add packages from links, upload container files
//! - Three error kinds at the boundary: cannot connect, invalid auth, parser error
//!
//! ## Usage example
//!
//! ```rust,no_run
//! use anyhow::Result;
//! use std::env;
//! use pyload_api::client::PyLoad;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<()> {
//!     let pyload = {
//!         let url = env::var("PYLOAD_URL")?;
//!         let username = env::var("PYLOAD_USERNAME")?;
//!         let password = env::var("PYLOAD_PASSWORD")?;
//!         PyLoad::builder()
//!             .url(url)
//!             .username(username)
//!             .password(password)
//!             .build()?
//!     };
//!
//!     pyload.login().await?;
//!
//!     let status = pyload.get_status().await?;
//!     println!(
//!         "active: {}, queued: {}, paused: {}",
//!         status.active, status.queue, status.pause
//!     );
//!
//!     pyload.delete_finished().await?;
//!
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod entities;
mod parser;
mod session;
mod transport;
pub mod utils;
