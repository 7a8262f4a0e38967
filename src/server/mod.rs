// src/server/mod.rs

//! Development server: static files from the markup output directory plus
//! live reload over Server-Sent Events.
//!
//! - [`livereload`] holds the reload broadcast and the browser client.
//! - [`http`] builds the router and owns the server lifecycle.

pub mod http;
pub mod livereload;

pub use http::{DevServer, DevServerHandle, router};
pub use livereload::{LiveReload, ReloadKind, ReloadTrigger};
