//! # rsws-pmd - permessage-deflate negotiation for WebSocket handshakes
//!
//! `rsws-pmd` represents, parses and renders the parameters of the
//! `permessage-deflate` extension (RFC 7692) as carried in the
//! `Sec-WebSocket-Extensions` header.
//!
//! ## Features
//!
//! - **Immutable options value** with `with_*`/`without_*` transitions
//! - **Lenient header parsing** that picks the first `permessage-deflate` offer
//! - **Canonical rendering** that omits default-valued parameters
//! - **Capability probe** for hosts that may lack streaming deflate
//!
//! ## Quick Start
//!
//! ```rust
//! use rsws_pmd::{DeflateOptions, Environment};
//!
//! let offer = DeflateOptions::from_header("permessage-deflate; client_max_window_bits=10")?;
//! let response = if Environment::new(true, None).supports_permessage_deflate() {
//!     offer.with_server_no_context_takeover().render_header()
//! } else {
//!     String::new()
//! };
//! assert_eq!(
//!     response,
//!     "permessage-deflate; client_max_window_bits=10; server_no_context_takeover"
//! );
//! # Ok::<(), rsws_pmd::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod extensions;

pub use config::{Environment, RuntimeVersion, permessage_deflate_supported};
pub use error::{Error, Result};
pub use extensions::deflate::{DEFAULT_WINDOW_BITS, DeflateOptions, EXTENSION_NAME, WindowBits};
