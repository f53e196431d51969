//! Permessage-deflate negotiation parameters (RFC 7692).

use crate::error::{Error, Result};
use crate::extensions::{ParamMap, find_offer};
use log::{debug, trace};
use std::fmt;
use std::str::FromStr;

/// The extension token as registered with IANA.
pub const EXTENSION_NAME: &str = "permessage-deflate";

/// Window bits assumed when a `max_window_bits` parameter is absent.
pub const DEFAULT_WINDOW_BITS: u8 = 15;

const CLIENT_NO_CONTEXT_TAKEOVER: &str = "client_no_context_takeover";
const SERVER_NO_CONTEXT_TAKEOVER: &str = "server_no_context_takeover";
const CLIENT_MAX_WINDOW_BITS: &str = "client_max_window_bits";
const SERVER_MAX_WINDOW_BITS: &str = "server_max_window_bits";

/// LZ77 sliding window size exponent, always in `8..=15`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WindowBits(u8);

impl WindowBits {
    /// Smallest window RFC 7692 allows (256 bytes).
    pub const MIN: WindowBits = WindowBits(8);
    /// Largest window RFC 7692 allows (32 KiB).
    pub const MAX: WindowBits = WindowBits(15);

    /// Validate `bits` on behalf of the named parameter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWindowBits`] if `bits` is not in `8..=15`.
    pub fn for_param(param: &'static str, bits: u8) -> Result<Self> {
        if (Self::MIN.0..=Self::MAX.0).contains(&bits) {
            Ok(WindowBits(bits))
        } else {
            Err(Error::invalid_window_bits(param, bits))
        }
    }

    fn parse_for_param(param: &'static str, s: &str) -> Result<Self> {
        let bits: u8 = s
            .parse()
            .map_err(|_| Error::invalid_window_bits(param, s))?;
        Self::for_param(param, bits)
    }

    /// The raw exponent.
    #[inline]
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for WindowBits {
    fn default() -> Self {
        WindowBits(DEFAULT_WINDOW_BITS)
    }
}

impl TryFrom<u8> for WindowBits {
    type Error = Error;

    fn try_from(bits: u8) -> Result<Self> {
        Self::for_param("max_window_bits", bits)
    }
}

impl FromStr for WindowBits {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_for_param("max_window_bits", s)
    }
}

impl From<WindowBits> for u8 {
    fn from(bits: WindowBits) -> Self {
        bits.0
    }
}

impl fmt::Display for WindowBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Negotiated permessage-deflate state for one connection.
///
/// A value is either disabled, with every parameter unset, or enabled,
/// with every parameter populated. Transformations return a new value and
/// leave the receiver untouched:
///
/// ```rust
/// use rsws_pmd::DeflateOptions;
///
/// let a = DeflateOptions::create_enabled();
/// let b = a.with_server_no_context_takeover();
/// assert_eq!(a.server_no_context_takeover(), Some(false));
/// assert_eq!(b.server_no_context_takeover(), Some(true));
/// assert_eq!(b.render_header(), "permessage-deflate; server_no_context_takeover");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct DeflateOptions {
    enabled: bool,
    client_no_context_takeover: Option<bool>,
    server_no_context_takeover: Option<bool>,
    client_max_window_bits: Option<WindowBits>,
    server_max_window_bits: Option<WindowBits>,
}

impl DeflateOptions {
    /// Enabled, with the RFC 7692 defaults: 15-bit windows on both sides
    /// and context takeover allowed.
    #[must_use]
    pub const fn create_enabled() -> Self {
        Self {
            enabled: true,
            client_no_context_takeover: Some(false),
            server_no_context_takeover: Some(false),
            client_max_window_bits: Some(WindowBits::MAX),
            server_max_window_bits: Some(WindowBits::MAX),
        }
    }

    /// Disabled; all parameters unset.
    #[must_use]
    pub const fn create_disabled() -> Self {
        Self {
            enabled: false,
            client_no_context_takeover: None,
            server_no_context_takeover: None,
            client_max_window_bits: None,
            server_max_window_bits: None,
        }
    }

    /// Require the client to reset its LZ77 window after each message.
    #[must_use]
    pub fn with_client_no_context_takeover(self) -> Self {
        Self {
            client_no_context_takeover: Some(true),
            ..self
        }
    }

    /// Allow the client to keep its LZ77 window across messages.
    #[must_use]
    pub fn without_client_no_context_takeover(self) -> Self {
        Self {
            client_no_context_takeover: Some(false),
            ..self
        }
    }

    /// Require the server to reset its LZ77 window after each message.
    #[must_use]
    pub fn with_server_no_context_takeover(self) -> Self {
        Self {
            server_no_context_takeover: Some(true),
            ..self
        }
    }

    /// Allow the server to keep its LZ77 window across messages.
    #[must_use]
    pub fn without_server_no_context_takeover(self) -> Self {
        Self {
            server_no_context_takeover: Some(false),
            ..self
        }
    }

    /// Set `client_max_window_bits`. Pass [`DEFAULT_WINDOW_BITS`] to
    /// restore the default.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWindowBits`] if `bits` is not in `8..=15`.
    pub fn with_client_max_window_bits(self, bits: u8) -> Result<Self> {
        let bits = WindowBits::for_param(CLIENT_MAX_WINDOW_BITS, bits)?;
        Ok(self.with_client_window_bits(bits))
    }

    /// Set `server_max_window_bits`. Pass [`DEFAULT_WINDOW_BITS`] to
    /// restore the default.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWindowBits`] if `bits` is not in `8..=15`.
    pub fn with_server_max_window_bits(self, bits: u8) -> Result<Self> {
        let bits = WindowBits::for_param(SERVER_MAX_WINDOW_BITS, bits)?;
        Ok(self.with_server_window_bits(bits))
    }

    /// Infallible form of [`with_client_max_window_bits`](Self::with_client_max_window_bits).
    #[must_use]
    pub fn with_client_window_bits(self, bits: WindowBits) -> Self {
        Self {
            client_max_window_bits: Some(bits),
            ..self
        }
    }

    /// Infallible form of [`with_server_max_window_bits`](Self::with_server_max_window_bits).
    #[must_use]
    pub fn with_server_window_bits(self, bits: WindowBits) -> Self {
        Self {
            server_max_window_bits: Some(bits),
            ..self
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    #[must_use]
    pub const fn client_no_context_takeover(&self) -> Option<bool> {
        self.client_no_context_takeover
    }

    #[inline]
    #[must_use]
    pub const fn server_no_context_takeover(&self) -> Option<bool> {
        self.server_no_context_takeover
    }

    #[inline]
    #[must_use]
    pub fn client_max_window_bits(&self) -> Option<u8> {
        self.client_max_window_bits.map(WindowBits::get)
    }

    #[inline]
    #[must_use]
    pub fn server_max_window_bits(&self) -> Option<u8> {
        self.server_max_window_bits.map(WindowBits::get)
    }

    #[inline]
    #[must_use]
    pub const fn client_window_bits(&self) -> Option<WindowBits> {
        self.client_max_window_bits
    }

    #[inline]
    #[must_use]
    pub const fn server_window_bits(&self) -> Option<WindowBits> {
        self.server_max_window_bits
    }

    /// Parse the value of a `Sec-WebSocket-Extensions` header.
    ///
    /// Only the first `permessage-deflate` offer is considered. Anything
    /// else that is missing or unrecognized falls back to disabled, or to
    /// enabled with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidWindowBits`] if the offer carries a
    /// `client_max_window_bits` or `server_max_window_bits` value that is
    /// not an integer in `8..=15`.
    pub fn from_header(header: &str) -> Result<Self> {
        let Some(params) = find_offer(header, EXTENSION_NAME) else {
            debug!("no {} offer in {:?}", EXTENSION_NAME, header);
            return Ok(Self::create_disabled());
        };

        let params = ParamMap::parse(params);
        for param in params.iter() {
            trace!("{} parameter {}", EXTENSION_NAME, param);
        }

        let mut options = Self::create_enabled();
        if params.contains(CLIENT_NO_CONTEXT_TAKEOVER) {
            options = options.with_client_no_context_takeover();
        }
        if params.contains(SERVER_NO_CONTEXT_TAKEOVER) {
            options = options.with_server_no_context_takeover();
        }
        if let Some(value) = params.value(CLIENT_MAX_WINDOW_BITS) {
            let bits = WindowBits::parse_for_param(CLIENT_MAX_WINDOW_BITS, value)?;
            options = options.with_client_window_bits(bits);
        }
        if let Some(value) = params.value(SERVER_MAX_WINDOW_BITS) {
            let bits = WindowBits::parse_for_param(SERVER_MAX_WINDOW_BITS, value)?;
            options = options.with_server_window_bits(bits);
        }

        debug!("accepted {} offer: {:?}", EXTENSION_NAME, options);
        Ok(options)
    }

    /// Render the value for a `Sec-WebSocket-Extensions` response header.
    ///
    /// Default-valued parameters are omitted. A disabled value renders as
    /// the empty string, meaning the header should not be sent.
    pub fn render_header(&self) -> String {
        self.to_string()
    }
}

impl FromStr for DeflateOptions {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_header(s)
    }
}

impl fmt::Display for DeflateOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.enabled {
            return Ok(());
        }

        write!(f, "{}", EXTENSION_NAME)?;
        let non_default = |bits: &WindowBits| bits.get() != DEFAULT_WINDOW_BITS;
        if let Some(bits) = self.client_max_window_bits.filter(non_default) {
            write!(f, "; {}={}", CLIENT_MAX_WINDOW_BITS, bits)?;
        }
        if let Some(bits) = self.server_max_window_bits.filter(non_default) {
            write!(f, "; {}={}", SERVER_MAX_WINDOW_BITS, bits)?;
        }
        if self.client_no_context_takeover == Some(true) {
            write!(f, "; {}", CLIENT_NO_CONTEXT_TAKEOVER)?;
        }
        if self.server_no_context_takeover == Some(true) {
            write!(f, "; {}", SERVER_NO_CONTEXT_TAKEOVER)?;
        }
        Ok(())
    }
}
