//! `Sec-WebSocket-Extensions` tokenizer (RFC 6455 Section 9.1).
//!
//! The header carries a comma-separated list of extension offers, each
//! made of a name followed by `;`-separated parameters:
//!
//! ```text
//! x-webkit-deflate-frame, permessage-deflate; client_max_window_bits=10; server_no_context_takeover
//! ```
//!
//! Tokenizing is deliberately lenient. Quoted-string values are not
//! unescaped and duplicate parameters are not rejected; a later parameter
//! replaces an earlier one with the same name.
//!
//! # Example
//!
//! ```rust
//! use rsws_pmd::extensions::{find_offer, ParamMap, ParamValue};
//!
//! let params = find_offer("foo, permessage-deflate; client_max_window_bits=12", "permessage-deflate")
//!     .map(ParamMap::parse)
//!     .unwrap();
//! assert_eq!(params.get("client_max_window_bits"), Some(ParamValue::Value("12")));
//! ```

pub mod deflate;

use std::fmt;

/// Separator between extension offers.
pub const OFFER_SEPARATOR: char = ',';

/// Separator between an extension name and its parameters.
pub const PARAM_SEPARATOR: char = ';';

/// Split a header value into trimmed, non-empty extension offers.
pub fn split_offers(header: &str) -> impl Iterator<Item = &str> {
    header
        .split(OFFER_SEPARATOR)
        .map(str::trim)
        .filter(|offer| !offer.is_empty())
}

/// Find the first offer whose name starts with `name`.
///
/// The name is compared ASCII case-insensitively. On a match the returned
/// slice is the offer's parameter text: everything after the name and the
/// single separator character that follows it, with the original casing.
/// Returns `None` if no offer matches.
pub fn find_offer<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    let offer = split_offers(header).find(|offer| {
        offer.len() >= name.len()
            && offer.as_bytes()[..name.len()].eq_ignore_ascii_case(name.as_bytes())
    })?;

    // The matched prefix is ASCII, so `name.len()` is a char boundary.
    let mut rest = offer[name.len()..].chars();
    rest.next();
    Some(rest.as_str())
}

/// Value of a single extension parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamValue<'a> {
    /// Parameter given without a value (`server_no_context_takeover`),
    /// or with an empty one (`client_max_window_bits=`).
    Flag,
    /// Parameter given with a non-empty value.
    Value(&'a str),
}

impl<'a> ParamValue<'a> {
    /// The parameter's text value, if it has one.
    #[must_use]
    pub fn as_str(&self) -> Option<&'a str> {
        match self {
            ParamValue::Flag => None,
            ParamValue::Value(v) => Some(v),
        }
    }
}

/// A single extension parameter (e.g., `param=value` or `param`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtensionParam<'a> {
    /// Parameter name (e.g., "client_max_window_bits").
    pub name: &'a str,
    /// Parameter value.
    pub value: ParamValue<'a>,
}

impl<'a> ExtensionParam<'a> {
    /// Parse a single parameter, splitting on the first `=` only.
    pub fn parse(s: &'a str) -> Self {
        match s.split_once('=') {
            Some((name, value)) => {
                let value = value.trim();
                Self {
                    name: name.trim(),
                    value: if value.is_empty() {
                        ParamValue::Flag
                    } else {
                        ParamValue::Value(value)
                    },
                }
            }
            None => Self {
                name: s.trim(),
                value: ParamValue::Flag,
            },
        }
    }
}

impl fmt::Display for ExtensionParam<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            ParamValue::Value(v) => write!(f, "{}={}", self.name, v),
            ParamValue::Flag => write!(f, "{}", self.name),
        }
    }
}

/// Parameters of one extension offer, keyed by name.
///
/// Keeps first-seen order; a repeated name overwrites the earlier value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamMap<'a> {
    params: Vec<ExtensionParam<'a>>,
}

impl<'a> ParamMap<'a> {
    /// Parse `;`-separated parameter text. Empty pieces and pieces with
    /// an empty name are skipped.
    pub fn parse(params: &'a str) -> Self {
        let mut map = Self::default();
        for piece in params.split(PARAM_SEPARATOR).map(str::trim) {
            if piece.is_empty() {
                continue;
            }
            let param = ExtensionParam::parse(piece);
            if !param.name.is_empty() {
                map.insert(param);
            }
        }
        map
    }

    fn insert(&mut self, param: ExtensionParam<'a>) {
        match self.params.iter_mut().find(|p| p.name == param.name) {
            Some(existing) => existing.value = param.value,
            None => self.params.push(param),
        }
    }

    /// Get a parameter value by name.
    pub fn get(&self, name: &str) -> Option<ParamValue<'a>> {
        self.params
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value)
    }

    /// Check if a parameter is present, with or without a value.
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Get a parameter's non-empty text value by name.
    pub fn value(&self, name: &str) -> Option<&'a str> {
        self.get(name).and_then(|v| v.as_str())
    }

    /// Iterate over the parameters in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &ExtensionParam<'a>> {
        self.params.iter()
    }

    /// Number of distinct parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Returns `true` if there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}
