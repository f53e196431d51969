//! Host environment configuration for the permessage-deflate capability probe.
//!
//! Whether compression can be honored at all depends on two inputs from the
//! host: whether a streaming raw-deflate primitive is available, and the
//! version of the runtime that provides it. Both can be injected through
//! [`Environment::new`] or detected with [`Environment::detect`].

use log::debug;
use std::cmp::Ordering;
use std::fmt;
use std::sync::OnceLock;

/// Environment variable naming the host runtime version.
pub const RUNTIME_VERSION_VAR: &str = "RSWS_PMD_RUNTIME_VERSION";

/// Versions strictly above this are supported.
const FIXED_SINCE: (u64, u64, u64) = (7, 1, 3);

/// Patched window on the older release line: `[7.0.18, 7.1.0)`.
const PATCHED_LINE: ((u64, u64, u64), (u64, u64, u64)) = ((7, 0, 18), (7, 1, 0));

/// Rank of a numeric component (and of a missing one) against special words.
const RELEASE_RANK: i8 = 4;

/// Rank of a word that is not a recognized special form.
const UNKNOWN_RANK: i8 = -1;

/// Recognized special words, matched by prefix in this order.
const SPECIAL_FORMS: [(&str, i8); 10] = [
    ("dev", 0),
    ("alpha", 1),
    ("a", 1),
    ("beta", 2),
    ("b", 2),
    ("RC", 3),
    ("rc", 3),
    ("#", RELEASE_RANK),
    ("pl", 5),
    ("p", 5),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VersionPart {
    Number(u64),
    Special(i8),
}

impl VersionPart {
    fn parse(part: &[u8]) -> Self {
        if part.first().is_some_and(u8::is_ascii_digit) {
            let n = part.iter().fold(0u64, |acc, &b| {
                acc.saturating_mul(10).saturating_add(u64::from(b - b'0'))
            });
            return VersionPart::Number(n);
        }
        let rank = SPECIAL_FORMS
            .iter()
            .find(|(name, _)| part.starts_with(name.as_bytes()))
            .map_or(UNKNOWN_RANK, |&(_, rank)| rank);
        VersionPart::Special(rank)
    }
}

/// Ordering key of one component slot. A missing slot sits between the
/// pre-release words and any number; patch-level words sort above both.
fn slot_key(part: Option<&VersionPart>) -> (i8, u8, u64) {
    match part {
        Some(VersionPart::Special(rank)) => (*rank, 0, 0),
        None => (RELEASE_RANK, 0, 0),
        Some(VersionPart::Number(n)) => (RELEASE_RANK, 1, *n),
    }
}

/// Split `version` into components.
///
/// `-`, `_`, `+` and any other non-alphanumeric byte separate components,
/// as does every boundary between a digit and a non-digit, so
/// `7.0.18-0ubuntu0.16.04.1` yields `7 0 18 0 ubuntu 0 16 04 1` and
/// `7.1.3pl1` yields `7 1 3 pl 1`. Repeated and trailing separators are
/// dropped; the first byte is kept as is.
fn canonicalize(version: &str) -> Vec<u8> {
    let bytes = version.as_bytes();
    let Some((&first, rest)) = bytes.split_first() else {
        return Vec::new();
    };

    let is_digit = |b: u8| b.is_ascii_digit();
    let is_non_digit = |b: u8| !b.is_ascii_digit() && b != b'.';
    let separate = |out: &mut Vec<u8>| {
        if out.last() != Some(&b'.') {
            out.push(b'.');
        }
    };

    let mut out = Vec::with_capacity(bytes.len() * 2);
    out.push(first);
    let mut prev = first;
    for &b in rest {
        if matches!(b, b'-' | b'_' | b'+') {
            separate(&mut out);
        } else if (is_non_digit(prev) && is_digit(b)) || (is_digit(prev) && is_non_digit(b)) {
            separate(&mut out);
            out.push(b);
        } else if !b.is_ascii_alphanumeric() {
            separate(&mut out);
        } else {
            out.push(b);
        }
        prev = b;
    }
    if out.len() > 1 && out.last() == Some(&b'.') {
        out.pop();
    }
    out
}

/// A host runtime version, ordered the way PHP-style release lines are.
///
/// Components are compared left to right: numbers numerically, words by
/// rank (`dev` < `alpha`/`a` < `beta`/`b` < `RC`/`rc` < release <
/// `pl`/`p`, unknown words lowest). When one version runs out of
/// components, a leftover number makes the longer version greater and a
/// leftover word is ranked against the release slot. So `7.1` < `7.1.0`,
/// `7.1.3.1` > `7.1.3`, `7.1.3pl1` > `7.1.3` and `7.0.18RC1` < `7.0.18`.
#[derive(Debug, Clone)]
pub struct RuntimeVersion {
    raw: String,
    parts: Vec<VersionPart>,
}

impl RuntimeVersion {
    /// Parse a version string. Every string is a version; text that is
    /// not numeric just ranks low.
    pub fn parse(s: &str) -> Self {
        let canonical = canonicalize(s);
        let parts = if canonical.is_empty() {
            Vec::new()
        } else {
            canonical.split(|&b| b == b'.').map(VersionPart::parse).collect()
        };
        Self {
            raw: s.to_string(),
            parts,
        }
    }

    /// A plain `major.minor.patch` release.
    #[must_use]
    pub fn release(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            raw: format!("{}.{}.{}", major, minor, patch),
            parts: vec![
                VersionPart::Number(major),
                VersionPart::Number(minor),
                VersionPart::Number(patch),
            ],
        }
    }

    /// The version text as given.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl From<&str> for RuntimeVersion {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl Ord for RuntimeVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.parts.len().max(other.parts.len());
        (0..len)
            .map(|i| slot_key(self.parts.get(i)).cmp(&slot_key(other.parts.get(i))))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for RuntimeVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RuntimeVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for RuntimeVersion {}

impl fmt::Display for RuntimeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Inputs to the capability probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// A streaming raw-deflate primitive is available.
    pub streaming_deflate: bool,
    /// Host runtime version. `None` means the native Rust host, which is
    /// not part of any affected release line.
    pub version: Option<String>,
}

impl Environment {
    /// Create an environment from injected values.
    #[must_use]
    pub fn new(streaming_deflate: bool, version: Option<String>) -> Self {
        Self {
            streaming_deflate,
            version,
        }
    }

    /// Detect the current environment.
    ///
    /// The deflate flag comes from the `compression` feature and a one-time
    /// probe of the `flate2` backend; the version from [`RUNTIME_VERSION_VAR`].
    pub fn detect() -> Self {
        Self {
            streaming_deflate: streaming_deflate_available(),
            version: std::env::var(RUNTIME_VERSION_VAR)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
        }
    }

    /// Same environment, with a different runtime version.
    #[must_use]
    pub fn with_version(self, version: impl Into<String>) -> Self {
        Self {
            version: Some(version.into()),
            ..self
        }
    }

    /// Whether permessage-deflate can be honored in this environment.
    pub fn supports_permessage_deflate(&self) -> bool {
        if !self.streaming_deflate {
            debug!("permessage-deflate unsupported: no streaming deflate");
            return false;
        }
        let Some(version) = self.version.as_deref() else {
            return true;
        };

        let version = RuntimeVersion::parse(version);
        let release = |(major, minor, patch)| RuntimeVersion::release(major, minor, patch);
        let supported = version > release(FIXED_SINCE)
            || (version >= release(PATCHED_LINE.0) && version < release(PATCHED_LINE.1));
        debug!("permessage-deflate on runtime {}: supported={}", version, supported);
        supported
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::detect()
    }
}

/// Probe the detected environment against `version`.
pub fn permessage_deflate_supported(version: &str) -> bool {
    Environment::new(streaming_deflate_available(), Some(version.to_string()))
        .supports_permessage_deflate()
}

fn streaming_deflate_available() -> bool {
    static AVAILABLE: OnceLock<bool> = OnceLock::new();
    *AVAILABLE.get_or_init(probe_streaming_deflate)
}

#[cfg(feature = "compression")]
fn probe_streaming_deflate() -> bool {
    use flate2::{Compress, Compression, FlushCompress};

    // Raw stream with an explicit window, as the extension requires.
    let mut compress = Compress::new_with_window_bits(Compression::fast(), false, 15);
    let mut out = [0u8; 16];
    compress.compress(b"", &mut out, FlushCompress::Sync).is_ok()
}

#[cfg(not(feature = "compression"))]
fn probe_streaming_deflate() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(version: &str) -> Environment {
        Environment::new(true, Some(version.to_string()))
    }

    fn v(s: &str) -> RuntimeVersion {
        RuntimeVersion::parse(s)
    }

    #[test]
    fn test_canonicalize() {
        assert_eq!(canonicalize("7.0.18-0ubuntu0.16.04.1"), b"7.0.18.0.ubuntu.0.16.04.1");
        assert_eq!(canonicalize("7.1.3-1+ubuntu16.04.1"), b"7.1.3.1.ubuntu.16.04.1");
        assert_eq!(canonicalize("7.1.3pl1"), b"7.1.3.pl.1");
        assert_eq!(canonicalize("7.0.18RC1"), b"7.0.18.RC.1");
        assert_eq!(canonicalize("7..1__2"), b"7.1.2");
        assert_eq!(canonicalize("7.1."), b"7.1");
        assert!(canonicalize("").is_empty());
    }

    #[test]
    fn test_version_parts() {
        assert_eq!(
            v("7.1.4-dev").parts,
            vec![
                VersionPart::Number(7),
                VersionPart::Number(1),
                VersionPart::Number(4),
                VersionPart::Special(0),
            ]
        );
        assert_eq!(v("7.0.18beta2").parts[3], VersionPart::Special(2));
        assert_eq!(v("7.0.18-ubuntu").parts[3], VersionPart::Special(UNKNOWN_RANK));
        assert!(v("").parts.is_empty());
        assert_eq!(v("7.1.3-1").to_string(), "7.1.3-1");
    }

    #[test]
    fn test_version_ordering() {
        assert!(v("7.1.4") > v("7.1.3"));
        assert!(v("7.1.4-dev") > v("7.1.3"));
        assert!(v("7.0.18RC1") < v("7.0.18"));
        assert!(v("7.0.18alpha1") < v("7.0.18beta1"));
        assert!(v("7.0.18beta1") < v("7.0.18rc1"));
        assert!(v("7.0.18dev") < v("7.0.18a1"));
        assert!(v("7.1") < v("7.1.0"));
        assert!(v("7.1") > v("7.0.99"));
        assert!(v("7.1.3.1") > v("7.1.3"));
        assert!(v("7.1.3pl1") > v("7.1.3"));
        assert!(v("7.1.3pl1") > v("7.1.3.1"));
        assert!(v("7.0.18-0ubuntu0.16.04.1") > v("7.0.18"));
        assert!(v("7.1.3-1+ubuntu16.04.1") > v("7.1.3"));
        assert!(v("7.0.18-ubuntu") < v("7.0.18"));
        assert!(v("") < v("7.1.3"));
        assert_eq!(v("7.1.3"), RuntimeVersion::release(7, 1, 3));
        assert_eq!(v("07.1.3"), v("7.1.3"));
        assert_eq!(v("7.0.18alpha"), v("7.0.18a"));
    }

    #[test]
    fn test_supported_above_fixed_release() {
        assert!(env("7.1.4").supports_permessage_deflate());
        assert!(env("7.2.0").supports_permessage_deflate());
        assert!(env("8.3.1").supports_permessage_deflate());
    }

    #[test]
    fn test_unsupported_at_or_below_fixed_release() {
        assert!(!env("7.1.3").supports_permessage_deflate());
        assert!(!env("7.1.0").supports_permessage_deflate());
        assert!(!env("7.1.2").supports_permessage_deflate());
        assert!(!env("7.1.3RC1").supports_permessage_deflate());
        assert!(!env("5.6.40").supports_permessage_deflate());
    }

    #[test]
    fn test_patched_release_line() {
        assert!(env("7.0.18").supports_permessage_deflate());
        assert!(env("7.0.33").supports_permessage_deflate());
        assert!(!env("7.0.17").supports_permessage_deflate());
        assert!(!env("7.0.18RC1").supports_permessage_deflate());
        assert!(env("7.1.0-dev").supports_permessage_deflate());
    }

    #[test]
    fn test_distribution_builds() {
        assert!(env("7.0.18-0ubuntu0.16.04.1").supports_permessage_deflate());
        assert!(env("7.1.3-1+ubuntu16.04.1").supports_permessage_deflate());
        assert!(env("7.1.3pl1").supports_permessage_deflate());
        assert!(env("7.1.3.1").supports_permessage_deflate());
        assert!(env("7.1").supports_permessage_deflate());
    }

    #[test]
    fn test_no_streaming_deflate() {
        let env = Environment::new(false, Some("8.0.0".to_string()));
        assert!(!env.supports_permessage_deflate());
        assert!(!Environment::new(false, None).supports_permessage_deflate());
    }

    #[test]
    fn test_native_host_supported() {
        assert!(Environment::new(true, None).supports_permessage_deflate());
    }

    #[test]
    fn test_non_numeric_version_unsupported() {
        assert!(!env("unknown").supports_permessage_deflate());
        assert!(!env("").supports_permessage_deflate());
    }

    #[test]
    fn test_detect_matches_feature() {
        let detected = Environment::detect();
        assert_eq!(detected.streaming_deflate, cfg!(feature = "compression"));
        assert_eq!(Environment::detect().streaming_deflate, detected.streaming_deflate);
        assert_eq!(
            permessage_deflate_supported("7.4.0"),
            cfg!(feature = "compression")
        );
        assert!(!permessage_deflate_supported("7.1.3"));
    }

    #[test]
    fn test_streaming_deflate_cached() {
        let first = streaming_deflate_available();
        assert_eq!(streaming_deflate_available(), first);
        assert_eq!(first, probe_streaming_deflate());
    }
}
