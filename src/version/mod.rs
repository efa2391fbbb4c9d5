// src/version/mod.rs

//! Version handling for RPM-style package versions
//!
//! Versions are `[epoch:]version[-release]`. Version and release strings are
//! compared segment by segment: runs of digits compare numerically, runs of
//! letters compare lexically, and everything else separates segments.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Compare two version (or release) strings the RPM way
///
/// - `compare_version("1.0", "1.0") == Equal`
/// - `compare_version("10", "9") == Greater` (numeric, not lexical)
/// - `compare_version("1.0a", "1.0") == Less` (a trailing alpha segment is a
///   pre-release marker, as is `~`)
pub fn compare_version(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let mut one = a.as_bytes();
    let mut two = b.as_bytes();

    loop {
        one = skip_separators(one);
        two = skip_separators(two);

        // Tilde sorts before anything, even the end of the string
        match (one.first() == Some(&b'~'), two.first() == Some(&b'~')) {
            (true, true) => {
                one = &one[1..];
                two = &two[1..];
                continue;
            }
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }

        if one.is_empty() || two.is_empty() {
            break;
        }

        let numeric = one[0].is_ascii_digit();
        let (seg1, rest1) = take_segment(one, numeric);
        let (seg2, rest2) = take_segment(two, numeric);

        // Segment types differ: the numeric one is newer
        if seg2.is_empty() {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let ord = if numeric {
            compare_numeric(seg1, seg2)
        } else {
            seg1.cmp(seg2)
        };

        if ord != Ordering::Equal {
            return ord;
        }

        one = rest1;
        two = rest2;
    }

    match (one.first(), two.first()) {
        (None, None) => Ordering::Equal,
        (Some(c), None) => trailing_order(*c),
        (None, Some(c)) => trailing_order(*c).reverse(),
        // Unreachable: the loop only breaks when one side is exhausted
        (Some(_), Some(_)) => Ordering::Equal,
    }
}

/// Ordering of a version that has a leftover segment starting with `c`
/// against one that has none
fn trailing_order(c: u8) -> Ordering {
    if c.is_ascii_digit() {
        Ordering::Greater
    } else {
        Ordering::Less
    }
}

fn skip_separators(s: &[u8]) -> &[u8] {
    let n = s
        .iter()
        .take_while(|c| !c.is_ascii_alphanumeric() && **c != b'~')
        .count();
    &s[n..]
}

fn take_segment(s: &[u8], numeric: bool) -> (&[u8], &[u8]) {
    let n = s
        .iter()
        .take_while(|c| {
            if numeric {
                c.is_ascii_digit()
            } else {
                c.is_ascii_alphabetic()
            }
        })
        .count();
    s.split_at(n)
}

fn compare_numeric(a: &[u8], b: &[u8]) -> Ordering {
    let a = strip_leading_zeros(a);
    let b = strip_leading_zeros(b);
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn strip_leading_zeros(s: &[u8]) -> &[u8] {
    let n = s.iter().take_while(|c| **c == b'0').count();
    &s[n..]
}

/// How a missing epoch compares against a present one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EpochPolicy {
    /// A missing epoch is epoch 0
    #[default]
    Zero,
    /// A missing epoch takes the other side's epoch
    Promote,
}

impl EpochPolicy {
    pub fn from_promote(promote: bool) -> Self {
        if promote {
            EpochPolicy::Promote
        } else {
            EpochPolicy::Zero
        }
    }
}

/// A parsed RPM version with epoch, version, and release components
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RpmVersion {
    pub epoch: Option<u32>,
    pub version: String,
    pub release: Option<String>,
}

impl RpmVersion {
    pub fn new(epoch: Option<u32>, version: impl Into<String>, release: Option<String>) -> Self {
        Self {
            epoch,
            version: version.into(),
            release,
        }
    }

    /// Parse an RPM version string
    ///
    /// Format: [epoch:]version[-release]
    /// Examples:
    /// - "1.2.3" → epoch=None, version="1.2.3", release=None
    /// - "2:1.2.3" → epoch=2, version="1.2.3", release=None
    /// - "1.2.3-4.el8" → epoch=None, version="1.2.3", release=Some("4.el8")
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (epoch, rest) = match s.split_once(':') {
            Some(("", rest)) => (None, rest),
            Some((e, rest)) => {
                let epoch = e
                    .parse::<u32>()
                    .map_err(|_| Error::InvalidVersion(s.to_string()))?;
                (Some(epoch), rest)
            }
            None => (None, s),
        };

        let (version, release) = match rest.split_once('-') {
            Some((v, r)) => (v, Some(r)),
            None => (rest, None),
        };

        if version.is_empty()
            || release.is_some_and(|r| r.is_empty() || r.contains('-'))
            || version.contains(char::is_whitespace)
        {
            return Err(Error::InvalidVersion(s.to_string()));
        }

        Ok(Self {
            epoch,
            version: version.to_string(),
            release: release.map(str::to_string),
        })
    }

    /// Epoch with a missing value read as 0
    pub fn epoch_or_zero(&self) -> u32 {
        self.epoch.unwrap_or(0)
    }

    /// Full comparison; a missing epoch is 0, a missing release sorts first
    pub fn compare(&self, other: &RpmVersion) -> Ordering {
        self.epoch_or_zero()
            .cmp(&other.epoch_or_zero())
            .then_with(|| compare_version(&self.version, &other.version))
            .then_with(|| match (&self.release, &other.release) {
                (Some(a), Some(b)) => compare_version(a, b),
                (a, b) => a.is_some().cmp(&b.is_some()),
            })
    }

    /// Comparison used when matching a requirement (`self`) against a
    /// provided version (`other`)
    ///
    /// A release missing on either side is not compared, so `foo >= 1.0`
    /// is satisfied by `foo-1.0-3`.
    pub fn compare_with(&self, other: &RpmVersion, policy: EpochPolicy) -> Ordering {
        let (e1, e2) = match (self.epoch, other.epoch, policy) {
            (None, Some(e), EpochPolicy::Promote) | (Some(e), None, EpochPolicy::Promote) => {
                (e, e)
            }
            (a, b, _) => (a.unwrap_or(0), b.unwrap_or(0)),
        };

        e1.cmp(&e2)
            .then_with(|| compare_version(&self.version, &other.version))
            .then_with(|| match (&self.release, &other.release) {
                (Some(a), Some(b)) => compare_version(a, b),
                _ => Ordering::Equal,
            })
    }
}

impl fmt::Display for RpmVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(epoch) = self.epoch {
            write!(f, "{}:", epoch)?;
        }
        write!(f, "{}", self.version)?;
        if let Some(ref release) = self.release {
            write!(f, "-{}", release)?;
        }
        Ok(())
    }
}
