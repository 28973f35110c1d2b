use derive_more::From;
use serde::{Deserialize, Serialize};
use std::fmt;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

///
/// Timestamp
/// (in seconds since the Unix epoch)
///
/// Field values carry wall-clock instants as whole seconds; the wire form
/// is RFC-3339 text.
///

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, From, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[repr(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const EPOCH: Self = Self(u64::MIN);

    /// Construct from seconds.
    #[must_use]
    pub const fn from_seconds(secs: u64) -> Self {
        Self(secs)
    }

    #[allow(clippy::cast_sign_loss)]
    pub fn parse_rfc3339(s: &str) -> Result<Self, String> {
        let dt = OffsetDateTime::parse(s, &Rfc3339)
            .map_err(|e| format!("timestamp parse error: {e}"))?;
        let ts = dt.unix_timestamp();
        if ts < 0 {
            return Err("timestamp before epoch".to_string());
        }

        Ok(Self(ts as u64))
    }

    /// RFC-3339 rendering in UTC.
    ///
    /// Fails only for instants past the formattable year range.
    pub fn to_rfc3339(self) -> Result<String, String> {
        let secs =
            i64::try_from(self.0).map_err(|_| "timestamp out of datetime range".to_string())?;
        let dt = OffsetDateTime::from_unix_timestamp(secs)
            .map_err(|e| format!("timestamp out of datetime range: {e}"))?;

        dt.format(&Rfc3339)
            .map_err(|e| format!("timestamp format error: {e}"))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn saturating_add(self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    #[must_use]
    pub const fn saturating_sub(self, secs: u64) -> Self {
        Self(self.0.saturating_sub(secs))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_rfc3339() {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{}s", self.0),
        }
    }
}

///
/// TESTS
///
