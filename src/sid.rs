//! FDSN Source Identifier (SID).
//!
//! The FDSN Source Identifier uses the format `FDSN:NET_STA_LOC_BAND_SOURCE_SS`
//! where the channel code (e.g. "BHZ") is split into band ("B"), source ("H"),
//! and subsource ("Z") components. Source IDs are the grouping key of the
//! trace list, so they are totally ordered and hashable.

use std::fmt;
use std::str::FromStr;

use crate::{MseedError, Result};

/// Maximum length of a source identifier in bytes.
pub const MAX_SID_LENGTH: usize = 64;

const FDSN_PREFIX: &str = "FDSN:";

/// Source identifier.
///
/// Format: `FDSN:NET_STA_LOC_BAND_SOURCE_SUBSOURCE`, or any other
/// `namespace:...` URN carried verbatim.
///
/// # Examples
///
/// ```
/// use mseed_trace::SourceId;
///
/// let sid = SourceId::from_nslc("IU", "ANMO", "00", "BHZ").unwrap();
/// assert_eq!(sid.as_str(), "FDSN:IU_ANMO_00_B_H_Z");
/// assert_eq!(sid.network(), "IU");
/// assert_eq!(sid.station(), "ANMO");
/// assert_eq!(sid.location(), "00");
/// assert_eq!(sid.channel(), "BHZ");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SourceId {
    raw: String,
}

impl SourceId {
    /// Parse a source identifier string.
    ///
    /// Strings with a namespace (`XX:...`) are kept as-is; bare
    /// underscore-separated codes get the `FDSN:` prefix.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim_end_matches(['\0', ' ']);
        if s.is_empty() {
            return Err(MseedError::Validation("empty source identifier".into()));
        }
        let raw = if s.contains(':') {
            s.to_string()
        } else {
            format!("{FDSN_PREFIX}{s}")
        };
        Self::checked(raw)
    }

    /// Create a source identifier from NSLC codes.
    ///
    /// A 3-character channel code is split into band, source and subsource.
    /// A channel already written as `B_S_SS` is used as-is.
    pub fn from_nslc(network: &str, station: &str, location: &str, channel: &str) -> Result<Self> {
        let channel_part = match channel.chars().count() {
            3 if !channel.contains('_') => {
                let mut chars = channel.chars();
                let (b, s, ss) = (
                    chars.next().unwrap_or_default(),
                    chars.next().unwrap_or_default(),
                    chars.next().unwrap_or_default(),
                );
                format!("{b}_{s}_{ss}")
            }
            _ if channel.split('_').count() == 3 => channel.to_string(),
            _ => {
                let (band, source, subsource) = split_channel(channel);
                format!("{band}_{source}_{subsource}")
            }
        };
        Self::checked(format!(
            "{FDSN_PREFIX}{network}_{station}_{location}_{channel_part}"
        ))
    }

    fn checked(raw: String) -> Result<Self> {
        if raw.len() > MAX_SID_LENGTH {
            return Err(MseedError::Validation(format!(
                "source identifier {raw:?} exceeds {MAX_SID_LENGTH} bytes"
            )));
        }
        Ok(Self { raw })
    }

    /// Return the raw source identifier string.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether this is an FDSN-namespace identifier.
    pub fn is_fdsn(&self) -> bool {
        self.raw.starts_with(FDSN_PREFIX)
    }

    /// Extract the network code.
    pub fn network(&self) -> &str {
        self.component(0)
    }

    /// Extract the station code.
    pub fn station(&self) -> &str {
        self.component(1)
    }

    /// Extract the location code.
    pub fn location(&self) -> &str {
        self.component(2)
    }

    /// Extract the channel code.
    ///
    /// Single-character band, source and subsource codes are concatenated
    /// (`B_H_Z` becomes `BHZ`); longer codes keep their separators.
    pub fn channel(&self) -> String {
        let band = self.component(3);
        let source = self.component(4);
        let subsource = self.component(5);
        if band.len() <= 1 && source.len() <= 1 && subsource.len() <= 1 {
            format!("{band}{source}{subsource}")
        } else {
            format!("{band}_{source}_{subsource}")
        }
    }

    /// Extract the NSLC tuple: (network, station, location, channel).
    pub fn to_nslc(&self) -> (String, String, String, String) {
        (
            self.network().to_string(),
            self.station().to_string(),
            self.location().to_string(),
            self.channel(),
        )
    }

    /// Get the Nth underscore-separated component after the namespace.
    fn component(&self, index: usize) -> &str {
        let body = self
            .raw
            .split_once(':')
            .map_or(self.raw.as_str(), |(_, body)| body);
        body.split('_').nth(index).unwrap_or("")
    }
}

impl FromStr for SourceId {
    type Err = MseedError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Split a short channel code into (band, source, subsource).
///
/// Missing components default to empty strings.
fn split_channel(channel: &str) -> (&str, &str, &str) {
    let mut bounds = channel.char_indices().map(|(i, _)| i).chain([channel.len()]);
    let a = bounds.next().unwrap_or(0);
    let b = bounds.next().unwrap_or(channel.len());
    let c = bounds.next().unwrap_or(channel.len());
    (&channel[a..b], &channel[b..c], &channel[c..])
}
