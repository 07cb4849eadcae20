//! Intelligence records and threat scoring
//!
//! The normalized shape every provider response is mapped into, plus the
//! deterministic scoring that turns provider security flags into an ordinal
//! threat level.

use serde::{Deserialize, Serialize};

/// Security flags reported by intelligence providers.
///
/// Providers that do not report a flag leave it false.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityFlags {
    pub is_vpn: bool,
    pub is_proxy: bool,
    pub is_tor: bool,
    pub is_hosting: bool,
    pub is_relay: bool,
    pub is_mobile: bool,
    pub is_abuse: bool,
}

impl SecurityFlags {
    /// Cumulative threat score. `is_mobile` is informational and never
    /// contributes.
    pub fn threat_score(&self) -> u32 {
        let mut score = 0;
        if self.is_abuse {
            score += 4;
        }
        if self.is_tor {
            score += 3;
        }
        if self.is_proxy {
            score += 2;
        }
        if self.is_vpn {
            score += 1;
        }
        if self.is_hosting {
            score += 1;
        }
        if self.is_relay {
            score += 1;
        }
        score
    }
}

/// Ordinal risk classification for an endpoint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    Safe,
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    /// Numeric level, Safe = 0 through Critical = 4.
    pub fn level(self) -> u8 {
        match self {
            ThreatLevel::Safe => 0,
            ThreatLevel::Low => 1,
            ThreatLevel::Medium => 2,
            ThreatLevel::High => 3,
            ThreatLevel::Critical => 4,
        }
    }

    /// Display color used by map/panel consumers.
    pub fn color(self) -> &'static str {
        match self {
            ThreatLevel::Safe => "#00ff41",
            ThreatLevel::Low => "#7fff00",
            ThreatLevel::Medium => "#ffff00",
            ThreatLevel::High => "#ff8c00",
            ThreatLevel::Critical => "#ff0000",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThreatLevel::Safe => "Safe",
            ThreatLevel::Low => "Low Risk",
            ThreatLevel::Medium => "Medium Risk",
            ThreatLevel::High => "High Risk",
            ThreatLevel::Critical => "Critical",
        }
    }

    /// Score the flags and map to a level. The first matching threshold
    /// in descending order applies; scores are not capped.
    pub fn from_flags(flags: &SecurityFlags) -> Self {
        match flags.threat_score() {
            s if s >= 4 => ThreatLevel::Critical,
            s if s >= 3 => ThreatLevel::High,
            s if s >= 2 => ThreatLevel::Medium,
            s if s >= 1 => ThreatLevel::Low,
            _ => ThreatLevel::Safe,
        }
    }
}

impl std::fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Fully normalized geolocation/intelligence data for a public endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoIntel {
    pub country: String,
    pub city: String,
    pub region: String,
    pub latitude: f64,
    pub longitude: f64,
    pub isp: String,
    pub asn: Option<String>,
    pub asn_number: Option<u32>,
    pub timezone: Option<String>,
    pub security: SecurityFlags,
    pub threat_level: ThreatLevel,
    pub map_url: Option<String>,
}

impl GeoIntel {
    /// Google Maps link for a coordinate pair, when one was reported.
    pub fn map_url_for(latitude: Option<f64>, longitude: Option<f64>) -> Option<String> {
        match (latitude, longitude) {
            (Some(lat), Some(lon)) => {
                Some(format!("https://www.google.com/maps?q={},{}", lat, lon))
            }
            _ => None,
        }
    }
}

/// Per-IP enrichment result held in the durable cache.
///
/// Special address classes never reach a provider and get fixed Safe
/// records; provider failures degrade to an error record so the rest of
/// the pass is unaffected. Records are only ever overwritten by fresher
/// fetches, never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntelRecord {
    Private {
        threat_level: ThreatLevel,
        security: SecurityFlags,
    },
    Multicast {
        threat_level: ThreatLevel,
        security: SecurityFlags,
    },
    Special {
        threat_level: ThreatLevel,
        security: SecurityFlags,
    },
    Enriched(GeoIntel),
    Error {
        message: String,
        threat_level: ThreatLevel,
        security: SecurityFlags,
    },
}

impl IntelRecord {
    pub fn private() -> Self {
        IntelRecord::Private {
            threat_level: ThreatLevel::Safe,
            security: SecurityFlags::default(),
        }
    }

    pub fn multicast() -> Self {
        IntelRecord::Multicast {
            threat_level: ThreatLevel::Safe,
            security: SecurityFlags::default(),
        }
    }

    pub fn special() -> Self {
        IntelRecord::Special {
            threat_level: ThreatLevel::Safe,
            security: SecurityFlags::default(),
        }
    }

    /// Safe-default record for an address both providers failed on.
    pub fn error(message: impl Into<String>) -> Self {
        IntelRecord::Error {
            message: message.into(),
            threat_level: ThreatLevel::Safe,
            security: SecurityFlags::default(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, IntelRecord::Error { .. })
    }

    pub fn threat_level(&self) -> ThreatLevel {
        match self {
            IntelRecord::Private { threat_level, .. }
            | IntelRecord::Multicast { threat_level, .. }
            | IntelRecord::Special { threat_level, .. }
            | IntelRecord::Error { threat_level, .. } => *threat_level,
            IntelRecord::Enriched(intel) => intel.threat_level,
        }
    }
}
