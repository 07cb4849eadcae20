//! Fallback provider: ipapi.co
//!
//! Flat JSON response, no API key required. Reports location and network
//! ownership only; it carries no security section, so records sourced here
//! always come back with default flags and a Safe threat level.

use std::net::Ipv4Addr;

use async_trait::async_trait;
use serde::Deserialize;

use super::provider::{IntelProvider, UNKNOWN_FIELD};
use super::record::{GeoIntel, SecurityFlags, ThreatLevel};

pub const DEFAULT_ENDPOINT: &str = "https://ipapi.co";

/// ipapi.co client configuration.
pub struct IpapiProvider {
    endpoint: String,
}

impl IpapiProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }

    fn normalize(response: IpapiResponse) -> GeoIntel {
        let security = SecurityFlags::default();
        // The ASN comes as "AS64496"; keep the string and extract the number.
        let asn_number = response
            .asn
            .as_deref()
            .and_then(|asn| asn.trim_start_matches("AS").parse().ok());

        GeoIntel {
            country: response
                .country_name
                .unwrap_or_else(|| UNKNOWN_FIELD.to_string()),
            city: response.city.unwrap_or_else(|| UNKNOWN_FIELD.to_string()),
            region: response.region.unwrap_or_else(|| UNKNOWN_FIELD.to_string()),
            latitude: response.latitude.unwrap_or(0.0),
            longitude: response.longitude.unwrap_or(0.0),
            isp: response.org.unwrap_or_else(|| UNKNOWN_FIELD.to_string()),
            asn: response.asn,
            asn_number,
            timezone: response.timezone,
            security,
            threat_level: ThreatLevel::from_flags(&security),
            map_url: GeoIntel::map_url_for(response.latitude, response.longitude),
        }
    }
}

#[async_trait]
impl IntelProvider for IpapiProvider {
    fn name(&self) -> &str {
        "ipapi.co"
    }

    async fn fetch(&self, client: &reqwest::Client, ip: Ipv4Addr) -> anyhow::Result<GeoIntel> {
        let url = format!("{}/{}/json/", self.endpoint.trim_end_matches('/'), ip);

        let response = client.get(&url).send().await?.error_for_status()?;
        let data: IpapiResponse = response.json().await?;

        // ipapi.co reports quota and lookup failures as 200s with an
        // error body.
        if data.error.unwrap_or(false) {
            anyhow::bail!(
                "ipapi.co error: {}",
                data.reason.as_deref().unwrap_or("unspecified")
            );
        }

        Ok(Self::normalize(data))
    }
}

#[derive(Debug, Deserialize)]
struct IpapiResponse {
    error: Option<bool>,
    reason: Option<String>,
    city: Option<String>,
    region: Option<String>,
    country_name: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    org: Option<String>,
    asn: Option<String>,
    timezone: Option<String>,
}
