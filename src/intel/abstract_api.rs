//! Primary provider: Abstract IP Intelligence
//!
//! Nested JSON response with location, company, ASN, and security sections.
//! This is the only provider that reports security flags, so its answers
//! drive real threat levels. Requires an API key; without one the provider
//! fails immediately and the pipeline falls back.

use std::net::Ipv4Addr;

use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;

use super::provider::{IntelProvider, UNKNOWN_FIELD};
use super::record::{GeoIntel, SecurityFlags, ThreatLevel};

pub const DEFAULT_ENDPOINT: &str = "https://ip-intelligence.abstractapi.com/v1/";

/// Abstract API client configuration.
pub struct AbstractApiProvider {
    endpoint: String,
    api_key: Option<String>,
}

impl AbstractApiProvider {
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key,
        }
    }

    fn normalize(response: AbstractApiResponse) -> GeoIntel {
        let location = response.location.unwrap_or_default();
        let security = response.security.unwrap_or_default();
        let threat_level = ThreatLevel::from_flags(&security);

        GeoIntel {
            country: location.country.unwrap_or_else(|| UNKNOWN_FIELD.to_string()),
            city: location.city.unwrap_or_else(|| UNKNOWN_FIELD.to_string()),
            region: location.region.unwrap_or_else(|| UNKNOWN_FIELD.to_string()),
            latitude: location.latitude.unwrap_or(0.0),
            longitude: location.longitude.unwrap_or(0.0),
            isp: response
                .company
                .and_then(|c| c.name)
                .unwrap_or_else(|| UNKNOWN_FIELD.to_string()),
            asn: response.asn.as_ref().and_then(|a| a.name.clone()),
            asn_number: response.asn.and_then(|a| a.asn),
            timezone: response.timezone.and_then(|t| t.name),
            security,
            threat_level,
            map_url: GeoIntel::map_url_for(location.latitude, location.longitude),
        }
    }
}

#[async_trait]
impl IntelProvider for AbstractApiProvider {
    fn name(&self) -> &str {
        "Abstract IP Intelligence"
    }

    async fn fetch(&self, client: &reqwest::Client, ip: Ipv4Addr) -> anyhow::Result<GeoIntel> {
        let api_key = self
            .api_key
            .as_deref()
            .context("no API key configured for Abstract API")?;

        let response = client
            .get(&self.endpoint)
            .query(&[("api_key", api_key), ("ip_address", &ip.to_string())])
            .send()
            .await?
            .error_for_status()?;

        let data: AbstractApiResponse = response.json().await?;
        Ok(Self::normalize(data))
    }
}

#[derive(Debug, Deserialize)]
struct AbstractApiResponse {
    location: Option<LocationSection>,
    company: Option<CompanySection>,
    asn: Option<AsnSection>,
    security: Option<SecurityFlags>,
    timezone: Option<TimezoneSection>,
}

#[derive(Debug, Default, Deserialize)]
struct LocationSection {
    country: Option<String>,
    city: Option<String>,
    region: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CompanySection {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AsnSection {
    asn: Option<u32>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TimezoneSection {
    name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_full_response() {
        let data: AbstractApiResponse = serde_json::from_value(json!({
            "location": {
                "country": "Germany",
                "city": "Frankfurt",
                "region": "Hesse",
                "latitude": 50.11,
                "longitude": 8.68
            },
            "company": { "name": "Example Hosting GmbH" },
            "asn": { "asn": 64496, "name": "EXAMPLE-AS" },
            "security": { "is_vpn": true, "is_proxy": true },
            "timezone": { "name": "Europe/Berlin" }
        }))
        .unwrap();

        let intel = AbstractApiProvider::normalize(data);
        assert_eq!(intel.country, "Germany");
        assert_eq!(intel.city, "Frankfurt");
        assert_eq!(intel.isp, "Example Hosting GmbH");
        assert_eq!(intel.asn.as_deref(), Some("EXAMPLE-AS"));
        assert_eq!(intel.asn_number, Some(64496));
        assert_eq!(intel.timezone.as_deref(), Some("Europe/Berlin"));
        assert!(intel.security.is_vpn);
        assert!(intel.security.is_proxy);
        assert!(!intel.security.is_tor);
        // vpn(1) + proxy(2) = 3
        assert_eq!(intel.threat_level, ThreatLevel::High);
        assert_eq!(
            intel.map_url.as_deref(),
            Some("https://www.google.com/maps?q=50.11,8.68")
        );
    }

    #[test]
    fn test_normalize_sparse_response() {
        let data: AbstractApiResponse = serde_json::from_value(json!({})).unwrap();
        let intel = AbstractApiProvider::normalize(data);

        assert_eq!(intel.country, "Unknown");
        assert_eq!(intel.city, "Unknown");
        assert_eq!(intel.isp, "Unknown");
        assert_eq!(intel.latitude, 0.0);
        assert_eq!(intel.longitude, 0.0);
        assert!(intel.asn.is_none());
        assert!(intel.map_url.is_none());
        assert_eq!(intel.threat_level, ThreatLevel::Safe);
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_fast() {
        let provider = AbstractApiProvider::new(DEFAULT_ENDPOINT, None);
        let client = reqwest::Client::new();
        let err = provider
            .fetch(&client, "93.184.216.34".parse().unwrap())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("API key"));
    }
}
