//! Geolocation result types.

use serde::{Deserialize, Serialize};

/// Substrings in the org/ISP fields that mark an address as coming from a
/// VPN exit, proxy, or rented server rather than a residential connection.
const VPN_ORG_TOKENS: &[&str] = &["vpn", "proxy", "hosting", "datacenter"];

/// Resolved location and network metadata for a visitor address.
///
/// Every field is best effort; the upstream service omits fields it cannot
/// determine and the gate treats missing data as unknown rather than as a
/// block signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationRecord {
    /// Country display name, e.g. "Thailand".
    pub country: Option<String>,
    /// ISO 3166-1 alpha-2 code, upper-cased, e.g. "TH".
    pub country_code: Option<String>,
    /// Region or state name.
    pub region: Option<String>,
    /// City name.
    pub city: Option<String>,
    /// IANA timezone, e.g. "Asia/Bangkok".
    pub timezone: Option<String>,
    /// Internet service provider name.
    pub isp: Option<String>,
    /// Organization the address is registered to.
    pub org: Option<String>,
    /// Upstream flagged the address as an anonymizing proxy.
    pub is_proxy: bool,
    /// Upstream flagged the address as a hosting/datacenter range.
    pub is_hosting: bool,
}

impl LocationRecord {
    /// Whether this address looks like a VPN, proxy, or datacenter exit.
    ///
    /// Trusts the upstream proxy/hosting flags first, then falls back to
    /// scanning the org and ISP names for well-known tokens. Heuristic by
    /// nature: a miss means the visitor is treated as residential.
    pub fn is_vpn(&self) -> bool {
        if self.is_proxy || self.is_hosting {
            return true;
        }
        let mentions_vpn = |field: &Option<String>| {
            field.as_deref().is_some_and(|value| {
                let lower = value.to_lowercase();
                VPN_ORG_TOKENS.iter().any(|token| lower.contains(token))
            })
        };
        mentions_vpn(&self.org) || mentions_vpn(&self.isp)
    }
}

/// Wire format of the upstream geolocation response.
///
/// Field names follow the provider's camelCase JSON. `status` is `"success"`
/// or `"fail"`; on failure `message` carries the reason and the remaining
/// fields are absent.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GeoApiResponse {
    pub status: Option<String>,
    pub message: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub region_name: Option<String>,
    pub city: Option<String>,
    pub timezone: Option<String>,
    pub isp: Option<String>,
    pub org: Option<String>,
    #[serde(default)]
    pub proxy: bool,
    #[serde(default)]
    pub hosting: bool,
}

impl From<GeoApiResponse> for LocationRecord {
    fn from(api: GeoApiResponse) -> Self {
        LocationRecord {
            country: api.country,
            country_code: api
                .country_code
                .map(|code| code.trim().to_ascii_uppercase()),
            region: api.region_name,
            city: api.city,
            timezone: api.timezone,
            isp: api.isp,
            org: api.org,
            is_proxy: api.proxy,
            is_hosting: api.hosting,
        }
    }
}
