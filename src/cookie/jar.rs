//! Serialized cookie jars: the wire format stored per username.
//!
//! A jar is a JSON array of cookie objects with the classic PascalCase
//! field names, so jars written by older pool deployments decode unchanged.
//! Round-trip is identity for every populated field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One HTTP cookie record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CookieRecord {
    pub name: String,
    pub value: String,
    pub path: String,
    pub domain: String,
    pub expires: Option<DateTime<Utc>>,
    pub raw_expires: String,
    pub max_age: i64,
    pub secure: bool,
    pub http_only: bool,
    /// SameSite as an integer tag: 0 unset, 1 default, 2 lax, 3 strict, 4 none.
    pub same_site: i32,
    pub raw: String,
    pub unparsed: Vec<String>,
}

pub type CookieJar = Vec<CookieRecord>;

pub fn encode(jar: &CookieJar) -> Result<String, serde_json::Error> {
    serde_json::to_string(jar)
}

pub fn decode(data: &str) -> Result<CookieJar, serde_json::Error> {
    serde_json::from_str(data)
}

/// Render the jar as a `Cookie:` request header value.
pub fn header_value(jar: &CookieJar) -> String {
    jar.iter()
        .map(|cookie| format!("{}={}", cookie.name, cookie.value))
        .collect::<Vec<_>>()
        .join("; ")
}
