//! The JSON document emitted by `speedtest --format=json`.
//!
//! Fields which are absent or `null` in the input decode to zero values, and fields
//! we don't use (`type`, `timestamp`, `interface`, ...) are ignored.

use serde::{Deserialize, Deserializer};

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct SpeedTestResult {
    #[serde(deserialize_with = "null_as_default")]
    pub ping: Ping,
    #[serde(deserialize_with = "null_as_default")]
    pub download: Transfer,
    #[serde(deserialize_with = "null_as_default")]
    pub upload: Transfer,
    #[serde(deserialize_with = "null_as_default")]
    pub packet_loss: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub isp: String,
    #[serde(deserialize_with = "null_as_default")]
    pub server: Server,
    #[serde(deserialize_with = "null_as_default")]
    pub result: ResultInfo,
}

impl SpeedTestResult {
    pub fn from_json(input: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(input)
    }
}

/// Treats `null` like an absent field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Ping {
    #[serde(deserialize_with = "null_as_default")]
    pub jitter: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub latency: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub low: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub high: f64,
}

/// Measurements for one direction (download or upload)
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Transfer {
    /// Bytes per second
    #[serde(deserialize_with = "null_as_default")]
    pub bandwidth: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub bytes: i64,
    /// Milliseconds
    #[serde(deserialize_with = "null_as_default")]
    pub elapsed: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub latency: LatencyStats,
}

/// Latency observed while the transfer was under load
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct LatencyStats {
    /// Interquartile mean
    #[serde(deserialize_with = "null_as_default")]
    pub iqm: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub low: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub high: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub jitter: f64,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Server {
    #[serde(deserialize_with = "null_as_default")]
    pub id: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub location: String,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResultInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
}
