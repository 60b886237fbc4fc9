//! Data shapes exchanged over the API.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// One configured backing object store.
///
/// `name` is the registry key. Empty optional strings are treated the same
/// as absent ones, since browser forms post `""` for untouched fields.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Unique, user-chosen store name.
    #[serde(default)]
    pub name: String,
    /// Nominal region of the store.
    #[serde(default)]
    pub region: String,
    /// Region used for request signing when it differs from `region`.
    #[serde(default, alias = "signing_region", skip_serializing_if = "Option::is_none")]
    pub signing_region: Option<String>,
    /// Access key ID.
    #[serde(default, alias = "access_key")]
    pub access_key: String,
    /// Secret access key.
    #[serde(default, alias = "secret_key")]
    pub secret_key: String,
    /// Custom endpoint URL for S3-compatible servers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl StoreConfig {
    /// The explicit signing region, if a non-empty one is configured.
    #[must_use]
    pub fn signing_region(&self) -> Option<&str> {
        self.signing_region.as_deref().filter(|s| !s.is_empty())
    }

    /// The custom endpoint, if a non-empty one is configured.
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref().filter(|s| !s.is_empty())
    }
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("name", &self.name)
            .field("region", &self.region)
            .field("signing_region", &self.signing_region)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Public view of a [`StoreConfig`]; never carries the secret key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreView {
    /// Store name.
    pub name: String,
    /// Nominal region.
    pub region: String,
    /// Explicit signing region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_region: Option<String>,
    /// Custom endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Access key ID.
    pub access_key: String,
}

impl From<&StoreConfig> for StoreView {
    fn from(config: &StoreConfig) -> Self {
        Self {
            name: config.name.clone(),
            region: config.region.clone(),
            signing_region: config.signing_region().map(str::to_owned),
            endpoint: config.endpoint().map(str::to_owned),
            access_key: config.access_key.clone(),
        }
    }
}

/// One row of a shallow listing: a file directly under the prefix, or a
/// sub-prefix ("folder").
///
/// Folder rows carry `Size`/`LastModified` only once their aggregate is
/// ready; until then they are provisional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListingEntry {
    /// Full object key or sub-prefix (with trailing `/`).
    pub key: String,
    /// Object size, or folder aggregate size.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    /// Modification time, or the latest one under a folder.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "rfc3339::option")]
    pub last_modified: Option<DateTime<Utc>>,
    /// Whether this row is a sub-prefix.
    pub is_folder: bool,
}

impl ListingEntry {
    /// A file row.
    #[must_use]
    pub fn file(key: impl Into<String>, size: Option<i64>, last_modified: Option<DateTime<Utc>>) -> Self {
        Self {
            key: key.into(),
            size,
            last_modified,
            is_folder: false,
        }
    }

    /// A folder row whose aggregate is not available yet.
    #[must_use]
    pub fn provisional_folder(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            size: None,
            last_modified: None,
            is_folder: true,
        }
    }

    /// A folder row with a ready aggregate.
    #[must_use]
    pub fn folder(key: impl Into<String>, size: i64, last_modified: Option<DateTime<Utc>>) -> Self {
        Self {
            key: key.into(),
            size: Some(size),
            last_modified,
            is_folder: true,
        }
    }
}

/// Poll-style view of a prefix aggregate.
///
/// An unscheduled key serializes as `{"ready":false}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefixStatsView {
    /// Whether the aggregate has been computed.
    pub ready: bool,
    /// Sum of known object sizes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    /// Latest modification time under the prefix; absent for an empty prefix.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "rfc3339::option")]
    pub last_modified: Option<DateTime<Utc>>,
    /// When the entry last changed state.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "rfc3339::option")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Failure message of the last computation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Objects the store listed without a size; excluded from `size`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects_without_size: Option<u64>,
}

impl PrefixStatsView {
    /// The view of a key that was never scheduled.
    #[must_use]
    pub fn unscheduled() -> Self {
        Self::default()
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    /// The object key that was written.
    pub key: String,
    /// Exact number of bytes sent to the store.
    pub size: u64,
}

/// Format a timestamp the way every API response does (RFC 3339, whole seconds, `Z`).
#[must_use]
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

mod rfc3339 {
    pub(super) mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        #[allow(clippy::ref_option)]
        pub(crate) fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(ts) => serializer.serialize_str(&super::super::format_timestamp(ts)),
                None => serializer.serialize_none(),
            }
        }

        pub(crate) fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            let raw = Option::<String>::deserialize(deserializer)?;
            match raw.as_deref() {
                None | Some("") => Ok(None),
                Some(s) => DateTime::parse_from_rfc3339(s)
                    .map(|ts| Some(ts.with_timezone(&Utc)))
                    .map_err(serde::de::Error::custom),
            }
        }
    }
}
