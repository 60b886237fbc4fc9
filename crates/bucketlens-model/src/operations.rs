//! Routed API operations.

/// All supported BucketLens operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiOperation {
    /// `GET /buckets/{bucket}/objects`: shallow listing with folder stats.
    ListObjects,
    /// `POST /buckets/{bucket}/objects`: buffered multipart upload.
    UploadObject,
    /// `GET /buckets/{bucket}/folders/{prefix}?download=true`: zip archive of a prefix.
    DownloadFolder,
    /// `GET /prefix-stats`: poll a prefix aggregate.
    GetPrefixStats,
    /// `DELETE /prefix-stats`: drop a prefix aggregate and cancel its computation.
    InvalidatePrefixStats,
    /// `GET /stores`.
    ListStores,
    /// `POST /stores`.
    CreateStore,
    /// `DELETE /stores/{name}`.
    DeleteStore,
}

impl ApiOperation {
    /// Returns the operation name as a string.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ListObjects => "ListObjects",
            Self::UploadObject => "UploadObject",
            Self::DownloadFolder => "DownloadFolder",
            Self::GetPrefixStats => "GetPrefixStats",
            Self::InvalidatePrefixStats => "InvalidatePrefixStats",
            Self::ListStores => "ListStores",
            Self::CreateStore => "CreateStore",
            Self::DeleteStore => "DeleteStore",
        }
    }

    /// Parse an operation from its string name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ListObjects" => Some(Self::ListObjects),
            "UploadObject" => Some(Self::UploadObject),
            "DownloadFolder" => Some(Self::DownloadFolder),
            "GetPrefixStats" => Some(Self::GetPrefixStats),
            "InvalidatePrefixStats" => Some(Self::InvalidatePrefixStats),
            "ListStores" => Some(Self::ListStores),
            "CreateStore" => Some(Self::CreateStore),
            "DeleteStore" => Some(Self::DeleteStore),
            _ => None,
        }
    }

    /// Whether the operation mutates server-side state.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Self::UploadObject | Self::InvalidatePrefixStats | Self::CreateStore | Self::DeleteStore
        )
    }
}

impl std::fmt::Display for ApiOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
