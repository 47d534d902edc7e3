use serde::Deserialize;
use std::fmt;

/// API versions that have their own pair catalog and price route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub enum CatalogVersion {
    #[serde(rename = "v2")]
    V2,
    #[serde(rename = "v2.1", alias = "v2_1")]
    V2_1,
}

impl CatalogVersion {
    /// Name used in config files and logs.
    pub fn tag(self) -> &'static str {
        match self {
            CatalogVersion::V2 => "v2",
            CatalogVersion::V2_1 => "v2.1",
        }
    }

    /// Leading segment of the price route for this version.
    pub fn path_segment(self) -> &'static str {
        match self {
            CatalogVersion::V2 => "v2",
            CatalogVersion::V2_1 => "v2_1",
        }
    }
}

impl fmt::Display for CatalogVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}
