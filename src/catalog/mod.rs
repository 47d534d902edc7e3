use rand::Rng;
use rand::seq::IndexedRandom;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::CatalogError;

mod pair;
mod version;

pub use pair::TradingPair;
pub use version::CatalogVersion;

/// Immutable list of pairs eligible for sampling under one version.
#[derive(Debug, Clone)]
pub struct PairCatalog {
    version: CatalogVersion,
    pairs: Vec<TradingPair>,
}

impl PairCatalog {
    pub fn new(version: CatalogVersion, pairs: Vec<TradingPair>) -> Self {
        Self { version, pairs }
    }

    pub fn version(&self) -> CatalogVersion {
        self.version
    }

    pub fn pairs(&self) -> &[TradingPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn sample_pair(&self) -> Result<&TradingPair, CatalogError> {
        self.sample_pair_with(&mut rand::rng())
    }

    /// Uniform choice with a caller-supplied RNG. Calls are independent, so
    /// repeats are expected.
    pub fn sample_pair_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<&TradingPair, CatalogError> {
        self.pairs.choose(rng).ok_or(CatalogError::Empty {
            version: self.version,
        })
    }
}

/// Where each version's catalog file lives.
#[derive(Debug, Clone, Default)]
pub struct CatalogSource {
    paths: BTreeMap<CatalogVersion, PathBuf>,
}

impl CatalogSource {
    pub fn new(paths: BTreeMap<CatalogVersion, PathBuf>) -> Self {
        Self { paths }
    }

    pub fn versions(&self) -> impl Iterator<Item = CatalogVersion> + '_ {
        self.paths.keys().copied()
    }

    /// Reads and decodes the catalog for `version`. Every call hits storage.
    pub fn load_catalog(&self, version: CatalogVersion) -> Result<PairCatalog, CatalogError> {
        let path = self
            .paths
            .get(&version)
            .ok_or(CatalogError::NotLoaded { version })?;
        let catalog = read_catalog(version, path)?;

        if catalog.is_empty() {
            warn!("Catalog {} for {} has no pairs", path.display(), version);
        } else {
            debug!(
                "Loaded {} pairs for {} from {}",
                catalog.len(),
                version,
                path.display()
            );
        }
        Ok(catalog)
    }
}

fn read_catalog(version: CatalogVersion, path: &Path) -> Result<PairCatalog, CatalogError> {
    let content = std::fs::read(path).map_err(|source| CatalogError::Unavailable {
        path: path.to_path_buf(),
        source,
    })?;
    decode_catalog(version, path, &content)
}

fn decode_catalog(
    version: CatalogVersion,
    path: &Path,
    content: &[u8],
) -> Result<PairCatalog, CatalogError> {
    let malformed = |reason: String| CatalogError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let pairs: Vec<TradingPair> =
        serde_json::from_slice(content).map_err(|e| malformed(e.to_string()))?;

    for (index, pair) in pairs.iter().enumerate() {
        pair.validate()
            .map_err(|reason| malformed(format!("entry {}: {}", index, reason)))?;
    }

    Ok(PairCatalog::new(version, pairs))
}
