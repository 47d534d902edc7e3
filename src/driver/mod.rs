use http::StatusCode;
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::catalog::{CatalogSource, CatalogVersion, PairCatalog, TradingPair};
use crate::error::{CatalogError, TaskError};

mod client;

pub use client::{HyperPriceClient, PriceClient};

/// `/{segment}/prices/{token_x}/{token_y}/{bin_step}`, fields substituted verbatim.
pub fn build_price_path(version: CatalogVersion, pair: &TradingPair) -> String {
    format!(
        "/{}/prices/{}/{}/{}",
        version.path_segment(),
        pair.token_x,
        pair.token_y,
        pair.bin_step
    )
}

/// Samples pairs from preloaded catalogs and issues price lookups.
///
/// Holds no mutable state of its own, so one instance is shared by all users.
pub struct PriceDriver<C> {
    catalogs: BTreeMap<CatalogVersion, PairCatalog>,
    client: C,
}

impl<C: PriceClient> PriceDriver<C> {
    pub fn new(client: C, catalogs: impl IntoIterator<Item = PairCatalog>) -> Self {
        let catalogs = catalogs
            .into_iter()
            .map(|catalog| (catalog.version(), catalog))
            .collect();
        Self { catalogs, client }
    }

    /// Loads each requested version once; the first failing catalog aborts startup.
    pub fn load(
        client: C,
        source: &CatalogSource,
        versions: impl IntoIterator<Item = CatalogVersion>,
    ) -> Result<Self, CatalogError> {
        let mut catalogs = Vec::new();
        for version in versions {
            let catalog = source.load_catalog(version)?;
            info!("Catalog {} ready with {} pairs", version, catalog.len());
            catalogs.push(catalog);
        }
        Ok(Self::new(client, catalogs))
    }

    pub fn catalog(&self, version: CatalogVersion) -> Result<&PairCatalog, CatalogError> {
        self.catalogs
            .get(&version)
            .ok_or(CatalogError::NotLoaded { version })
    }

    /// One price lookup for a random pair of `version`. The status is returned
    /// as-is; classifying it is left to the caller.
    pub async fn run_task(&self, version: CatalogVersion) -> Result<StatusCode, TaskError> {
        let path = {
            let pair = self.catalog(version)?.sample_pair()?;
            build_price_path(version, pair)
        };

        debug!("GET {}", path);
        self.client.get(&path).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::catalog::tests::{pair, write_catalog};
    use std::sync::Mutex;
    use tokio_test::{assert_err, assert_ok};

    /// Records every requested path and answers with a fixed status.
    pub(crate) struct RecordingClient {
        paths: Mutex<Vec<String>>,
        status: StatusCode,
    }

    impl RecordingClient {
        pub(crate) fn new(status: StatusCode) -> Self {
            Self {
                paths: Mutex::new(Vec::new()),
                status,
            }
        }

        fn requested(&self) -> Vec<String> {
            self.paths.lock().unwrap().clone()
        }
    }

    impl PriceClient for RecordingClient {
        async fn get(&self, path: &str) -> Result<StatusCode, TaskError> {
            self.paths.lock().unwrap().push(path.to_string());
            Ok(self.status)
        }
    }

    impl PriceDriver<RecordingClient> {
        pub(crate) fn recorded_requests(&self) -> Vec<String> {
            self.client.requested()
        }
    }

    #[test]
    fn builds_path_per_version() {
        let p = pair("0xabc", "0xdef", 25);
        assert_eq!(
            build_price_path(CatalogVersion::V2, &p),
            "/v2/prices/0xabc/0xdef/25"
        );
        assert_eq!(
            build_price_path(CatalogVersion::V2_1, &p),
            "/v2_1/prices/0xabc/0xdef/25"
        );
    }

    #[test]
    fn path_building_is_pure() {
        let p = pair("A", "B", 10);
        assert_eq!(
            build_price_path(CatalogVersion::V2_1, &p),
            build_price_path(CatalogVersion::V2_1, &p)
        );
    }

    #[tokio::test]
    async fn run_task_issues_exactly_one_request() {
        let driver = PriceDriver::new(
            RecordingClient::new(StatusCode::OK),
            [PairCatalog::new(CatalogVersion::V2_1, vec![pair("A", "B", 10)])],
        );

        let status = assert_ok!(driver.run_task(CatalogVersion::V2_1).await);

        assert_eq!(status, StatusCode::OK);
        assert_eq!(driver.recorded_requests(), vec!["/v2_1/prices/A/B/10"]);
    }

    #[tokio::test]
    async fn run_task_passes_failure_status_through() {
        let driver = PriceDriver::new(
            RecordingClient::new(StatusCode::SERVICE_UNAVAILABLE),
            [PairCatalog::new(CatalogVersion::V2, vec![pair("A", "B", 1)])],
        );

        let status = assert_ok!(driver.run_task(CatalogVersion::V2).await);
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn empty_catalog_fails_without_a_request() {
        let driver = PriceDriver::new(
            RecordingClient::new(StatusCode::OK),
            [PairCatalog::new(CatalogVersion::V2, Vec::new())],
        );

        let err = assert_err!(driver.run_task(CatalogVersion::V2).await);
        assert!(matches!(err, TaskError::Catalog(CatalogError::Empty { .. })));
        assert!(driver.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn unloaded_version_fails_without_a_request() {
        let driver = PriceDriver::new(
            RecordingClient::new(StatusCode::OK),
            [PairCatalog::new(CatalogVersion::V2_1, vec![pair("A", "B", 10)])],
        );

        let err = assert_err!(driver.run_task(CatalogVersion::V2).await);
        assert!(matches!(
            err,
            TaskError::Catalog(CatalogError::NotLoaded { .. })
        ));
        assert!(driver.recorded_requests().is_empty());
    }

    #[test]
    fn malformed_catalog_aborts_load() {
        let good = write_catalog(
            "driver-good",
            r#"[{"token_x": "A", "token_y": "B", "bin_step": 10}]"#,
        );
        let bad = write_catalog("driver-bad", "this is not json");
        let source = CatalogSource::new(BTreeMap::from([
            (CatalogVersion::V2, good.path()),
            (CatalogVersion::V2_1, bad.path()),
        ]));

        let result = PriceDriver::load(
            RecordingClient::new(StatusCode::OK),
            &source,
            [CatalogVersion::V2, CatalogVersion::V2_1],
        );
        assert!(matches!(result, Err(CatalogError::Malformed { .. })));
    }

    #[tokio::test]
    async fn loaded_driver_serves_each_version_from_its_own_catalog() {
        let v2 = write_catalog(
            "driver-v2",
            r#"[{"token_x": "X2", "token_y": "Y2", "bin_step": 2}]"#,
        );
        let v21 = write_catalog(
            "driver-v21",
            r#"[{"token_x": "X21", "token_y": "Y21", "bin_step": 21}]"#,
        );
        let source = CatalogSource::new(BTreeMap::from([
            (CatalogVersion::V2, v2.path()),
            (CatalogVersion::V2_1, v21.path()),
        ]));
        let driver = PriceDriver::load(
            RecordingClient::new(StatusCode::OK),
            &source,
            source.versions(),
        )
        .unwrap();

        driver.run_task(CatalogVersion::V2).await.unwrap();
        driver.run_task(CatalogVersion::V2_1).await.unwrap();

        assert_eq!(
            driver.recorded_requests(),
            vec!["/v2/prices/X2/Y2/2", "/v2_1/prices/X21/Y21/21"]
        );
    }
}
