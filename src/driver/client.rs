use http::{Request, StatusCode, Uri};
use http_body_util::{BodyExt, Empty};
use hyper::body::Bytes;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use std::time::Duration;
use tokio::time;

use crate::error::TaskError;

/// Issues one GET for a path relative to the target host and reports the status.
pub trait PriceClient: Send + Sync + 'static {
    fn get(&self, path: &str) -> impl Future<Output = Result<StatusCode, TaskError>> + Send;
}

/// Pooled HTTP/1.1 client shared by every simulated user.
pub struct HyperPriceClient {
    client: Client<HttpConnector, Empty<Bytes>>,
    base: String,
    timeout: Option<Duration>,
}

impl HyperPriceClient {
    pub fn new(host: &str, timeout: Option<Duration>) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);
        connector.set_keepalive(Some(Duration::from_secs(30)));

        let client = Client::builder(TokioExecutor::new()).build(connector);

        Self {
            client,
            base: host.trim_end_matches('/').to_string(),
            timeout,
        }
    }

    async fn send(&self, uri: Uri) -> Result<StatusCode, TaskError> {
        let request = Request::get(uri)
            .body(Empty::<Bytes>::new())
            .map_err(|e| TaskError::Request(e.to_string()))?;

        let response = self
            .client
            .request(request)
            .await
            .map_err(|e| TaskError::Request(e.to_string()))?;
        let status = response.status();

        // drain so the connection goes back to the pool
        response
            .into_body()
            .collect()
            .await
            .map_err(|e| TaskError::Request(e.to_string()))?;

        Ok(status)
    }
}

impl PriceClient for HyperPriceClient {
    async fn get(&self, path: &str) -> Result<StatusCode, TaskError> {
        let target = format!("{}{}", self.base, path);
        let uri: Uri = match target.parse() {
            Ok(uri) => uri,
            Err(source) => return Err(TaskError::InvalidUri { uri: target, source }),
        };

        match self.timeout {
            Some(limit) => time::timeout(limit, self.send(uri))
                .await
                .map_err(|_| TaskError::Timeout(limit))?,
            None => self.send(uri).await,
        }
    }
}
