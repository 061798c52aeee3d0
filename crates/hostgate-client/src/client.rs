use hostgate_common::protocol::error::{GatewayError, Result};
use hostgate_common::ExecutionResult;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Method, Request, Uri};
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use url::form_urlencoded;
use url::Url;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";

/// Client for one gateway.
///
/// Calls go through hyper-util's pooled client, but the gateway answers each
/// request with `connection: close`, so in practice every call runs on its
/// own connection.
#[derive(Clone)]
pub struct GatewayClient {
    base_url: Url,
    http: Client<HttpConnector, Full<Bytes>>,
}

impl GatewayClient {
    /// Creates a client for the gateway at `base_url`, e.g.
    /// `http://127.0.0.1:8080`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Client`] if the URL does not parse or is not
    /// plain `http`.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())
            .map_err(|e| GatewayError::Client(format!("invalid gateway URL: {}", e)))?;

        if base_url.scheme() != "http" {
            return Err(GatewayError::Client(format!(
                "unsupported scheme '{}': only http is supported",
                base_url.scheme()
            )));
        }

        let http = Client::builder(TokioExecutor::new()).build_http();

        Ok(Self { base_url, http })
    }

    /// The gateway this client talks to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Asks the gateway whether it is listening.
    pub async fn health(&self) -> Result<ExecutionResult> {
        self.post("/healthz", Bytes::new()).await
    }

    /// Asks the gateway to stop listening.
    pub async fn exit(&self) -> Result<ExecutionResult> {
        self.post("/exit", Bytes::new()).await
    }

    /// Submits `script` for execution, tagged with `token`.
    ///
    /// Script failures are not errors here: they come back as a result with a
    /// non-200 `errcode`.
    pub async fn execute(&self, script: &str, token: &str) -> Result<ExecutionResult> {
        let body = form_urlencoded::Serializer::new(String::new())
            .append_pair("maxcode", script)
            .append_pair("esspath", token)
            .finish();

        self.post("/", Bytes::from(body)).await
    }

    async fn post(&self, path: &str, body: Bytes) -> Result<ExecutionResult> {
        let uri = self.endpoint(path)?;
        tracing::debug!("POST {}", uri);

        let request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(CONTENT_TYPE, HeaderValue::from_static(FORM_CONTENT_TYPE))
            .body(Full::new(body))
            .map_err(|e| GatewayError::Client(e.to_string()))?;

        let response = self
            .http
            .request(request)
            .await
            .map_err(|e| GatewayError::Client(e.to_string()))?;

        let body = response
            .into_body()
            .collect()
            .await
            .map_err(|e| GatewayError::Transport(e.to_string()))?
            .to_bytes();

        ExecutionResult::from_json(&body).map_err(|e| {
            GatewayError::InvalidResponse(format!(
                "{} (body: {})",
                e,
                String::from_utf8_lossy(&body)
            ))
        })
    }

    fn endpoint(&self, path: &str) -> Result<Uri> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| GatewayError::Client(format!("invalid path '{}': {}", path, e)))?;

        url.as_str()
            .parse::<Uri>()
            .map_err(|e| GatewayError::Client(e.to_string()))
    }
}
