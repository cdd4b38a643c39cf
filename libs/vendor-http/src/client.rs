use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderValue, USER_AGENT};
use http::Uri;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use std::time::Instant;

use crate::config::{HttpTransportConfig, TlsRootConfig, TransportSecurity};
use crate::error::{BoxError, TransportError};
use crate::tls;
use crate::transport::{Transport, VendorRequest, VendorResponse};

type HyperClient = Client<HttpsConnector<HttpConnector>, Full<Bytes>>;

/// Pooled hyper client speaking HTTP/1.1 and HTTP/2 over rustls.
///
/// Each [`Transport::execute`] call is one attempt: it is bounded by
/// `request_timeout` end to end, including reading the body.
#[derive(Clone)]
pub struct HyperTransport {
    client: HyperClient,
    config: HttpTransportConfig,
    user_agent: HeaderValue,
}

impl std::fmt::Debug for HyperTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HyperTransport")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HyperTransport {
    /// Build the transport and its connection pool.
    ///
    /// # Errors
    /// - `TransportError::Tls` if the root store cannot be loaded
    /// - `TransportError::RequestBuild` if the User-Agent is not a valid header value
    /// - `TransportError::Other` if insecure HTTP is requested in a release
    ///   build without the `allow-insecure-http` feature
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        if config.transport == TransportSecurity::AllowInsecureHttp {
            if !cfg!(any(debug_assertions, feature = "allow-insecure-http")) {
                return Err(TransportError::Other(
                    "allow_insecure_http requires a debug build or the allow-insecure-http feature"
                        .into(),
                ));
            }
            tracing::warn!(
                target: "vendor_http::security",
                "insecure HTTP enabled - vendor traffic will NOT be encrypted in transit"
            );
        }

        let user_agent = HeaderValue::from_str(&config.user_agent).map_err(http::Error::from)?;
        let https = build_https_connector(config.tls_roots, config.transport)?;

        let mut builder = Client::builder(TokioExecutor::new());
        // pool_idle_timeout is ignored without a pool timer
        builder
            .pool_timer(TokioTimer::new())
            .pool_max_idle_per_host(config.pool_max_idle_per_host);
        if let Some(idle) = config.pool_idle_timeout {
            builder.pool_idle_timeout(idle);
        }

        Ok(Self {
            client: builder.build::<_, Full<Bytes>>(https),
            config,
            user_agent,
        })
    }

    #[must_use]
    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    fn parse_uri(&self, url: &str) -> Result<(Uri, String), TransportError> {
        let uri: Uri = url.parse().map_err(|e: http::uri::InvalidUri| TransportError::InvalidUri {
            url: url.to_owned(),
            reason: e.to_string(),
        })?;

        match (uri.scheme_str(), self.config.transport) {
            (Some("https"), _) | (Some("http"), TransportSecurity::AllowInsecureHttp) => {}
            (Some("http"), _) => {
                return Err(TransportError::InvalidScheme {
                    scheme: "http".to_owned(),
                    reason: "plain HTTP is disabled (transport = tls_only)".to_owned(),
                });
            }
            (Some(other), _) => {
                return Err(TransportError::InvalidScheme {
                    scheme: other.to_owned(),
                    reason: "only http and https are supported".to_owned(),
                });
            }
            (None, _) => {
                return Err(TransportError::InvalidUri {
                    url: url.to_owned(),
                    reason: "missing scheme".to_owned(),
                });
            }
        }

        let host = uri
            .host()
            .ok_or_else(|| TransportError::InvalidUri {
                url: url.to_owned(),
                reason: "missing host".to_owned(),
            })?
            .to_owned();
        Ok((uri, host))
    }
}

#[async_trait]
impl Transport for HyperTransport {
    async fn execute(&self, request: VendorRequest) -> Result<VendorResponse, TransportError> {
        let (uri, host) = self.parse_uri(&request.url)?;
        let method = request.method.clone();

        let mut req = http::Request::builder()
            .method(request.method)
            .uri(uri)
            .body(Full::new(request.body))?;
        *req.headers_mut() = request.headers;
        if !req.headers().contains_key(USER_AGENT) {
            req.headers_mut().insert(USER_AGENT, self.user_agent.clone());
        }

        let limit = self.config.max_body_size;
        let timeout = self.config.request_timeout;
        let started = Instant::now();

        let exchange = async {
            let response = self
                .client
                .request(req)
                .await
                .map_err(|e| TransportError::from_client_error(e, &host))?;
            let (parts, body) = response.into_parts();
            let body = Limited::new(body, limit)
                .collect()
                .await
                .map_err(|e| body_error(e, limit))?
                .to_bytes();
            Ok::<_, TransportError>(VendorResponse {
                status: parts.status,
                headers: parts.headers,
                body,
            })
        };

        let result = tokio::time::timeout(timeout, exchange)
            .await
            .map_err(|_| TransportError::Timeout(timeout))?;

        match &result {
            Ok(resp) => tracing::debug!(
                %method,
                host = %host,
                status = resp.status.as_u16(),
                elapsed = ?started.elapsed(),
                "vendor exchange completed"
            ),
            Err(err) => tracing::debug!(
                %method,
                host = %host,
                error = %err,
                elapsed = ?started.elapsed(),
                "vendor exchange failed"
            ),
        }
        result
    }
}

fn body_error(err: BoxError, limit: usize) -> TransportError {
    if err.downcast_ref::<LengthLimitError>().is_some() {
        TransportError::BodyTooLarge { limit }
    } else {
        TransportError::Other(err)
    }
}

fn build_https_connector(
    tls_roots: TlsRootConfig,
    transport: TransportSecurity,
) -> Result<HttpsConnector<HttpConnector>, TransportError> {
    let allow_http = transport == TransportSecurity::AllowInsecureHttp;

    let builder = match tls_roots {
        TlsRootConfig::WebPki => hyper_rustls::HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(tls::crypto_provider())
            .map_err(|e| TransportError::Tls(Box::new(e)))?,
        TlsRootConfig::Native => {
            let client_config =
                tls::native_roots_client_config().map_err(|e| TransportError::Tls(e.into()))?;
            hyper_rustls::HttpsConnectorBuilder::new().with_tls_config(client_config)
        }
    };

    let connector = if allow_http {
        builder.https_or_http().enable_all_versions().build()
    } else {
        builder.https_only().enable_all_versions().build()
    };
    Ok(connector)
}
