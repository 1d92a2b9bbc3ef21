use http::{Request, Response as HttpResponse};
use reqwest::blocking::{Client, Response as BlockingResponse};

use crate::http::config::HttpConfig;
use crate::http_client::{HttpClient as UpstreamHttpClient, HttpClientError};

/// Blocking HTTP client shared by the identity-provider and Power BI calls.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(config: &HttpConfig) -> Result<Self, HttpBuildError> {
        let mut builder = Client::builder()
            .use_rustls_tls()
            .tls_built_in_native_certs(true)
            .timeout(config.timeout)
            .connect_timeout(config.conn_timeout);

        if !config.proxy.is_empty() {
            let proxy = reqwest::Proxy::all(config.proxy.url_as_string())
                .map_err(|err| HttpBuildError::InvalidProxy(err.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|err| HttpBuildError::ClientBuilder(err.to_string()))?;

        Ok(Self { client })
    }

    fn send(&self, request: Request<Vec<u8>>) -> Result<HttpResponse<Vec<u8>>, HttpClientError> {
        let req = self
            .client
            .request(request.method().clone(), request.uri().to_string().as_str())
            .headers(request.headers().clone())
            .body(request.body().to_vec());

        let res = req
            .send()
            .map_err(|err| HttpClientError::TransportError(err.to_string()))?;

        try_build_response(res)
    }
}

fn try_build_response(res: BlockingResponse) -> Result<HttpResponse<Vec<u8>>, HttpClientError> {
    let status = res.status();
    let version = res.version();

    let body: Vec<u8> = res
        .bytes()
        .map_err(|err| HttpClientError::InvalidResponse(err.to_string()))?
        .into();

    http::Response::builder()
        .status(status)
        .version(version)
        .body(body)
        .map_err(|err| HttpClientError::InvalidResponse(err.to_string()))
}

impl UpstreamHttpClient for HttpClient {
    fn send(&self, req: Request<Vec<u8>>) -> Result<HttpResponse<Vec<u8>>, HttpClientError> {
        self.send(req)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum HttpBuildError {
    #[error("could not build the http client: {0}")]
    ClientBuilder(String),
    #[error("could not configure the proxy: {0}")]
    InvalidProxy(String),
}
