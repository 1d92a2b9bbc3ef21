use http::{Request, Response};

#[derive(thiserror::Error, Debug)]
pub enum HttpClientError {
    /// Represents an http transport crate error.
    #[error("HTTP Transport error: `{0}`")]
    TransportError(String),
    /// Represents an unexpected response.
    #[error("invalid http response: `{0}`")]
    InvalidResponse(String),
}

/// Transport seam shared by the identity-provider and Power BI clients. The
/// method and url are defined inside the request itself.
pub trait HttpClient {
    fn send(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, HttpClientError>;
}

#[cfg(test)]
pub(crate) mod tests {

    use super::*;

    use mockall::mock;

    mock! {
        pub HttpClient {}

        impl HttpClient for HttpClient {
            fn send(&self, req: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, HttpClientError>;
        }
    }
}
