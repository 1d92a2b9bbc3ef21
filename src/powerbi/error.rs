use thiserror::Error;

use crate::TokenProviderError;

#[derive(Debug, Error)]
pub enum PbiClientError {
    #[error("fetching access token: `{0}`")]
    TokenProvider(#[from] TokenProviderError),
    #[error("error computing the request payload: `{0}`")]
    Encoder(String),
    #[error("error decoding the response payload: `{0}`")]
    Decoder(String),
    #[error("Power BI API error: Status code: `{0}`, Reason: `{1}`")]
    Api(u16, String),
    #[error("transport error: `{0}`")]
    Transport(String),
}
