pub mod authenticator;
pub mod embed;
pub mod http;
pub mod http_client;
pub mod powerbi;
pub mod secret;
pub mod server;
pub mod settings;
pub mod token;
pub mod token_provider;

use crate::token::Token;
use thiserror::Error;

pub type ClientId = String;

#[derive(Error, Debug)]
pub enum TokenProviderError {
    #[error("fetching access token: `{0}`")]
    AuthenticatorError(#[from] authenticator::AuthenticateError),
    #[error("building token: `{0}`")]
    TokenError(String),
    #[error("acquiring token cache mutex lock")]
    PoisonError,
}

/// Produces the bearer access token used to authenticate calls against the
/// Power BI REST API.
pub trait AccessTokenProvider {
    fn access_token(&self) -> Result<Token, TokenProviderError>;
}
