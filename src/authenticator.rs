use std::fmt;

use http::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::ClientId;
use crate::http_client::HttpClient;
use crate::secret::{ClientSecret, Password};
use crate::token::AccessToken;

/// Path MSAL-style clients append to the authority when exchanging a grant.
const TOKEN_ENDPOINT_PATH: &str = "oauth2/v2.0/token";

/// Placeholder tenant segment in a multi-tenant authority URL.
const MULTI_TENANT_SEGMENT: &str = "organizations";

#[derive(Error, Debug)]
pub enum AuthenticateError {
    #[error("unable to serialize token request: `{0}`")]
    SerializeError(String),
    #[error("unable to deserialize token response: `{0}`")]
    DeserializeError(String),
    #[error("identity provider error: Status code: `{0}`, Reason: `{1}`")]
    HttpResponseError(u16, String),
    #[error("http transport error: `{0}`")]
    HttpTransportError(String),
    #[error("invalid authority url `{0}`: `{1}`")]
    InvalidAuthorityUrl(String, String),
}

pub trait Authenticator {
    fn authenticate(&self, req: TokenRequest) -> Result<TokenResponse, AuthenticateError>;
}

/// Builds the token endpoint for an authority, e.g.
/// `https://login.microsoftonline.com/contoso` becomes
/// `https://login.microsoftonline.com/contoso/oauth2/v2.0/token`.
pub fn token_endpoint(authority_url: &str) -> Result<Url, AuthenticateError> {
    let endpoint = format!(
        "{}/{}",
        authority_url.trim_end_matches('/'),
        TOKEN_ENDPOINT_PATH
    );
    Url::parse(&endpoint).map_err(|e| {
        AuthenticateError::InvalidAuthorityUrl(authority_url.to_string(), e.to_string())
    })
}

/// Replaces the multi-tenant `organizations` segment of an authority URL with
/// a concrete tenant id, leaving everything else untouched. App-only grants
/// require a tenant-specific authority.
pub fn tenant_authority(authority_url: &str, tenant_id: &str) -> String {
    authority_url.replace(MULTI_TENANT_SEGMENT, tenant_id)
}

/// The Authenticator is responsible for exchanging an OAuth2 grant for an
/// access token at the Azure AD token endpoint.
pub struct AadAuthenticator<C> {
    /// HTTP client
    http_client: C,
    /// Token endpoint of the configured authority
    token_url: Url,
}

impl<C> AadAuthenticator<C> {
    pub fn new(http_client: C, authority_url: &str) -> Result<Self, AuthenticateError> {
        Ok(Self {
            http_client,
            token_url: token_endpoint(authority_url)?,
        })
    }
}

impl<C> Authenticator for AadAuthenticator<C>
where
    C: HttpClient,
{
    /// Posts the grant to the token endpoint as an urlencoded form and decodes
    /// the JSON response.
    fn authenticate(&self, req: TokenRequest) -> Result<TokenResponse, AuthenticateError> {
        let form = serde_urlencoded::to_string(&req)
            .map_err(|e| AuthenticateError::SerializeError(e.to_string()))?;

        let http_request = http::Request::builder()
            .uri(self.token_url.as_str())
            .method("POST")
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form.into_bytes())
            .map_err(|e| AuthenticateError::SerializeError(e.to_string()))?;

        let response = self
            .http_client
            .send(http_request)
            .map_err(|e| AuthenticateError::HttpTransportError(e.to_string()))?;

        let body: String = String::from_utf8(response.body().clone()).map_err(|e| {
            AuthenticateError::DeserializeError(format!("invalid utf8 response: {}", e))
        })?;

        if !response.status().is_success() {
            return Err(AuthenticateError::HttpResponseError(
                response.status().as_u16(),
                body,
            ));
        }

        serde_json::from_str(body.as_str())
            .map_err(|e| AuthenticateError::DeserializeError(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
    Password,
    ClientCredentials,
}

/// Form body posted to the token endpoint. Only the fields of the selected
/// grant are serialized.
#[derive(Clone, PartialEq, Serialize)]
pub struct TokenRequest {
    pub client_id: ClientId,
    pub grant_type: GrantType,
    pub scope: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<ClientSecret>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<Password>,
}

impl TokenRequest {
    pub fn client_credentials(
        client_id: ClientId,
        scope: String,
        client_secret: ClientSecret,
    ) -> Self {
        Self {
            client_id,
            grant_type: GrantType::ClientCredentials,
            scope,
            client_secret: Some(client_secret),
            username: None,
            password: None,
        }
    }

    pub fn password_grant(
        client_id: ClientId,
        scope: String,
        username: String,
        password: Password,
    ) -> Self {
        Self {
            client_id,
            grant_type: GrantType::Password,
            scope,
            client_secret: None,
            username: Some(username),
            password: Some(password),
        }
    }
}

// Credentials stay out of log output.
impl fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenRequest")
            .field("client_id", &self.client_id)
            .field("grant_type", &self.grant_type)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: AccessToken,
    /// The lifetime in seconds of the access token.
    pub expires_in: u32,
    pub token_type: String,
}
