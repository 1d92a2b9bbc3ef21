use std::fmt;
use std::sync::Mutex;

use tracing::debug;

use crate::authenticator::{Authenticator, TokenRequest};
use crate::secret::{ClientSecret, Password};
use crate::token::Token;
use crate::{AccessTokenProvider, ClientId, TokenProviderError};

/// Credentials backing each supported authentication mode.
#[derive(Clone, PartialEq)]
pub enum Credentials {
    /// Resource-owner password grant with a master user account.
    MasterUser { username: String, password: Password },
    /// Client-credentials grant with a service principal.
    ServicePrincipal { client_secret: ClientSecret },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::MasterUser { .. } => write!(f, "MasterUser: redacted"),
            Credentials::ServicePrincipal { .. } => write!(f, "ServicePrincipal: redacted"),
        }
    }
}

/// Produces bearer tokens for the configured authentication mode.
///
/// In the master-user mode a silent-retrieval slot is consulted first and the
/// password grant only runs on a miss or an expired token. The service
/// principal mode exchanges its grant on every call.
pub struct AadTokenProvider<A> {
    client_id: ClientId,
    scope: String,
    credentials: Credentials,
    authenticator: A,
    cached: Mutex<Option<Token>>,
}

impl<A> AadTokenProvider<A> {
    pub fn new(
        client_id: ClientId,
        scope: String,
        credentials: Credentials,
        authenticator: A,
    ) -> Self {
        Self {
            client_id,
            scope,
            credentials,
            authenticator,
            cached: Mutex::new(None),
        }
    }
}

impl<A> AccessTokenProvider for AadTokenProvider<A>
where
    A: Authenticator,
{
    fn access_token(&self) -> Result<Token, TokenProviderError> {
        match &self.credentials {
            Credentials::MasterUser { username, password } => {
                self.master_user_token(username, password)
            }
            Credentials::ServicePrincipal { client_secret } => {
                self.service_principal_token(client_secret)
            }
        }
    }
}

impl<A> AadTokenProvider<A>
where
    A: Authenticator,
{
    fn master_user_token(
        &self,
        username: &str,
        password: &Password,
    ) -> Result<Token, TokenProviderError> {
        let mut cached = self
            .cached
            .lock()
            .map_err(|_| TokenProviderError::PoisonError)?;

        if let Some(token) = cached.as_ref().filter(|token| !token.is_expired()) {
            debug!("serving access token from the silent cache");
            return Ok(token.clone());
        }

        debug!("no usable cached token, falling back to the password grant");
        let request = TokenRequest::password_grant(
            self.client_id.clone(),
            self.scope.clone(),
            username.to_owned(),
            password.clone(),
        );
        let token = Token::try_from(self.authenticator.authenticate(request)?)?;

        *cached = Some(token.clone());

        Ok(token)
    }

    fn service_principal_token(
        &self,
        client_secret: &ClientSecret,
    ) -> Result<Token, TokenProviderError> {
        let request = TokenRequest::client_credentials(
            self.client_id.clone(),
            self.scope.clone(),
            client_secret.clone(),
        );

        Token::try_from(self.authenticator.authenticate(request)?)
    }
}
