use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};

use crate::TokenProviderError;
use crate::authenticator::TokenResponse;

pub type AccessToken = String;

#[derive(Clone, Debug, PartialEq)]
pub enum TokenType {
    Bearer,
}

/// Bearer access token with an absolute expiry. Never persisted; it only
/// lives for the requests that need it.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    expires_at: DateTime<Utc>,
    access_token: AccessToken,
    token_type: TokenType,
}

impl TryFrom<&str> for TokenType {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "Bearer" | "bearer" => Ok(TokenType::Bearer),
            _ => Err(format!("Invalid token type: {value}")),
        }
    }
}

impl Token {
    pub fn new(
        access_token: AccessToken,
        token_type: TokenType,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Token {
            access_token,
            token_type,
            expires_at,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.lt(&Utc::now())
    }

    pub fn access_token(&self) -> &AccessToken {
        &self.access_token
    }

    pub fn token_type(&self) -> &TokenType {
        &self.token_type
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::Bearer => write!(f, "Bearer"),
        }
    }
}

impl TryFrom<TokenResponse> for Token {
    type Error = TokenProviderError;

    fn try_from(response: TokenResponse) -> Result<Self, Self::Error> {
        let token_type = TokenType::try_from(response.token_type.as_str())
            .map_err(TokenProviderError::TokenError)?;

        // `expires_in` is a lifetime in seconds relative to now.
        let expires_at = Utc::now() + TimeDelta::seconds(i64::from(response.expires_in));

        Ok(Token::new(response.access_token, token_type, expires_at))
    }
}
