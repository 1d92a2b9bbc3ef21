use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::{HeaderValue, Method, Request, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;
use uuid::Uuid;

use crate::AccessTokenProvider;
use crate::http_client::HttpClient;
use crate::token::Token;

use super::PbiClient;
use super::error::PbiClientError;
use super::models::{EmbedToken, GenerateTokenRequest, GenerateTokenRequestV2, Report};

/// Implementation of the PbiClient trait for a generic HTTP client.
///
/// A bearer token is obtained from the access-token provider for every call,
/// so a failed authentication short-circuits before any API traffic.
pub struct HttpPbiClient<C, A>
where
    C: HttpClient,
    A: AccessTokenProvider,
{
    http_client: C,
    token_provider: A,
    api_url: Url,
}

impl<C, A> HttpPbiClient<C, A>
where
    C: HttpClient,
    A: AccessTokenProvider,
{
    pub fn new(http_client: C, token_provider: A, api_url: Url) -> Self {
        Self {
            http_client,
            token_provider,
            api_url,
        }
    }

    fn build_request(
        method: Method,
        url: &Url,
        token: &Token,
        body: Vec<u8>,
    ) -> Result<Request<Vec<u8>>, PbiClientError> {
        let mut bearer_token_header =
            HeaderValue::from_str(&format!("Bearer {}", token.access_token())).map_err(|_| {
                PbiClientError::Transport(
                    "invalid HTTP header value set for Authorization".to_string(),
                )
            })?;
        bearer_token_header.set_sensitive(true);

        Request::builder()
            .uri(url.as_str())
            .method(method)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, bearer_token_header)
            .body(body)
            .map_err(|e| PbiClientError::Encoder(format!("Failed to build request: {e}")))
    }

    fn endpoint(&self, path: &str) -> Result<Url, PbiClientError> {
        self.api_url
            .join(path)
            .map_err(|e| PbiClientError::Encoder(format!("invalid API path `{path}`: {e}")))
    }

    fn call<T>(&self, method: Method, path: &str, body: Vec<u8>) -> Result<T, PbiClientError>
    where
        T: DeserializeOwned,
    {
        let token = self.token_provider.access_token()?;
        let url = self.endpoint(path)?;
        let request = Self::build_request(method, &url, &token, body)?;

        let response = self
            .http_client
            .send(request)
            .map_err(|e| PbiClientError::Transport(format!("Failed to send HTTP request: {e}")))?;
        let body = response.body();

        match response.status() {
            StatusCode::OK => serde_json::from_slice(body)
                .map_err(|e| PbiClientError::Decoder(format!("Failed to decode JSON: {e}"))),
            status => Err(PbiClientError::Api(
                status.as_u16(),
                String::from_utf8_lossy(body).to_string(),
            )),
        }
    }

    fn encode<B: Serialize>(body: &B) -> Result<Vec<u8>, PbiClientError> {
        serde_json::to_vec(body)
            .map_err(|e| PbiClientError::Encoder(format!("Failed to encode JSON: {e}")))
    }
}

impl<C, A> PbiClient for HttpPbiClient<C, A>
where
    C: HttpClient,
    A: AccessTokenProvider,
{
    fn report_in_group(
        &self,
        workspace_id: Uuid,
        report_id: Uuid,
    ) -> Result<Report, PbiClientError> {
        self.call(
            Method::GET,
            &format!("v1.0/myorg/groups/{workspace_id}/reports/{report_id}"),
            Vec::new(),
        )
    }

    fn generate_token(
        &self,
        request: &GenerateTokenRequestV2,
    ) -> Result<EmbedToken, PbiClientError> {
        self.call(
            Method::POST,
            "v1.0/myorg/GenerateToken",
            Self::encode(request)?,
        )
    }

    fn generate_token_in_group(
        &self,
        workspace_id: Uuid,
        report_id: Uuid,
        request: &GenerateTokenRequest,
    ) -> Result<EmbedToken, PbiClientError> {
        self.call(
            Method::POST,
            &format!("v1.0/myorg/groups/{workspace_id}/reports/{report_id}/GenerateToken"),
            Self::encode(request)?,
        )
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::Utc;
    use http::Response;
    use serde_json::json;

    use crate::TokenProviderError;
    use crate::http_client::tests::MockHttpClient;
    use crate::powerbi::models::TokenRequestReport;
    use crate::token::{AccessToken, TokenType};
    use crate::token_provider::test::{MockAccessTokenProvider, fake_token};

    use super::*;

    fn api_url() -> Url {
        Url::parse("https://api.powerbi.com").unwrap()
    }

    fn provider_returning_token() -> MockAccessTokenProvider {
        let mut provider = MockAccessTokenProvider::new();
        provider.expect_access_token().returning(|| Ok(fake_token()));
        provider
    }

    #[test]
    fn build_request() {
        let url = Url::parse("https://api.powerbi.com/v1.0/myorg/GenerateToken").unwrap();
        let token = Token::new(
            AccessToken::from("test_token"),
            TokenType::Bearer,
            Utc::now(),
        );

        let request = HttpPbiClient::<MockHttpClient, MockAccessTokenProvider>::build_request(
            Method::POST,
            &url,
            &token,
            b"{}".to_vec(),
        )
        .unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.uri(), url.as_str());
        assert_eq!(
            request.headers().get(CONTENT_TYPE).unwrap(),
            &HeaderValue::from_static("application/json")
        );
        assert_eq!(
            request.headers().get(AUTHORIZATION).unwrap(),
            &HeaderValue::from_str(&format!("Bearer {}", token.access_token())).unwrap()
        );
        assert!(request.headers().get(AUTHORIZATION).unwrap().is_sensitive());
    }

    #[test]
    fn report_in_group_decodes_the_report() {
        let workspace_id = Uuid::new_v4();
        let report_id = Uuid::new_v4();

        let mut http_client = MockHttpClient::new();
        http_client.expect_send().once().returning(move |req| {
            assert_eq!(req.method(), Method::GET);
            assert!(
                req.uri()
                    .to_string()
                    .ends_with(&format!("groups/{workspace_id}/reports/{report_id}"))
            );
            let body = serde_json::to_vec(&json!({
                "id": report_id,
                "name": "Sales",
                "embedUrl": "https://app.powerbi.com/reportEmbed?r=1",
                "datasetId": "cfafbeb1-8037-4d0c-896e-a46fb27ff229",
            }))
            .unwrap();
            Ok(Response::builder().status(200).body(body).unwrap())
        });

        let client = HttpPbiClient::new(http_client, provider_returning_token(), api_url());

        let report = client.report_in_group(workspace_id, report_id).unwrap();

        assert_eq!(report.id, report_id);
        assert_eq!(report.name, "Sales");
        assert_eq!(
            report.dataset_id.as_deref(),
            Some("cfafbeb1-8037-4d0c-896e-a46fb27ff229")
        );
    }

    #[test]
    fn report_in_group_propagates_api_errors() {
        let mut http_client = MockHttpClient::new();
        http_client.expect_send().once().returning(|_| {
            Ok(Response::builder()
                .status(404)
                .body(b"report not found".to_vec())
                .unwrap())
        });

        let client = HttpPbiClient::new(http_client, provider_returning_token(), api_url());

        let error = client
            .report_in_group(Uuid::new_v4(), Uuid::new_v4())
            .unwrap_err();

        assert_matches!(error, PbiClientError::Api(404, reason) => {
            assert_eq!(reason, "report not found")
        });
    }

    #[test]
    // Authentication precedes data access: when the token provider fails, the
    // Power BI API is never reached.
    fn failed_authentication_skips_the_api_call() {
        let mut http_client = MockHttpClient::new();
        http_client.expect_send().times(0);

        let mut token_provider = MockAccessTokenProvider::new();
        token_provider
            .expect_access_token()
            .once()
            .returning(|| Err(TokenProviderError::PoisonError));

        let client = HttpPbiClient::new(http_client, token_provider, api_url());

        let error = client
            .report_in_group(Uuid::new_v4(), Uuid::new_v4())
            .unwrap_err();

        assert_matches!(error, PbiClientError::TokenProvider(_));
    }

    #[test]
    fn generate_token_posts_the_request_body() {
        let report_id = Uuid::new_v4();

        let token_request = GenerateTokenRequestV2 {
            reports: vec![TokenRequestReport { id: report_id }],
            datasets: vec![],
            target_workspaces: None,
        };
        let expected_body = serde_json::to_vec(&token_request).unwrap();

        let mut http_client = MockHttpClient::new();
        http_client.expect_send().once().returning(move |req| {
            assert_eq!(req.method(), Method::POST);
            assert!(req.uri().to_string().ends_with("v1.0/myorg/GenerateToken"));
            assert_eq!(req.body(), &expected_body);
            let body = serde_json::to_vec(&json!({
                "token": "embed-token",
                "tokenId": Uuid::new_v4(),
                "expiration": "2026-01-01T00:00:00Z",
            }))
            .unwrap();
            Ok(Response::builder().status(200).body(body).unwrap())
        });

        let client = HttpPbiClient::new(http_client, provider_returning_token(), api_url());

        let embed_token = client.generate_token(&token_request).unwrap();

        assert_eq!(embed_token.token, "embed-token");
    }
}
