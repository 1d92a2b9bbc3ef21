use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Report metadata as returned by
/// `GET /v1.0/myorg/groups/{workspace}/reports/{report}`.
///
/// Paginated (RDL) reports carry no dataset id; the embed flow branches on
/// that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: Uuid,
    pub name: String,
    pub embed_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_id: Option<String>,
}

/// Embed token issued by the Power BI API. The shape is owned by that API and
/// passed through to the caller untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbedToken {
    pub token: String,
    pub token_id: Uuid,
    pub expiration: DateTime<Utc>,
}

/// Body of `POST /v1.0/myorg/GenerateToken`, the request shape for
/// dataset-backed reports in V2 workspaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTokenRequestV2 {
    pub reports: Vec<TokenRequestReport>,
    pub datasets: Vec<TokenRequestDataset>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_workspaces: Option<Vec<TokenRequestTargetWorkspace>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRequestReport {
    pub id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRequestDataset {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRequestTargetWorkspace {
    pub id: Uuid,
}

/// Body of `POST .../reports/{report}/GenerateToken` for paginated reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTokenRequest {
    pub access_level: AccessLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    #[default]
    View,
}

impl Default for GenerateTokenRequest {
    fn default() -> Self {
        Self {
            access_level: AccessLevel::View,
        }
    }
}
