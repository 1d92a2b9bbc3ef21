use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::powerbi::PbiClient;
use crate::powerbi::error::PbiClientError;
use crate::powerbi::models::{
    EmbedToken, GenerateTokenRequest, GenerateTokenRequestV2, Report, TokenRequestDataset,
    TokenRequestReport, TokenRequestTargetWorkspace,
};

/// Type discriminator the front-end embedding SDK expects for reports.
const EMBED_TYPE_REPORT: &str = "Report";

#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("requesting the Power BI API: `{0}`")]
    Client(#[from] PbiClientError),
    #[error("report `{report_id}` has no dataset and cannot be part of a batched embed token")]
    MissingDatasetId { report_id: Uuid },
    #[error("report `{report_id}` has an invalid dataset id `{dataset_id}`: `{reason}`")]
    InvalidDatasetId {
        report_id: Uuid,
        dataset_id: String,
        reason: String,
    },
}

/// Metadata of one embedded report, serialized for the front-end client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmbedReport {
    pub report_id: Uuid,
    pub report_name: String,
    pub embed_url: String,
}

impl From<&Report> for EmbedReport {
    fn from(report: &Report) -> Self {
        Self {
            report_id: report.id,
            report_name: report.name.clone(),
            embed_url: report.embed_url.clone(),
        }
    }
}

/// Everything the front-end needs to render a report: metadata plus the embed
/// token. Only built once both have been obtained, so a failed request can
/// never surface partial data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmbedParams {
    pub embed_report: Vec<EmbedReport>,
    pub r#type: String,
    pub embed_token: EmbedToken,
}

impl EmbedParams {
    pub fn new(embed_report: Vec<EmbedReport>, embed_token: EmbedToken) -> Self {
        Self {
            embed_report,
            r#type: EMBED_TYPE_REPORT.to_string(),
            embed_token,
        }
    }
}

/// Resolves the embed parameters for reports by combining report metadata
/// lookups with embed-token generation.
pub struct EmbedTokenService<P> {
    client: P,
}

impl<P> EmbedTokenService<P>
where
    P: PbiClient,
{
    pub fn new(client: P) -> Self {
        Self { client }
    }

    /// Resolves the embed parameters for a single report.
    ///
    /// Dataset-backed reports get a token covering the report, its dataset,
    /// the optional additional dataset and the workspace. Reports without a
    /// dataset are paginated reports and get a view-level token scoped to the
    /// report alone.
    pub fn embed_params(
        &self,
        workspace_id: Uuid,
        report_id: Uuid,
        additional_dataset_id: Option<Uuid>,
    ) -> Result<EmbedParams, EmbedError> {
        let report = self.client.report_in_group(workspace_id, report_id)?;

        let embed_token = match report.dataset_id.as_deref().filter(|id| !id.is_empty()) {
            None => {
                debug!(%report_id, "report has no dataset, requesting a paginated-report token");
                self.client.generate_token_in_group(
                    workspace_id,
                    report_id,
                    &GenerateTokenRequest::default(),
                )?
            }
            Some(dataset_id) => {
                let mut dataset_ids = vec![parse_dataset_id(report.id, dataset_id)?];
                if let Some(extra) = additional_dataset_id.filter(|id| !id.is_nil()) {
                    dataset_ids.push(extra);
                }
                self.embed_token(&[report_id], &dataset_ids, &[workspace_id])?
            }
        };

        Ok(EmbedParams::new(
            vec![EmbedReport::from(&report)],
            embed_token,
        ))
    }

    /// Resolves the embed parameters for several reports of one workspace with
    /// a single batched token request covering all of them.
    ///
    /// Every report must be dataset-backed here; paginated reports cannot be
    /// mixed into a batched token.
    pub fn embed_params_for_reports(
        &self,
        workspace_id: Uuid,
        report_ids: &[Uuid],
        additional_dataset_ids: &[Uuid],
    ) -> Result<EmbedParams, EmbedError> {
        let mut embed_reports = Vec::with_capacity(report_ids.len());
        let mut dataset_ids = Vec::with_capacity(report_ids.len() + additional_dataset_ids.len());

        for &report_id in report_ids {
            let report = self.client.report_in_group(workspace_id, report_id)?;

            let dataset_id = report
                .dataset_id
                .as_deref()
                .filter(|id| !id.is_empty())
                .ok_or(EmbedError::MissingDatasetId { report_id })?;
            dataset_ids.push(parse_dataset_id(report.id, dataset_id)?);

            embed_reports.push(EmbedReport::from(&report));
        }

        dataset_ids.extend_from_slice(additional_dataset_ids);

        let embed_token = self.embed_token(report_ids, &dataset_ids, &[workspace_id])?;

        Ok(EmbedParams::new(embed_reports, embed_token))
    }

    /// Requests one embed token covering the given reports, datasets and
    /// target workspaces. Single-report call sites wrap their arguments in
    /// one-element slices.
    fn embed_token(
        &self,
        report_ids: &[Uuid],
        dataset_ids: &[Uuid],
        target_workspace_ids: &[Uuid],
    ) -> Result<EmbedToken, EmbedError> {
        let request = GenerateTokenRequestV2 {
            reports: report_ids
                .iter()
                .map(|&id| TokenRequestReport { id })
                .collect(),
            datasets: dataset_ids
                .iter()
                .map(|id| TokenRequestDataset { id: id.to_string() })
                .collect(),
            target_workspaces: (!target_workspace_ids.is_empty()).then(|| {
                target_workspace_ids
                    .iter()
                    .map(|&id| TokenRequestTargetWorkspace { id })
                    .collect()
            }),
        };

        Ok(self.client.generate_token(&request)?)
    }
}

fn parse_dataset_id(report_id: Uuid, dataset_id: &str) -> Result<Uuid, EmbedError> {
    Uuid::parse_str(dataset_id).map_err(|e| EmbedError::InvalidDatasetId {
        report_id,
        dataset_id: dataset_id.to_string(),
        reason: e.to_string(),
    })
}
