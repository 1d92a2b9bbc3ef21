use error::PbiClientError;
use models::{EmbedToken, GenerateTokenRequest, GenerateTokenRequestV2, Report};
use uuid::Uuid;

pub mod client;
pub mod error;
pub mod models;

/// Authenticated surface of the Power BI REST API used by the embed flow.
pub trait PbiClient {
    /// Fetches the metadata of a report inside a workspace.
    fn report_in_group(&self, workspace_id: Uuid, report_id: Uuid)
    -> Result<Report, PbiClientError>;

    /// Generates an embed token covering the reports, datasets and target
    /// workspaces named by the request.
    fn generate_token(&self, request: &GenerateTokenRequestV2)
    -> Result<EmbedToken, PbiClientError>;

    /// Generates an access-level embed token scoped to a single report;
    /// the shape paginated reports require.
    fn generate_token_in_group(
        &self,
        workspace_id: Uuid,
        report_id: Uuid,
        request: &GenerateTokenRequest,
    ) -> Result<EmbedToken, PbiClientError>;
}

#[cfg(test)]
pub(crate) mod tests {
    use mockall::mock;

    use super::*;

    mock! {
        pub PbiClient {}

        impl PbiClient for PbiClient {
            fn report_in_group(
                &self,
                workspace_id: Uuid,
                report_id: Uuid,
            ) -> Result<Report, PbiClientError>;

            fn generate_token(
                &self,
                request: &GenerateTokenRequestV2,
            ) -> Result<EmbedToken, PbiClientError>;

            fn generate_token_in_group(
                &self,
                workspace_id: Uuid,
                report_id: Uuid,
                request: &GenerateTokenRequest,
            ) -> Result<EmbedToken, PbiClientError>;
        }
    }
}
