use std::net::SocketAddr;

use clap::error::ErrorKind;
use clap::{Error, Parser, ValueEnum};
use url::Url;
use uuid::Uuid;

use crate::authenticator::tenant_authority;
use crate::secret::{ClientSecret, Password};
use crate::token_provider::Credentials;

pub const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com/organizations";
pub const DEFAULT_SCOPE: &str = "https://analysis.windows.net/powerbi/api/.default";
pub const DEFAULT_POWER_BI_API_URL: &str = "https://api.powerbi.com";

/// Startup configuration of the embed backend, read once from flags or the
/// environment and immutable for the process lifetime.
#[derive(Parser, Debug)]
#[command(
    name = "pbi-embed-server",
    about = "Backend returning Power BI embed tokens and report metadata"
)]
pub struct Settings {
    /// How the backend authenticates against Azure AD.
    #[arg(
        long,
        env = "AUTHENTICATION_MODE",
        value_enum,
        default_value = "serviceprincipal"
    )]
    pub authentication_mode: AuthenticationMode,

    /// Azure AD application (client) id.
    #[arg(long, env = "CLIENT_ID")]
    pub client_id: String,

    /// Directory (tenant) id; required with the serviceprincipal mode.
    #[arg(long, env = "TENANT_ID")]
    pub tenant_id: Option<String>,

    /// Client secret; required with the serviceprincipal mode.
    #[arg(long, env = "CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<ClientSecret>,

    /// Master user account; required with the masteruser mode.
    #[arg(long, env = "PBI_USERNAME")]
    pub username: Option<String>,

    /// Master user password; required with the masteruser mode.
    #[arg(long, env = "PBI_PASSWORD", hide_env_values = true)]
    pub password: Option<Password>,

    /// Azure AD authority URL.
    #[arg(long, env = "AUTHORITY_URL", default_value = DEFAULT_AUTHORITY_URL)]
    pub authority_url: String,

    /// OAuth2 scope requested for the Power BI API.
    #[arg(long, env = "SCOPE_BASE", default_value = DEFAULT_SCOPE)]
    pub scope_base: String,

    /// Base URL of the Power BI REST API.
    #[arg(long, env = "POWER_BI_API_URL", default_value = DEFAULT_POWER_BI_API_URL)]
    pub power_bi_api_url: Url,

    /// Workspace holding the report to embed.
    #[arg(long, env = "WORKSPACE_ID")]
    pub workspace_id: Uuid,

    /// Report to embed.
    #[arg(long, env = "REPORT_ID")]
    pub report_id: Uuid,

    /// Address the HTTP endpoint binds to.
    #[arg(long, env = "BIND_ADDRESS", default_value = "127.0.0.1:5300")]
    pub bind_address: SocketAddr,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum AuthenticationMode {
    /// Resource-owner password grant with a master user account.
    #[value(name = "masteruser")]
    MasterUser,
    /// Client-credentials grant with a service principal; the mode Microsoft
    /// recommends for app-owns-data embedding.
    #[value(name = "serviceprincipal")]
    ServicePrincipal,
}

/// Authentication inputs resolved from the raw settings: the credentials of
/// the selected mode plus the authority to exchange grants against.
#[derive(Debug)]
pub struct AuthSettings {
    pub credentials: Credentials,
    pub authority_url: String,
}

impl Settings {
    /// Validates the mode/credential pairing and resolves the effective
    /// authority. App-only authentication needs the tenant-specific authority,
    /// so the generic multi-tenant segment is replaced with the tenant id.
    pub fn auth_settings(&self) -> Result<AuthSettings, Error> {
        match self.authentication_mode {
            AuthenticationMode::MasterUser => {
                let username = self.username.clone().ok_or_else(|| {
                    missing("--username is required with --authentication-mode masteruser")
                })?;
                let password = self.password.clone().ok_or_else(|| {
                    missing("--password is required with --authentication-mode masteruser")
                })?;

                Ok(AuthSettings {
                    credentials: Credentials::MasterUser { username, password },
                    authority_url: self.authority_url.clone(),
                })
            }
            AuthenticationMode::ServicePrincipal => {
                let client_secret = self.client_secret.clone().ok_or_else(|| {
                    missing("--client-secret is required with --authentication-mode serviceprincipal")
                })?;
                let tenant_id = self.tenant_id.clone().ok_or_else(|| {
                    missing("--tenant-id is required with --authentication-mode serviceprincipal")
                })?;

                Ok(AuthSettings {
                    credentials: Credentials::ServicePrincipal { client_secret },
                    authority_url: tenant_authority(&self.authority_url, &tenant_id),
                })
            }
        }
    }
}

fn missing(message: &str) -> Error {
    Error::raw(ErrorKind::MissingRequiredArgument, message)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use clap::Parser;
    use rstest::rstest;

    use crate::token_provider::Credentials;

    use super::{AuthenticationMode, Settings};

    const WORKSPACE_ID: &str = "c27e4d53-6c74-4d51-9d8c-1b3e0254e154";
    const REPORT_ID: &str = "5b218778-e7a5-4d73-8187-f10824047715";

    fn parse(extra: &[&str]) -> Result<Settings, clap::Error> {
        let mut args = vec![
            "pbi-embed-server",
            "--client-id",
            "a-client",
            "--workspace-id",
            WORKSPACE_ID,
            "--report-id",
            REPORT_ID,
        ];
        args.extend_from_slice(extra);
        Settings::try_parse_from(args)
    }

    #[test]
    fn service_principal_settings_resolve_a_tenant_specific_authority() {
        let settings = parse(&[
            "--authentication-mode",
            "serviceprincipal",
            "--tenant-id",
            "a-tenant",
            "--client-secret",
            "a-secret",
        ])
        .unwrap();

        let auth = settings.auth_settings().unwrap();

        assert_eq!(
            auth.authority_url,
            "https://login.microsoftonline.com/a-tenant"
        );
        assert_matches!(auth.credentials, Credentials::ServicePrincipal { .. });
    }

    #[test]
    fn master_user_settings_keep_the_configured_authority() {
        let settings = parse(&[
            "--authentication-mode",
            "masteruser",
            "--username",
            "user@contoso.com",
            "--password",
            "hunter2",
        ])
        .unwrap();

        let auth = settings.auth_settings().unwrap();

        assert_eq!(
            auth.authority_url,
            "https://login.microsoftonline.com/organizations"
        );
        assert_matches!(auth.credentials, Credentials::MasterUser { username, .. } => {
            assert_eq!(username, "user@contoso.com")
        });
    }

    #[rstest]
    #[case::missing_secret(&["--authentication-mode", "serviceprincipal", "--tenant-id", "t"])]
    #[case::missing_tenant(&["--authentication-mode", "serviceprincipal", "--client-secret", "s"])]
    #[case::missing_username(&["--authentication-mode", "masteruser", "--password", "p"])]
    #[case::missing_password(&["--authentication-mode", "masteruser", "--username", "u"])]
    fn incomplete_credentials_are_a_configuration_error(#[case] extra: &[&str]) {
        let settings = parse(extra).unwrap();

        assert!(settings.auth_settings().is_err());
    }

    #[test]
    fn unknown_authentication_mode_is_rejected_at_parse_time() {
        let result = parse(&["--authentication-mode", "managedidentity"]);

        assert!(result.is_err());
    }

    #[test]
    fn workspace_and_report_ids_must_be_guids() {
        let result = Settings::try_parse_from([
            "pbi-embed-server",
            "--client-id",
            "a-client",
            "--workspace-id",
            "not-a-guid",
            "--report-id",
            REPORT_ID,
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn defaults_point_at_the_public_cloud() {
        let settings = parse(&[]).unwrap();

        assert_eq!(settings.authentication_mode, AuthenticationMode::ServicePrincipal);
        assert_eq!(
            settings.authority_url,
            "https://login.microsoftonline.com/organizations"
        );
        assert_eq!(
            settings.scope_base,
            "https://analysis.windows.net/powerbi/api/.default"
        );
        assert_eq!(settings.power_bi_api_url.as_str(), "https://api.powerbi.com/");
    }

    #[test]
    fn settings_debug_does_not_reveal_secrets() {
        let settings = parse(&[
            "--client-secret",
            "a-secret",
            "--password",
            "hunter2",
        ])
        .unwrap();

        let debug = format!("{:?}", settings);

        assert!(!debug.contains("a-secret"));
        assert!(!debug.contains("hunter2"));
    }
}
