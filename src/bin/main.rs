use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pbi_embed_api::authenticator::AadAuthenticator;
use pbi_embed_api::embed::EmbedTokenService;
use pbi_embed_api::http::client::HttpClient;
use pbi_embed_api::http::config::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_TIMEOUT, HttpConfig, ProxyConfig,
};
use pbi_embed_api::powerbi::client::HttpPbiClient;
use pbi_embed_api::server::{self, AppState};
use pbi_embed_api::settings::Settings;
use pbi_embed_api::token_provider::AadTokenProvider;

fn main() -> Result<(), Box<dyn Error>> {
    let settings = Settings::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let auth = settings.auth_settings()?;

    let proxy = ProxyConfig::default().try_with_url_from_env()?;
    let http_config = HttpConfig::new(DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT, proxy);
    let http_client =
        HttpClient::new(&http_config).map_err(|e| format!("error creating http client: {}", e))?;

    let authenticator = AadAuthenticator::new(http_client.clone(), &auth.authority_url)?;
    let token_provider = AadTokenProvider::new(
        settings.client_id.clone(),
        settings.scope_base.clone(),
        auth.credentials,
        authenticator,
    );
    let pbi_client = HttpPbiClient::new(
        http_client,
        token_provider,
        settings.power_bi_api_url.clone(),
    );

    let state = Arc::new(AppState {
        service: EmbedTokenService::new(pbi_client),
        workspace_id: settings.workspace_id,
        report_id: settings.report_id,
    });

    info!(
        address = %settings.bind_address,
        mode = ?settings.authentication_mode,
        "starting the embed backend"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(server::serve(settings.bind_address, state))?;

    Ok(())
}
