//! Social Login Example Server
//!
//! Serves the account pages, the OIDC callbacks and `/health`.
//!
//! ## Configuration
//!
//! Loaded by `sl_config::ConfigLoader` from `SOCIAL_LOGIN_CONFIG`,
//! `config.toml`, `social-login.toml`, `./config/config.toml` or
//! `/etc/social-login/config.toml`, then overridden by `SOCIAL_LOGIN_*`
//! environment variables.
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `SOCIAL_LOGIN_OIDC_AUTHORITY` | Authorization server URL |
//! | `SOCIAL_LOGIN_OIDC_CLIENT_ID` / `_CLIENT_SECRET` | OIDC client credentials |
//! | `SOCIAL_LOGIN_DIRECTORY_ORG_URL` | Identity-management org URL |
//! | `SOCIAL_LOGIN_DIRECTORY_API_TOKEN` | Identity-management API token |
//! | `SOCIAL_LOGIN_SESSION_SECRET` | Cookie key secret (32+ characters) |
//! | `LOG_FORMAT` | `json` or text (default) |
//! | `RUST_LOG` | Log filter (default `info`) |
//!
//! Run with `--example-config` to print a documented configuration file.

use anyhow::{Context, Result};
use axum::extract::Request;
use tokio::net::TcpListener;
use tracing::{info, warn};

use sl_common::{logging::init_logging, shutdown_signal};
use sl_config::{AppConfig, ConfigLoader};
use sl_platform::{build_router, canonical_routing, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    if std::env::args().any(|arg| arg == "--example-config") {
        print!("{}", AppConfig::example_toml());
        return Ok(());
    }

    init_logging("sl-server");

    let config = ConfigLoader::new()
        .load()
        .context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    if !config.session.secure {
        warn!("Session cookies are not marked Secure");
    }

    info!(
        authority = %config.oidc.authority,
        directory = %config.directory.org_url,
        providers = config.social_providers.len(),
        "Starting Social Login server"
    );

    let state = AppState::from_config(&config).context("Failed to initialize application state")?;
    let app = canonical_routing(build_router(state));

    let addr = format!("{}:{}", config.http.host, config.http.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!(addr = %addr, "Listening");

    axum::serve(
        listener,
        axum::ServiceExt::<Request>::into_make_service(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Social Login server shutdown complete");
    Ok(())
}
