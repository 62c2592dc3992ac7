use crate::{api, api::handlers::auth::AuthConfig, cli::actions::Action};
use anyhow::Result;

/// Handle the server action
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            cache_url,
        } => {
            let auth_config = AuthConfig::new();

            api::new(port, dsn, cache_url, auth_config).await?;
        }
    }

    Ok(())
}
