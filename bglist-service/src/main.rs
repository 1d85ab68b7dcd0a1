use bglist_service::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    init_tracing(&config)?;

    let state = AppState::from_config(config).await?;

    Server::new(state).serve().await
}
