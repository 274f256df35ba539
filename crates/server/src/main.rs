//! opengin-x web server binary.

use core_types::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("server=info".parse()?)
                .add_directive("api_client=info".parse()?),
        )
        .init();

    let config = Config::load()?;
    server::serve(config).await
}
