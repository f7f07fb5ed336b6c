use tracing::warn;
use tracing_subscriber::EnvFilter;

use bookstore_backend::server::{self, ServerConfig};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(err) = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!("tracing subscriber already initialised: {err}");
    }

    let config = ServerConfig::from_env()?;
    server::run(config).await
}
