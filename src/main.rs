use tunelink::configs::Config;
use tunelink::resolver::Resolver;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    let default_filter = config
        .logging
        .as_ref()
        .and_then(|logging| logging.filters.clone().or_else(|| logging.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let url = std::env::args()
        .nth(1)
        .ok_or("usage: tunelink <url>")?;

    let resolver = Resolver::new(&config)?;
    let resolved = resolver.resolve(&url).await?;

    println!("{}", serde_json::to_string_pretty(&resolved)?);

    Ok(())
}
