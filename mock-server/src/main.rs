use clap::Parser;
use tokio::net::TcpListener;

/// Django-style JSON API with CSRF enforcement, for exercising the client.
#[derive(Debug, Parser)]
#[command(name = "mock-server")]
struct Config {
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    host: String,

    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,

    /// Token handed out by `GET /api/csrf` and required on unsafe requests.
    #[arg(long, env = "CSRF_TOKEN", default_value = mock_server::DEFAULT_CSRF_TOKEN)]
    csrf_token: String,
}

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    mock_server::init_tracing();
    let config = Config::parse();
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    mock_server::run(listener, config.csrf_token).await
}
