use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use posts_server::ServerConfig;

#[derive(Parser)]
#[command(name = "posts-server")]
#[command(about = "Posts over REST, XML, GraphQL and WebSocket push")]
struct Cli {
    #[arg(long, env = "POSTS_REST_ADDR", default_value = "0.0.0.0:8080")]
    rest_addr: SocketAddr,

    #[arg(long, env = "POSTS_SOAP_ADDR", default_value = "0.0.0.0:8081")]
    soap_addr: SocketAddr,

    #[arg(long, env = "POSTS_GRAPHQL_ADDR", default_value = "0.0.0.0:8082")]
    graphql_addr: SocketAddr,

    #[arg(long, env = "POSTS_WS_ADDR", default_value = "0.0.0.0:8083")]
    ws_addr: SocketAddr,

    /// Events buffered per WebSocket subscriber before it is dropped
    #[arg(long, env = "POSTS_WS_BUFFER", default_value = "64")]
    ws_buffer: usize,

    /// Seconds between keepalive pings
    #[arg(long, env = "POSTS_WS_PING_SECS", default_value = "30")]
    ws_ping_secs: u64,

    /// Close silent WebSocket peers after this many seconds (0 disables)
    #[arg(long, env = "POSTS_WS_IDLE_SECS", default_value = "0")]
    ws_idle_secs: u64,
}

impl From<Cli> for ServerConfig {
    fn from(cli: Cli) -> Self {
        Self {
            rest_addr: cli.rest_addr,
            soap_addr: cli.soap_addr,
            graphql_addr: cli.graphql_addr,
            ws_addr: cli.ws_addr,
            ws_outbound_capacity: cli.ws_buffer,
            ws_ping_interval: Duration::from_secs(cli.ws_ping_secs),
            ws_idle_timeout: (cli.ws_idle_secs > 0).then(|| Duration::from_secs(cli.ws_idle_secs)),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    posts_server::init_tracing();
    let config = ServerConfig::from(Cli::parse());
    posts_server::run(config).await
}
