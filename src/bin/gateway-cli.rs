use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the service gateway admin API", long_about = None)]
struct Cli {
    #[arg(short, long, env = "GATEWAY_ADMIN_URL", default_value = "http://127.0.0.1:3100")]
    url: String,

    #[arg(short, long, env = "ADMIN_API_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway status
    Status,
    /// List services and instance health
    Services,
    /// List circuit breaker states
    Breakers,
    /// Close a circuit breaker
    Reset { service: String, url: String },
    /// Register a new instance for a service
    AddInstance { service: String, url: String },
    /// Mark an instance healthy
    Enable { service: String, url: String },
    /// Mark an instance unhealthy
    Disable { service: String, url: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let request = match cli.command {
        Commands::Status => client.get(format!("{}/admin/status", base)),
        Commands::Services => client.get(format!("{}/admin/services", base)),
        Commands::Breakers => client.get(format!("{}/admin/breakers", base)),
        Commands::Reset { service, url } => client
            .post(format!("{}/admin/breakers/reset", base))
            .json(&json!({ "service": service, "url": url })),
        Commands::AddInstance { service, url } => client
            .post(format!("{}/admin/instances", base))
            .json(&json!({ "service": service, "url": url })),
        Commands::Enable { service, url } => client
            .post(format!("{}/admin/instances/health", base))
            .json(&json!({ "service": service, "url": url, "healthy": true })),
        Commands::Disable { service, url } => client
            .post(format!("{}/admin/instances/health", base))
            .json(&json!({ "service": service, "url": url, "healthy": false })),
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
