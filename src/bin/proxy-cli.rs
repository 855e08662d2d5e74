use std::path::PathBuf;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method};
use clap::{Parser, Subcommand};
use serde_json::Value;

use allowlist_proxy::config::{load_config, load_from_env, ProxyConfig};
use allowlist_proxy::routing::{resolve, Allowlist};
use allowlist_proxy::security::HeaderPolicy;

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Operator CLI for the allowlist proxy", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query a running proxy's health endpoint
    Health {
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,

        /// Shared secret sent in the auth header
        #[arg(short, long, env = "PROXY_API_KEY")]
        key: Option<String>,

        #[arg(long, default_value = "X-API-Key")]
        header: String,
    },
    /// Show the upstream URL and headers a request would be forwarded with
    Resolve {
        /// Inbound path, e.g. /proxy/clob.polymarket.com/markets?limit=5
        path: String,

        #[arg(short, long, default_value = "GET")]
        method: String,

        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Inbound header as `name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
    /// Load and validate a config file
    CheckConfig { path: PathBuf },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Health { url, key, header } => {
            let client = reqwest::Client::new();
            let mut request = client.get(format!("{}/health", url.trim_end_matches('/')));
            if let Some(key) = key {
                request = request.header(header, key);
            }
            print_response(request.send().await?).await?;
        }
        Commands::Resolve {
            path,
            method,
            config,
            headers,
        } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => load_from_env()?,
            };
            explain(&config, &path, &method, &headers)?;
        }
        Commands::CheckConfig { path } => match load_config(&path) {
            Ok(mut config) => {
                if !config.auth.api_key.is_empty() {
                    config.auth.api_key = "<redacted>".to_string();
                }
                println!("OK: {}", path.display());
                println!("{}", toml::to_string_pretty(&config)?);
            }
            Err(e) => {
                eprintln!("Invalid config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}

fn explain(
    config: &ProxyConfig,
    raw: &str,
    method: &str,
    raw_headers: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())?;
    let (path, query) = match raw.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (raw, None),
    };

    let mut inbound = HeaderMap::new();
    for raw_header in raw_headers {
        let (name, value) = raw_header
            .split_once(':')
            .ok_or_else(|| format!("header {raw_header:?} is not `name: value`"))?;
        inbound.append(
            HeaderName::from_bytes(name.trim().as_bytes())?,
            HeaderValue::from_str(value.trim())?,
        );
    }

    let allowlist = Allowlist::new(config.upstream.allowed_hosts.iter().cloned());
    let target = match resolve(path, query, &allowlist) {
        Ok(target) => target,
        Err(e) => {
            eprintln!("Rejected ({}): {}", e.status(), e);
            std::process::exit(1);
        }
    };

    let policy = HeaderPolicy::from_config(config)?;
    let outbound = policy.outbound_headers(&inbound, &target, &method)?;

    println!("{} {}", method, target.url()?);
    println!("copy policy: {}", policy.copy_policy_name());
    for (name, value) in &outbound {
        println!("  {}: {}", name, value.to_str().unwrap_or("<binary>"));
    }
    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: proxy returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
