use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Management CLI for the Safe relay gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    /// Admin API key, required for circuit commands.
    #[arg(short, long, env = "GATEWAY_ADMIN_KEY")]
    key: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the remaining relays for a Safe
    Remaining {
        #[arg(long)]
        chain_id: String,
        #[arg(long)]
        address: String,
    },
    /// List every registered circuit
    Circuits,
    /// Show one circuit
    Circuit { name: String },
    /// Reset one circuit, or all of them when no name is given
    Reset { name: Option<String> },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Remaining { chain_id, address } => {
            let res = client
                .get(format!("{base}/v1/chains/{chain_id}/relay/{address}"))
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Circuits => {
            let headers = admin_headers(cli.key.as_deref())?;
            let res = client
                .get(format!("{base}/admin/circuits"))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Circuit { name } => {
            let headers = admin_headers(cli.key.as_deref())?;
            let res = client
                .get(format!("{base}/admin/circuits/{name}"))
                .headers(headers)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Reset { name } => {
            let headers = admin_headers(cli.key.as_deref())?;
            let url = match &name {
                Some(name) => format!("{base}/admin/circuits/{name}"),
                None => format!("{base}/admin/circuits"),
            };
            let res = client.delete(url).headers(headers).send().await?;
            let status = res.status();
            if status.is_success() {
                println!("Reset {}", name.as_deref().unwrap_or("all circuits"));
            } else {
                eprintln!("Error: Admin API returned status {}", status);
            }
        }
    }

    Ok(())
}

fn admin_headers(key: Option<&str>) -> Result<HeaderMap, Box<dyn std::error::Error>> {
    let key = key
        .filter(|key| !key.is_empty())
        .ok_or("admin key required: pass --key or set GATEWAY_ADMIN_KEY")?;
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {key}"))?);
    Ok(headers)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
