use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "admin-cli")]
#[command(about = "Management CLI for redis-admin", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the service is up
    Ping,
    /// Show process status and configured child services
    Status,
    /// List live circuit breakers with state and counts
    Breakers,
    /// Look up live weather through the Amap client
    Weather {
        /// City adcode; the service default when omitted
        #[arg(long)]
        city: Option<String>,
        /// Client IP to attribute the lookup to
        #[arg(long)]
        ip: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match cli.command {
        Commands::Ping => {
            let res = client.get(format!("{}/ping", cli.url)).send().await?;
            println!("{} {}", res.status(), res.text().await?);
        }
        Commands::Status => {
            let res = client.get(format!("{}/admin/status", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Breakers => {
            let res = client.get(format!("{}/admin/breakers", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Weather { city, ip } => {
            let mut query = Vec::new();
            if let Some(city) = city {
                query.push(("city", city));
            }
            if let Some(ip) = ip {
                query.push(("location_ip", ip));
            }
            let res = client
                .get(format!("{}/amap/weather", cli.url))
                .query(&query)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
