use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "cointwo-cli")]
#[command(about = "Operator CLI for the CoinTwo wallet backend", long_about = None)]
struct Cli {
    #[arg(short, long, env = "COINTWO_URL", default_value = "http://localhost:4000")]
    url: String,

    #[arg(short, long, env = "ADMIN_API_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Version, user count, pending rewards and chain health
    Status,
    /// List rewards waiting for review
    Pending,
    /// Approve a reward (and pay it out when payouts are enabled)
    Approve { id: i64 },
    /// Reject a reward
    Reject { id: i64 },
    /// Show a user's tasks
    Tasks {
        /// Wallet address, email or user id
        address: String,
        #[arg(long)]
        chain: Option<String>,
    },
    /// Show who a user invited and how far they got
    Referrals { address: String, chain: String },
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

    let res = match cli.command {
        Commands::Status => {
            client
                .get(format!("{}/admin/status", base))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Pending => {
            client
                .get(format!("{}/admin/pending-rewards", base))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Approve { id } => {
            client
                .post(format!("{}/admin/approve", base))
                .headers(headers)
                .json(&json!({ "rewardId": id }))
                .send()
                .await?
        }
        Commands::Reject { id } => {
            client
                .post(format!("{}/admin/reject", base))
                .headers(headers)
                .json(&json!({ "rewardId": id }))
                .send()
                .await?
        }
        Commands::Tasks { address, chain } => {
            let mut query = vec![("address", address)];
            if let Some(chain) = chain {
                query.push(("chain", chain));
            }
            client
                .get(format!("{}/task/status", base))
                .query(&query)
                .send()
                .await?
        }
        Commands::Referrals { address, chain } => {
            client
                .get(format!("{}/referral/progress", base))
                .query(&[("user", address), ("chain", chain)])
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
