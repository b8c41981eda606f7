use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use serde_json::Value;

use cart_service::http::USER_ID_HEADER;
use cart_service::operations::RemoveItem;
use cart_service::Item;

#[derive(Parser)]
#[command(name = "cart-cli")]
#[command(about = "Command-line client for the cart service", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Owner of the cart, sent as the User-ID header
    #[arg(long, default_value = "user1")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an item to the cart
    Add {
        #[arg(long)]
        id: String,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long)]
        price: Decimal,
        #[arg(long, default_value_t = 1)]
        quantity: u32,
    },
    /// Remove the first line entry with this id
    Remove {
        #[arg(long)]
        id: String,
    },
    /// Show the cart
    View,
    /// Check service health
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(USER_ID_HEADER, HeaderValue::from_str(&cli.user)?);

    let res = match cli.command {
        Commands::Add { id, name, price, quantity } => {
            let item = Item { id, name, unit_price: price, quantity };
            client.post(format!("{}/cart/add", cli.url))
                .headers(headers)
                .json(&item)
                .send()
                .await?
        }
        Commands::Remove { id } => {
            client.post(format!("{}/cart/remove", cli.url))
                .headers(headers)
                .json(&RemoveItem { id })
                .send()
                .await?
        }
        Commands::View => {
            client.get(format!("{}/cart/view", cli.url))
                .headers(headers)
                .send()
                .await?
        }
        Commands::Health => {
            client.get(format!("{}/health", cli.url))
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let json: Value = res.json().await?;

    if !status.is_success() {
        eprintln!("Error: cart service returned status {}", status);
    }
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
