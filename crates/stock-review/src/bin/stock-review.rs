//! Stock review CLI
//!
//! Renders a review document as JSON on stdout. Failures are printed as an
//! error envelope and exit with status 1.
//!
//! # Usage
//!
//! ```bash
//! export KITCHEN_FINNHUB_API_KEY="..."
//! cargo run --bin stock-review -- render AAPL --lang en
//! cargo run --bin stock-review -- tools
//! ```

use clap::{Parser, Subcommand};
use review_utils::{LogFormat, init_tracing, load_env_file};
use stock_review::{Language, ReviewConfig, StockReviewService, tool_registry};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "stock-review")]
#[command(about = "Render stock review documents", long_about = None)]
struct Args {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the review of one ticker
    Render {
        symbol: String,

        /// Output language (he, en)
        #[arg(short, long, default_value = "he")]
        lang: Language,

        /// Correlation id echoed in error responses
        #[arg(long)]
        request_id: Option<String>,
    },
    /// List the available tools
    Tools,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_env_file();

    let args = Args::parse();
    init_tracing(if args.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Text
    });

    match args.command {
        Command::Tools => {
            println!("{}", serde_json::to_string_pretty(&tool_registry())?);
        }
        Command::Render {
            symbol,
            lang,
            request_id,
        } => {
            let request_id = request_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            info!(%symbol, %lang, %request_id, "Starting stock-review");

            let service = StockReviewService::new(ReviewConfig::from_env())?;
            match service.generate_review(&symbol, lang, &request_id).await {
                Ok(review) => println!("{}", serde_json::to_string_pretty(&review)?),
                Err(e) => {
                    error!(error = %e, code = ?e.code(), "Review failed");
                    println!("{}", serde_json::to_string_pretty(&e.to_response(request_id))?);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
