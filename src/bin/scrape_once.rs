//! Runs one scrape-and-upload cycle without the HTTP server and prints the result.
//! Exit code 0 on success, 1 on failure.

use forex_scraper::config::AppConfig;
use forex_scraper::Pipeline;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    forex_scraper::init_tracing();

    let code = match run().await {
        Ok(json) => {
            println!("{json}");
            0
        }
        Err(e) => {
            eprintln!("Scraper failed: {e:#}");
            1
        }
    };
    std::process::exit(code);
}

async fn run() -> anyhow::Result<String> {
    let cfg = AppConfig::from_env()?;
    let pipeline = Pipeline::from_config(&cfg)?;
    let result = pipeline.run().await?;
    Ok(serde_json::to_string_pretty(&result)?)
}
