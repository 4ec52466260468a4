use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tweet_harvest::account::Account;
use tweet_harvest::config::Config;
use tweet_harvest::scraper::Scraper;
use tweet_harvest::sentiment::Vader;
use tweet_harvest::store::Store;
use tweet_harvest::twitter_client::{ResultType, TwitterClient};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Exchange the app credentials for a new bearer token even if one is cached
    #[arg(short, long)]
    login: bool,

    #[arg(long, env = "HARVEST_DATA_DIR", default_value = "users")]
    data_dir: PathBuf,

    #[arg(long, default_value = "var/.access_token")]
    token_path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and cache an account's profile
    Profile { account: Account },
    /// Fetch every tweet newer than the cached timeline
    Collect { account: Account },
    /// Re-fetch favorite and retweet counts of cached tweets
    Refresh {
        account: Account,
        /// Only the newest N tweets
        #[arg(short, long)]
        count: Option<usize>,
    },
    /// Report account age, standout tweets and mention sentiment
    Analyze {
        account: Account,
        /// Which mentions the search favours: mixed, recent or popular
        #[arg(long, default_value = "mixed")]
        result_type: ResultType,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive("tweet_harvest=info".parse()?))
        .init();

    let config = Config::from_env(args.data_dir, args.token_path)?;
    config.log_redacted();

    let mut twitter_client = TwitterClient::new(&config.app_key, &config.app_secret);
    if args.login || !config.token_path.exists() {
        twitter_client.authorize().await?;
        twitter_client.save_access_token(&config.token_path)?;
    } else {
        twitter_client.load_access_token(&config.token_path)?;
    }

    let mut scraper = Scraper::new(twitter_client, Store::new(&config.data_dir));

    match args.command {
        Command::Profile { account } => {
            let profile = scraper.fetch_profile(&account).await?;
            println!(
                "@{} ({}): {} tweets, {} followers, joined {}",
                profile.screen_name,
                profile.name,
                profile.statuses_count,
                profile.followers_count,
                profile.created_at.format("%Y-%m-%d")
            );
        }
        Command::Collect { account } => {
            let timeline = scraper.collect_timeline(&account).await?;
            println!("{} tweets cached for @{account}", timeline.len());
        }
        Command::Refresh { account, count } => {
            let refreshed = scraper.refresh_timeline(&account, count).await?;
            println!("{} tweets refreshed for @{account}", refreshed.len());
        }
        Command::Analyze {
            account,
            result_type,
            json,
        } => {
            let analysis = scraper.analyze(&account, &Vader, result_type).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                println!("{analysis}");
            }
        }
    }

    Ok(())
}
