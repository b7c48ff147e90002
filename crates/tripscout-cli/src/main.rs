mod reviews;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tripscout-cli")]
#[command(about = "Find the worst-reviewed businesses near a place")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Aggregate ranked businesses with one review each, printed as JSON
    Reviews {
        #[arg(long, requires = "longitude", allow_negative_numbers = true)]
        latitude: Option<f64>,
        #[arg(long, requires = "latitude", allow_negative_numbers = true)]
        longitude: Option<f64>,
        /// Geocoded to coordinates when latitude/longitude are not given
        #[arg(
            long,
            conflicts_with_all = ["latitude", "longitude"],
            required_unless_present = "latitude"
        )]
        city: Option<String>,
        #[arg(long)]
        keyword: String,
        /// Override the configured number of results
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print geocoder matches for a free-text place query
    Locate { query: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = tripscout_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Reviews {
            latitude,
            longitude,
            city,
            keyword,
            limit,
        } => {
            if let Some(limit) = limit {
                config.result_limit = limit;
            }
            let origin = match (latitude, longitude, city) {
                (Some(latitude), Some(longitude), _) => reviews::Origin::Coordinates {
                    latitude,
                    longitude,
                },
                (_, _, Some(city)) => reviews::Origin::City(city),
                _ => anyhow::bail!("either --latitude/--longitude or --city is required"),
            };
            reviews::run_reviews(&config, origin, &keyword).await?;
        }
        Commands::Locate { query } => reviews::run_locate(&config, &query).await?,
    }

    Ok(())
}
