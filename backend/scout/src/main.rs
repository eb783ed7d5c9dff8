use clap::Parser;
use places::Coordinate;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Search center, located by IP when omitted
    #[arg(long, requires = "longitude", allow_hyphen_values = true)]
    latitude: Option<f64>,

    #[arg(long, requires = "latitude", allow_hyphen_values = true)]
    longitude: Option<f64>,

    /// Spin the roulette over the results
    #[arg(long)]
    spin: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();
    let center = args
        .latitude
        .zip(args.longitude)
        .map(|(latitude, longitude)| Coordinate::new(latitude, longitude));

    scout::scout(center, args.spin).await
}
