use std::path::PathBuf;

use clap::{Parser, Subcommand};
use layers::LayerKind;
use tools::{
    ToolError, load_config, project_point, read_source, render_snapshot, summarize_borders,
    summarize_earthquakes, summarize_volcanoes, to_pretty_json,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect hazard globe data sources offline")]
struct Args {
    /// Viewer config JSON (defaults apply to missing fields)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse an earthquake CSV and report what would be drawn
    Earthquakes { csv: PathBuf },

    /// Parse a volcano CSV
    Volcanoes { csv: PathBuf },

    /// Parse a country-border GeoJSON FeatureCollection
    Borders { geojson: PathBuf },

    /// Project a latitude/longitude onto the globe
    Project {
        #[arg(allow_negative_numbers = true)]
        lat: f64,
        #[arg(allow_negative_numbers = true)]
        lon: f64,

        /// Globe radius
        #[arg(long, default_value_t = 1.0)]
        radius: f64,
    },

    /// Load sources into a headless viewer and print the scene snapshot
    Snapshot {
        #[arg(long)]
        earthquakes: Option<PathBuf>,
        #[arg(long)]
        volcanoes: Option<PathBuf>,
        #[arg(long)]
        borders: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(output) => println!("{output}"),
        Err(err) => {
            error!("{err}");
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<String, ToolError> {
    let config = load_config(args.config.as_deref())?;

    match args.command {
        Command::Earthquakes { csv } => {
            to_pretty_json(&summarize_earthquakes(&read_source(&csv)?, &config)?)
        }
        Command::Volcanoes { csv } => to_pretty_json(&summarize_volcanoes(&read_source(&csv)?)?),
        Command::Borders { geojson } => to_pretty_json(&summarize_borders(&read_source(&geojson)?)?),
        Command::Project { lat, lon, radius } => {
            to_pretty_json(&project_point(lat, lon, radius, &config))
        }
        Command::Snapshot {
            earthquakes,
            volcanoes,
            borders,
        } => {
            let sources: Vec<(LayerKind, PathBuf)> = [
                (LayerKind::Earthquakes, earthquakes),
                (LayerKind::Volcanoes, volcanoes),
                (LayerKind::Borders, borders),
            ]
            .into_iter()
            .filter_map(|(kind, path)| path.map(|p| (kind, p)))
            .collect();
            to_pretty_json(&render_snapshot(config, &sources)?)
        }
    }
}
