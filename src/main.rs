use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use csv::Writer;
use tracing::warn;

use ngomatch::coerce::source_point;
use ngomatch::{ngo_source, GeoMatcher, InputFormat, MatchConfig};

#[derive(Parser, Debug)]
#[command(name = "nearest")]
#[command(about = "Rank registered NGOs by distance from a reported location and pick the nearest.", long_about = None)]
struct Cli {
    /// NGO records (.csv, or a .json export of the account store)
    #[arg(short, long)]
    ngos: PathBuf,

    /// Input format; guessed from the file extension when omitted
    #[arg(short, long, value_enum)]
    format: Option<InputFormat>,

    /// Report latitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    lat: String,

    /// Report longitude in degrees
    #[arg(long, allow_hyphen_values = true)]
    lon: String,

    /// How many nearby NGOs to list
    #[arg(short = 'k', long, default_value_t = ngomatch::matcher::DEFAULT_TOP_K)]
    top_k: usize,

    /// Ignore NGOs farther than this many kilometers. Unlimited when omitted.
    #[arg(long)]
    max_radius_km: Option<f64>,

    /// Output CSV (rank, ngo_id, name, distance_km) of every ranked NGO
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Print the assignment as JSON instead of a summary
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    ngomatch::telemetry::init()?;
    let cli = Cli::parse();

    let format = InputFormat::resolve(cli.format, &cli.ngos);
    let candidates = ngo_source::load_path(&cli.ngos, format)
        .with_context(|| format!("loading NGOs from {}", cli.ngos.display()))?;

    // A bad report location skips geo-assignment; it is not a failure.
    let source = match source_point(&cli.lat, &cli.lon) {
        Ok(point) => point,
        Err(e) => {
            warn!(lat = %cli.lat, lon = %cli.lon, error = %e, "Invalid report coordinates");
            println!("No assignment: invalid report coordinates ({e})");
            return Ok(());
        }
    };

    let matcher = GeoMatcher::new(MatchConfig {
        top_k: cli.top_k,
        max_radius_km: cli.max_radius_km,
    });

    if let Some(out_path) = &cli.out {
        let ranked = matcher.rank(&source, &candidates);
        let mut wtr = Writer::from_path(out_path)
            .with_context(|| format!("creating CSV {}", out_path.display()))?;
        wtr.write_record(["rank", "ngo_id", "name", "distance_km"])?;
        for m in &ranked {
            wtr.write_record(&[
                m.rank.to_string(),
                m.id().to_string(),
                m.ngo.name.clone().unwrap_or_default(),
                format!("{:.6}", m.distance_km),
            ])?;
        }
        wtr.flush()?;
        println!("Wrote {} ranked NGOs to {}", ranked.len(), out_path.display());
    }

    let outcome = matcher.match_report(&source, &candidates);

    if cli.json {
        let summary = serde_json::to_string_pretty(&outcome.summary())?;
        println!("{}", summary);
        return Ok(());
    }

    let located = candidates.iter().filter(|c| c.location.is_some()).count();
    println!("Candidates: {}", candidates.len());
    println!("With coordinates: {}", located);
    if let Some(radius) = matcher.config().radius_km() {
        println!("Within {:.1} km: {}", radius, outcome.ranked_count);
    }

    match outcome.assigned {
        Some(assigned) => {
            println!(
                "Assigned: {} ({:.2} km)",
                assigned.ngo.name.as_deref().unwrap_or(assigned.id()),
                assigned.distance_km
            );
            println!("Nearby NGOs:");
            for m in &outcome.nearby {
                println!(
                    "  #{} {} [{}] {:.2} km",
                    m.rank + 1,
                    m.ngo.name.as_deref().unwrap_or("-"),
                    m.id(),
                    m.distance_km
                );
            }
        }
        None => println!("No assignment: no NGO with usable coordinates in range"),
    }

    Ok(())
}
