use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use ngomatch::reports::{self, BatchStats};
use ngomatch::{ngo_source, GeoMatcher, InputFormat, MatchConfig};

#[derive(Parser, Debug)]
#[command(name = "assign")]
#[command(about = "Assign every report in a file to its nearest registered NGO.", long_about = None)]
struct Cli {
    /// NGO records (.csv, or a .json export of the account store)
    #[arg(short, long)]
    ngos: PathBuf,

    /// Format of the NGO file; guessed from the extension when omitted
    #[arg(long, value_enum)]
    ngo_format: Option<InputFormat>,

    /// Reports to assign (.csv with latitude/longitude columns, or .json documents)
    #[arg(short, long)]
    reports: PathBuf,

    /// Format of the reports file; guessed from the extension when omitted
    #[arg(long, value_enum)]
    report_format: Option<InputFormat>,

    /// Where to write the assigned reports. Written to stdout when omitted.
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// How many nearby NGOs to attach to JSON reports
    #[arg(short = 'k', long, default_value_t = ngomatch::matcher::DEFAULT_TOP_K)]
    top_k: usize,

    /// Leave reports unassigned when the nearest NGO is farther than this
    #[arg(long)]
    max_radius_km: Option<f64>,
}

fn open_output(out: &Option<PathBuf>) -> Result<Box<dyn Write>> {
    Ok(match out {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("creating {}", path.display()))?,
        )),
        None => Box::new(io::stdout().lock()),
    })
}

/// Summary goes to stdout unless stdout is already carrying the assigned reports.
fn print_summary(stats: &BatchStats, reports_on_stdout: bool) {
    if reports_on_stdout {
        eprint!("{}", stats);
    } else {
        print!("{}", stats);
    }
}

fn main() -> Result<()> {
    ngomatch::telemetry::init()?;
    let cli = Cli::parse();

    let ngo_format = InputFormat::resolve(cli.ngo_format, &cli.ngos);
    let candidates = ngo_source::load_path(&cli.ngos, ngo_format)
        .with_context(|| format!("loading NGOs from {}", cli.ngos.display()))?;

    let matcher = GeoMatcher::new(MatchConfig {
        top_k: cli.top_k,
        max_radius_km: cli.max_radius_km,
    });

    let input = BufReader::new(
        File::open(&cli.reports).with_context(|| format!("opening {}", cli.reports.display()))?,
    );
    let mut output = open_output(&cli.out)?;

    let stats = match InputFormat::resolve(cli.report_format, &cli.reports) {
        InputFormat::Csv => reports::assign_csv(input, &mut output, &matcher, &candidates)
            .with_context(|| format!("assigning reports from {}", cli.reports.display()))?,
        InputFormat::Json => {
            let (docs, stats) = reports::assign_json(input, &matcher, &candidates)
                .with_context(|| format!("assigning reports from {}", cli.reports.display()))?;
            serde_json::to_writer_pretty(&mut output, &docs)?;
            writeln!(output)?;
            stats
        }
    };
    output.flush()?;
    drop(output);

    info!(reports = stats.reports, assigned = stats.assigned, "Batch assignment finished");
    print_summary(&stats, cli.out.is_none());

    Ok(())
}
