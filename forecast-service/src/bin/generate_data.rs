use anyhow::{bail, Context, Result};
use forecast_service::synthetic::{self, SyntheticConfig};
use std::{env, fs::File, io::BufWriter};
use time::{macros::format_description, Date};

const USAGE: &str = "usage: generate_data <output_csv> [meters] [start YYYY-MM-DD] [end YYYY-MM-DD] [seed]";

fn parse_date(s: &str) -> Result<Date> {
    Date::parse(s, format_description!("[year]-[month]-[day]")).with_context(|| format!("invalid date {s:?}"))
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!(USAGE);
    }
    let output = &args[1];

    let mut cfg = SyntheticConfig::default();
    if let Some(meters) = args.get(2) {
        cfg.meters = meters.parse().with_context(|| format!("invalid meter count {meters:?}"))?;
    }
    if let Some(start) = args.get(3) {
        cfg.start = parse_date(start)?;
    }
    if let Some(end) = args.get(4) {
        cfg.end = parse_date(end)?;
    }
    if let Some(seed) = args.get(5) {
        cfg.seed = Some(seed.parse().with_context(|| format!("invalid seed {seed:?}"))?);
    }

    let readings = synthetic::generate(&cfg)?;
    let file = File::create(output).with_context(|| format!("cannot create {output}"))?;
    let written = synthetic::write_csv(&readings, BufWriter::new(file))?;

    println!("synthetic dataset with {written} rows written to {output}");
    Ok(())
}
