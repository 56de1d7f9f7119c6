//! Filter a GeoNames dataset down to selected records.
//!
//! Kept rows stream back out in the native tab-separated format,
//! unchanged, so the output is itself a loadable dataset.

use clap::Parser;
use geoanchor::geonames::{self, GeonamesSource};
use geoanchor::{CityRecord, GeoAnchorError, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process::exit;

#[derive(Debug, Parser)]
#[command(
    name = "filter-records",
    version,
    about = "Filter a GeoNames dataset by population and city phrases"
)]
struct Args {
    /// GeoNames country-data file path (countryInfo.txt)
    #[arg(long = "country-data", env = "GEOANCHOR_COUNTRY_DATA")]
    country_data: PathBuf,

    /// GeoNames city- and population-data input file path (.txt, or a .zip archive)
    #[arg(long = "input")]
    input: PathBuf,

    /// Output file path; stdout when omitted
    #[arg(long = "output")]
    output: Option<PathBuf>,

    /// Include city (looks like "city" or "city,country", where country
    /// is the resolved display name, e.g. "warren,united states");
    /// repeatable, matched case-insensitively
    #[arg(long = "city")]
    cities: Vec<String>,

    /// Minimum population size
    #[arg(long = "population", default_value_t = 0)]
    population: u64,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(err) = run(&args) {
        eprintln!("{}", err);
        exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let source = GeonamesSource::from_country_file(&args.country_data)?;
    let mut reader = geonames::open_city_data(&args.input)?;

    let mut city_filter = Vec::new();
    let mut city_and_country_filter = Vec::new();
    for phrase in &args.cities {
        let phrase = phrase.to_lowercase();
        match phrase.split_once(',') {
            None => city_filter.push(phrase),
            Some((city, country)) if !city.contains(',') && !country.contains(',') => {
                city_and_country_filter.push((city.to_string(), country.to_string()));
            }
            Some(_) => {
                return Err(GeoAnchorError::InvalidInput(format!(
                    "city filter phrase not formatted correctly: [{}]",
                    phrase
                )));
            }
        }
    }

    let mut writer: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::stdout().lock()),
    };

    let keep = |record: &CityRecord| -> bool {
        if args.population > 0 && record.population < args.population {
            return false;
        }

        if city_filter.is_empty() && city_and_country_filter.is_empty() {
            return true;
        }

        let city = record.city.to_lowercase();
        let country = record.country.to_lowercase();

        city_filter.iter().any(|c| *c == city)
            || city_and_country_filter
                .iter()
                .any(|(c, k)| *c == city && *k == country)
    };

    let (scanned, kept) = source.filter(reader.as_mut(), &mut writer, keep)?;
    writer.flush()?;

    log::info!("kept ({}) of ({}) scanned records", kept, scanned);

    Ok(())
}
