//! Scan a GeoNames dataset for specific records.
//!
//! Useful for checking which records the acceptance rules admit, since
//! that can be hard to tell from the raw data by eye. With no qualifiers
//! every accepted record is printed.

use clap::Parser;
use geoanchor::geonames::{self, GeonamesSource};
use geoanchor::{CellAddress, CityRecord, CityRecordSource, Config, GeoAnchorError, Result};
use std::path::PathBuf;
use std::process::exit;

#[derive(Debug, Parser)]
#[command(
    name = "find-record",
    version,
    about = "Scan a GeoNames dataset for specific records"
)]
struct Args {
    /// GeoNames country-data file path (countryInfo.txt)
    #[arg(short = 'c', long = "country-data", env = "GEOANCHOR_COUNTRY_DATA")]
    country_data: PathBuf,

    /// GeoNames city- and population-data file path (.txt, or a .zip archive)
    #[arg(short = 'p', long = "city-data", env = "GEOANCHOR_CITY_DATA")]
    city_data: PathBuf,

    /// Record id to find (repeatable)
    #[arg(short = 'i', long = "record-id")]
    record_ids: Vec<String>,

    /// Exact "latitude,longitude" to search by leaf cell (repeatable)
    #[arg(short = 'C', long = "coordinates")]
    coordinates: Vec<String>,

    /// Only print urban centers
    #[arg(short = 'u', long = "urban-centers")]
    urban_centers: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(err) = run(&args) {
        eprintln!("{}", err);
        exit(1);
    }
}

fn parse_coordinates(phrase: &str) -> Result<CellAddress> {
    let (lat, lon) = phrase.split_once(',').ok_or_else(|| {
        GeoAnchorError::InvalidInput(format!(
            "coordinate phrase is not exactly two parts: [{}]",
            phrase
        ))
    })?;

    let latitude: f64 = lat.trim().parse().map_err(|_| {
        GeoAnchorError::InvalidInput(format!("unparseable latitude: [{}]", lat))
    })?;
    let longitude: f64 = lon.trim().parse().map_err(|_| {
        GeoAnchorError::InvalidInput(format!("unparseable longitude: [{}]", lon))
    })?;

    CellAddress::from_coordinates(latitude, longitude)
}

fn run(args: &Args) -> Result<()> {
    let source = GeonamesSource::from_country_file(&args.country_data)?;
    let mut reader = geonames::open_city_data(&args.city_data)?;

    let cells = args
        .coordinates
        .iter()
        .map(|phrase| parse_coordinates(phrase))
        .collect::<Result<Vec<_>>>()?;

    let urban_minimum = Config::default().urban_center_minimum_population;
    let has_qualifiers = !args.record_ids.is_empty() || !cells.is_empty();

    let mut callback = |record: CityRecord| -> Result<()> {
        // The parser already filters by everything but population.
        if args.urban_centers && record.population < urban_minimum {
            return Ok(());
        }

        let mut hit = args.record_ids.iter().any(|id| *id == record.id);
        if !hit && !cells.is_empty() {
            let cell = record.cell()?;
            hit = cells.contains(&cell);
        }

        if has_qualifiers && !hit {
            return Ok(());
        }

        println!("{}", record);
        Ok(())
    };

    let scanned = source.parse(reader.as_mut(), &mut callback)?;
    println!("({}) records scanned.", scanned);

    Ok(())
}
