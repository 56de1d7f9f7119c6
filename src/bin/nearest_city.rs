//! Resolve the nearest notable city to a coordinate pair.

use clap::Parser;
use geoanchor::geonames::{self, GeonamesSource};
use geoanchor::{CityIndex, Config, LoadFilter, Result};
use std::path::PathBuf;
use std::process::exit;

/// Exit status for the expected "nothing indexed near this point" outcome.
const EXIT_NO_NEAREST_CITY: i32 = 10;

#[derive(Debug, Parser)]
#[command(
    name = "nearest-city",
    version,
    about = "Find the nearest notable city to a coordinate pair"
)]
struct Args {
    /// GeoNames country-data file path (countryInfo.txt)
    #[arg(short = 'c', long = "country-data", env = "GEOANCHOR_COUNTRY_DATA")]
    country_data: PathBuf,

    /// GeoNames city- and population-data file path (.txt, or a .zip archive)
    #[arg(short = 'p', long = "city-data", env = "GEOANCHOR_CITY_DATA")]
    city_data: PathBuf,

    /// Latitude in decimal degrees
    #[arg(short = 'a', long)]
    latitude: f64,

    /// Longitude in decimal degrees
    #[arg(short = 'o', long)]
    longitude: f64,

    /// Print the visit history
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Print the result as JSON
    #[arg(short = 'j', long)]
    json: bool,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    match run(&args) {
        Ok(code) => exit(code),
        Err(err) => {
            eprintln!("{}", err);
            exit(1);
        }
    }
}

fn run(args: &Args) -> Result<i32> {
    let source = GeonamesSource::from_country_file(&args.country_data)?;
    let mut reader = geonames::open_city_data(&args.city_data)?;

    let mut index = CityIndex::open(Config::default())?;
    index.load(&source, reader.as_mut(), &LoadFilter::pass_all())?;

    let nearest = match index.nearest(args.latitude, args.longitude, args.verbose) {
        Ok(nearest) => nearest,
        Err(err) if err.is_no_nearest_city() => {
            println!("No nearest city found.");
            return Ok(EXIT_NO_NEAREST_CITY);
        }
        Err(err) => return Err(err),
    };

    if args.json {
        let output = serde_json::json!({
            "result": nearest.record,
            "stats": index.stats(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        if args.verbose {
            for (i, visit) in nearest.visits.iter().enumerate() {
                println!("VISIT({:2}): {}: {}", i, visit.token, visit.record);
            }
            println!();
        }

        println!("Source: {}", nearest.source_name);
        println!("ID: {}", nearest.record.id);
        println!("Country: {}", nearest.record.country);
        println!("City: {}", nearest.record.city);
        println!("Population: {}", nearest.record.population);
        println!("Latitude: {:.10}", nearest.record.latitude);
        println!("Longitude: {:.10}", nearest.record.longitude);
    }

    Ok(0)
}
