//! GeoNames dataset parsing.
//!
//! Implements [`CityRecordSource`] for the GeoNames "allCountries" dump: a
//! tab-separated file with one geographical point per row, paired with the
//! separate `countryInfo.txt` country list that resolves ISO-2 codes to
//! display names.
//!
//! Row layout (19 tab-separated fields):
//!
//! ```text
//!  0: geonameid          integer id of the record
//!  1: name               name of the geographical point
//!  2: asciiname          plain-ascii variant
//!  3: alternatenames     comma separated
//!  4: latitude           decimal degrees (wgs84)
//!  5: longitude          decimal degrees (wgs84)
//!  6: feature class      one letter, "P" = populated place
//!  7: feature code       PPL, PPLA*, PPLC, PPLX, PPLL, ...
//!  8: country code       ISO-3166 2-letter code
//!  9: cc2                alternate country codes
//! 10: admin1 code        first-level administrative subdivision
//! 11: admin2 code
//! 12: admin3 code
//! 13: admin4 code
//! 14: population
//! 15: elevation          meters
//! 16: dem                digital elevation model
//! 17: timezone           IANA id
//! 18: modification date  yyyy-MM-dd
//! ```

use crate::error::{GeoAnchorError, Result};
use crate::source::{CityRecordSource, RecordCallback};
use crate::types::CityRecord;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom, Write};
use std::path::Path;

/// Field count of a well-formed GeoNames row (both files use it).
const GEONAMES_FIELD_COUNT: usize = 19;

/// Dataset member extracted from zipped GeoNames archives.
const ARCHIVE_MEMBER: &str = "allCountries.txt";

/// Parse the GeoNames `countryInfo.txt` file into a code-to-display-name
/// map. Comment lines and lines without the expected field count are
/// skipped.
pub fn build_country_mapping<R: BufRead>(reader: R) -> Result<FxHashMap<String, String>> {
    let mut countries = FxHashMap::default();

    for line in reader.lines() {
        let line = line?;
        if line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() != GEONAMES_FIELD_COUNT {
            continue;
        }

        countries.insert(fields[0].to_string(), fields[4].to_string());
    }

    Ok(countries)
}

/// Open a GeoNames city-data file for reading.
///
/// A `.zip` path is treated as a GeoNames archive: the `allCountries.txt`
/// member is unpacked into an anonymous temporary file first, so the
/// caller always gets a plain buffered reader.
pub fn open_city_data(path: impl AsRef<Path>) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let is_zip = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("zip"))
        .unwrap_or(false);

    if is_zip {
        let mut archive = zip::ZipArchive::new(File::open(path)?)?;
        let mut member = archive.by_name(ARCHIVE_MEMBER)?;

        let mut scratch = tempfile::tempfile()?;
        std::io::copy(&mut member, &mut scratch)?;
        scratch.seek(SeekFrom::Start(0))?;

        Ok(Box::new(BufReader::new(scratch)))
    } else {
        Ok(Box::new(BufReader::new(File::open(path)?)))
    }
}

/// Fields of an accepted row, before country and coordinate resolution.
struct RawRow<'a> {
    id: &'a str,
    name: &'a str,
    latitude: &'a str,
    longitude: &'a str,
    country_code: &'a str,
    admin1: &'a str,
    population: u64,
}

/// GeoNames parser with a pre-resolved country mapping.
///
/// Malformed rows (unresolvable country, unparseable coordinates, missing
/// name) are skipped with a warning by default; [`GeonamesSource::with_strict`]
/// turns them into hard errors instead.
pub struct GeonamesSource {
    countries: FxHashMap<String, String>,
    strict: bool,
}

impl GeonamesSource {
    pub fn new(countries: FxHashMap<String, String>) -> Self {
        Self {
            countries,
            strict: false,
        }
    }

    /// Error on malformed rows instead of skipping them with a warning.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Build a source from a `countryInfo.txt` file on disk.
    pub fn from_country_file(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let countries = build_country_mapping(BufReader::new(file))?;
        Ok(Self::new(countries))
    }

    /// Acceptance rules shared by [`parse`](CityRecordSource::parse) and
    /// [`filter`](GeonamesSource::filter): `Ok(None)` for rows that are not
    /// populated-place records with a reported population.
    fn accept_row<'a>(&self, line: &'a str) -> Result<Option<RawRow<'a>>> {
        let fields: Vec<&str> = line.split('\t').collect();

        // Not a record line, or a commented one.
        if fields.len() != GEONAMES_FIELD_COUNT || fields[0].starts_with('#') {
            return Ok(None);
        }

        // The country list gets fed in by accident often enough that the
        // wrong-file case deserves a loud failure.
        if fields[0].parse::<u64>().is_err() {
            return Err(GeoAnchorError::InvalidInput(format!(
                "first column does not look like an integer; is this the right kind of file? [{}]",
                fields[0]
            )));
        }

        let country_code = fields[8];
        if country_code.is_empty() {
            // Supranational entries carry no country code.
            return Ok(None);
        }

        if fields[6] != "P" {
            return Ok(None);
        }

        // Any populated-place type; the distinctions depend on size and no
        // single classification applies.
        let feature_code = fields[7];
        let is_populated_place = feature_code == "PPLC"
            || feature_code.starts_with("PPLA")
            || feature_code == "PPL"
            || feature_code == "PPLX"
            || feature_code == "PPLL";
        if !is_populated_place {
            return Ok(None);
        }

        let population_raw = fields[14];
        if population_raw.is_empty() || population_raw == "null" {
            return Ok(None);
        }

        let population = match population_raw.parse::<u64>() {
            Ok(population) => population,
            Err(_) => return Ok(None),
        };
        if population == 0 {
            return Ok(None);
        }

        Ok(Some(RawRow {
            id: fields[0],
            name: fields[1],
            latitude: fields[4],
            longitude: fields[5],
            country_code,
            admin1: fields[10],
            population,
        }))
    }

    /// Resolve an accepted row into a full record, applying the
    /// malformed-row policy. `Ok(None)` means the row was skipped.
    fn build_record(&self, row: RawRow<'_>, line_number: usize) -> Result<Option<CityRecord>> {
        let Some(country) = self.countries.get(row.country_code) else {
            if self.strict {
                return Err(GeoAnchorError::UnknownCountry(row.country_code.to_string()));
            }
            log::warn!(
                "skipping record at line ({}): could not resolve country code [{}] (({}) countries known)",
                line_number,
                row.country_code,
                self.countries.len()
            );
            return Ok(None);
        };

        if row.name.is_empty() {
            self.handle_malformed(
                line_number,
                format!("no city name for record [{}]", row.id),
            )?;
            return Ok(None);
        }

        let Ok(latitude) = row.latitude.parse::<f64>() else {
            self.handle_malformed(
                line_number,
                format!("unparseable latitude [{}]", row.latitude),
            )?;
            return Ok(None);
        };

        let Ok(longitude) = row.longitude.parse::<f64>() else {
            self.handle_malformed(
                line_number,
                format!("unparseable longitude [{}]", row.longitude),
            )?;
            return Ok(None);
        };

        Ok(Some(CityRecord {
            id: row.id.to_string(),
            country: country.clone(),
            province_state: row.admin1.to_string(),
            city: row.name.to_string(),
            population: row.population,
            latitude,
            longitude,
        }))
    }

    fn handle_malformed(&self, line_number: usize, reason: String) -> Result<()> {
        if self.strict {
            return Err(GeoAnchorError::MalformedRecord {
                line: line_number,
                reason,
            });
        }

        log::warn!("skipping malformed record at line ({}): {}", line_number, reason);
        Ok(())
    }

    /// Stream accepted rows, writing kept lines back out unchanged.
    ///
    /// Records failing the acceptance rules are dropped before the
    /// predicate runs. Returns `(rows_scanned, rows_kept)`.
    pub fn filter<W: Write>(
        &self,
        reader: &mut dyn BufRead,
        writer: &mut W,
        mut predicate: impl FnMut(&CityRecord) -> bool,
    ) -> Result<(usize, usize)> {
        let mut scanned = 0;
        let mut kept = 0;

        for (line_index, line) in reader.lines().enumerate() {
            let line = line?;
            let Some(row) = self.accept_row(&line)? else {
                continue;
            };
            scanned += 1;

            let Some(record) = self.build_record(row, line_index + 1)? else {
                continue;
            };

            if predicate(&record) {
                writeln!(writer, "{}", line)?;
                kept += 1;
            }
        }

        Ok((scanned, kept))
    }
}

impl CityRecordSource for GeonamesSource {
    fn name(&self) -> &str {
        "GeoNames"
    }

    fn parse(
        &self,
        reader: &mut dyn BufRead,
        callback: &mut RecordCallback<'_>,
    ) -> Result<usize> {
        let mut records_count = 0;

        for (line_index, line) in reader.lines().enumerate() {
            let line = line?;
            let Some(row) = self.accept_row(&line)? else {
                continue;
            };
            records_count += 1;

            let Some(record) = self.build_record(row, line_index + 1)? else {
                continue;
            };

            callback(record)?;
        }

        Ok(records_count)
    }
}
