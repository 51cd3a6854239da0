//! CSV import and export of the boundary table, country rings and the gazetteer.

use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::{info, warn};

use crate::gazetteer::City;
use crate::models::{Coordinate, CountryRings, FeatureId, ShiftedBoundaryPoint};
use crate::pip::BoundaryTable;

/// One row of the flattened boundary table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryRow {
    pub lat: f64,
    pub lon: f64,
    pub country_code: String,
    pub feature_id: FeatureId,
}

impl From<&ShiftedBoundaryPoint> for BoundaryRow {
    fn from(p: &ShiftedBoundaryPoint) -> Self {
        Self {
            lat: p.coordinate.lat,
            lon: p.coordinate.lon,
            country_code: p.country_code.clone(),
            feature_id: p.feature_id,
        }
    }
}

/// One vertex of a raw country ring. Rows of a ring are consecutive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingVertexRow {
    pub lat: f64,
    pub lon: f64,
    pub country_code: String,
    /// Ring number within the country
    pub ring: u32,
    #[serde(default)]
    pub group: Option<String>,
}

pub fn write_boundary_table<W: Write>(table: &BoundaryTable, writer: W) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().has_headers(true).from_writer(writer);
    for point in &table.points {
        csv_writer.serialize(BoundaryRow::from(point))?;
    }
    csv_writer.flush().context("Failed to flush boundary table")?;
    Ok(())
}

pub fn save_boundary_table(table: &BoundaryTable, path: &Path) -> Result<()> {
    info!(
        "Writing {} boundary points to {}",
        table.points.len(),
        path.display()
    );
    let file = File::create(path)
        .with_context(|| format!("Failed to create boundary table {}", path.display()))?;
    write_boundary_table(table, file)
}

pub fn read_boundary_rows<R: Read>(reader: R) -> Result<Vec<BoundaryRow>> {
    let mut csv_reader = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let mut rows = Vec::new();
    for result in csv_reader.deserialize() {
        let row: BoundaryRow = result.context("Malformed boundary row")?;
        rows.push(row);
    }
    Ok(rows)
}

/// Read raw rings, grouped by country in order of first appearance.
pub fn read_country_rings<R: Read>(reader: R) -> Result<Vec<CountryRings>> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut countries: Vec<CountryRings> = Vec::new();
    // (country index, ring number) of the ring being filled
    let mut current: Option<(usize, u32)> = None;

    for result in csv_reader.deserialize() {
        let row: RingVertexRow = result.context("Malformed ring vertex row")?;

        let country = match countries
            .iter()
            .position(|c| c.country_code == row.country_code)
        {
            Some(i) => i,
            None => {
                let mut rings = CountryRings::new(row.country_code.clone(), Vec::new());
                rings.group = row.group.clone();
                countries.push(rings);
                countries.len() - 1
            }
        };

        if current != Some((country, row.ring)) {
            countries[country].rings.push(Vec::new());
            current = Some((country, row.ring));
        }
        if let Some(ring) = countries[country].rings.last_mut() {
            ring.push(Coordinate::new(row.lat, row.lon));
        }
    }

    let rings: usize = countries.iter().map(|c| c.rings.len()).sum();
    info!("Loaded {} rings for {} countries", rings, countries.len());
    Ok(countries)
}

pub fn load_country_rings(path: &Path) -> Result<Vec<CountryRings>> {
    info!("Loading country rings from {}", path.display());
    let file = File::open(path)
        .with_context(|| format!("Failed to open ring file {}", path.display()))?;
    read_country_rings(file)
}

pub fn read_gazetteer<R: Read>(reader: R) -> Result<Vec<City>> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut cities = Vec::new();
    let mut malformed = 0usize;
    for result in csv_reader.deserialize::<City>() {
        match result {
            Ok(city) => cities.push(city),
            Err(e) => {
                malformed += 1;
                if malformed == 1 {
                    warn!("Skipping malformed gazetteer row: {}", e);
                }
            }
        }
    }
    if malformed > 0 {
        warn!("Skipped {} malformed gazetteer rows", malformed);
    }

    Ok(cities)
}

pub fn load_gazetteer(path: &Path) -> Result<Vec<City>> {
    info!("Loading gazetteer from {}", path.display());
    let file =
        File::open(path).with_context(|| format!("Failed to open gazetteer {}", path.display()))?;
    let cities = read_gazetteer(file)?;
    info!("Loaded {} cities", cities.len());
    Ok(cities)
}

pub fn write_gazetteer<W: Write>(cities: &[City], writer: W) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().has_headers(true).from_writer(writer);
    for city in cities {
        csv_writer.serialize(city)?;
    }
    csv_writer.flush().context("Failed to flush gazetteer")?;
    Ok(())
}
