//! City gazetteer for settlement lookup.
//!
//! Cities are indexed per country so that a point resolved to one country is
//! never given a city across the border, even when that one is closer.

use hashbrown::HashMap;
use rayon::prelude::*;
use rstar::primitives::GeomWithData;
use rstar::RTree;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::SettlementError;
use crate::models::{Coordinate, CountryLabel, Settlement};

/// A gazetteer row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct City {
    pub lat: f64,
    pub lon: f64,
    pub name: String,
    /// First-level administrative region
    pub admin1: String,
    #[serde(default)]
    pub admin2: String,
    #[serde(rename = "cc")]
    pub country_code: String,
}

impl City {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.lat, self.lon)
    }
}

struct CountryCities {
    cities: Vec<City>,
    tree: RTree<GeomWithData<[f64; 2], usize>>,
}

impl CountryCities {
    fn new(cities: Vec<City>) -> Self {
        let entries = cities
            .iter()
            .enumerate()
            .map(|(i, c)| GeomWithData::new(c.coordinate().key(), i))
            .collect();
        Self {
            tree: RTree::bulk_load(entries),
            cities,
        }
    }
}

/// Per-country nearest-city index
#[derive(Default)]
pub struct Gazetteer {
    by_country: HashMap<String, CountryCities>,
    len: usize,
}

impl Gazetteer {
    pub fn build(cities: Vec<City>) -> Self {
        info!("Building gazetteer for {} cities...", cities.len());

        let mut grouped: HashMap<String, Vec<City>> = HashMap::new();
        let mut skipped = 0usize;
        for city in cities {
            if !city.coordinate().is_valid() {
                skipped += 1;
                continue;
            }
            grouped
                .entry(city.country_code.clone())
                .or_default()
                .push(city);
        }
        if skipped > 0 {
            warn!("Skipped {} cities with invalid coordinates", skipped);
        }

        let grouped: Vec<(String, Vec<City>)> = grouped.into_iter().collect();
        let by_country: HashMap<String, CountryCities> = grouped
            .into_par_iter()
            .map(|(cc, cities)| (cc, CountryCities::new(cities)))
            .collect::<Vec<_>>()
            .into_iter()
            .collect();
        let len = by_country.values().map(|c| c.cities.len()).sum();

        info!("Gazetteer built: {} cities in {} countries", len, by_country.len());
        Self { by_country, len }
    }

    /// Nearest city of `country_code` to the point.
    pub fn try_nearest(
        &self,
        country_code: &str,
        coordinate: Coordinate,
    ) -> Result<&City, SettlementError> {
        let empty = || SettlementError::EmptyGazetteerForCountry {
            country_code: country_code.to_string(),
        };
        let country = self.by_country.get(country_code).ok_or_else(empty)?;
        country
            .tree
            .nearest_neighbor(&coordinate.key())
            .map(|entry| &country.cities[entry.data])
            .ok_or_else(empty)
    }

    pub fn nearest(&self, country_code: &str, coordinate: Coordinate) -> Option<&City> {
        self.try_nearest(country_code, coordinate).ok()
    }

    /// Settlement for a resolved label; empty for ambiguous labels and countries
    /// without cities.
    pub fn settle(&self, label: &CountryLabel, coordinate: Coordinate) -> Settlement {
        let Some(code) = label.as_resolved() else {
            return Settlement::default();
        };
        match self.try_nearest(code, coordinate) {
            Ok(city) => Settlement {
                admin_name: city.admin1.clone(),
                city: city.name.clone(),
            },
            Err(e) => {
                debug!("No settlement for {:?}: {}", coordinate, e);
                Settlement::default()
            }
        }
    }

    pub fn cities_for(&self, country_code: &str) -> &[City] {
        self.by_country
            .get(country_code)
            .map(|c| c.cities.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pip::fixtures::{cities, city};

    #[test]
    fn test_nearest_stays_in_country() {
        let gazetteer = Gazetteer::build(cities());
        let near_border = Coordinate::new(22.47, 103.93);

        // Hekou (CN) is closer, but the point is in Vietnam
        let overall = cities()
            .into_iter()
            .min_by(|a, b| {
                a.coordinate()
                    .planar_distance(&near_border)
                    .total_cmp(&b.coordinate().planar_distance(&near_border))
            })
            .unwrap();
        assert_eq!(overall.name, "Hekou");

        let settlement = gazetteer.settle(&CountryLabel::resolved("VN"), near_border);
        assert_eq!(settlement.city, "Lao Cai");
        assert_eq!(settlement.admin_name, "Lao Cai");
    }

    #[test]
    fn test_missing_country_is_error() {
        let gazetteer = Gazetteer::build(cities());
        let err = gazetteer
            .try_nearest("XK", Coordinate::new(42.6, 21.1))
            .unwrap_err();
        assert_eq!(
            err,
            SettlementError::EmptyGazetteerForCountry {
                country_code: "XK".to_string()
            }
        );
        assert_eq!(
            gazetteer.settle(&CountryLabel::resolved("XK"), Coordinate::new(42.6, 21.1)),
            Settlement::default()
        );
    }

    #[test]
    fn test_ambiguous_label_has_no_settlement() {
        let gazetteer = Gazetteer::build(cities());
        let label = CountryLabel::from_codes(["AT", "SI"]);
        assert_eq!(
            gazetteer.settle(&label, Coordinate::new(46.4, 13.8)),
            Settlement::default()
        );
    }

    #[test]
    fn test_invalid_cities_skipped() {
        let mut all = cities();
        all.push(city("Nowhere", "", "VN", f64::NAN, 105.0));
        let gazetteer = Gazetteer::build(all);
        assert_eq!(gazetteer.len(), cities().len());
        assert_eq!(gazetteer.cities_for("VN").len(), 2);
        assert!(gazetteer.cities_for("XK").is_empty());
    }
}
