//! Small synthetic boundary datasets shared by the tests.
//!
//! Shapes are boxes roughly where the real countries are. Outer rings are wound
//! clockwise in (lon, lat), like the source data; enclave holes counter-clockwise.

use crate::config::EngineConfig;
use crate::gazetteer::City;
use crate::models::{Coordinate, CountryRings};

/// Route engine logs to the test output; `RUST_LOG=borderline=debug` to see them.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Box corners alone are far too sparse for nearest-point lookups
pub fn engine_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.boundary.max_point_spacing = Some(0.05);
    config
}

/// Clockwise box.
pub fn box_ring(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Vec<Coordinate> {
    vec![
        Coordinate::new(min_lat, min_lon),
        Coordinate::new(max_lat, min_lon),
        Coordinate::new(max_lat, max_lon),
        Coordinate::new(min_lat, max_lon),
    ]
}

pub fn reversed(mut ring: Vec<Coordinate>) -> Vec<Coordinate> {
    ring.reverse();
    ring
}

pub const LESOTHO: (f64, f64, f64, f64) = (-30.7, -28.6, 27.0, 29.5);

/// South Africa with Lesotho cut out as a hole ring, then Lesotho itself.
pub fn za_ls() -> Vec<CountryRings> {
    let (a, b, c, d) = LESOTHO;
    vec![
        CountryRings::new(
            "ZA",
            vec![box_ring(-35.0, -22.0, 16.0, 33.0), reversed(box_ring(a, b, c, d))],
        )
        .with_group("africa"),
        CountryRings::new("LS", vec![box_ring(a, b, c, d)]).with_group("africa"),
    ]
}

pub const SAN_MARINO: (f64, f64, f64, f64) = (43.89, 43.99, 12.40, 12.52);
pub const VATICAN: (f64, f64, f64, f64) = (41.900, 41.907, 12.446, 12.458);

/// Central Italy with San Marino and the Vatican cut out of it.
pub fn it_sm_va() -> Vec<CountryRings> {
    let hole = |(a, b, c, d): (f64, f64, f64, f64)| reversed(box_ring(a, b, c, d));
    let enclave = |(a, b, c, d): (f64, f64, f64, f64)| vec![box_ring(a, b, c, d)];
    vec![
        CountryRings::new(
            "IT",
            vec![box_ring(41.0, 44.5, 9.0, 14.0), hole(SAN_MARINO), hole(VATICAN)],
        )
        .with_group("europe"),
        CountryRings::new("SM", enclave(SAN_MARINO)).with_group("europe"),
        CountryRings::new("VA", enclave(VATICAN)).with_group("europe"),
    ]
}

/// France, Monaco and Italy meeting at the Monaco corner (43.70, 7.40).
pub fn fr_mc_it() -> Vec<CountryRings> {
    let italy = vec![
        Coordinate::new(43.0, 7.40),
        Coordinate::new(43.70, 7.40),
        Coordinate::new(43.70, 7.45),
        Coordinate::new(43.78, 7.45),
        Coordinate::new(43.78, 7.40),
        Coordinate::new(44.5, 7.40),
        Coordinate::new(44.5, 9.0),
        Coordinate::new(43.0, 9.0),
    ];
    vec![
        CountryRings::new("FR", vec![box_ring(43.0, 44.5, 6.0, 7.40)]).with_group("europe"),
        CountryRings::new("MC", vec![box_ring(43.70, 43.78, 7.40, 7.45)]).with_group("europe"),
        CountryRings::new("IT", vec![italy]).with_group("europe"),
    ]
}

/// Austria north of Slovenia, sharing the 46.4 parallel.
pub fn at_si() -> Vec<CountryRings> {
    vec![
        CountryRings::new("AT", vec![box_ring(46.4, 49.0, 9.5, 17.0)]).with_group("europe"),
        CountryRings::new("SI", vec![box_ring(45.4, 46.4, 13.4, 16.6)]).with_group("europe"),
    ]
}

/// China north of Vietnam, sharing the 22.5 parallel.
pub fn vn_cn() -> Vec<CountryRings> {
    vec![
        CountryRings::new("CN", vec![box_ring(22.5, 25.0, 100.0, 106.0)]).with_group("asia"),
        CountryRings::new("VN", vec![box_ring(20.0, 22.5, 102.0, 106.0)]).with_group("asia"),
    ]
}

pub fn world() -> Vec<CountryRings> {
    let mut all = za_ls();
    all.extend(fr_mc_it());
    all.extend(at_si());
    all.extend(vn_cn());
    all
}

pub fn city(name: &str, admin1: &str, cc: &str, lat: f64, lon: f64) -> City {
    City {
        lat,
        lon,
        name: name.to_string(),
        admin1: admin1.to_string(),
        admin2: String::new(),
        country_code: cc.to_string(),
    }
}

pub fn cities() -> Vec<City> {
    vec![
        city("Hekou", "Yunnan", "CN", 22.51, 103.95),
        city("Kunming", "Yunnan", "CN", 25.0, 102.7),
        city("Lao Cai", "Lao Cai", "VN", 22.42, 103.98),
        city("Hanoi", "Ha Noi", "VN", 21.03, 105.85),
        city("Maseru", "Maseru", "LS", -29.31, 27.48),
        city("Ladybrand", "Free State", "ZA", -29.19, 27.46),
        city("Villach", "Carinthia", "AT", 46.61, 13.85),
        city("Kranjska Gora", "Kranjska Gora", "SI", 46.38, 13.78),
        city("Monaco", "Monaco", "MC", 43.73, 7.42),
    ]
}
