//! Static airport reference data
//!
//! This module contains the built-in airport dataset: IATA codes, display
//! names, coordinates, and a display-priority weight tier. The table is a
//! curated subset of major airports; route queries accept any well-formed
//! IATA code, using the table only to enrich output.

use super::AirportRef;

/// Static array of the built-in airport reference set
///
/// Weight tiers follow display priority: 1 for major international hubs,
/// 2 for large regional airports, 3 for the rest.
pub static AIRPORTS: [AirportRef; 24] = [
    AirportRef {
        iata: "YVR",
        name: "Vancouver International Airport",
        city: "Vancouver",
        country: "Canada",
        latitude: 49.1947,
        longitude: -123.1792,
        weight: 1,
    },
    AirportRef {
        iata: "SEA",
        name: "Seattle-Tacoma International Airport",
        city: "Seattle",
        country: "United States",
        latitude: 47.4502,
        longitude: -122.3088,
        weight: 1,
    },
    AirportRef {
        iata: "LAX",
        name: "Los Angeles International Airport",
        city: "Los Angeles",
        country: "United States",
        latitude: 33.9416,
        longitude: -118.4085,
        weight: 1,
    },
    AirportRef {
        iata: "SFO",
        name: "San Francisco International Airport",
        city: "San Francisco",
        country: "United States",
        latitude: 37.6213,
        longitude: -122.3790,
        weight: 1,
    },
    AirportRef {
        iata: "DEN",
        name: "Denver International Airport",
        city: "Denver",
        country: "United States",
        latitude: 39.8561,
        longitude: -104.6737,
        weight: 2,
    },
    AirportRef {
        iata: "ORD",
        name: "O'Hare International Airport",
        city: "Chicago",
        country: "United States",
        latitude: 41.9742,
        longitude: -87.9073,
        weight: 1,
    },
    AirportRef {
        iata: "ATL",
        name: "Hartsfield-Jackson Atlanta International Airport",
        city: "Atlanta",
        country: "United States",
        latitude: 33.6407,
        longitude: -84.4277,
        weight: 1,
    },
    AirportRef {
        iata: "JFK",
        name: "John F. Kennedy International Airport",
        city: "New York",
        country: "United States",
        latitude: 40.6413,
        longitude: -73.7781,
        weight: 1,
    },
    AirportRef {
        iata: "BOS",
        name: "Boston Logan International Airport",
        city: "Boston",
        country: "United States",
        latitude: 42.3656,
        longitude: -71.0096,
        weight: 2,
    },
    AirportRef {
        iata: "MIA",
        name: "Miami International Airport",
        city: "Miami",
        country: "United States",
        latitude: 25.7959,
        longitude: -80.2870,
        weight: 2,
    },
    AirportRef {
        iata: "YYZ",
        name: "Toronto Pearson International Airport",
        city: "Toronto",
        country: "Canada",
        latitude: 43.6777,
        longitude: -79.6248,
        weight: 1,
    },
    AirportRef {
        iata: "MEX",
        name: "Mexico City International Airport",
        city: "Mexico City",
        country: "Mexico",
        latitude: 19.4363,
        longitude: -99.0721,
        weight: 2,
    },
    AirportRef {
        iata: "GRU",
        name: "Sao Paulo-Guarulhos International Airport",
        city: "Sao Paulo",
        country: "Brazil",
        latitude: -23.4356,
        longitude: -46.4731,
        weight: 2,
    },
    AirportRef {
        iata: "KEF",
        name: "Keflavik International Airport",
        city: "Reykjavik",
        country: "Iceland",
        latitude: 63.9850,
        longitude: -22.6056,
        weight: 3,
    },
    AirportRef {
        iata: "LHR",
        name: "London Heathrow Airport",
        city: "London",
        country: "United Kingdom",
        latitude: 51.4700,
        longitude: -0.4543,
        weight: 1,
    },
    AirportRef {
        iata: "CDG",
        name: "Paris Charles de Gaulle Airport",
        city: "Paris",
        country: "France",
        latitude: 49.0097,
        longitude: 2.5479,
        weight: 1,
    },
    AirportRef {
        iata: "AMS",
        name: "Amsterdam Airport Schiphol",
        city: "Amsterdam",
        country: "Netherlands",
        latitude: 52.3105,
        longitude: 4.7683,
        weight: 1,
    },
    AirportRef {
        iata: "FRA",
        name: "Frankfurt Airport",
        city: "Frankfurt",
        country: "Germany",
        latitude: 50.0379,
        longitude: 8.5622,
        weight: 1,
    },
    AirportRef {
        iata: "MAD",
        name: "Adolfo Suarez Madrid-Barajas Airport",
        city: "Madrid",
        country: "Spain",
        latitude: 40.4983,
        longitude: -3.5676,
        weight: 2,
    },
    AirportRef {
        iata: "FCO",
        name: "Leonardo da Vinci-Fiumicino Airport",
        city: "Rome",
        country: "Italy",
        latitude: 41.8003,
        longitude: 12.2389,
        weight: 2,
    },
    AirportRef {
        iata: "DXB",
        name: "Dubai International Airport",
        city: "Dubai",
        country: "United Arab Emirates",
        latitude: 25.2532,
        longitude: 55.3657,
        weight: 1,
    },
    AirportRef {
        iata: "SIN",
        name: "Singapore Changi Airport",
        city: "Singapore",
        country: "Singapore",
        latitude: 1.3644,
        longitude: 103.9915,
        weight: 1,
    },
    AirportRef {
        iata: "HND",
        name: "Tokyo Haneda Airport",
        city: "Tokyo",
        country: "Japan",
        latitude: 35.5494,
        longitude: 139.7798,
        weight: 1,
    },
    AirportRef {
        iata: "SYD",
        name: "Sydney Kingsford Smith Airport",
        city: "Sydney",
        country: "Australia",
        latitude: -33.9399,
        longitude: 151.1753,
        weight: 1,
    },
];

/// Get an airport by its IATA code
///
/// # Arguments
///
/// * `iata` - The three-letter IATA code (uppercase, e.g. "YVR", "LHR")
///
/// # Returns
///
/// Returns `Some(&AirportRef)` if found, `None` otherwise
pub fn get_airport_by_iata(iata: &str) -> Option<&'static AirportRef> {
    AIRPORTS.iter().find(|airport| airport.iata == iata)
}

/// Get all airports in the reference set
pub fn all_airports() -> &'static [AirportRef] {
    &AIRPORTS
}

/// Checks whether a string has the shape of an IATA code
///
/// Three ASCII uppercase letters. Shape only; the code does not have to
/// appear in the reference table.
pub fn is_iata_shaped(code: &str) -> bool {
    code.len() == 3 && code.chars().all(|c| c.is_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_airports_array_has_24_entries() {
        assert_eq!(AIRPORTS.len(), 24);
        assert_eq!(all_airports().len(), 24);
    }

    #[test]
    fn test_all_airports_have_unique_iata_codes() {
        let mut codes: Vec<&str> = all_airports().iter().map(|a| a.iata).collect();
        codes.sort();
        let original_len = codes.len();
        codes.dedup();
        assert_eq!(codes.len(), original_len, "IATA codes are not unique");
    }

    #[test]
    fn test_all_iata_codes_are_well_formed() {
        for airport in all_airports() {
            assert!(
                is_iata_shaped(airport.iata),
                "Airport {} has malformed IATA code {}",
                airport.name,
                airport.iata
            );
        }
    }

    #[test]
    fn test_each_airport_has_valid_coordinates() {
        for airport in all_airports() {
            assert!(
                airport.latitude >= -90.0 && airport.latitude <= 90.0,
                "Airport {} has invalid latitude: {}",
                airport.iata,
                airport.latitude
            );
            assert!(
                airport.longitude >= -180.0 && airport.longitude <= 180.0,
                "Airport {} has invalid longitude: {}",
                airport.iata,
                airport.longitude
            );
        }
    }

    #[test]
    fn test_weight_tiers_are_in_range() {
        for airport in all_airports() {
            assert!(
                (1..=3).contains(&airport.weight),
                "Airport {} has weight outside 1..=3: {}",
                airport.iata,
                airport.weight
            );
        }
    }

    #[test]
    fn test_get_airport_by_iata_returns_correct_airport() {
        let airport = get_airport_by_iata("YVR");
        assert!(airport.is_some());
        let airport = airport.unwrap();
        assert_eq!(airport.iata, "YVR");
        assert_eq!(airport.city, "Vancouver");
        assert!((airport.latitude - 49.1947).abs() < 0.0001);
    }

    #[test]
    fn test_get_airport_by_iata_is_case_sensitive() {
        assert!(get_airport_by_iata("yvr").is_none());
        assert!(get_airport_by_iata("").is_none());
        assert!(get_airport_by_iata("XXX").is_none());
    }

    #[test]
    fn test_is_iata_shaped() {
        assert!(is_iata_shaped("YVR"));
        assert!(is_iata_shaped("KEF"));
        assert!(!is_iata_shaped("yvr"));
        assert!(!is_iata_shaped("YV"));
        assert!(!is_iata_shaped("YVRX"));
        assert!(!is_iata_shaped("Y1R"));
        assert!(!is_iata_shaped(""));
    }
}
