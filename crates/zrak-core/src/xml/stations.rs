//! Station directory parser.

use zrak_types::{ParseResult, Station};

use super::{CODE_ATTRIBUTE, Element, ElementVisitor, STATION_ELEMENT, parse_coordinate, visit};

const LATITUDE_ATTRIBUTE: &str = "wgs84_sirina";
const LONGITUDE_ATTRIBUTE: &str = "wgs84_dolzina";
const NAME_ELEMENT: &str = "merilno_mesto";

/// Parse station records from a daily-directory or hourly feed.
///
/// A record is kept only when it has a non-empty code and both coordinates
/// parse. Records are returned in document order; duplicates are not merged.
pub fn parse_stations(data: &[u8]) -> ParseResult<Vec<Station>> {
    let mut visitor = StationVisitor::default();
    visit(data, &mut visitor)?;
    Ok(visitor.stations)
}

struct PendingStation {
    code: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    name: String,
}

#[derive(Default)]
struct StationVisitor {
    stations: Vec<Station>,
    current: Option<PendingStation>,
}

impl ElementVisitor for StationVisitor {
    fn start(&mut self, element: &Element) {
        if element.name != STATION_ELEMENT {
            return;
        }
        self.current = Some(PendingStation {
            code: element
                .attribute(CODE_ATTRIBUTE)
                .unwrap_or_default()
                .trim()
                .to_string(),
            latitude: parse_coordinate(element.attribute(LATITUDE_ATTRIBUTE)),
            longitude: parse_coordinate(element.attribute(LONGITUDE_ATTRIBUTE)),
            name: String::new(),
        });
    }

    fn end(&mut self, name: &str, text: &str) {
        match name {
            NAME_ELEMENT => {
                if let Some(pending) = self.current.as_mut() {
                    pending.name = text.to_string();
                }
            }
            STATION_ELEMENT => {
                let Some(pending) = self.current.take() else {
                    return;
                };
                if pending.code.is_empty() {
                    return;
                }
                if let (Some(latitude), Some(longitude)) = (pending.latitude, pending.longitude) {
                    self.stations
                        .push(Station::new(pending.code, pending.name, latitude, longitude));
                }
            }
            _ => {}
        }
    }
}
