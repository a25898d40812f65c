//! Streaming parsers for ARSO XML feeds.
//!
//! Both ARSO feed families share one document shape: a flat list of
//! `<postaja>` elements keyed by a `sifra` attribute. The station directory
//! carries coordinates and a `<merilno_mesto>` name; the hourly feeds carry
//! interval bounds and pollutant values as child elements.
//!
//! Parsing is field-tolerant: a value that cannot be read becomes absent and
//! a record missing its required keys is dropped. Only a structurally broken
//! document (unterminated element, mismatched tags, invalid UTF-8) is an
//! error.
//!
//! # Example
//!
//! ```
//! use zrak_core::xml::{parse_measurements, parse_stations};
//!
//! let xml = br#"<arsopodatki>
//!   <postaja sifra="E403" wgs84_sirina="46,06" wgs84_dolzina="14,51">
//!     <merilno_mesto>LJ Center</merilno_mesto>
//!     <datum_do>2024-01-15 10:00</datum_do>
//!     <pm2.5>12</pm2.5>
//!   </postaja>
//! </arsopodatki>"#;
//!
//! let stations = parse_stations(xml)?;
//! assert_eq!(stations[0].name, "LJ Center");
//!
//! let measurements = parse_measurements(xml)?;
//! assert_eq!(measurements[0].pm25, Some(12.0));
//! # Ok::<(), zrak_types::ParseError>(())
//! ```

mod measurements;
mod stations;

pub use measurements::parse_measurements;
pub use stations::parse_stations;

use chrono::{Datelike, NaiveDateTime, TimeZone};
use chrono_tz::Europe::Ljubljana;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use time::OffsetDateTime;

use zrak_types::{ParseError, ParseResult};

/// Element name of a station record.
pub(crate) const STATION_ELEMENT: &str = "postaja";
/// Attribute carrying the station code.
pub(crate) const CODE_ATTRIBUTE: &str = "sifra";

/// Wall-clock format used by ARSO for interval bounds.
const FEED_DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Years accepted in interval bounds.
const FEED_YEARS: std::ops::RangeInclusive<i32> = 1900..=2999;

/// A start tag with its decoded attributes.
#[derive(Debug)]
pub(crate) struct Element {
    pub name: String,
    attributes: Vec<(String, String)>,
}

impl Element {
    /// Look up an attribute value by name.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    fn decode(start: &BytesStart<'_>, position: u64) -> ParseResult<Self> {
        let name = decode_name(start.local_name().as_ref(), position)?;
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute =
                attribute.map_err(|e| ParseError::malformed(position, e.to_string()))?;
            let key = decode_name(attribute.key.local_name().as_ref(), position)?;
            let value = attribute
                .unescape_value()
                .map_err(|e| ParseError::malformed(position, e.to_string()))?;
            attributes.push((key, value.into_owned()));
        }
        Ok(Self { name, attributes })
    }
}

/// Receives element boundaries from [`visit`].
pub(crate) trait ElementVisitor {
    /// Called for every start tag (and for self-closing tags).
    fn start(&mut self, element: &Element);

    /// Called for every end tag with the trimmed text collected since the
    /// most recent start or end tag.
    fn end(&mut self, name: &str, text: &str);
}

/// Walk a document, reporting element boundaries to `visitor`.
pub(crate) fn visit<V: ElementVisitor>(data: &[u8], visitor: &mut V) -> ParseResult<()> {
    let mut reader = Reader::from_reader(data);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut open: Vec<String> = Vec::new();
    let mut text = String::new();

    loop {
        let position = reader.buffer_position() as u64;
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(start)) => {
                text.clear();
                let element = Element::decode(&start, position)?;
                visitor.start(&element);
                open.push(element.name);
            }
            Ok(Event::Empty(start)) => {
                text.clear();
                let element = Element::decode(&start, position)?;
                visitor.start(&element);
                visitor.end(&element.name, "");
            }
            Ok(Event::Text(chunk)) => {
                let chunk = chunk
                    .unescape()
                    .map_err(|e| ParseError::malformed(position, e.to_string()))?;
                text.push_str(&chunk);
            }
            Ok(Event::CData(chunk)) => {
                let chunk = std::str::from_utf8(chunk.as_ref())
                    .map_err(|e| ParseError::malformed(position, e.to_string()))?;
                text.push_str(chunk);
            }
            Ok(Event::End(end)) => {
                let name = decode_name(end.local_name().as_ref(), position)?;
                open.pop();
                visitor.end(&name, text.trim());
                text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ParseError::malformed(
                    reader.error_position() as u64,
                    e.to_string(),
                ));
            }
            _ => {}
        }
        buf.clear();
    }

    match open.pop() {
        Some(element) => Err(ParseError::UnterminatedElement { element }),
        None => Ok(()),
    }
}

fn decode_name(raw: &[u8], position: u64) -> ParseResult<String> {
    std::str::from_utf8(raw)
        .map(str::to_owned)
        .map_err(|e| ParseError::malformed(position, e.to_string()))
}

/// Parse a coordinate attribute, accepting a decimal comma.
pub(crate) fn parse_coordinate(raw: Option<&str>) -> Option<f64> {
    let trimmed = raw?.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

/// Parse a pollutant value.
///
/// Decimal commas become dots and every character other than ASCII digits,
/// `.` and `-` is stripped (units, flags, stray whitespace). Anything left that
/// still does not parse is treated as not reported.
pub(crate) fn parse_concentration(raw: &str) -> Option<f64> {
    let numeric: String = raw
        .replace(',', ".")
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    if numeric.is_empty() {
        return None;
    }
    numeric.parse::<f64>().ok()
}

/// Parse an interval bound given as Europe/Ljubljana wall-clock time.
///
/// Ambiguous times (autumn fall-back) resolve to the earlier instant; times
/// that do not exist (spring-forward gap) are treated as absent, as are years
/// outside 1900..=2999.
pub(crate) fn parse_feed_date(raw: &str) -> Option<OffsetDateTime> {
    if raw.is_empty() {
        return None;
    }
    let naive = NaiveDateTime::parse_from_str(raw, FEED_DATE_FORMAT).ok()?;
    if !FEED_YEARS.contains(&naive.year()) {
        return None;
    }
    let local = Ljubljana.from_local_datetime(&naive).earliest()?;
    OffsetDateTime::from_unix_timestamp(local.timestamp()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    struct Recorder(Vec<String>);

    impl ElementVisitor for Recorder {
        fn start(&mut self, element: &Element) {
            self.0.push(format!("+{}", element.name));
        }

        fn end(&mut self, name: &str, text: &str) {
            self.0.push(format!("-{}:{}", name, text));
        }
    }

    #[test]
    fn test_visit_reports_boundaries_and_text() {
        let mut recorder = Recorder(Vec::new());
        visit(b"<a><b> hi </b><c/></a>", &mut recorder).unwrap();
        assert_eq!(recorder.0, vec!["+a", "+b", "-b:hi", "+c", "-c:", "-a:"]);
    }

    #[test]
    fn test_visit_unescapes_entities() {
        let mut recorder = Recorder(Vec::new());
        visit(b"<a>Ko&amp;per</a>", &mut recorder).unwrap();
        assert_eq!(recorder.0, vec!["+a", "-a:Ko&per"]);
    }

    #[test]
    fn test_visit_rejects_unterminated_element() {
        let mut recorder = Recorder(Vec::new());
        let err = visit(b"<a><b>text</b>", &mut recorder).unwrap_err();
        match err {
            ParseError::UnterminatedElement { element } => assert_eq!(element, "a"),
            other => assert!(matches!(other, ParseError::MalformedXml { .. })),
        }
    }

    #[test]
    fn test_visit_rejects_mismatched_end() {
        let mut recorder = Recorder(Vec::new());
        let err = visit(b"<a><b></a></b>", &mut recorder).unwrap_err();
        assert!(matches!(err, ParseError::MalformedXml { .. }));
    }

    #[test]
    fn test_parse_coordinate() {
        assert_eq!(parse_coordinate(Some("46,0500")), Some(46.05));
        assert_eq!(parse_coordinate(Some(" 14.5 ")), Some(14.5));
        assert_eq!(parse_coordinate(Some("")), None);
        assert_eq!(parse_coordinate(Some("north")), None);
        assert_eq!(parse_coordinate(Some("NaN")), None);
        assert_eq!(parse_coordinate(None), None);
    }

    #[test]
    fn test_parse_concentration() {
        assert_eq!(parse_concentration("12"), Some(12.0));
        assert_eq!(parse_concentration("12,5"), Some(12.5));
        assert_eq!(parse_concentration("<3"), Some(3.0));
        assert_eq!(parse_concentration(" 7 ug "), Some(7.0));
        assert_eq!(parse_concentration("-1"), Some(-1.0));
        assert_eq!(parse_concentration("0"), Some(0.0));
        assert_eq!(parse_concentration(""), None);
        assert_eq!(parse_concentration("n/a"), None);
        assert_eq!(parse_concentration("1.2.3"), None);
    }

    #[test]
    fn test_parse_feed_date_winter_offset() {
        // CET is UTC+1
        assert_eq!(
            parse_feed_date("2024-01-15 10:00"),
            Some(datetime!(2024-01-15 09:00 UTC))
        );
    }

    #[test]
    fn test_parse_feed_date_summer_offset() {
        // CEST is UTC+2
        assert_eq!(
            parse_feed_date("2024-07-01 14:00"),
            Some(datetime!(2024-07-01 12:00 UTC))
        );
    }

    #[test]
    fn test_parse_feed_date_dst_edges() {
        // 02:30 does not exist on 2024-03-31
        assert_eq!(parse_feed_date("2024-03-31 02:30"), None);
        // 02:30 happens twice on 2024-10-27; the CEST instant comes first
        assert_eq!(
            parse_feed_date("2024-10-27 02:30"),
            Some(datetime!(2024-10-27 00:30 UTC))
        );
    }

    #[test]
    fn test_parse_feed_date_rejects_other_formats() {
        assert_eq!(parse_feed_date(""), None);
        assert_eq!(parse_feed_date("15.01.2024 10:00"), None);
        assert_eq!(parse_feed_date("2024-01-15T10:00"), None);
        assert_eq!(parse_feed_date("2024-01-15 10:00:00"), None);
    }

    #[test]
    fn test_parse_feed_date_rejects_implausible_years() {
        assert_eq!(parse_feed_date("-9999-01-05 00:00"), None);
        assert_eq!(parse_feed_date("0024-01-15 10:00"), None);
        assert_eq!(parse_feed_date("12024-01-15 10:00"), None);
        assert_eq!(
            parse_feed_date("1950-01-15 12:00"),
            Some(datetime!(1950-01-15 11:00 UTC))
        );
    }

    // --- invalid encoding ---

    #[test]
    fn test_visit_rejects_invalid_utf8_text() {
        let mut recorder = Recorder(Vec::new());
        let err = visit(b"<postaja sifra=\"E1\"><pm10>\xff\xfe</pm10></postaja>", &mut recorder)
            .unwrap_err();
        assert!(matches!(err, ParseError::MalformedXml { .. }));
    }

    #[test]
    fn test_visit_rejects_invalid_utf8_attribute() {
        let mut recorder = Recorder(Vec::new());
        let err = visit(b"<postaja sifra=\"E\xff\"></postaja>", &mut recorder).unwrap_err();
        assert!(matches!(err, ParseError::MalformedXml { .. }));
    }
}
