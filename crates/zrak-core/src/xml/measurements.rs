//! Hourly measurement parser.

use zrak_types::{Measurement, ParseResult};

use super::{
    CODE_ATTRIBUTE, Element, ElementVisitor, STATION_ELEMENT, parse_concentration,
    parse_feed_date, visit,
};

/// Parse measurement records from an hourly feed (latest or 7-day).
///
/// Every `<postaja>` with a non-empty `sifra` yields one record, in document
/// order. Unknown child elements are ignored and unreadable values are left
/// absent.
pub fn parse_measurements(data: &[u8]) -> ParseResult<Vec<Measurement>> {
    let mut visitor = MeasurementVisitor::default();
    visit(data, &mut visitor)?;
    Ok(visitor.measurements)
}

#[derive(Default)]
struct MeasurementVisitor {
    measurements: Vec<Measurement>,
    current: Option<Measurement>,
}

impl ElementVisitor for MeasurementVisitor {
    fn start(&mut self, element: &Element) {
        if element.name == STATION_ELEMENT {
            let code = element.attribute(CODE_ATTRIBUTE).unwrap_or_default().trim();
            self.current = Some(Measurement::new(code));
        }
    }

    fn end(&mut self, name: &str, text: &str) {
        if name == STATION_ELEMENT {
            if let Some(measurement) = self.current.take()
                && !measurement.station_code.is_empty()
            {
                self.measurements.push(measurement);
            }
            return;
        }

        let Some(m) = self.current.as_mut() else {
            return;
        };
        match name {
            "datum_od" => m.interval_start = parse_feed_date(text),
            "datum_do" => m.interval_end = parse_feed_date(text),
            "pm2.5" => m.pm25 = parse_concentration(text),
            "pm10" => m.pm10 = parse_concentration(text),
            "no2" => m.no2 = parse_concentration(text),
            "o3" => m.o3 = parse_concentration(text),
            "so2" => m.so2 = parse_concentration(text),
            "co" => m.co = parse_concentration(text),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    const HOURLY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<arsopodatki verzija="1.4">
  <vir>Agencija RS za okolje</vir>
  <datum_priprave>2024-01-15 11:10</datum_priprave>
  <postaja sifra="E403" wgs84_sirina="46.0514" wgs84_dolzina="14.5060">
    <merilno_mesto>LJ Center</merilno_mesto>
    <datum_od>2024-01-15 09:00</datum_od>
    <datum_do>2024-01-15 10:00</datum_do>
    <pm10>31</pm10>
    <pm2.5>18,4</pm2.5>
    <no2>42</no2>
    <o3></o3>
    <so2/>
    <co>0,4</co>
  </postaja>
  <postaja sifra="E21">
    <datum_od>2024-01-15 09:00</datum_od>
    <datum_do></datum_do>
    <pm10>n/a</pm10>
  </postaja>
</arsopodatki>"#;

    #[test]
    fn test_parse_hourly_feed() {
        let measurements = parse_measurements(HOURLY.as_bytes()).unwrap();
        assert_eq!(measurements.len(), 2);

        let m = &measurements[0];
        assert_eq!(m.station_code, "E403");
        assert_eq!(m.interval_start, Some(datetime!(2024-01-15 08:00 UTC)));
        assert_eq!(m.interval_end, Some(datetime!(2024-01-15 09:00 UTC)));
        assert_eq!(m.pm10, Some(31.0));
        assert_eq!(m.pm25, Some(18.4));
        assert_eq!(m.no2, Some(42.0));
        assert_eq!(m.o3, None);
        assert_eq!(m.so2, None);
        assert_eq!(m.co, Some(0.4));
    }

    #[test]
    fn test_unreadable_values_are_absent() {
        let measurements = parse_measurements(HOURLY.as_bytes()).unwrap();
        let m = &measurements[1];
        assert_eq!(m.station_code, "E21");
        assert!(m.interval_end.is_none());
        assert_eq!(m.last_update(), Some(datetime!(2024-01-15 08:00 UTC)));
        assert!(m.pm10.is_none());
        assert!(m.pm25.is_none());
    }

    #[test]
    fn test_zero_is_distinct_from_absent() {
        let xml = r#"<r><postaja sifra="E1"><pm2.5>0</pm2.5></postaja></r>"#;
        let measurements = parse_measurements(xml.as_bytes()).unwrap();
        assert_eq!(measurements[0].pm25, Some(0.0));
        assert_eq!(measurements[0].pm10, None);
    }

    #[test]
    fn test_drops_records_without_code() {
        let xml = r#"<r>
  <postaja sifra="  "><pm10>5</pm10></postaja>
  <postaja><pm10>6</pm10></postaja>
  <postaja sifra="E1"><pm10>7</pm10></postaja>
</r>"#;
        let measurements = parse_measurements(xml.as_bytes()).unwrap();
        assert_eq!(measurements.len(), 1);
        assert_eq!(measurements[0].station_code, "E1");
    }

    #[test]
    fn test_values_outside_station_are_ignored() {
        let xml = r#"<r><pm10>99</pm10><postaja sifra="E1"/></r>"#;
        let measurements = parse_measurements(xml.as_bytes()).unwrap();
        assert_eq!(measurements.len(), 1);
        assert!(measurements[0].pm10.is_none());
    }

    #[test]
    fn test_keeps_duplicates_in_document_order() {
        let xml = r#"<r>
  <postaja sifra="E1"><pm10>1</pm10></postaja>
  <postaja sifra="E1"><pm10>2</pm10></postaja>
</r>"#;
        let measurements = parse_measurements(xml.as_bytes()).unwrap();
        let values: Vec<_> = measurements.iter().map(|m| m.pm10).collect();
        assert_eq!(values, vec![Some(1.0), Some(2.0)]);
    }

    #[test]
    fn test_unterminated_document_is_error() {
        let xml = r#"<arsopodatki><postaja sifra="E1"><pm10>1</pm10>"#;
        assert!(parse_measurements(xml.as_bytes()).is_err());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Arbitrary bytes never panic the parser.
        #[test]
        fn parse_never_panics(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            let _ = parse_measurements(&data);
            let _ = crate::xml::parse_stations(&data);
        }

        /// Numeric text inside a pollutant element always survives parsing.
        #[test]
        fn pm10_value_roundtrips(value in 0.0f64..1000.0) {
            let text = format!("{:.1}", value);
            let xml = format!(r#"<r><postaja sifra="E1"><pm10>{}</pm10></postaja></r>"#, text.replace('.', ","));
            let measurements = parse_measurements(xml.as_bytes()).unwrap();
            let expected: f64 = text.parse().unwrap();
            prop_assert_eq!(measurements[0].pm10, Some(expected));
        }

        /// Every station element with a code yields exactly one record.
        #[test]
        fn one_record_per_coded_station(codes in proptest::collection::vec("[A-Z][0-9]{1,3}", 0..20)) {
            let body: String = codes
                .iter()
                .map(|c| format!(r#"<postaja sifra="{}"><pm10>1</pm10></postaja>"#, c))
                .collect();
            let xml = format!("<arsopodatki>{}</arsopodatki>", body);
            let measurements = parse_measurements(xml.as_bytes()).unwrap();
            let parsed: Vec<_> = measurements.iter().map(|m| m.station_code.clone()).collect();
            prop_assert_eq!(parsed, codes);
        }
    }
}
