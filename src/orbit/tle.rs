use std::fs;
use std::ops::Range;
use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Serialize;

use crate::orbit::error::OrbitError;

const FALLBACK_LINE1: &str =
    "1 25544U 98067A   24103.43211991  .00018476  00000+0  32968-3 0  9996";
const FALLBACK_LINE2: &str =
    "2 25544  51.6405  60.2146 0004116 162.5696 274.5025 15.50060690552075";

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Raw two-line element text
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TleSet {
    line1: String,
    line2: String,
}

/// Line 2 fields as published, angles still in degrees
#[derive(Debug, Clone, PartialEq)]
pub struct ElementFields {
    pub norad_id: u32,
    pub inclination_deg: f64,
    pub raan_deg: f64,
    pub eccentricity: f64,
    pub arg_perigee_deg: f64,
    pub mean_anomaly_deg: f64,
    pub mean_motion_rev_day: f64,
    pub epoch: DateTime<Utc>,
}

/// One satellite from a catalog listing
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    pub norad_id: u32,
    pub tle: TleSet,
}

impl TleSet {
    pub fn new(line1: impl Into<String>, line2: impl Into<String>) -> Self {
        Self {
            line1: line1.into().trim().to_string(),
            line2: line2.into().trim().to_string(),
        }
    }

    /// Built-in ISS element set used when nothing fresher is available
    pub fn fallback() -> Self {
        Self::new(FALLBACK_LINE1, FALLBACK_LINE2)
    }

    /// Pick the element lines out of a catalog service response body
    pub fn from_response_text(text: &str) -> Result<Self, OrbitError> {
        let lines: Vec<&str> = text
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect();

        let line1 = lines.iter().find(|l| l.starts_with("1 "));
        let line2 = lines.iter().find(|l| l.starts_with("2 "));
        match (line1, line2) {
            (Some(line1), Some(line2)) => Ok(Self::new(*line1, *line2)),
            _ => Err(OrbitError::malformed(
                "lines",
                "response does not contain a line 1 and line 2",
            )),
        }
    }

    pub fn line1(&self) -> &str {
        &self.line1
    }

    pub fn line2(&self) -> &str {
        &self.line2
    }

    pub fn norad_id(&self) -> Result<u32, OrbitError> {
        self.check_prefixes()?;
        let raw = column(&self.line1, 2..7, "catalog number")?.trim();
        raw.parse()
            .map_err(|_| OrbitError::malformed("catalog number", format!("not a number: {raw:?}")))
    }

    /// Whether the last column of both lines matches [`line_checksum`]
    pub fn checksums_valid(&self) -> bool {
        [&self.line1, &self.line2].into_iter().all(|line| {
            line.len() == 69
                && line.as_bytes()[68].is_ascii_digit()
                && u32::from(line.as_bytes()[68] - b'0') == line_checksum(line)
        })
    }

    /// Extract the fixed-column fields. Checksums are not verified.
    pub fn fields(&self) -> Result<ElementFields, OrbitError> {
        self.check_prefixes()?;
        let line2 = self.line2.as_str();

        Ok(ElementFields {
            norad_id: self.norad_id()?,
            inclination_deg: parse_float(line2, 8..16, "inclination")?,
            raan_deg: parse_float(line2, 17..25, "raan")?,
            eccentricity: parse_eccentricity(line2)?,
            arg_perigee_deg: parse_float(line2, 34..42, "argument of perigee")?,
            mean_anomaly_deg: parse_float(line2, 43..51, "mean anomaly")?,
            mean_motion_rev_day: parse_float(line2, 52..63, "mean motion")?,
            epoch: parse_epoch(&self.line1)?,
        })
    }

    fn check_prefixes(&self) -> Result<(), OrbitError> {
        if !self.line1.starts_with("1 ") {
            return Err(OrbitError::malformed("line 1", "expected \"1 \" prefix"));
        }
        if !self.line2.starts_with("2 ") {
            return Err(OrbitError::malformed("line 2", "expected \"2 \" prefix"));
        }
        Ok(())
    }
}

/// Modulo-10 sum over the first 68 columns; digits count at face value and
/// `-` counts as one
pub fn line_checksum(line: &str) -> u32 {
    line.bytes()
        .take(68)
        .map(|b| match b {
            b'0'..=b'9' => u32::from(b - b'0'),
            b'-' => 1,
            _ => 0,
        })
        .sum::<u32>()
        % 10
}

fn column<'a>(line: &'a str, range: Range<usize>, field: &'static str) -> Result<&'a str, OrbitError> {
    line.get(range.clone()).ok_or_else(|| {
        OrbitError::malformed(
            field,
            format!("line too short for columns {}..{}", range.start, range.end),
        )
    })
}

fn parse_float(line: &str, range: Range<usize>, field: &'static str) -> Result<f64, OrbitError> {
    let raw = column(line, range, field)?.trim();
    let value: f64 = raw
        .parse()
        .map_err(|_| OrbitError::malformed(field, format!("not a number: {raw:?}")))?;
    if !value.is_finite() {
        return Err(OrbitError::malformed(field, format!("not finite: {raw:?}")));
    }
    Ok(value)
}

// Published with an implied leading decimal point
fn parse_eccentricity(line2: &str) -> Result<f64, OrbitError> {
    let raw = column(line2, 26..33, "eccentricity")?.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(OrbitError::malformed(
            "eccentricity",
            format!("expected digits, got {raw:?}"),
        ));
    }
    format!("0.{raw}")
        .parse()
        .map_err(|_| OrbitError::malformed("eccentricity", format!("not a number: {raw:?}")))
}

fn parse_epoch(line1: &str) -> Result<DateTime<Utc>, OrbitError> {
    let raw_year = column(line1, 18..20, "epoch year")?.trim();
    let two_digit_year: i32 = raw_year
        .parse::<u32>()
        .map_err(|_| OrbitError::malformed("epoch year", format!("not a number: {raw_year:?}")))?
        as i32;
    let year = if two_digit_year < 57 {
        two_digit_year + 2000
    } else {
        two_digit_year + 1900
    };

    let day = parse_float(line1, 20..32, "epoch day")?;
    if !(1.0..367.0).contains(&day) {
        return Err(OrbitError::malformed(
            "epoch day",
            format!("day of year out of range: {day}"),
        ));
    }

    let whole_day = day.floor();
    let fraction_ms = ((day - whole_day) * MILLIS_PER_DAY).round() as i64;
    let start_of_year = Utc
        .with_ymd_and_hms(year, 1, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| OrbitError::malformed("epoch year", format!("invalid year {year}")))?;

    Ok(start_of_year + Duration::days(whole_day as i64 - 1) + Duration::milliseconds(fraction_ms))
}

/// Parse catalog text holding any mix of 2-line and named 3-line entries.
///
/// A non-element line names the pair that follows it. Unpaired element
/// lines and entries without a numeric catalog number are skipped.
pub fn parse_catalog(content: &str) -> Vec<CatalogEntry> {
    let mut entries = Vec::new();
    let mut name: Option<&str> = None;
    let mut lines = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .peekable();

    while let Some(line) = lines.next() {
        if line.starts_with("2 ") {
            log::warn!("Skipping line 2 without a preceding line 1");
            name = None;
            continue;
        }
        if !line.starts_with("1 ") {
            // "0 " prefixed in some catalogs
            name = Some(line.strip_prefix("0 ").unwrap_or(line).trim());
            continue;
        }

        let label = name.take();
        let Some(line2) = lines.next_if(|l| l.starts_with("2 ")) else {
            log::warn!("Skipping {}: line 1 without a line 2", label.unwrap_or("unnamed entry"));
            continue;
        };

        let tle = TleSet::new(line, line2);
        match tle.norad_id() {
            Ok(norad_id) => entries.push(CatalogEntry {
                name: label.map_or_else(|| format!("NORAD {}", norad_id), str::to_string),
                norad_id,
                tle,
            }),
            Err(e) => {
                log::warn!("Skipping catalog entry: {}", e);
            }
        }
    }

    entries
}

pub fn load_catalog_file(path: &Path) -> Result<Vec<CatalogEntry>, OrbitError> {
    let content = fs::read_to_string(path)?;
    let entries = parse_catalog(&content);
    log::debug!("Loaded {} element sets from {}", entries.len(), path.display());
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    const WIKI_LINE1: &str =
        "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  2927";
    const WIKI_LINE2: &str =
        "2 25544  51.6416 247.4627 0006703 130.5360 325.0288 15.72125391563537";

    #[test]
    fn test_fallback_fields() {
        let fields = TleSet::fallback().fields().unwrap();
        assert_eq!(fields.norad_id, 25544);
        assert_eq!(fields.inclination_deg, 51.6405);
        assert_eq!(fields.raan_deg, 60.2146);
        assert_eq!(fields.eccentricity, 0.0004116);
        assert_eq!(fields.arg_perigee_deg, 162.5696);
        assert_eq!(fields.mean_anomaly_deg, 274.5025);
        assert_eq!(fields.mean_motion_rev_day, 15.50060690);
    }

    #[test]
    fn test_checksums() {
        assert_eq!(line_checksum(WIKI_LINE1), 7);
        assert_eq!(line_checksum(WIKI_LINE2), 7);
        assert!(TleSet::new(WIKI_LINE1, WIKI_LINE2).checksums_valid());
        assert!(TleSet::fallback().checksums_valid());

        let corrupted = WIKI_LINE2.replacen("51.6416", "51.6417", 1);
        assert!(!TleSet::new(WIKI_LINE1, corrupted).checksums_valid());
        assert!(!TleSet::new(WIKI_LINE1, &WIKI_LINE2[..68]).checksums_valid());
    }

    #[test]
    fn test_epoch_reconstruction() {
        // Day 103 of 2024 is April 12; .43211991 of a day is 10:22:15.160
        let epoch = TleSet::fallback().fields().unwrap().epoch;
        let expected = Utc.with_ymd_and_hms(2024, 4, 12, 10, 22, 15).unwrap()
            + Duration::milliseconds(160);
        assert_eq!(epoch, expected);
    }

    #[test]
    fn test_epoch_year_pivot() {
        let epoch = TleSet::new(WIKI_LINE1, WIKI_LINE2).fields().unwrap().epoch;
        assert_eq!(epoch.date_naive().to_string(), "2008-09-20");
        assert_eq!(epoch.hour(), 12);

        let old = WIKI_LINE1.replacen("08264", "98264", 1);
        let epoch = TleSet::new(old, WIKI_LINE2).fields().unwrap().epoch;
        assert_eq!(epoch.date_naive().to_string(), "1998-09-21");
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        let tle = TleSet::new(format!("  {WIKI_LINE1}  "), format!("{WIKI_LINE2}\r"));
        assert_eq!(tle.line1(), WIKI_LINE1);
        assert!(tle.fields().is_ok());
    }

    #[test]
    fn test_wrong_prefix_is_malformed() {
        let tle = TleSet::new(WIKI_LINE2, WIKI_LINE1);
        assert!(matches!(
            tle.fields(),
            Err(OrbitError::MalformedElementSet { field: "line 1", .. })
        ));
    }

    #[test]
    fn test_bad_numeric_field_is_malformed() {
        let line2 = WIKI_LINE2.replacen("51.6416", "51.6x16", 1);
        assert!(matches!(
            TleSet::new(WIKI_LINE1, line2).fields(),
            Err(OrbitError::MalformedElementSet { field: "inclination", .. })
        ));

        let line2 = WIKI_LINE2.replacen("0006703", "00A6703", 1);
        assert!(matches!(
            TleSet::new(WIKI_LINE1, line2).fields(),
            Err(OrbitError::MalformedElementSet { field: "eccentricity", .. })
        ));

        let line2 = WIKI_LINE2.replacen(" 51.6416", "     NaN", 1);
        assert!(matches!(
            TleSet::new(WIKI_LINE1, line2).fields(),
            Err(OrbitError::MalformedElementSet { field: "inclination", .. })
        ));
    }

    #[test]
    fn test_truncated_line_is_malformed() {
        let tle = TleSet::new(WIKI_LINE1, &WIKI_LINE2[..45]);
        assert!(matches!(
            tle.fields(),
            Err(OrbitError::MalformedElementSet { field: "mean anomaly", .. })
        ));
    }

    #[test]
    fn test_day_of_year_out_of_range() {
        let line1 = WIKI_LINE1.replacen("08264.51782528", "08000.51782528", 1);
        assert!(matches!(
            TleSet::new(line1, WIKI_LINE2).fields(),
            Err(OrbitError::MalformedElementSet { field: "epoch day", .. })
        ));
    }

    #[test]
    fn test_response_text_extraction() {
        let body = format!("ISS (ZARYA)\r\n{WIKI_LINE1}\r\n{WIKI_LINE2}\r\n\r\n");
        let tle = TleSet::from_response_text(&body).unwrap();
        assert_eq!(tle.line1(), WIKI_LINE1);
        assert_eq!(tle.line2(), WIKI_LINE2);

        assert!(TleSet::from_response_text("No GP data found").is_err());
    }

    #[test]
    fn test_parse_catalog_mixed_entries() {
        let content = format!(
            "0 ISS (ZARYA)\n{WIKI_LINE1}\n{WIKI_LINE2}\n\n{}\n{}\ntrailing garbage\n",
            TleSet::fallback().line1(),
            TleSet::fallback().line2()
        );
        let entries = parse_catalog(&content);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "ISS (ZARYA)");
        assert_eq!(entries[0].norad_id, 25544);
        assert_eq!(entries[1].name, "NORAD 25544");
    }

    #[test]
    fn test_parse_catalog_skips_unpaired_lines() {
        let content = format!(
            "{WIKI_LINE2}\nLONELY\n{WIKI_LINE1}\nNAMED\n{WIKI_LINE1}\n{WIKI_LINE2}\n"
        );
        let entries = parse_catalog(&content);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "NAMED");

        let bad_id = WIKI_LINE1.replacen("25544", "A5544", 1);
        assert!(parse_catalog(&format!("{bad_id}\n{WIKI_LINE2}\n")).is_empty());
    }

    #[test]
    fn test_load_missing_catalog_file() {
        assert!(matches!(
            load_catalog_file(Path::new("/nonexistent/stations.tle")),
            Err(OrbitError::FileRead(_))
        ));
    }
}
