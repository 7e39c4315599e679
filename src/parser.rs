//! Decoders for trip-info record files: CSV, JSON and the simulator's XML.

use std::collections::HashMap;
use std::fmt::Display;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use flate2::read::GzDecoder;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use tracing::debug;

use crate::error::SourceError;
use crate::record::TripRecord;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Encoding of a record file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// Comma or semicolon separated, one record per row, with a header row.
    Csv,
    /// A JSON array of record objects.
    Json,
    /// The simulator's native output: one `<tripinfo .../>` element per
    /// record, fields as attributes.
    Xml,
}

impl FromStr for RecordFormat {
    type Err = SourceError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "csv" => Ok(RecordFormat::Csv),
            "json" => Ok(RecordFormat::Json),
            "xml" => Ok(RecordFormat::Xml),
            other => Err(SourceError::UnknownFormat(other.to_string())),
        }
    }
}

impl RecordFormat {
    /// Infers the format from a path or URL extension, looking through a
    /// trailing `.gz`. Defaults to CSV.
    pub fn from_path(path: &str) -> Self {
        let path = path.strip_suffix(".gz").unwrap_or(path);
        match Path::new(path).extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => RecordFormat::Json,
            Some(ext) if ext.eq_ignore_ascii_case("xml") => RecordFormat::Xml,
            _ => RecordFormat::Csv,
        }
    }
}

/// Decodes all records in `bytes`. Gzip-compressed input is detected and
/// decompressed first.
///
/// # Errors
///
/// Returns [`SourceError::MalformedRecord`] for the first row with a missing
/// or non-numeric field.
pub fn parse_records(bytes: &[u8], format: RecordFormat) -> Result<Vec<TripRecord>, SourceError> {
    if bytes.starts_with(&GZIP_MAGIC) {
        let mut decoded = Vec::new();
        GzDecoder::new(bytes).read_to_end(&mut decoded)?;
        debug!(compressed = bytes.len(), decoded = decoded.len(), "Decompressed gzip source");
        return parse_records(&decoded, format);
    }

    let records = match format {
        RecordFormat::Csv => parse_csv(bytes)?,
        RecordFormat::Json => parse_json(bytes)?,
        RecordFormat::Xml => parse_xml(bytes)?,
    };
    debug!(records = records.len(), ?format, "Records decoded");
    Ok(records)
}

fn parse_csv(bytes: &[u8]) -> Result<Vec<TripRecord>, SourceError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(sniff_delimiter(bytes))
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: TripRecord = result.map_err(|e| SourceError::MalformedRecord {
            line: e.position().map(|p| p.line()).unwrap_or(0),
            reason: e.to_string(),
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Converters for the simulator's XML output write `;`-separated files.
fn sniff_delimiter(bytes: &[u8]) -> u8 {
    let header = bytes.split(|&b| b == b'\n').next().unwrap_or_default();
    if header.contains(&b';') && !header.contains(&b',') {
        b';'
    } else {
        b','
    }
}

fn parse_json(bytes: &[u8]) -> Result<Vec<TripRecord>, SourceError> {
    serde_json::from_slice(bytes).map_err(|e| {
        if e.is_data() {
            SourceError::MalformedRecord {
                line: e.line() as u64,
                reason: e.to_string(),
            }
        } else {
            SourceError::Json(e)
        }
    })
}

fn parse_xml(bytes: &[u8]) -> Result<Vec<TripRecord>, SourceError> {
    let mut reader = Reader::from_reader(bytes);
    let mut records = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"tripinfo" => {
                let end = (reader.buffer_position() as usize).min(bytes.len());
                let line = bytes[..end].iter().filter(|&&b| b == b'\n').count() as u64 + 1;
                let malformed = |reason: String| SourceError::MalformedRecord { line, reason };

                let mut attrs = HashMap::new();
                for attr in e.attributes() {
                    let attr = attr.map_err(|err| malformed(err.to_string()))?;
                    let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                    attrs.insert(key, attr.unescape_value()?.into_owned());
                }
                records.push(trip_from_attributes(&attrs).map_err(malformed)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(records)
}

fn trip_from_attributes(attrs: &HashMap<String, String>) -> Result<TripRecord, String> {
    fn attr<T>(attrs: &HashMap<String, String>, name: &str) -> Result<T, String>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = attrs
            .get(name)
            .ok_or_else(|| format!("missing attribute `{name}`"))?;
        raw.trim()
            .parse()
            .map_err(|e| format!("attribute `{name}`: {e} ({raw:?})"))
    }

    Ok(TripRecord {
        id: attr(attrs, "id")?,
        depart: attr(attrs, "depart")?,
        arrival: attr(attrs, "arrival")?,
        duration: attr(attrs, "duration")?,
        route_length: attr(attrs, "routeLength")?,
        waiting_time: attr(attrs, "waitingTime")?,
        time_loss: attr(attrs, "timeLoss")?,
        stop_time: attr(attrs, "stopTime")?,
        reroute_no: attr(attrs, "rerouteNo")?,
    })
}
