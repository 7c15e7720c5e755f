use crate::error::{EngineError, Result};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use shared::models::{Candle, TimeFrame};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

// Timestamp and number handling for exchange CSV exports
pub mod exchange_format {
    use super::*;

    // Accepts epoch milliseconds, RFC 3339 or "YYYY-MM-DD HH:MM:SS" (UTC)
    pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
        let s = s.trim();
        if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
            let millis: i64 = s
                .parse()
                .map_err(|e| EngineError::CsvDataFormatError(format!("Failed to parse timestamp '{}': {}", s, e)))?;
            return Utc
                .timestamp_millis_opt(millis)
                .single()
                .ok_or_else(|| EngineError::CsvDataFormatError(format!("Timestamp out of range '{}'", s)));
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
            .map(|naive| naive.and_utc())
            .map_err(|e| EngineError::CsvDataFormatError(format!("Failed to parse timestamp '{}': {}", s, e)))
    }

    pub fn parse_decimal(s: &str) -> Result<f64> {
        let value: f64 = s
            .trim()
            .parse()
            .map_err(|e| EngineError::CsvDataFormatError(format!("Failed to parse decimal '{}': {}", s, e)))?;
        if !value.is_finite() {
            return Err(EngineError::CsvDataFormatError(format!("Non-finite decimal '{}'", s)));
        }
        Ok(value)
    }

    /// "BTCUSDT_15m.csv" -> ("BTCUSDT", 15m)
    pub fn parse_file_name(path: &Path) -> Option<(String, TimeFrame)> {
        let stem = path.file_stem()?.to_str()?;
        let (symbol, timeframe) = stem.rsplit_once('_')?;
        if symbol.is_empty() {
            return None;
        }
        Some((symbol.to_uppercase(), timeframe.parse().ok()?))
    }

}

pub struct OhlcvCsvParser;

impl OhlcvCsvParser {
    // CSV Header: open_time,open,high,low,close,volume
    // Example Row: 2024-05-06T10:00:00Z,64000.5,64210.0,63890.1,64150.2,152.33
    pub fn load_candles_from_csv(file_path: impl AsRef<Path>) -> Result<Vec<Candle>> {
        let file_path = file_path.as_ref();
        let file = File::open(file_path).map_err(|e| {
            EngineError::CsvDataFormatError(format!("Failed to open CSV file '{}': {}", file_path.display(), e))
        })?;
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_reader(BufReader::new(file));

        let headers = rdr.headers()?.clone();
        let mut candles = Vec::new();

        for (idx, result) in rdr.records().enumerate() {
            let line = idx + 2;
            let record = result?;

            let open_time = exchange_format::parse_timestamp(Self::field(&record, &headers, "open_time", line)?)
                .map_err(|e| {
                    EngineError::CsvDataFormatError(format!("Error parsing 'open_time' at line {}: {}", line, e))
                })?;

            candles.push(Candle {
                open_time,
                open: Self::number(&record, &headers, "open", line)?,
                high: Self::number(&record, &headers, "high", line)?,
                low: Self::number(&record, &headers, "low", line)?,
                close: Self::number(&record, &headers, "close", line)?,
                volume: Self::number(&record, &headers, "volume", line)?,
            });
        }

        candles.sort_by_key(|c| c.open_time);
        candles.dedup_by_key(|c| c.open_time);
        Ok(candles)
    }

    // Looks a field up by header name so column order does not matter.
    fn get_field<'a>(record: &'a StringRecord, headers: &StringRecord, name: &str) -> Option<&'a str> {
        headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(name))
            .and_then(|pos| record.get(pos))
    }

    fn field<'a>(record: &'a StringRecord, headers: &StringRecord, name: &str, line: usize) -> Result<&'a str> {
        Self::get_field(record, headers, name).ok_or_else(|| {
            EngineError::CsvDataFormatError(format!("Missing '{}' field in CSV record at line {}", name, line))
        })
    }

    fn number(record: &StringRecord, headers: &StringRecord, name: &str, line: usize) -> Result<f64> {
        let raw = Self::field(record, headers, name, line)?;
        exchange_format::parse_decimal(raw).map_err(|e| {
            EngineError::CsvDataFormatError(format!("Error parsing '{}' at line {}: {}", name, line, e))
        })
    }
}
