//! Kline CSV interchange format
//!
//! `timestamp,open,high,low,close,volume`, one row per candle, ascending
//! time order. Timestamps are unix seconds on write; on read unix seconds,
//! unix milliseconds and RFC 3339 are accepted.

use crate::data::{Candle, CandleSeries};
use crate::error::EngineError;
use crate::Result;
use anyhow::Context;
use chrono::{DateTime, TimeZone, Utc};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Column header written and expected by the loaders.
pub const KLINE_HEADER: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

// Anything above this is treated as milliseconds (year 5138 in seconds).
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// Load candles from a CSV file
pub fn load_csv(path: impl AsRef<Path>) -> Result<CandleSeries> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let series = read_csv(file).with_context(|| format!("failed to parse {}", path.display()))?;
    debug!(path = %path.display(), candles = series.len(), "loaded klines");
    Ok(series)
}

/// Parse candles from any reader; result is sorted and de-duplicated by timestamp.
pub fn read_csv<R: Read>(reader: R) -> Result<CandleSeries> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

    let headers = rdr.headers()?.clone();
    let column = |name: &'static str| -> Result<usize> {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                EngineError::CsvRow {
                    row: 0,
                    reason: format!("missing column `{}`", name),
                }
                .into()
            })
    };
    let idx = [
        column("timestamp")?,
        column("open")?,
        column("high")?,
        column("low")?,
        column("close")?,
    ];
    // volume is optional in older dumps
    let vol_idx = headers.iter().position(|h| h.eq_ignore_ascii_case("volume"));

    let mut series = CandleSeries::new();
    for (i, record) in rdr.records().enumerate() {
        let row = i + 1;
        let record = record?;
        let field = |col: usize| -> Result<&str> {
            record.get(col).ok_or_else(|| {
                EngineError::CsvRow {
                    row,
                    reason: format!("missing field {}", col),
                }
                .into()
            })
        };
        let number = |col: usize| -> Result<f64> {
            let raw = field(col)?;
            match raw.parse::<f64>() {
                Ok(v) if v.is_finite() => Ok(v),
                Ok(_) => Err(EngineError::CsvRow {
                    row,
                    reason: format!("non-finite value `{}`", raw),
                }
                .into()),
                Err(_) => Err(EngineError::CsvRow {
                    row,
                    reason: format!("not a number: `{}`", raw),
                }
                .into()),
            }
        };

        let timestamp = parse_timestamp(field(idx[0])?).ok_or_else(|| EngineError::CsvRow {
            row,
            reason: format!("bad timestamp `{}`", record.get(idx[0]).unwrap_or_default()),
        })?;
        let volume = match vol_idx {
            Some(col) => match field(col)? {
                "" => 0.0,
                _ => number(col)?,
            },
            None => 0.0,
        };

        let candle = Candle::new(
            number(idx[1])?,
            number(idx[2])?,
            number(idx[3])?,
            number(idx[4])?,
            volume,
            timestamp,
        );
        if candle.high < candle.low {
            return Err(EngineError::CsvRow {
                row,
                reason: format!("high {} is below low {}", candle.high, candle.low),
            }
            .into());
        }
        series.push(candle);
    }

    series.sort_by_time();
    series.dedup_by_time();
    Ok(series)
}

/// Write candles to a CSV file
pub fn write_csv(path: impl AsRef<Path>, candles: &[Candle]) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }
    let file = File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    write_csv_to(file, candles)
}

/// Write candles to any writer
pub fn write_csv_to<W: Write>(writer: W, candles: &[Candle]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(KLINE_HEADER)?;
    for candle in candles {
        wtr.write_record([
            candle.timestamp.timestamp().to_string(),
            candle.open.to_string(),
            candle.high.to_string(),
            candle.low.to_string(),
            candle.close.to_string(),
            candle.volume.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(n) = raw.parse::<i64>() {
        return if n.abs() >= MILLIS_THRESHOLD {
            Utc.timestamp_millis_opt(n).single()
        } else {
            Utc.timestamp_opt(n, 0).single()
        };
    }
    // "1700000000.0" style exports
    if let Ok(f) = raw.parse::<f64>() {
        if f.is_finite() {
            return parse_timestamp(&(f as i64).to_string());
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_sorts_and_dedups() {
        let data = "timestamp,open,high,low,close,volume\n\
                    120,2,3,1,2.5,10\n\
                    60,1,2,0.5,1.5,5\n\
                    120,9,9,9,9,9\n";
        let series = read_csv(data.as_bytes()).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.closes(), vec![1.5, 2.5]);
        assert_eq!(series.candles()[0].timestamp.timestamp(), 60);
    }

    #[test]
    fn test_timestamp_formats() {
        assert_eq!(parse_timestamp("1700000000").unwrap().timestamp(), 1_700_000_000);
        assert_eq!(parse_timestamp("1700000000000").unwrap().timestamp(), 1_700_000_000);
        assert_eq!(
            parse_timestamp("2023-11-14T22:13:20Z").unwrap().timestamp(),
            1_700_000_000
        );
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_bad_number_reports_row() {
        let data = "timestamp,open,high,low,close,volume\n60,1,2,0.5,abc,5\n";
        let err = read_csv(data.as_bytes()).unwrap_err();
        let engine = err.downcast_ref::<EngineError>().unwrap();
        assert!(matches!(engine, EngineError::CsvRow { row: 1, .. }));
    }

    #[test]
    fn test_write_then_read_preserves_prices() {
        let data = "timestamp,open,high,low,close,volume\n60,1,2,0.5,1.5,5\n";
        let series = read_csv(data.as_bytes()).unwrap();
        let mut buf = Vec::new();
        write_csv_to(&mut buf, series.candles()).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("timestamp,open,high,low,close,volume"));
        assert!(text.contains("60,1,2,0.5,1.5,5"));
    }
}
