//! Text protocol spoken with the external change point tool
//!
//! Input is a CSV file (`kpi,timestamp,datasetid`, oldest row first) plus a
//! small YAML file describing it. Output is a human-oriented table where
//! each change point is framed by runs of middle dots:
//!
//! ```text
//! time                         datasetid    kpi
//! -------------------------  -----------  -----
//! 2023-01-27 11:09:50 +0000            1    100
//!                                         ·····
//!                                         +30.0%
//!                                         ·····
//! 2023-01-28 11:09:50 +0000            2    130
//! ```
//!
//! Nothing here spawns processes, so the parser is tested against captured
//! output.

use crate::types::DataPoint;
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use std::io::{self, Write};
use std::path::Path;
use std::sync::OnceLock;

/// Header row of the input CSV
pub const CSV_HEADER: &str = "kpi,timestamp,datasetid";

/// Line the `validate` command prints once it has checked the input
pub const VALIDATION_FINISHED: &str = "Validation finished";

/// Marker the `validate` command prints for a rejected input
pub const VALIDATION_INVALID: &str = "INVALID";

const CHANGE_MARKER: &str = "··";

/// Timestamp layout of the tool's output table, also accepted by its date parser
const TOOL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S +0000";

/// Write `oldest_first` as the tool's CSV input
///
/// The third column carries the data point id so change points can be
/// mapped back to input points.
pub fn write_csv<'a, W: Write>(
    mut out: W,
    oldest_first: impl IntoIterator<Item = &'a DataPoint>,
) -> io::Result<()> {
    writeln!(out, "{}", CSV_HEADER)?;
    for dp in oldest_first {
        writeln!(
            out,
            "{:.2},{},{}",
            dp.value,
            dp.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            dp.id
        )?;
    }
    out.flush()
}

/// YAML configuration pointing the tool at the generated CSV
///
/// The path is emitted as a double-quoted scalar (JSON string syntax is
/// valid YAML), so temp directories containing `#`, `: ` or quotes survive.
pub fn tool_config(test_name: &str, csv_path: &Path) -> String {
    format!(
        r#"tests:
  {name}:
    type: csv
    file: {file}
    time_column: timestamp
    metrics: [kpi]
    attributes: [datasetid]
    csv_options:
      delimiter: ","
      quote_char: "'"
"#,
        name = test_name,
        file = serde_json::Value::from(csv_path.display().to_string())
    )
}

/// Render a `--since` bound in the timestamp form the tool prints itself
pub fn since_argument(epoch_secs: i64) -> String {
    match DateTime::<Utc>::from_timestamp(epoch_secs, 0) {
        Some(t) => t.format(TOOL_TIME_FORMAT).to_string(),
        None => epoch_secs.to_string(),
    }
}

/// Check the combined output of a `validate` run
///
/// Succeeds only if a line contains the "Validation finished" marker and
/// no line reports the input as INVALID.
pub fn check_validation(lines: &[String]) -> Result<(), String> {
    if !lines.iter().any(|l| l.contains(VALIDATION_FINISHED)) {
        return Err(format!(
            "validation did not finish ({} lines of output)",
            lines.len()
        ));
    }

    if let Some(invalid) = lines.iter().find(|l| l.contains(VALIDATION_INVALID)) {
        return Err(invalid.trim().to_string());
    }

    Ok(())
}

/// One change point reported by the tool
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedChangePoint {
    /// Relative change summary, e.g. `+30.0%`
    pub summary: String,
    /// Timestamp column as printed by the tool
    pub timestamp: String,
    pub data_point_id: i64,
    pub kpi: f64,
}

fn row_pattern() -> &'static Regex {
    static ROW: OnceLock<Regex> = OnceLock::new();
    ROW.get_or_init(|| {
        Regex::new(
            r"^\s*(?P<timestamp>\d{4}-\d{2}-\d{2}[ T]\d{2}:\d{2}:\d{2}(?:\s*(?:[+-]\d{2}:?\d{2}|Z))?)\s+(?P<dataPointId>\d+)\s+(?P<kpi>-?\d+(?:\.\d+)?(?:[eE][+-]?\d+)?)\s*$",
        )
        .expect("change point row pattern is valid")
    })
}

fn summary_pattern() -> &'static Regex {
    static SUMMARY: OnceLock<Regex> = OnceLock::new();
    SUMMARY.get_or_init(|| {
        Regex::new(r"^[+-]?(?:\d+(?:\.\d+)?|inf)%$").expect("summary pattern is valid")
    })
}

fn is_marker(line: &str) -> bool {
    line.contains(CHANGE_MARKER)
}

fn is_separator(line: &str) -> bool {
    is_marker(line) || line.trim().is_empty()
}

fn is_header(line: &str) -> bool {
    let mut columns = line.split_whitespace();
    columns.next() == Some("time") && line.split_whitespace().any(|c| c == "kpi")
}

/// Extract change points from the `analyze` output table
///
/// Blocks that do not follow the marker / summary / marker / row layout
/// are logged and skipped; the rest of the table is still parsed.
pub fn parse_change_points(lines: &[String]) -> Vec<ParsedChangePoint> {
    let mut points = Vec::new();
    let mut saw_header = false;
    let mut iter = lines.iter().map(String::as_str);

    while let Some(line) = iter.next() {
        if !saw_header && is_header(line) {
            saw_header = true;
            continue;
        }
        if !is_marker(line) {
            continue;
        }

        let Some(summary) = iter.by_ref().find(|l| !l.trim().is_empty()) else {
            tracing::warn!("Change point output truncated after marker line");
            break;
        };
        let summary = summary.trim();
        if !summary_pattern().is_match(summary) {
            tracing::error!("Could not parse change point summary: '{}'", summary);
            continue;
        }

        let Some(row) = iter.by_ref().find(|l| !is_separator(l)) else {
            tracing::warn!("Change point output truncated after summary '{}'", summary);
            break;
        };

        let Some(caps) = row_pattern().captures(row) else {
            tracing::error!("Could not parse change point line: '{}'", row);
            continue;
        };

        let (Ok(data_point_id), Ok(kpi)) = (
            caps["dataPointId"].parse::<i64>(),
            caps["kpi"].parse::<f64>(),
        )
        else {
            tracing::error!("Could not parse change point line: '{}'", row);
            continue;
        };

        points.push(ParsedChangePoint {
            summary: summary.to_string(),
            timestamp: caps["timestamp"].to_string(),
            data_point_id,
            kpi,
        });
    }

    if !saw_header && !lines.is_empty() {
        tracing::warn!("Change point output has no 'time ... kpi' header, format may have changed");
    }

    points
}
