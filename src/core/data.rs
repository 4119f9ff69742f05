// Review CSV loading, sampling and annotated export

use crate::core::types::AnnotatedReview;
use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Columns kept from the raw export; everything else is dropped on load.
pub const REQUIRED_COLUMNS: [&str; 4] = ["Score", "Summary", "Text", "Time"];

#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing column '{column}' (found: {found})")]
    MissingColumn { column: String, found: String },

    #[error("row {row}: invalid UNIX timestamp {value}")]
    InvalidTimestamp { row: usize, value: i64 },
}

/// Raw row as it appears in the file
#[derive(Debug, Deserialize)]
struct RawReview {
    #[serde(rename = "Score")]
    score: u8,
    #[serde(rename = "Summary", default)]
    summary: String,
    #[serde(rename = "Text", default)]
    text: String,
    #[serde(rename = "Time")]
    time: i64,
}

/// One review after column selection and timestamp conversion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub score: u8,
    pub summary: String,
    pub text: String,
    pub time: DateTime<Utc>,
}

/// Load reviews from `path`, reading at most `nrows` data rows.
pub fn load_reviews<P: AsRef<Path>>(path: P, nrows: Option<usize>) -> Result<Vec<ReviewRecord>, DataError> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)?;

    let headers = reader.headers()?.clone();
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(DataError::MissingColumn {
                column: column.to_string(),
                found: headers.iter().collect::<Vec<_>>().join(", "),
            });
        }
    }

    let limit = nrows.unwrap_or(usize::MAX);
    let mut records = Vec::new();
    for (row, result) in reader.deserialize::<RawReview>().take(limit).enumerate() {
        let raw = result?;
        let time = DateTime::from_timestamp(raw.time, 0).ok_or(DataError::InvalidTimestamp {
            row,
            value: raw.time,
        })?;
        records.push(ReviewRecord {
            score: raw.score,
            summary: raw.summary,
            text: raw.text,
            time,
        });
    }

    info!(path = %path.display(), rows = records.len(), "loaded reviews");
    Ok(records)
}

/// Draw `n` rows without replacement, in draw order.
///
/// Asking for more rows than exist returns the whole population, shuffled.
pub fn sample_records<T: Clone>(records: &[T], n: usize, seed: u64) -> Vec<T> {
    let amount = if n > records.len() {
        warn!(
            requested = n,
            available = records.len(),
            "sample larger than population, using every row"
        );
        records.len()
    } else {
        n
    };

    let mut rng = StdRng::seed_from_u64(seed);
    rand::seq::index::sample(&mut rng, records.len(), amount)
        .into_iter()
        .map(|i| records[i].clone())
        .collect()
}

/// Write annotated rows as CSV, one `coord_i` column per projected dimension.
pub fn write_annotated<P: AsRef<Path>>(path: P, rows: &[AnnotatedReview]) -> Result<(), DataError> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_path(path)?;

    let components = rows.first().map(|r| r.coordinates.len()).unwrap_or(0);
    let mut header: Vec<String> = [
        "Score",
        "Summary",
        "Text",
        "Time",
        "cleaned",
        "vader_compound",
        "vader_label",
        "cluster",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend((0..components).map(|i| format!("coord_{}", i)));
    writer.write_record(&header)?;

    for row in rows {
        let mut fields = vec![
            row.record.score.to_string(),
            row.record.summary.clone(),
            row.record.text.clone(),
            row.record.time.to_rfc3339(),
            row.cleaned.clone(),
            row.vader_compound.to_string(),
            row.vader_label.to_string(),
            row.cluster.map(|c| c.to_string()).unwrap_or_default(),
        ];
        fields.extend(
            (0..components).map(|i| row.coordinates.get(i).map(|c| c.to_string()).unwrap_or_default()),
        );
        writer.write_record(&fields)?;
    }

    writer.flush()?;
    info!(path = %path.display(), rows = rows.len(), "wrote annotated sample");
    Ok(())
}
