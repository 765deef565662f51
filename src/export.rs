use chrono::{DateTime, SecondsFormat, TimeZone};

use crate::error::ExportError;
use crate::models::{Category, HistoryRecord};
use crate::score::record_score;

pub const CSV_HEADER: [&str; 8] = [
    "id",
    "date",
    "opening",
    "content",
    "delivery",
    "grammar",
    "overall",
    "transcript",
];

/// Serializes records in the order given, one row each.
///
/// Whether `records` is the full history or the filtered view is up to the
/// caller. Cells with a comma, quote or newline are quoted RFC 4180 style.
pub fn export_csv<'a, I>(records: I) -> Result<String, ExportError>
where
    I: IntoIterator<Item = &'a HistoryRecord>,
{
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for record in records {
        writer.write_record(csv_row(record))?;
    }

    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8(bytes)?)
}

fn csv_row(record: &HistoryRecord) -> Vec<String> {
    let mut row = Vec::with_capacity(CSV_HEADER.len());
    row.push(record.id.to_string());
    row.push(
        record
            .created_at
            .map(|created_at| created_at.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_default(),
    );
    for category in Category::ALL {
        row.push(
            record_score(record, category)
                .map(|score| score.to_string())
                .unwrap_or_default(),
        );
    }
    row.push(record.transcript.clone().unwrap_or_default());
    row
}

pub fn export_filename<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("speech-progress-{}.csv", now.format("%Y%m%d-%H%M%S"))
}
