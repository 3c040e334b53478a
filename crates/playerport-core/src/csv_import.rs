// CSV parsing and row normalization for player import files.
//
// The first record is the header row. Columns are looked up by header name so
// column order does not matter and unknown columns are ignored. Rows missing
// any required field (name, age group, sport, gender) are skipped without an
// error; the caller sees only the kept rows and a skipped count.

use std::collections::HashMap;

use chrono::Datelike;
use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::debug;

use crate::error::ImportError;
use crate::model::{Gender, ParentRelationship, ParsedPlayerRow};

// ---------------------------------------------------------------------------
// Header names
// ---------------------------------------------------------------------------

pub const COL_NAME: &str = "Name";
pub const COL_FIRST_NAME: &str = "FirstName";
pub const COL_LAST_NAME: &str = "LastName";
pub const COL_AGE_GROUP: &str = "AgeGroup";
pub const COL_SPORT: &str = "Sport";
pub const COL_GENDER: &str = "Gender";
pub const COL_SEASON: &str = "Season";
pub const COL_PARENT_FIRST_NAME: &str = "ParentFirstName";
pub const COL_PARENT_SURNAME: &str = "ParentSurname";
pub const COL_PARENT_LAST_NAME: &str = "ParentLastName";
pub const COL_PARENT_EMAIL: &str = "ParentEmail";
pub const COL_PARENT_PHONE: &str = "ParentPhone";
pub const COL_PARENT_RELATIONSHIP: &str = "ParentRelationship";
pub const COL_DATE_OF_BIRTH: &str = "DateOfBirth";
pub const COL_ADDRESS: &str = "Address";
pub const COL_TOWN: &str = "Town";
pub const COL_POSTCODE: &str = "Postcode";
pub const COL_COUNTRY: &str = "Country";

/// Delimiters considered by [`detect_delimiter`], in tie-break order.
const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Number of leading lines sampled for delimiter detection.
const DETECT_SAMPLE_LINES: usize = 10;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Field delimiter. `None` auto-detects.
    pub delimiter: Option<u8>,
    /// Season used for rows with a blank Season column. `None` uses the
    /// current calendar year.
    pub default_season: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutcome {
    pub rows: Vec<ParsedPlayerRow>,
    /// Data rows dropped for missing required fields.
    pub skipped: usize,
    pub delimiter: u8,
}

// ---------------------------------------------------------------------------
// Normalization helpers
// ---------------------------------------------------------------------------

/// Current four-digit calendar year, used as the default season.
pub fn current_season() -> String {
    chrono::Local::now().year().to_string()
}

/// Split a full name on whitespace into (first, rest).
fn split_name(name: &str) -> (String, String) {
    let mut parts = name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let last = parts.collect::<Vec<_>>().join(" ");
    (first, last)
}

/// Count occurrences of `delimiter` outside double-quoted sections.
fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for b in line.bytes() {
        if b == b'"' {
            in_quotes = !in_quotes;
        } else if b == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Guess the field delimiter from the first few lines.
///
/// Each candidate is scored by how often and how consistently it appears
/// outside quotes: `avg * lines_containing_it - variance`. Falls back to a
/// comma when no candidate appears at all.
pub fn detect_delimiter(text: &str) -> u8 {
    let sample: Vec<&str> = text.lines().take(DETECT_SAMPLE_LINES).collect();

    let mut best = b',';
    let mut best_score = f64::NEG_INFINITY;

    for &delimiter in &CANDIDATE_DELIMITERS {
        let counts: Vec<f64> = sample
            .iter()
            .map(|line| count_unquoted(line, delimiter))
            .filter(|&c| c > 0)
            .map(|c| c as f64)
            .collect();
        if counts.is_empty() {
            continue;
        }

        let n = counts.len() as f64;
        let avg = counts.iter().sum::<f64>() / n;
        let variance = counts.iter().map(|c| (c - avg).powi(2)).sum::<f64>() / n;
        let score = avg * n - variance;

        if score > best_score {
            best_score = score;
            best = delimiter;
        }
    }

    best
}

// ---------------------------------------------------------------------------
// Row access
// ---------------------------------------------------------------------------

/// Header-name lookup over one record. Missing trailing cells read as "".
struct RowView<'a> {
    columns: &'a HashMap<String, usize>,
    record: &'a StringRecord,
}

impl<'a> RowView<'a> {
    fn get(&self, column: &str) -> &'a str {
        self.columns
            .get(column)
            .and_then(|&idx| self.record.get(idx))
            .unwrap_or("")
    }

    fn optional(&self, column: &str) -> Option<String> {
        let value = self.get(column);
        (!value.is_empty()).then(|| value.to_string())
    }
}

fn normalize_row(view: &RowView<'_>, row_index: usize, default_season: &str) -> Option<ParsedPlayerRow> {
    let first_name_col = view.get(COL_FIRST_NAME);
    let last_name_col = view.get(COL_LAST_NAME);
    let (first_name, last_name) = if !first_name_col.is_empty() && !last_name_col.is_empty() {
        (first_name_col.to_string(), last_name_col.to_string())
    } else {
        split_name(view.get(COL_NAME))
    };

    let age_group = view.get(COL_AGE_GROUP);
    let sport = view.get(COL_SPORT);
    let gender = view.get(COL_GENDER);
    if first_name.is_empty() || age_group.is_empty() || sport.is_empty() || gender.is_empty() {
        return None;
    }

    let season = match view.get(COL_SEASON) {
        "" => default_season.to_string(),
        s => s.to_string(),
    };

    Some(ParsedPlayerRow {
        name: format!("{first_name} {last_name}").trim().to_string(),
        first_name,
        last_name,
        age_group: age_group.to_string(),
        sport: sport.to_string(),
        gender: Gender::normalize(gender),
        season,
        parent_first_name: view.optional(COL_PARENT_FIRST_NAME),
        parent_surname: view
            .optional(COL_PARENT_SURNAME)
            .or_else(|| view.optional(COL_PARENT_LAST_NAME)),
        parent_email: view.optional(COL_PARENT_EMAIL),
        parent_phone: view.optional(COL_PARENT_PHONE),
        parent_relationship: ParentRelationship::parse(view.get(COL_PARENT_RELATIONSHIP)),
        date_of_birth: view.optional(COL_DATE_OF_BIRTH),
        address: view.optional(COL_ADDRESS),
        town: view.optional(COL_TOWN),
        postcode: view.optional(COL_POSTCODE),
        country: view.optional(COL_COUNTRY),
        row_index,
        matched_team_id: None,
        matched_team_name: None,
    })
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse import text into normalized player rows.
///
/// Input with fewer than two non-blank lines has no data rows and yields an
/// empty outcome rather than an error.
pub fn parse_players(text: &str, options: &ParseOptions) -> Result<ParseOutcome, ImportError> {
    let text = text.trim();
    let delimiter = options.delimiter.unwrap_or_else(|| detect_delimiter(text));

    if text.lines().filter(|l| !l.trim().is_empty()).count() < 2 {
        return Ok(ParseOutcome {
            rows: Vec::new(),
            skipped: 0,
            delimiter,
        });
    }

    let default_season = options
        .default_season
        .clone()
        .unwrap_or_else(current_season);

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut columns = HashMap::new();
    for (idx, header) in reader.headers()?.iter().enumerate() {
        columns.entry(header.to_string()).or_insert(idx);
    }

    let mut rows = Vec::new();
    let mut skipped = 0;
    for record in reader.records() {
        let record = record?;
        let view = RowView {
            columns: &columns,
            record: &record,
        };
        match normalize_row(&view, rows.len(), &default_season) {
            Some(row) => rows.push(row),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(skipped, kept = rows.len(), "skipped rows missing required fields");
    }

    Ok(ParseOutcome {
        rows,
        skipped,
        delimiter,
    })
}
