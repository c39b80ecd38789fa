//! CSV staged-import pipeline
//!
//! Upload parses and validates every row, the annotated set is staged in the
//! `PreviewStore` under an opaque token, and an explicit confirm re-validates
//! each preview-valid row against current database state before inserting.
//! Invalid rows are flagged with a reason but never dropped from the batch,
//! so created + skipped always equals the batch size.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use centers_common::db::ParticipantFields;
use centers_common::Result;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::csv;
use crate::db::{centers, participants};

/// Required upload columns, order-independent; extra columns are ignored
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "center_code",
    "participant_name",
    "participant_id",
    "sex",
    "caregiver_name",
    "house_latitude",
    "house_longitude",
];

/// How long a staged preview stays redeemable
const PREVIEW_TTL: Duration = Duration::from_secs(30 * 60);

/// One annotated upload row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewRow {
    /// 1-based file line number; data starts at 2 (after the header)
    pub row_number: usize,
    pub center_code: String,
    pub participant_name: String,
    pub participant_id: String,
    pub sex: String,
    pub caregiver_name: String,
    pub house_latitude: String,
    pub house_longitude: String,
    pub valid: bool,
    pub error: String,
}

impl PreviewRow {
    /// Parse the raw string fields into validated-form participant fields
    fn to_fields(&self) -> std::result::Result<ParticipantFields, String> {
        let house_latitude = self
            .house_latitude
            .parse::<f64>()
            .map_err(|_| "house_latitude is not a number".to_string())?;
        let house_longitude = self
            .house_longitude
            .parse::<f64>()
            .map_err(|_| "house_longitude is not a number".to_string())?;

        Ok(ParticipantFields {
            participant_name: self.participant_name.clone(),
            participant_id: self.participant_id.clone(),
            sex: self.sex.clone(),
            caregiver_name: self.caregiver_name.clone(),
            house_latitude,
            house_longitude,
        })
    }
}

/// Parse upload text into raw preview rows
///
/// Fails only on structural problems (no header, missing required columns);
/// data rows are never rejected here.
pub fn parse_rows(text: &str) -> std::result::Result<Vec<PreviewRow>, String> {
    let records = csv::parse(text);

    let Some(header) = records.first() else {
        return Err("CSV has no headers".to_string());
    };

    let header: Vec<String> = header.iter().map(|h| h.trim().to_string()).collect();

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !header.iter().any(|h| h == *c))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(format!("Missing columns: {}", missing.join(", ")));
    }

    let index = |name: &str| header.iter().position(|h| h == name).unwrap();
    let col = |record: &[String], name: &str| -> String {
        record
            .get(index(name))
            .map(|v| v.trim().to_string())
            .unwrap_or_default()
    };

    let rows = records[1..]
        .iter()
        .enumerate()
        .map(|(i, record)| PreviewRow {
            row_number: i + 2,
            center_code: col(record, "center_code"),
            participant_name: col(record, "participant_name"),
            participant_id: col(record, "participant_id"),
            sex: col(record, "sex").to_uppercase(),
            caregiver_name: col(record, "caregiver_name"),
            house_latitude: col(record, "house_latitude"),
            house_longitude: col(record, "house_longitude"),
            valid: true,
            error: String::new(),
        })
        .collect();

    Ok(rows)
}

/// Validate every row against field constraints and current database state
pub async fn validate_rows(pool: &SqlitePool, rows: &mut [PreviewRow]) -> Result<()> {
    for row in rows.iter_mut() {
        if let Err(reason) = validate_row(pool, row).await? {
            row.valid = false;
            row.error = reason;
        }
    }

    Ok(())
}

/// One row's checks; Ok(Err(reason)) flags the row without failing the batch
async fn validate_row(
    pool: &SqlitePool,
    row: &PreviewRow,
) -> Result<std::result::Result<(), String>> {
    if row.center_code.is_empty() {
        return Ok(Err("center_code is empty".to_string()));
    }
    if centers::find_by_code(pool, &row.center_code).await?.is_none() {
        return Ok(Err(format!("unknown center_code: {}", row.center_code)));
    }

    if row.participant_id.is_empty() {
        return Ok(Err("participant_id is empty".to_string()));
    }
    if participants::id_exists(pool, &row.participant_id).await? {
        return Ok(Err("participant_id already exists".to_string()));
    }

    let fields = match row.to_fields() {
        Ok(fields) => fields,
        Err(reason) => return Ok(Err(reason)),
    };

    if let Err(errors) = fields.validate() {
        let reasons: Vec<String> = errors
            .iter()
            .map(|e| format!("{} {}", e.field, e.message))
            .collect();
        return Ok(Err(reasons.join("; ")));
    }

    Ok(Ok(()))
}

/// Outcome of committing a staged batch
#[derive(Debug, Serialize)]
pub struct CommitOutcome {
    pub created: i64,
    pub skipped: i64,
    pub errors: Vec<String>,
    pub center_codes: Vec<String>,
}

/// Commit a staged batch
///
/// Consumes only rows marked valid at preview time and re-checks each one:
/// database state can change between preview and confirmation. Uniqueness
/// violations at insert (a concurrent commit won the race) count as skips.
pub async fn commit(pool: &SqlitePool, rows: &[PreviewRow]) -> Result<CommitOutcome> {
    let mut created = 0i64;
    let mut skipped = 0i64;
    let mut errors = Vec::new();
    let mut center_codes = BTreeSet::new();

    for row in rows {
        if !row.valid {
            skipped += 1;
            continue;
        }

        let Some(center) = centers::find_by_code(pool, &row.center_code).await? else {
            skipped += 1;
            errors.push(format!(
                "Row {}: center {} no longer exists",
                row.row_number, row.center_code
            ));
            continue;
        };

        if participants::id_exists(pool, &row.participant_id).await? {
            skipped += 1;
            continue;
        }

        let fields = match row.to_fields() {
            Ok(fields) => fields,
            Err(reason) => {
                skipped += 1;
                errors.push(format!("Row {}: {}", row.row_number, reason));
                continue;
            }
        };

        if let Err(field_errors) = fields.validate() {
            skipped += 1;
            let reasons: Vec<String> = field_errors
                .iter()
                .map(|e| format!("{} {}", e.field, e.message))
                .collect();
            errors.push(format!("Row {}: {}", row.row_number, reasons.join("; ")));
            continue;
        }

        let guid = Uuid::new_v4().to_string();
        match participants::insert(pool, &guid, &center.guid, &fields).await {
            Ok(()) => {
                created += 1;
                center_codes.insert(center.center_code.clone());
            }
            Err(e) => {
                // Lost a uniqueness race, or another constraint fired;
                // either way it is a per-row skip, not a batch failure.
                skipped += 1;
                errors.push(format!("Row {}: {}", row.row_number, e));
            }
        }
    }

    Ok(CommitOutcome {
        created,
        skipped,
        errors,
        center_codes: center_codes.into_iter().collect(),
    })
}

struct PreviewEntry {
    rows: Vec<PreviewRow>,
    staged_at: Instant,
}

/// Server-side staging area for annotated upload batches
///
/// Replaces framework session state: entries are keyed by an opaque token,
/// expire after `PREVIEW_TTL`, and are consumed on take so a token can never
/// be redeemed twice.
#[derive(Clone, Default)]
pub struct PreviewStore {
    entries: Arc<Mutex<HashMap<Uuid, PreviewEntry>>>,
}

impl PreviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a batch, returning its token
    pub async fn insert(&self, rows: Vec<PreviewRow>) -> Uuid {
        let token = Uuid::new_v4();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.staged_at.elapsed() < PREVIEW_TTL);
        entries.insert(
            token,
            PreviewEntry {
                rows,
                staged_at: Instant::now(),
            },
        );
        token
    }

    /// Consume a staged batch; None if the token is unknown or expired
    pub async fn take(&self, token: Uuid) -> Option<Vec<PreviewRow>> {
        let mut entries = self.entries.lock().await;
        let entry = entries.remove(&token)?;
        if entry.staged_at.elapsed() >= PREVIEW_TTL {
            return None;
        }
        Some(entry.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str =
        "center_code,participant_name,participant_id,sex,caregiver_name,house_latitude,house_longitude";

    #[test]
    fn parse_requires_header() {
        let err = parse_rows("").unwrap_err();
        assert!(err.contains("no headers"));
    }

    #[test]
    fn parse_reports_missing_columns() {
        let err = parse_rows("center_code,participant_name\nMD1111,John\n").unwrap_err();
        assert!(err.contains("participant_id"));
        assert!(err.contains("house_longitude"));
    }

    #[test]
    fn parse_trims_and_uppercases_sex() {
        let text = format!("{HEADER}\n MD1111 , John Doe ,MD1111-001, m ,Jane Doe,39.29,-76.61\n");
        let rows = parse_rows(&text).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row_number, 2);
        assert_eq!(rows[0].center_code, "MD1111");
        assert_eq!(rows[0].participant_name, "John Doe");
        assert_eq!(rows[0].sex, "M");
    }

    #[test]
    fn parse_tolerates_bom_and_column_order() {
        let text = "\u{feff}participant_id,center_code,participant_name,sex,caregiver_name,house_latitude,house_longitude\nP-1,MD1111,John,M,Jane,0,0\n";
        let rows = parse_rows(text).unwrap();
        assert_eq!(rows[0].participant_id, "P-1");
        assert_eq!(rows[0].center_code, "MD1111");
    }

    #[test]
    fn short_records_become_empty_fields() {
        let text = format!("{HEADER}\nMD1111,John\n");
        let rows = parse_rows(&text).unwrap();
        assert_eq!(rows[0].participant_id, "");
        assert_eq!(rows[0].house_longitude, "");
    }

    #[tokio::test]
    async fn preview_store_tokens_are_single_use() {
        let store = PreviewStore::new();
        let token = store.insert(Vec::new()).await;
        assert!(store.take(token).await.is_some());
        assert!(store.take(token).await.is_none());
    }

    #[tokio::test]
    async fn preview_store_rejects_unknown_token() {
        let store = PreviewStore::new();
        assert!(store.take(Uuid::new_v4()).await.is_none());
    }
}
