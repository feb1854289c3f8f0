//! Record Normalizer: one snapshot file's bytes to one [`SnapshotRecord`].
//!
//! # Purpose
//! The external capture tool writes one JSON object per snapshot file. This
//! module parses those bytes and extracts the canonical record shape consumed
//! by the resolver.
//!
//! # Design constraints
//! - Pure function of its inputs. No IO, no clock, no global state.
//! - Only malformed *structure* (not valid UTF-8 JSON, not an object) is a
//!   [`ParseFailure`]; the caller records it and the walk continues.
//! - Field extraction never fails: a missing or non-numeric rank yields
//!   [`DeclaredRank::Missing`], an absent or unparseable timestamp yields
//!   [`CaptureTime::Unknown`]. A field-level problem never discards the file.
//! - Accepted capture timestamp forms: RFC 3339 (offset honoured), and the
//!   capture tool's naive `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DDTHH:MM:SS`
//!   (taken as UTC). Anything else is `Unknown`.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use crate::{CaptureTime, DeclaredRank, ParseFailure, SnapshotRecord};

/// Top-level key carrying the capture timestamp.
const KEY_CAPTURED_AT: &str = "capturedAt";
/// Sub-object carrying the lab-item identity and declared rank.
const KEY_CONTEXT: &str = "institutionContext";
/// Single-element array naming the assigned code.
const KEY_CODES: &str = "selectedCodes";

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Normalize one snapshot file's raw bytes into a [`SnapshotRecord`].
///
/// `source_file` is the store-relative path of the file (retained verbatim
/// for audit and tie-breaking). `institution_scope` is the run's institution
/// label, used when the file does not carry its own institution string.
///
/// # Errors
/// Returns a [`ParseFailure`] when the bytes are not a well-formed JSON
/// object. Field-level problems never error; they normalize to sentinels.
pub fn normalize_snapshot(
    bytes: &[u8],
    source_file: &str,
    institution_scope: &str,
) -> Result<SnapshotRecord, ParseFailure> {
    // Capture tool runs on Windows; strip a UTF-8 BOM if present.
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);

    let root: Value = serde_json::from_slice(bytes)
        .map_err(|e| ParseFailure::new(source_file, format!("invalid json: {e}")))?;

    if !root.is_object() {
        return Err(ParseFailure::new(
            source_file,
            "top-level value is not a json object",
        ));
    }

    let ctx = root.get(KEY_CONTEXT);
    let (assigned_code, assigned_code_name) = first_code(root.get(KEY_CODES));

    let mut institution = text_field(ctx, "institution");
    if institution.is_empty() {
        institution = institution_scope.trim().to_string();
    }

    Ok(SnapshotRecord {
        institution,
        lab_item_id: text_field(ctx, "labItemId"),
        lab_item_name: text_field(ctx, "labItemName"),
        lab_unit: text_field(ctx, "labUnit"),
        lab_sample_type: text_field(ctx, "labSampleType"),
        item_rank: rank_field(ctx, "itemRank"),
        assigned_code,
        assigned_code_name,
        captured_at: capture_time(root.get(KEY_CAPTURED_AT)),
        source_file: source_file.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Field extraction
// ---------------------------------------------------------------------------

/// Extract a display string from a sub-object field.
///
/// Strings are trimmed; numbers are rendered (some captures emit numeric lab
/// item ids); everything else becomes the empty string.
fn text_field(obj: Option<&Value>, key: &str) -> String {
    match obj.and_then(|o| o.get(key)) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Extract the declared rank.
///
/// Accepts an integer, an integral float (`40.0`), or a numeric string
/// (`"40"`, trimmed). A fractional value is not a rank. Everything else is
/// [`DeclaredRank::Missing`].
fn rank_field(obj: Option<&Value>, key: &str) -> DeclaredRank {
    match obj.and_then(|o| o.get(key)) {
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return DeclaredRank::Value(i);
            }
            match n.as_f64() {
                Some(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => {
                    DeclaredRank::Value(f as i64)
                }
                _ => DeclaredRank::Missing,
            }
        }
        Some(Value::String(s)) => match s.trim().parse::<i64>() {
            Ok(i) => DeclaredRank::Value(i),
            Err(_) => DeclaredRank::Missing,
        },
        _ => DeclaredRank::Missing,
    }
}

/// Extract the assigned code and its display name from the first element of
/// the `selectedCodes` array.
///
/// The capture contract is a single-element array; extra elements are
/// ignored, an empty or absent array yields empty strings (no selection).
fn first_code(codes: Option<&Value>) -> (String, String) {
    let Some(first) = codes.and_then(|c| c.as_array()).and_then(|a| a.first()) else {
        return (String::new(), String::new());
    };
    let code = match first.get("code") {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    let name = match first.get("name") {
        Some(Value::String(s)) => s.trim().to_string(),
        _ => String::new(),
    };
    (code, name)
}

/// Parse the capture timestamp value.
fn capture_time(v: Option<&Value>) -> CaptureTime {
    let Some(Value::String(raw)) = v else {
        return CaptureTime::Unknown;
    };
    match parse_capture_timestamp(raw.trim()) {
        Some(t) => CaptureTime::At(t),
        None => CaptureTime::Unknown,
    }
}

/// Accepted textual timestamp forms, tried in order.
fn parse_capture_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
