use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::schema::{FieldDef, Record};
use super::selection::SelectionSet;
use crate::models::Collection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportScope {
    All,
    Filtered,
    Selected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub scope: ExportScope,
    pub format: ExportFormat,
    /// Canonical field names in output order.
    pub fields: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("select at least one field to export")]
    NoFieldsSelected,

    #[error("unknown export field '{0}'")]
    UnknownField(String),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),
}

/// A serialized export ready to hand to the client as a download.
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
    pub record_count: usize,
}

/// `<collection>-<YYYY-MM-DD>.<ext>`
pub fn export_filename(collection: Collection, format: ExportFormat, date: NaiveDate) -> String {
    format!(
        "{}-{}.{}",
        collection.slug(),
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Picks the records an export covers. `Selected` walks the full collection
/// so stale ids in the selection simply match nothing.
pub fn resolve_scope<'a, R: Record>(
    all: &'a [R],
    filtered: &[&'a R],
    selection: &SelectionSet,
    scope: ExportScope,
) -> Vec<&'a R> {
    match scope {
        ExportScope::All => all.iter().collect(),
        ExportScope::Filtered => filtered.to_vec(),
        ExportScope::Selected if selection.is_empty() => Vec::new(),
        ExportScope::Selected => all.iter().filter(|r| selection.is_selected(r.id())).collect(),
    }
}

fn resolve_fields<R: Record>(fields: &[String]) -> Result<Vec<&'static FieldDef<R>>, ExportError> {
    if fields.is_empty() {
        return Err(ExportError::NoFieldsSelected);
    }
    let mut defs: Vec<&'static FieldDef<R>> = Vec::with_capacity(fields.len());
    for name in fields {
        let def = R::field(name).ok_or_else(|| ExportError::UnknownField(name.clone()))?;
        if !defs.iter().any(|d| d.name == def.name) {
            defs.push(def);
        }
    }
    Ok(defs)
}

fn to_csv<R: Record>(
    records: &[&R],
    defs: &[&'static FieldDef<R>],
) -> Result<String, ExportError> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(defs.iter().map(|d| d.label))?;
    for record in records {
        writer.write_record(defs.iter().map(|d| d.value(record).display()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    let mut text = String::from_utf8(bytes)
        .map_err(|e| csv::Error::from(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
    // Rows are newline-separated, not newline-terminated
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

fn to_json<R: Record>(
    records: &[&R],
    defs: &[&'static FieldDef<R>],
) -> Result<String, ExportError> {
    let rows: Vec<Value> = records
        .iter()
        .map(|record| {
            let mut obj = Map::new();
            for d in defs {
                obj.insert(d.name.to_string(), d.value(record).to_json());
            }
            Value::Object(obj)
        })
        .collect();
    Ok(serde_json::to_string_pretty(&rows)?)
}

/// Renders `records` with only the requested fields, in the requested order.
pub fn serialize<R: Record>(
    records: &[&R],
    fields: &[String],
    format: ExportFormat,
) -> Result<String, ExportError> {
    let defs = resolve_fields::<R>(fields)?;
    match format {
        ExportFormat::Csv => to_csv(records, &defs),
        ExportFormat::Json => to_json(records, &defs),
    }
}

/// Validates, resolves scope and serializes in one go.
pub fn export<R: Record>(
    all: &[R],
    filtered: &[&R],
    selection: &SelectionSet,
    request: &ExportRequest,
    today: NaiveDate,
) -> Result<ExportFile, ExportError> {
    // Reject before touching any record
    resolve_fields::<R>(&request.fields)?;

    let records = resolve_scope(all, filtered, selection, request.scope);
    let body = serialize(&records, &request.fields, request.format)?;
    Ok(ExportFile {
        filename: export_filename(R::COLLECTION, request.format, today),
        content_type: request.format.content_type(),
        body,
        record_count: records.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::contact::{Contact, ContactType};
    use chrono::{TimeZone, Utc};

    fn contact(id: &str, name: &str, email: &str) -> Contact {
        let ts = Utc.with_ymd_and_hms(2024, 3, 10, 9, 0, 0).unwrap();
        Contact {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            company: "X".to_string(),
            role: None,
            linkedin_url: None,
            contact_type: ContactType::Referral,
            notes: None,
            created_at: ts,
            updated_at: ts,
        }
    }

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_csv_exact_output() {
        let records = vec![contact("1", "A", "a@x.com"), contact("2", "B", "b@x.com")];
        let refs: Vec<&Contact> = records.iter().collect();
        let csv = serialize(&refs, &fields(&["name", "email"]), ExportFormat::Csv).unwrap();
        assert_eq!(csv, "\"Name\",\"Email\"\n\"A\",\"a@x.com\"\n\"B\",\"b@x.com\"");
    }

    #[test]
    fn test_csv_escapes_quotes_and_keeps_commas() {
        let mut c = contact("1", "Jo \"JJ\" Smith", "jo@x.com");
        c.notes = Some("likes commas, a lot".to_string());
        let csv = serialize(&[&c], &fields(&["notes", "name"]), ExportFormat::Csv).unwrap();
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(row, "\"likes commas, a lot\",\"Jo \"\"JJ\"\" Smith\"");
    }

    #[test]
    fn test_csv_header_only_without_rows() {
        let csv =
            serialize::<Contact>(&[], &fields(&["name", "email"]), ExportFormat::Csv).unwrap();
        assert_eq!(csv, "\"Name\",\"Email\"");
    }

    #[test]
    fn test_csv_keeps_embedded_newlines_inside_quotes() {
        let mut c = contact("1", "A", "a@x.com");
        c.notes = Some("line one\nline two".to_string());
        let csv = serialize(&[&c], &fields(&["notes"]), ExportFormat::Csv).unwrap();
        assert_eq!(csv, "\"Notes\"\n\"line one\nline two\"");
    }

    #[test]
    fn test_csv_renders_choice_and_timestamp() {
        let c = contact("1", "A", "a@x.com");
        let columns = fields(&["contact_type", "created_at", "role"]);
        let csv = serialize(&[&c], &columns, ExportFormat::Csv).unwrap();
        assert_eq!(
            csv.lines().nth(1).unwrap(),
            "\"referral\",\"2024-03-10T09:00:00Z\",\"\""
        );
    }

    #[test]
    fn test_json_uses_canonical_names_in_order() {
        let c = contact("1", "A", "a@x.com");
        let columns = fields(&["email", "name", "role"]);
        let json = serialize(&[&c], &columns, ExportFormat::Json).unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();
        let obj = parsed[0].as_object().unwrap();
        assert_eq!(obj.keys().collect::<Vec<_>>(), vec!["email", "name", "role"]);
        assert_eq!(obj["role"], Value::Null);
        assert!(json.contains('\n'));
    }

    #[test]
    fn test_no_fields_rejected() {
        let records = vec![contact("1", "A", "a@x.com")];
        let request = ExportRequest {
            scope: ExportScope::All,
            format: ExportFormat::Csv,
            fields: vec![],
        };
        let today = Utc::now().date_naive();
        let err = export(&records, &[], &SelectionSet::default(), &request, today);
        assert!(matches!(err, Err(ExportError::NoFieldsSelected)));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let c = contact("1", "A", "a@x.com");
        assert!(matches!(
            serialize(&[&c], &fields(&["shoe_size"]), ExportFormat::Json),
            Err(ExportError::UnknownField(_))
        ));
    }

    #[test]
    fn test_selected_scope_skips_stale_ids() {
        let records = vec![
            contact("1", "A", "a@x.com"),
            contact("2", "B", "b@x.com"),
            contact("3", "C", "c@x.com"),
        ];
        let selection: SelectionSet = ["3".to_string(), "1".to_string(), "gone".to_string()]
            .into_iter()
            .collect();
        let picked = resolve_scope(&records, &[], &selection, ExportScope::Selected);
        let ids: Vec<&str> = picked.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn test_filtered_scope_keeps_filtered_order() {
        let records = vec![contact("1", "A", "a@x.com"), contact("2", "B", "b@x.com")];
        let filtered = vec![&records[1], &records[0]];
        let request = ExportRequest {
            scope: ExportScope::Filtered,
            format: ExportFormat::Csv,
            fields: fields(&["name"]),
        };
        let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
        let file = export(&records, &filtered, &SelectionSet::default(), &request, today).unwrap();
        assert_eq!(file.body, "\"Name\"\n\"B\"\n\"A\"");
        assert_eq!(file.filename, "contacts-2024-03-15.csv");
        assert_eq!(file.record_count, 2);
    }
}
