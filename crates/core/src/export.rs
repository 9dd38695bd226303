use serde::Serialize;

use crate::clock::format_timestamp;
use crate::error::CoreError;
use crate::item::EffectiveItem;

const CSV_HEADERS: [&str; 10] = [
    "id",
    "title",
    "category",
    "description",
    "link",
    "status",
    "isEdited",
    "statusUpdatedAt",
    "editUpdatedAt",
    "comment",
];

/// Flat export row. Absent values are written as empty strings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportRow<'a> {
    id: &'a str,
    title: &'a str,
    category: &'a str,
    description: &'a str,
    link: &'a str,
    status: &'static str,
    is_edited: bool,
    status_updated_at: String,
    edit_updated_at: String,
    comment: &'a str,
}

impl<'a> ExportRow<'a> {
    fn new(item: &'a EffectiveItem) -> Self {
        Self {
            id: item.id.as_str(),
            title: &item.title,
            category: item.category.as_deref().unwrap_or_default(),
            description: item.description.as_deref().unwrap_or_default(),
            link: item.link.as_deref().unwrap_or_default(),
            status: item.status.as_str(),
            is_edited: item.is_edited,
            status_updated_at: item
                .status_updated_at
                .as_ref()
                .map(format_timestamp)
                .unwrap_or_default(),
            edit_updated_at: item
                .edit_updated_at
                .as_ref()
                .map(format_timestamp)
                .unwrap_or_default(),
            comment: &item.comment,
        }
    }

    fn cells(&self) -> [String; 10] {
        [
            self.id.to_string(),
            self.title.to_string(),
            self.category.to_string(),
            self.description.to_string(),
            self.link.to_string(),
            self.status.to_string(),
            self.is_edited.to_string(),
            self.status_updated_at.clone(),
            self.edit_updated_at.clone(),
            self.comment.to_string(),
        ]
    }
}

pub fn to_json(items: &[EffectiveItem]) -> Result<String, CoreError> {
    let rows: Vec<ExportRow<'_>> = items.iter().map(ExportRow::new).collect();
    Ok(serde_json::to_string_pretty(&rows)?)
}

pub fn to_csv(items: &[EffectiveItem]) -> String {
    let mut lines = Vec::with_capacity(items.len() + 1);
    lines.push(CSV_HEADERS.join(","));
    for item in items {
        let row = ExportRow::new(item);
        let cells: Vec<String> = row.cells().iter().map(|c| escape_cell(c)).collect();
        lines.push(cells.join(","));
    }
    lines.join("\n")
}

fn escape_cell(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
