// Client-side CSV preview
//
// Only enough parsing to show headers and a short sample before mapping. Fields are split on
// bare commas; quoted fields containing commas are not supported. The server does the real
// parse of the uploaded file.

use crate::error::ValidationError;

/// Data rows shown under the headers.
pub const PREVIEW_ROWS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CsvPreview {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

fn split_fields(line: &str) -> Vec<String> {
    line.split(',')
        .map(|field| {
            let field = field.trim();
            let field = field.strip_prefix('"').unwrap_or(field);
            let field = field.strip_suffix('"').unwrap_or(field);
            field.trim().to_string()
        })
        .collect()
}

/// Header line plus up to [`PREVIEW_ROWS`] rows. Blank lines are ignored; a file without at
/// least one row after the header is rejected.
pub fn parse_preview(text: &str) -> Result<CsvPreview, ValidationError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .filter(|l| !l.trim().is_empty());

    let header = lines.next().ok_or(ValidationError::EmptyCsv)?;
    let rows: Vec<Vec<String>> = lines.take(PREVIEW_ROWS).map(split_fields).collect();
    if rows.is_empty() {
        return Err(ValidationError::EmptyCsv);
    }
    Ok(CsvPreview {
        headers: split_fields(header),
        rows,
    })
}
