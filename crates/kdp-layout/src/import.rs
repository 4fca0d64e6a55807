use crate::types::{LayoutError, PagePayload, PlannedPage, Result};
use std::path::Path;

/// Load a hand-written page list.
///
/// Columns: `kind,title,prompt,text`. Rows are indexed in file order; empty
/// cells are left unset.
pub async fn load_pages_from_csv(path: impl AsRef<Path>) -> Result<Vec<PlannedPage>> {
    let path = path.as_ref().to_owned();

    let contents = tokio::fs::read_to_string(&path).await?;

    let pages = tokio::task::spawn_blocking(move || parse_pages(&contents)).await??;

    Ok(pages)
}

pub(crate) fn parse_pages(contents: &str) -> Result<Vec<PlannedPage>> {
    let mut reader = csv::Reader::from_reader(contents.as_bytes());
    let mut pages = Vec::new();

    for (i, result) in reader.records().enumerate() {
        let record = result?;
        let kind = record
            .get(0)
            .unwrap_or_default()
            .parse()
            .map_err(|e: String| LayoutError::Format(format!("row {}: {}", i + 1, e)))?;

        let cell = |n: usize| {
            record
                .get(n)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        pages.push(PlannedPage::new(
            i as u32,
            kind,
            PagePayload {
                title: cell(1),
                prompt: cell(2),
                text: cell(3),
                ..Default::default()
            },
        ));
    }

    Ok(pages)
}
