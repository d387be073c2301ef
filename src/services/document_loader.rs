use std::path::Path;

use tracing::{info, warn};

pub const BILLING_SUMMARY_SOURCE: &str = "synthetic_data_summary";

/// A text document headed for the vector store
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub content: String,
    /// Label reported back to the user when the document is retrieved
    pub source: Option<String>,
}

/// Read a whole text file; its path becomes the source label.
pub async fn load_text_file(path: &Path) -> std::io::Result<Document> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(Document {
        content,
        source: Some(path.display().to_string()),
    })
}

/// Render the first `max_rows` rows of the billing CSV as a plain-text table.
pub async fn load_billing_summary(path: &Path, max_rows: usize) -> Result<Document, csv::Error> {
    let bytes = tokio::fs::read(path).await?;
    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows: Vec<Vec<String>> = Vec::with_capacity(max_rows);
    for record in reader.records().take(max_rows) {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    let mut content = format!("FinOps Billing Data Summary (First {} Records):\n", max_rows);
    content.push_str(&render_table(&headers, &rows));

    Ok(Document {
        content,
        source: Some(BILLING_SUMMARY_SOURCE.to_string()),
    })
}

fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .map(|v| v.chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let render_line = |cells: &[String]| -> String {
        widths
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                format!("{:>width$}", cell, width = w)
            })
            .collect::<Vec<_>>()
            .join("  ")
    };

    let mut out = render_line(headers);
    for row in rows {
        out.push('\n');
        out.push_str(&render_line(row.as_slice()));
    }
    out
}

/// Load the tips document and the billing summary. Sources that cannot be
/// read are logged and skipped, so the result may be empty.
pub async fn load_corpus(tips_path: &Path, billing_csv_path: &Path, summary_rows: usize) -> Vec<Document> {
    let mut documents = Vec::new();

    match load_text_file(tips_path).await {
        Ok(doc) => documents.push(doc),
        Err(e) => warn!(path = %tips_path.display(), error = %e, "FinOps tips file could not be loaded"),
    }

    match load_billing_summary(billing_csv_path, summary_rows).await {
        Ok(doc) => documents.push(doc),
        Err(e) => warn!(
            path = %billing_csv_path.display(),
            error = %e,
            "Billing data could not be summarized for RAG"
        ),
    }

    info!(documents = documents.len(), "RAG corpus loaded");
    documents
}
