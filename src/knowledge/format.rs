//! Result formatting for the orchestration layer and the CLI

use super::document::Document;

/// Separator line between formatted documents
const RULE_WIDTH: usize = 100;

/// Renders documents as a numbered listing with full metadata and content.
///
/// Numbering starts at 0, matching how the answering prompt cites documents.
pub fn format_docs(docs: &[Document]) -> String {
    docs.iter()
        .enumerate()
        .map(|(i, doc)| {
            let metadata = serde_json::to_string_pretty(&doc.metadata)
                .unwrap_or_else(|_| format!("{:?}", doc.metadata));
            format!(
                "{}. {}\n Metadata:\n{}\nContent:\n{}\n{}",
                i,
                doc.title(),
                metadata,
                doc.content,
                "-".repeat(RULE_WIDTH)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Truncates text to `max_chars` characters (UTF-8 safe), flattening newlines
pub fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// Human-readable byte size
pub fn format_bytes(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
