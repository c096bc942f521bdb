//! Listing what an index holds (`dh chunks`).

use anyhow::Result;

use crate::index::VectorIndex;
use crate::models::IndexEntry;

const PREVIEW_CHARS: usize = 100;

/// Print up to `limit` stored chunks with a short text preview.
pub async fn print_chunks(index: &dyn VectorIndex, limit: usize) -> Result<()> {
    let total = index.count().await?;
    println!("index: {}", index.spec());
    println!("chunks stored: {}", total);

    for (i, entry) in index.entries(limit).await?.iter().enumerate() {
        println!("{}", format_entry(i, entry));
    }

    if total > limit {
        println!("... {} more", total - limit);
    }
    Ok(())
}

pub fn format_entry(position: usize, entry: &IndexEntry) -> String {
    format!(
        "{}: {} [{} chunk {}] {}",
        position,
        entry.id,
        entry.metadata.filename,
        entry.metadata.chunk,
        preview(&entry.document)
    )
}

/// First [`PREVIEW_CHARS`] characters, with `...` when cut. Never splits a
/// multi-byte character.
fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChunkMetadata;

    #[test]
    fn short_text_is_unchanged() {
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn long_text_is_cut_on_char_boundary() {
        let text = "é".repeat(150);
        let p = preview(&text);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
    }

    #[test]
    fn entry_line_names_file_and_chunk() {
        let entry = IndexEntry {
            id: "a.pdf_chunk2".into(),
            vector: vec![],
            document: "hello".into(),
            metadata: ChunkMetadata {
                filename: "a.pdf".into(),
                chunk: 2,
            },
        };
        assert_eq!(format_entry(0, &entry), "0: a.pdf_chunk2 [a.pdf chunk 2] hello");
    }
}
