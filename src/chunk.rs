//! Fixed-size word chunker.
//!
//! Splits document text on whitespace and groups the words into runs of
//! exactly `chunk_size` words; only the final run may be shorter. Chunks do
//! not overlap and keep document order, so joining every chunk's words gives
//! back the original word sequence.
//!
//! Each chunk's id is derived from its filename and index
//! (`"{filename}_chunk{index}"`), so re-chunking unchanged text regenerates
//! identical ids.

use crate::models::Chunk;

/// Split text into ordered chunks of at most `chunk_size` words.
///
/// Returns an empty vector when the text has no words. A `chunk_size` of
/// zero is treated as one (config validation rejects zero before it gets
/// here).
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .chunks(chunk_size.max(1))
        .map(|run| run.join(" "))
        .collect()
}

/// Chunk a document's text and attach ids and indices.
pub fn build_chunks(filename: &str, text: &str, chunk_size: usize) -> Vec<Chunk> {
    chunk_text(text, chunk_size)
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk {
            id: chunk_id(filename, index),
            filename: filename.to_string(),
            chunk_index: index,
            text,
        })
        .collect()
}

pub fn chunk_id(filename: &str, index: usize) -> String {
    format!("{}_chunk{}", filename, index)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        (0..n)
            .map(|i| format!("w{}", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_empty_text_yields_no_chunks() {
        assert!(chunk_text("", 300).is_empty());
        assert!(chunk_text("   \n\t  ", 300).is_empty());
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = chunk_text("Hello, world!", 300);
        assert_eq!(chunks, vec!["Hello, world!".to_string()]);
    }

    #[test]
    fn test_exact_multiple() {
        let chunks = chunk_text(&words(600), 300);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].split_whitespace().count(), 300);
        assert_eq!(chunks[1].split_whitespace().count(), 300);
    }

    #[test]
    fn test_count_is_ceiling() {
        for (n, size) in [(1, 300), (299, 300), (301, 300), (10, 3), (7, 7), (8, 7)] {
            let chunks = chunk_text(&words(n), size);
            assert_eq!(chunks.len(), n.div_ceil(size), "n={} size={}", n, size);
        }
    }

    #[test]
    fn test_only_last_chunk_is_short() {
        let chunks = chunk_text(&words(10), 4);
        let sizes: Vec<usize> = chunks
            .iter()
            .map(|c| c.split_whitespace().count())
            .collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }

    #[test]
    fn test_words_reconstruct_original() {
        let text = "The  quick\nbrown fox\t\tjumps over\n\nthe lazy dog. Again and again.";
        let chunks = chunk_text(text, 3);
        let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.split_whitespace()).collect();
        let original: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rejoined, original);
    }

    #[test]
    fn test_deterministic() {
        let text = words(1234);
        assert_eq!(chunk_text(&text, 300), chunk_text(&text, 300));
    }

    #[test]
    fn test_zero_size_treated_as_one() {
        assert_eq!(chunk_text("a b", 0), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_build_chunks_ids_and_indices() {
        let chunks = build_chunks("report.pdf", &words(450), 300);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].id, "report.pdf_chunk0");
        assert_eq!(chunks[1].id, "report.pdf_chunk1");
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i);
            assert_eq!(c.filename, "report.pdf");
        }
    }
}
