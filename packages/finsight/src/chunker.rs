//! Page chunking - fixed-size page groups covering the document in order.

use crate::error::{ExtractionError, Result};
use crate::types::document::{Chunk, Page};

/// Split pages into chunks of at most `chunk_size` pages.
///
/// Lazy, deterministic, and order preserving: every page lands in
/// exactly one chunk, chunk boundaries depend only on the input length
/// and `chunk_size`, and the final chunk may be smaller. Fails with
/// `InvalidInput` on an empty page sequence or a zero chunk size.
pub fn chunk_pages(pages: &[Page], chunk_size: usize) -> Result<impl Iterator<Item = Chunk> + '_> {
    if pages.is_empty() {
        return Err(ExtractionError::InvalidInput {
            reason: "cannot chunk an empty page sequence".into(),
        });
    }
    if chunk_size == 0 {
        return Err(ExtractionError::InvalidInput {
            reason: "chunk size must be at least one page".into(),
        });
    }

    Ok(pages
        .chunks(chunk_size)
        .enumerate()
        .map(|(index, group)| Chunk {
            index,
            pages: group.to_vec(),
        }))
}

/// Number of chunks `chunk_pages` produces for a page count.
pub fn chunk_count(page_count: usize, chunk_size: usize) -> usize {
    page_count.div_ceil(chunk_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn pages(count: usize) -> Vec<Page> {
        (0..count).map(|i| Page::new(i, format!("page {i}"))).collect()
    }

    #[test]
    fn test_twelve_pages_k5() {
        let chunks: Vec<Chunk> = chunk_pages(&pages(12), 5).unwrap().collect();
        let sizes: Vec<usize> = chunks.iter().map(Chunk::page_count).collect();
        assert_eq!(sizes, vec![5, 5, 2]);
        assert_eq!(chunks[2].index, 2);
        assert_eq!(chunks[2].pages[0].index, 10);
    }

    #[test]
    fn test_exact_multiple() {
        let chunks: Vec<Chunk> = chunk_pages(&pages(10), 5).unwrap().collect();
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.page_count() == 5));
    }

    #[test]
    fn test_empty_pages_rejected() {
        assert!(matches!(
            chunk_pages(&[], 5).map(|it| it.count()),
            Err(ExtractionError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        assert!(matches!(
            chunk_pages(&pages(3), 0).map(|it| it.count()),
            Err(ExtractionError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_deterministic() {
        let input = pages(17);
        let a: Vec<Chunk> = chunk_pages(&input, 4).unwrap().collect();
        let b: Vec<Chunk> = chunk_pages(&input, 4).unwrap().collect();
        assert_eq!(a, b);
    }

    proptest! {
        #[test]
        fn prop_chunks_cover_pages_exactly(page_count in 1usize..200, chunk_size in 1usize..20) {
            let input = pages(page_count);
            let chunks: Vec<Chunk> = chunk_pages(&input, chunk_size).unwrap().collect();

            prop_assert_eq!(chunks.len(), chunk_count(page_count, chunk_size));
            prop_assert!(chunks.iter().all(|c| c.page_count() <= chunk_size && c.page_count() > 0));

            let rejoined: Vec<Page> = chunks.iter().flat_map(|c| c.pages.clone()).collect();
            prop_assert_eq!(rejoined, input);
        }
    }
}
