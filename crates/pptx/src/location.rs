//! Addresses of text runs inside a slide deck.

use std::fmt;

/// A cell inside a table graphic frame (zero-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TableCell {
    pub row: usize,
    pub col: usize,
}

/// Location of one `a:r` run.
///
/// All indices are zero-based. `shape` counts `p:sp` and `p:graphicFrame`
/// elements in document order, including those nested in group shapes.
/// `paragraph` restarts for every text body, so table cells number their
/// paragraphs from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlideLocation {
    pub slide: usize,
    pub shape: usize,
    pub cell: Option<TableCell>,
    pub paragraph: usize,
    pub run: usize,
}

impl fmt::Display for SlideLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slide {}, shape {}", self.slide + 1, self.shape + 1)?;
        if let Some(cell) = self.cell {
            write!(f, ", cell ({}, {})", cell.row + 1, cell.col + 1)?;
        }
        write!(f, ", paragraph {}, run {}", self.paragraph + 1, self.run + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_is_one_based() {
        let location = SlideLocation {
            slide: 1,
            shape: 0,
            cell: Some(TableCell { row: 0, col: 1 }),
            paragraph: 0,
            run: 2,
        };
        assert_eq!(
            location.to_string(),
            "slide 2, shape 1, cell (1, 2), paragraph 1, run 3"
        );
    }

    #[test]
    fn test_ordering_follows_traversal() {
        let text = SlideLocation {
            slide: 0,
            shape: 0,
            cell: None,
            paragraph: 3,
            run: 0,
        };
        let table = SlideLocation {
            slide: 0,
            shape: 1,
            cell: Some(TableCell { row: 0, col: 0 }),
            paragraph: 0,
            run: 0,
        };
        let later_row = SlideLocation {
            cell: Some(TableCell { row: 1, col: 0 }),
            ..table
        };
        assert!(text < table);
        assert!(table < later_row);
    }
}
