use crate::layout::{BookLayout, PageContent};
use serde::Serialize;
use std::fmt;

/// Role of an interior page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrintPageKind {
    Title,
    Left,
    Right,
    Ending,
}

impl fmt::Display for PrintPageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PrintPageKind::Title => "title",
            PrintPageKind::Left => "left",
            PrintPageKind::Right => "right",
            PrintPageKind::Ending => "ending",
        })
    }
}

/// One physical interior page, borrowing its content from the layout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrintPage<'a> {
    pub kind: PrintPageKind,
    pub content: &'a PageContent,
    /// 1-based position in the interior
    pub absolute_page_number: usize,
}

/// Interior pages in print order: title, each spread's left then right
/// page, ending. The cover is printed separately and never appears here.
pub fn flatten(layout: &BookLayout) -> Vec<PrintPage<'_>> {
    let mut pages = Vec::with_capacity(layout.interior_page_count());

    pages.push(PrintPage {
        kind: PrintPageKind::Title,
        content: &layout.title.content,
        absolute_page_number: 1,
    });

    for (index, spread) in layout.spreads.iter().enumerate() {
        pages.push(PrintPage {
            kind: PrintPageKind::Left,
            content: &spread.left,
            absolute_page_number: 2 + index * 2,
        });
        pages.push(PrintPage {
            kind: PrintPageKind::Right,
            content: &spread.right,
            absolute_page_number: 3 + index * 2,
        });
    }

    pages.push(PrintPage {
        kind: PrintPageKind::Ending,
        content: &layout.ending.content,
        absolute_page_number: 2 + layout.spreads.len() * 2,
    });

    pages
}
