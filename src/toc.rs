//! Table of contents layout.
//!
//! Entries refer to chapters by their index in the parsed chapter list, which
//! is also the index used for the chapter's file name in the package.

use tracing::warn;

use crate::parser::Chapter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TocEntry {
    Link(usize),
    Section(usize, Vec<usize>),
}

/// One entry per chapter, in order.
pub fn flat(chapters: &[Chapter]) -> Vec<TocEntry> {
    (0..chapters.len()).map(TocEntry::Link).collect()
}

/// Groups each level-2 chapter under the level-1 chapter before it.
///
/// Level-2 chapters that precede every level-1 chapter have no section to
/// join and are left out of the table of contents.
pub fn nested(chapters: &[Chapter]) -> Vec<TocEntry> {
    let mut toc: Vec<TocEntry> = Vec::new();
    let mut orphans = 0usize;

    for (index, chapter) in chapters.iter().enumerate() {
        match chapter.level() {
            1 => toc.push(TocEntry::Section(index, Vec::new())),
            2 => match toc.last_mut() {
                Some(TocEntry::Section(_, children)) => children.push(index),
                _ => orphans += 1,
            },
            level => warn!(
                "Unexpected chapter level {} for \"{}\", skipping it in the table of contents",
                level, chapter.title
            ),
        }
    }

    if orphans > 0 {
        warn!(
            "{} section(s) appear before the first chapter and are not listed in the table of contents",
            orphans
        );
    }

    toc
}
