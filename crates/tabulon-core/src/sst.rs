//! Shared string table
//!
//! Text cells store an index into this table instead of the text itself.
//! Indices are stable: entries are only ever appended. An entry is either
//! plain text or a list of rich text runs, each with its own font.

use crate::error::{Error, Result};
use crate::TOTAL_CELL_CHARS;
use ahash::AHashMap;
use std::sync::Arc;

/// Font of one rich text run (`<rPr>`)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RichTextFont {
    pub bold: bool,
    pub italic: bool,
    pub strike: bool,
    /// Underline style such as `"single"` or `"double"`
    pub underline: Option<String>,
    pub family: Option<String>,
    pub size: Option<f64>,
    /// RGB hex without alpha, e.g. `"2354E8"`
    pub color: Option<String>,
}

/// A piece of text sharing one font
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RichTextRun {
    pub text: String,
    pub font: Option<RichTextFont>,
}

impl RichTextRun {
    pub fn new(text: impl Into<String>) -> Self {
        RichTextRun {
            text: text.into(),
            font: None,
        }
    }

    pub fn with_font(mut self, font: RichTextFont) -> Self {
        self.font = Some(font);
        self
    }
}

/// One table entry as read from or written to the part
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SharedStringItem {
    /// Plain text; for rich entries the concatenated run text
    pub text: String,
    /// Runs of a rich entry, `None` for plain text
    pub runs: Option<Vec<RichTextRun>>,
}

impl SharedStringItem {
    pub fn plain(text: impl Into<String>) -> Self {
        SharedStringItem {
            text: text.into(),
            runs: None,
        }
    }

    pub fn rich(runs: Vec<RichTextRun>) -> Self {
        SharedStringItem {
            text: runs.iter().map(|r| r.text.as_str()).collect(),
            runs: Some(runs),
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    text: Arc<str>,
    runs: Option<Arc<[RichTextRun]>>,
}

/// Deduplicated, append-only pool of cell strings.
#[derive(Debug, Clone, Default)]
pub struct SharedStringTable {
    items: Vec<Entry>,
    /// Plain entries only; rich text never resolves a plain lookup
    index: AHashMap<Arc<str>, usize>,
    /// Total number of string references in the workbook (`count` attribute)
    count: usize,
}

impl SharedStringTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from strings read out of an existing part. Duplicates
    /// keep their own slot so indices in worksheets stay valid; lookups
    /// resolve to the first occurrence.
    pub fn from_items<I, S>(items: I, count: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::from_entries(items.into_iter().map(|s| SharedStringItem::plain(s.as_ref())), count)
    }

    /// Like [`SharedStringTable::from_items`], keeping the runs of rich
    /// entries.
    pub fn from_entries<I>(items: I, count: usize) -> Self
    where
        I: IntoIterator<Item = SharedStringItem>,
    {
        let mut table = Self::default();
        for item in items {
            let text: Arc<str> = Arc::from(item.text);
            if item.runs.is_none() {
                table.index.entry(text.clone()).or_insert(table.items.len());
            }
            table.items.push(Entry {
                text,
                runs: item.runs.map(Arc::from),
            });
        }
        table.count = count.max(table.items.len());
        table
    }

    /// Return the index of `s`, appending it if it is new.
    ///
    /// Text longer than 32767 characters is truncated first.
    pub fn intern(&mut self, s: &str) -> usize {
        let s = truncate_chars(s, TOTAL_CELL_CHARS);
        if let Some(&i) = self.index.get(s) {
            return i;
        }
        let text: Arc<str> = Arc::from(s);
        let i = self.items.len();
        self.items.push(Entry {
            text: text.clone(),
            runs: None,
        });
        self.index.insert(text, i);
        self.count += 1;
        i
    }

    /// Return the index of an entry with exactly these runs, appending one
    /// if there is none. Fails when the runs hold more than 32767
    /// characters in total.
    pub fn intern_rich(&mut self, runs: &[RichTextRun]) -> Result<usize> {
        let chars: usize = runs.iter().map(|r| r.text.chars().count()).sum();
        if chars > TOTAL_CELL_CHARS {
            return Err(Error::CellCharsLength);
        }
        let found = self
            .items
            .iter()
            .position(|e| e.runs.as_deref().is_some_and(|r| r == runs));
        if let Some(i) = found {
            return Ok(i);
        }
        let item = SharedStringItem::rich(runs.to_vec());
        self.items.push(Entry {
            text: Arc::from(item.text),
            runs: item.runs.map(Arc::from),
        });
        self.count += 1;
        Ok(self.items.len() - 1)
    }

    fn entry(&self, index: usize) -> Result<&Entry> {
        self.items.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: self.items.len(),
        })
    }

    /// Look up the string at `index`.
    pub fn get(&self, index: usize) -> Result<&str> {
        self.entry(index).map(|e| e.text.as_ref())
    }

    /// Runs of the entry at `index`, `None` when it is plain text.
    pub fn runs(&self, index: usize) -> Result<Option<&[RichTextRun]>> {
        self.entry(index).map(|e| e.runs.as_deref())
    }

    /// Number of entries (`uniqueCount`)
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|e| e.text.as_ref())
    }

    /// Every entry with its runs, in index order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, Option<&[RichTextRun]>)> {
        self.items.iter().map(|e| (e.text.as_ref(), e.runs.as_deref()))
    }
}

/// Cut `s` to at most `max` characters on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((byte, _)) => &s[..byte],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_dedups() {
        let mut sst = SharedStringTable::new();
        let foo = sst.intern("foo");
        assert_eq!(sst.intern("foo"), foo);
        let bar = sst.intern("bar");
        assert_eq!(bar, foo + 1);
        assert_eq!(sst.len(), 2);
        assert_eq!(sst.get(bar).unwrap(), "bar");
    }

    #[test]
    fn test_exact_match_only() {
        let mut sst = SharedStringTable::new();
        let a = sst.intern("Foo");
        let b = sst.intern("foo");
        let c = sst.intern("foo ");
        assert_ne!(a, b);
        assert_ne!(b, c);
    }

    #[test]
    fn test_out_of_range() {
        let sst = SharedStringTable::from_items(["a", "b"], 2);
        assert_eq!(
            sst.get(2),
            Err(Error::IndexOutOfRange { index: 2, len: 2 })
        );
    }

    #[test]
    fn test_from_items_keeps_duplicate_slots() {
        let mut sst = SharedStringTable::from_items(["x", "y", "x"], 7);
        assert_eq!(sst.len(), 3);
        assert_eq!(sst.count(), 7);
        assert_eq!(sst.get(2).unwrap(), "x");
        assert_eq!(sst.intern("x"), 0);
        assert_eq!(sst.intern("z"), 3);
    }

    #[test]
    fn test_rich_entries() {
        let mut sst = SharedStringTable::new();
        let plain = sst.intern("bold text");
        let bold = RichTextFont {
            bold: true,
            ..Default::default()
        };
        let runs = vec![
            RichTextRun::new("bold").with_font(bold),
            RichTextRun::new(" text"),
        ];
        let rich = sst.intern_rich(&runs).unwrap();
        assert_ne!(rich, plain);
        assert_eq!(sst.get(rich).unwrap(), "bold text");
        assert_eq!(sst.runs(rich).unwrap(), Some(runs.as_slice()));
        assert_eq!(sst.runs(plain).unwrap(), None);
        assert_eq!(sst.intern_rich(&runs).unwrap(), rich);
        assert_eq!(sst.intern("bold text"), plain);
        assert_eq!(sst.len(), 2);

        let long = vec![RichTextRun::new("x".repeat(TOTAL_CELL_CHARS + 1))];
        assert_eq!(sst.intern_rich(&long), Err(Error::CellCharsLength));
    }

    #[test]
    fn test_rich_entries_stay_out_of_plain_lookup() {
        let sst_items = vec![
            SharedStringItem::rich(vec![RichTextRun::new("ab")]),
            SharedStringItem::plain("cd"),
        ];
        let mut sst = SharedStringTable::from_entries(sst_items, 0);
        assert_eq!(sst.count(), 2);
        assert_eq!(sst.intern("cd"), 1);
        assert_eq!(sst.intern("ab"), 2);
    }

    #[test]
    fn test_truncates_long_text() {
        let mut sst = SharedStringTable::new();
        let long = "é".repeat(TOTAL_CELL_CHARS + 10);
        let i = sst.intern(&long);
        assert_eq!(sst.get(i).unwrap().chars().count(), TOTAL_CELL_CHARS);
    }
}
