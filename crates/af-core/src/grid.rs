/// Grille ASCII : lignes de texte, row-major, non mutée après production.
///
/// Rows may differ in length when the grid comes from user text; grids
/// produced by the quantizer have rows of exactly `output_width` glyphs.
///
/// # Example
/// ```
/// use af_core::grid::AsciiGrid;
/// let grid = AsciiGrid::from_text("ab\ncde");
/// assert_eq!(grid.row_count(), 2);
/// assert_eq!(grid.max_row_len(), 3);
/// assert_eq!(grid.to_text(), "ab\ncde");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AsciiGrid {
    rows: Vec<String>,
}

impl AsciiGrid {
    /// Split newline-delimited text into rows. A trailing `'\r'` on a row
    /// is dropped. Empty text yields one empty row.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self {
            rows: text
                .split('\n')
                .map(|r| r.strip_suffix('\r').unwrap_or(r).to_string())
                .collect(),
        }
    }

    /// Chunk a row-major character stream into rows of `width` characters.
    /// The last row is shorter when the count is not a multiple of `width`.
    ///
    /// # Example
    /// ```
    /// use af_core::grid::AsciiGrid;
    /// let grid = AsciiGrid::from_chars("abcdefg".chars(), 3);
    /// assert_eq!(grid.rows(), ["abc", "def", "g"]);
    /// ```
    #[must_use]
    pub fn from_chars(chars: impl IntoIterator<Item = char>, width: usize) -> Self {
        let width = width.max(1);
        let mut rows = Vec::new();
        let mut current = String::new();
        let mut n = 0usize;
        for ch in chars {
            current.push(ch);
            n += 1;
            if n == width {
                rows.push(std::mem::take(&mut current));
                n = 0;
            }
        }
        if n > 0 {
            rows.push(current);
        }
        Self { rows }
    }

    /// Rows, top to bottom.
    #[must_use]
    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Length of the longest row, in characters.
    #[must_use]
    pub fn max_row_len(&self) -> usize {
        self.rows.iter().map(|r| r.chars().count()).max().unwrap_or(0)
    }

    /// Rows joined by `'\n'`, no trailing newline.
    #[must_use]
    pub fn to_text(&self) -> String {
        self.rows.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_one_empty_row() {
        let grid = AsciiGrid::from_text("");
        assert_eq!(grid.row_count(), 1);
        assert_eq!(grid.max_row_len(), 0);
    }

    #[test]
    fn crlf_rows_are_trimmed() {
        let grid = AsciiGrid::from_text("ab\r\ncd\r\n");
        assert_eq!(grid.rows(), ["ab", "cd", ""]);
    }

    #[test]
    fn row_length_counts_chars_not_bytes() {
        let grid = AsciiGrid::from_text("██\n.");
        assert_eq!(grid.max_row_len(), 2);
    }

    #[test]
    fn exact_multiple_has_no_tail_row() {
        let grid = AsciiGrid::from_chars("abcdef".chars(), 3);
        assert_eq!(grid.to_text(), "abc\ndef");
    }
}
