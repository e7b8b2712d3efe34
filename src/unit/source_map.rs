use crate::error::Position;

/// Row/column lookup over a loaded script, counted the way the reader counts:
/// `\r\n`, `\r` and `\n` each end a row, a tab advances `tab_width` columns
/// and any other character advances one.
pub struct SourceMap<'a> {
    source: &'a str,
    row_starts: Vec<usize>,
    tab_width: usize,
}

impl<'a> SourceMap<'a> {
    pub fn new(source: &'a str, tab_width: usize) -> Self {
        let bytes = source.as_bytes();
        let mut row_starts = vec![0];
        let mut i = 0;
        while i < bytes.len() {
            i += match (bytes[i], bytes.get(i + 1)) {
                (b'\r', Some(b'\n')) => 2,
                _ => 1,
            };
            if matches!(bytes[i - 1], b'\r' | b'\n') {
                row_starts.push(i);
            }
        }
        SourceMap { source, row_starts, tab_width }
    }

    /// Zero-based row holding `offset`.
    fn row(&self, offset: usize) -> usize {
        self.row_starts.partition_point(|&start| start <= offset).saturating_sub(1)
    }

    pub fn position(&self, offset: usize) -> Position {
        let row = self.row(offset);
        let start = self.row_starts[row];
        let col: usize = self
            .source
            .get(start..offset.min(self.source.len()))
            .unwrap_or("")
            .chars()
            .map(|c| if c == '\t' { self.tab_width } else { 1 })
            .sum();
        Position { row: row + 1, col: col + 1 }
    }

    /// The row holding `offset`, without its line break and with tabs
    /// expanded so columns line up with [`SourceMap::position`].
    pub fn row_text(&self, offset: usize) -> String {
        let row = self.row(offset);
        let start = self.row_starts[row];
        let end = self.row_starts.get(row + 1).copied().unwrap_or(self.source.len());
        self.source
            .get(start..end)
            .unwrap_or("")
            .trim_end_matches(['\r', '\n'])
            .replace('\t', &" ".repeat(self.tab_width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(row: usize, col: usize) -> Position {
        Position { row, col }
    }

    #[test]
    fn single_statement() {
        let map = SourceMap::new("a = {1, 2}[0]", 4);
        assert_eq!(map.position(0), at(1, 1));
        assert_eq!(map.position(4), at(1, 5));
        assert_eq!(map.position(13), at(1, 14));
    }

    #[test]
    fn every_line_break_starts_a_row() {
        let src = "a = 1;\nb = 2;\r\nc\rd";
        let map = SourceMap::new(src, 4);
        assert_eq!(map.position(6), at(1, 7));
        assert_eq!(map.position(7), at(2, 1));
        assert_eq!(map.position(15), at(3, 1));
        assert_eq!(map.position(17), at(4, 1));
        assert_eq!(map.row_text(8), "b = 2;");
        assert_eq!(map.row_text(17), "d");
    }

    #[test]
    fn tabs_follow_the_width() {
        let src = "\ta =\t$";
        assert_eq!(SourceMap::new(src, 4).position(5), at(1, 12));
        assert_eq!(SourceMap::new(src, 8).position(5), at(1, 20));
        assert_eq!(SourceMap::new(src, 2).row_text(0), "  a =  $");
    }

    #[test]
    fn non_ascii_counts_one_column() {
        let src = "é $";
        assert_eq!(SourceMap::new(src, 4).position(3), at(1, 3));
    }

    #[test]
    fn offsets_past_the_end() {
        let map = SourceMap::new("1 + 2", 4);
        assert_eq!(map.position(99), at(1, 6));
        assert_eq!(map.row_text(99), "1 + 2");
        let empty = SourceMap::new("", 4);
        assert_eq!(empty.position(0), at(1, 1));
        assert_eq!(empty.row_text(0), "");
    }
}
