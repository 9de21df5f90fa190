use std::borrow::Cow;

const COLUMN_GAP: &str = "  ";

/// Monospace table with a dashed rule under the header row.
#[derive(Default)]
pub struct TextTableBuilder<'a, Seq> {
    headers: &'a [Cow<'a, str>],
    rows: Vec<Seq>,
    alignments: Cow<'a, [Alignment]>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl<'a, Seq> TextTableBuilder<'a, Seq>
where
    Seq: AsRef<[Cow<'a, str>]> + Default,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alignments(mut self, alignments: &'a [Alignment]) -> Self {
        self.alignments = Cow::Borrowed(alignments);
        self
    }

    pub fn headers(mut self, headers: &'a [Cow<'a, str>]) -> Self {
        self.headers = headers;
        if self.alignments.is_empty() {
            self.alignments = Cow::Owned(vec![Alignment::default(); self.headers.len()]);
        }
        self
    }

    pub fn row(mut self, row: Seq) -> Self {
        self.rows.push(row);
        self
    }

    pub fn rows(mut self, rows: impl IntoIterator<Item = Seq>) -> Self {
        self.rows.extend(rows);
        self
    }

    pub fn build(self) -> String {
        let col_count = self.headers.len();
        if col_count == 0 {
            return String::new();
        }

        let mut col_widths: Vec<usize> = self.headers.iter().map(|h| text_width(h)).collect();
        for row in &self.rows {
            for (i, cell) in row.as_ref().iter().enumerate().take(col_count) {
                col_widths[i] = col_widths[i].max(text_width(cell));
            }
        }

        let alignment = |i: usize| self.alignments.get(i).copied().unwrap_or_default();
        let mut table = String::with_capacity(
            (col_widths.iter().sum::<usize>() + col_count * COLUMN_GAP.len() + 1)
                * (self.rows.len() + 2),
        );

        push_line(
            &mut table,
            self.headers.iter().map(|h| h.as_ref()),
            &col_widths,
            alignment,
        );
        let rule: Vec<String> = col_widths.iter().map(|&width| "-".repeat(width)).collect();
        push_line(
            &mut table,
            rule.iter().map(String::as_str),
            &col_widths,
            |_| Alignment::Left,
        );
        for row in &self.rows {
            push_line(
                &mut table,
                row.as_ref().iter().map(|cell| cell.as_ref()),
                &col_widths,
                alignment,
            );
        }

        table
    }
}

fn push_line<'c>(
    out: &mut String,
    cells: impl Iterator<Item = &'c str>,
    col_widths: &[usize],
    alignment: impl Fn(usize) -> Alignment,
) {
    let mut line = String::new();
    for (i, (cell, &width)) in cells.zip(col_widths).enumerate() {
        if i > 0 {
            line.push_str(COLUMN_GAP);
        }
        let padding = width.saturating_sub(text_width(cell));
        let (left, right) = match alignment(i) {
            Alignment::Left => (0, padding),
            Alignment::Center => (padding / 2, padding - padding / 2),
            Alignment::Right => (padding, 0),
        };
        line.extend(std::iter::repeat_n(' ', left));
        line.push_str(cell);
        line.extend(std::iter::repeat_n(' ', right));
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

fn text_width(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_simple_table() {
        let table = TextTableBuilder::new()
            .alignments(&[Alignment::Left, Alignment::Right])
            .headers(&[Cow::Borrowed("Name"), Cow::Borrowed("Balance")])
            .row([Cow::Borrowed("Alice"), Cow::Borrowed("+$100.00")])
            .row([Cow::Borrowed("Bob"), Cow::Borrowed("-$100.00")])
            .build();

        assert_eq!(
            table,
            "Name    Balance\n\
             -----  --------\n\
             Alice  +$100.00\n\
             Bob    -$100.00\n"
        );
    }

    #[rstest]
    fn test_center_alignment_and_default() {
        let table = TextTableBuilder::new()
            .alignments(&[Alignment::Center])
            .headers(&[Cow::Borrowed("Status")])
            .row([Cow::Borrowed("ok")])
            .build();

        assert_eq!(table, "Status\n------\n  ok\n");
    }

    #[rstest]
    fn test_missing_alignments_default_to_left() {
        let table = TextTableBuilder::new()
            .headers(&[Cow::Borrowed("A"), Cow::Borrowed("B")])
            .rows([
                [Cow::Borrowed("long"), Cow::Borrowed("x")],
                [Cow::Borrowed("y"), Cow::Borrowed("z")],
            ])
            .build();

        assert_eq!(table, "A     B\n----  -\nlong  x\ny     z\n");
    }

    #[rstest]
    fn test_no_headers_builds_nothing() {
        let table = TextTableBuilder::<[Cow<'_, str>; 0]>::new().build();
        assert!(table.is_empty());
    }
}
