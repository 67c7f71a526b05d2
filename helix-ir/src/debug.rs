#![forbid(unsafe_code)]

use helix_ast::Span;

/// Maps byte offsets back to line/column positions of one source file.
#[derive(Clone, Debug)]
pub struct DebugSource {
    pub file_name: String,
    text: String,
    line_starts: Vec<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineCol {
    /// 1-based line number
    pub line: u32,
    /// 1-based column number
    pub col: u32,
}

impl DebugSource {
    pub fn new(file_name: String, text: &str) -> Self {
        let mut line_starts: Vec<usize> = Vec::new();
        line_starts.push(0);
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            file_name,
            text: text.to_string(),
            line_starts,
        }
    }

    /// The text of a 1-based line, without its line terminator.
    pub fn line_text(&self, line: u32) -> &str {
        let idx = (line as usize).saturating_sub(1);
        let Some(&start) = self.line_starts.get(idx) else {
            return "";
        };
        let end = self
            .line_starts
            .get(idx + 1)
            .copied()
            .unwrap_or(self.text.len());
        self.text[start..end].trim_end_matches(['\n', '\r'])
    }

    pub fn line_col(&self, span: Span) -> LineCol {
        let off: usize = span.offset();

        let line_idx = match self.line_starts.binary_search(&off) {
            Ok(i) => i,
            Err(0) => 0,
            Err(i) => i - 1,
        };

        let line_start = self.line_starts.get(line_idx).copied().unwrap_or(0);
        let col0 = off.saturating_sub(line_start);

        LineCol {
            line: (line_idx as u32) + 1,
            col: (col0 as u32) + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use helix_ast::span;

    #[test]
    fn line_col_is_one_based() {
        let src = DebugSource::new("main.hx".to_string(), "let a = 1;\nlet b = 2;\n");
        assert_eq!(src.line_col(span(0, 3)), LineCol { line: 1, col: 1 });
        assert_eq!(src.line_col(span(15, 1)), LineCol { line: 2, col: 5 });
        assert_eq!(src.line_text(2), "let b = 2;");
        assert_eq!(src.line_text(9), "");
    }
}
