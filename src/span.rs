use serde::{Deserialize, Serialize};

/// Byte span inside a source file.
///
/// `start` is a byte index into the file, `length` the number of bytes the
/// original expression occupies.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SourceSpan {
    /// Start byte offset (inclusive).
    pub start: u32,

    /// Length in bytes.
    pub length: u32,
}

impl SourceSpan {
    pub fn new(start: u32, length: u32) -> Self {
        Self { start, length }
    }

    /// End byte offset (exclusive).
    pub fn end(&self) -> u32 {
        self.start + self.length
    }
}

/// Line/column span inside a source file.
///
/// Lines and columns are 1-based; columns count Unicode scalar values.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct LineSpan {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
}

impl LineSpan {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }
}

/// Convert a byte offset into a 1-based (line, column) location.
///
/// Column counts Unicode scalar values on the line segment.
pub fn byte_offset_to_line_col(code: &str, offset: usize) -> Option<(u32, u32)> {
    if offset > code.len() {
        return None;
    }

    let prefix = &code[..offset];

    let line = prefix.as_bytes().iter().filter(|&&b| b == b'\n').count() + 1;
    let line_start = prefix.rfind('\n').map(|pos| pos + 1).unwrap_or(0);
    let col = code[line_start..offset].chars().count() + 1;

    Some((line as u32, col as u32))
}

/// Build a [`LineSpan`] for a byte range of `code`.
pub fn line_span_for(code: &str, span: &SourceSpan) -> Option<LineSpan> {
    let (sl, sc) = byte_offset_to_line_col(code, span.start as usize)?;
    let (el, ec) = byte_offset_to_line_col(code, span.end() as usize)?;
    Some(LineSpan::new(sl, sc, el, ec))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_offset_to_line_col_basic() {
        let code = "a\nbcd\nef";
        assert_eq!(byte_offset_to_line_col(code, 0), Some((1, 1)));
        assert_eq!(byte_offset_to_line_col(code, 1), Some((1, 2)));
        assert_eq!(byte_offset_to_line_col(code, 2), Some((2, 1)));
        assert_eq!(byte_offset_to_line_col(code, 4), Some((2, 3)));
        assert_eq!(byte_offset_to_line_col(code, 6), Some((3, 1)));
        assert_eq!(byte_offset_to_line_col(code, code.len()), Some((3, 3)));
        assert_eq!(byte_offset_to_line_col(code, code.len() + 1), None);
    }

    #[test]
    fn line_span_for_multi_line_range() {
        let code = "var x = 1;\nvar y = 2;\n";
        let span = SourceSpan::new(4, 12);
        let ls = line_span_for(code, &span).unwrap();
        assert_eq!(ls, LineSpan::new(1, 5, 2, 6));
    }
}
