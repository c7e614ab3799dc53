/// Append-only text buffer behind the log panel.
///
/// Grows monotonically within a run; [`LogBuffer::reset`] is only called
/// when a new run starts, after which the dashboard writes its banner line.
#[derive(Debug, Default, Clone)]
pub struct LogBuffer {
    text: String,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line, terminating it with a newline
    pub fn append_line(&mut self, line: &str) {
        self.text.push_str(line);
        self.text.push('\n');
    }

    /// Clear the buffer for a new run
    pub fn reset(&mut self) {
        self.text.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_reset() {
        let mut buffer = LogBuffer::new();
        assert!(buffer.is_empty());

        buffer.append_line("first");
        buffer.append_line("second");
        assert_eq!(buffer.as_str(), "first\nsecond\n");

        buffer.reset();
        assert!(buffer.is_empty());
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn test_empty_line_still_grows() {
        let mut buffer = LogBuffer::new();
        buffer.append_line("");
        assert_eq!(buffer.len(), 1);
    }
}
