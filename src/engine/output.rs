//! Line-oriented report output

use std::io::{self, Write};

/// Destination for a run's progress and summary lines.
///
/// Every line is flushed as soon as it is written.
pub struct OutputSink {
    writer: Box<dyn Write + Send>,
}

impl OutputSink {
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Box::new(writer),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Discard everything
    pub fn null() -> Self {
        Self::new(io::sink())
    }

    pub fn line(&mut self, text: impl AsRef<str>) -> io::Result<()> {
        writeln!(self.writer, "{}", text.as_ref())?;
        self.writer.flush()
    }
}

impl Default for OutputSink {
    fn default() -> Self {
        Self::stdout()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CapturedOutput;

    #[test]
    fn test_lines_are_newline_terminated() {
        let captured = CapturedOutput::new();
        let mut sink = captured.sink();
        sink.line("one").unwrap();
        sink.line(String::from("two")).unwrap();
        assert_eq!(captured.contents(), "one\ntwo\n");
    }
}
