//! Console appender implementation

use crate::core::{Appender, LogEntry, Result};
use std::io::{self, Write};

/// Where console output goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsoleTarget {
    #[default]
    Stdout,
    Stderr,
}

enum Output {
    Std(ConsoleTarget),
    Writer(Box<dyn Write + Send>),
}

/// Writes one rendered line per record.
///
/// The line is written through a single locked handle, so records from
/// different sinks sharing stdout do not interleave mid-line.
pub struct ConsoleAppender {
    output: Output,
}

impl ConsoleAppender {
    pub fn new() -> Self {
        Self::with_target(ConsoleTarget::Stdout)
    }

    pub fn with_target(target: ConsoleTarget) -> Self {
        Self {
            output: Output::Std(target),
        }
    }

    /// Write to an arbitrary writer instead of a standard stream.
    ///
    /// # Example
    ///
    /// ```
    /// use session_logger::appenders::ConsoleAppender;
    ///
    /// let appender = ConsoleAppender::with_writer(Box::new(std::io::sink()));
    /// ```
    pub fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            output: Output::Writer(writer),
        }
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        match self.output {
            Output::Std(ConsoleTarget::Stdout) => {
                let mut out = io::stdout().lock();
                writeln!(out, "{}", line)
            }
            Output::Std(ConsoleTarget::Stderr) => {
                let mut out = io::stderr().lock();
                writeln!(out, "{}", line)
            }
            Output::Writer(ref mut writer) => writeln!(writer, "{}", line),
        }
    }
}

impl Default for ConsoleAppender {
    fn default() -> Self {
        Self::new()
    }
}

impl Appender for ConsoleAppender {
    fn write(&mut self, _entry: &LogEntry, rendered: &str) -> Result<()> {
        self.write_line(rendered)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        match self.output {
            Output::Std(ConsoleTarget::Stdout) => io::stdout().flush()?,
            Output::Std(ConsoleTarget::Stderr) => io::stderr().flush()?,
            Output::Writer(ref mut writer) => writer.flush()?,
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }

    fn write_banner(&mut self, text: &str) -> Result<()> {
        self.write_line(text)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogLevel;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_writes_rendered_line() {
        let buf = SharedBuf::default();
        let mut appender = ConsoleAppender::with_writer(Box::new(buf.clone()));
        let entry = LogEntry::new(LogLevel::Info, "ignored".to_string());

        appender.write(&entry, "rendered text").unwrap();
        appender.write_banner("header").unwrap();
        appender.flush().unwrap();

        let out = String::from_utf8(buf.0.lock().clone()).unwrap();
        assert_eq!(out, "rendered text\nheader\n");
    }
}
