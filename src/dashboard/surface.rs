//! Display surfaces for the dashboard panels

use std::io::Write;
use tracing::warn;

/// One-off message shown to the user outside the two panels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// The run is in progress
    Status(String),
    Success(String),
    Warning(String),
    Error(String),
}

/// Where the log panel, result panel and notices are drawn
pub trait Surface: Send {
    /// Redraw the log panel with the full buffer contents
    fn render_log(&mut self, log: &str);

    /// Show the final pipeline output
    fn render_result(&mut self, result: &str);

    fn notify(&mut self, notice: Notice);
}

/// Surface that writes both panels to a terminal stream.
///
/// The log buffer only ever grows within a run, so a full redraw is
/// equivalent to printing whatever the terminal has not shown yet.
pub struct TerminalSurface<W: Write + Send> {
    out: W,
    rendered: usize,
}

impl TerminalSurface<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out, rendered: 0 }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) {
        if let Err(e) = self
            .out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush())
        {
            warn!("Failed to write to terminal: {}", e);
        }
    }
}

impl<W: Write + Send> Surface for TerminalSurface<W> {
    fn render_log(&mut self, log: &str) {
        // A shorter buffer means a new run reset it
        if log.len() < self.rendered || !log.is_char_boundary(self.rendered) {
            self.rendered = 0;
        }
        let unseen = &log[self.rendered..];
        self.rendered = log.len();
        if !unseen.is_empty() {
            self.write(unseen);
        }
    }

    fn render_result(&mut self, result: &str) {
        self.write(&format!("\n📄 Result\n{}\n{result}\n", "─".repeat(40)));
    }

    fn notify(&mut self, notice: Notice) {
        let line = match notice {
            Notice::Status(message) => format!("⏳ {message}\n"),
            Notice::Success(message) => format!("✅ {message}\n"),
            Notice::Warning(message) => format!("⚠️ {message}\n"),
            Notice::Error(message) => format!("❌ {message}\n"),
        };
        self.write(&line);
    }
}
