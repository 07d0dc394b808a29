use codegen_core::{format_remaining, format_thousands};
use codegen_pipeline::{Progress, ProgressObserver};
use std::io::{self, Write};

const FRAMES: [&str; 2] = ["> ", " >"];
const CLEAR_LINE: &str = "\x1b[2K\r";

/// Single-line progress display, rewritten in place every tick.
pub struct TerminalProgress<W: Write + Send + 'static = io::Stdout> {
    out: W,
    prefix: String,
    frame: usize,
}

impl TerminalProgress {
    pub fn stdout(prefix: &str) -> Self {
        Self::new(io::stdout(), prefix)
    }
}

impl<W: Write + Send + 'static> TerminalProgress<W> {
    pub fn new(out: W, prefix: &str) -> Self {
        Self {
            out,
            prefix: prefix.to_owned(),
            frame: 0,
        }
    }
}

pub fn render_line(frame: &str, prefix: &str, progress: &Progress) -> String {
    format!(
        "\r{frame}Generating {} codes with prefix '{prefix}' [ST: {:.2}% | RM: {}]",
        format_thousands(progress.target),
        progress.percent(),
        format_remaining(progress.remaining.unwrap_or_default()),
    )
}

/// Erases the progress line on stdout.
pub fn clear_line() {
    let mut out = io::stdout();
    // best effort; the next message starts on a fresh line either way
    let _ = out.write_all(CLEAR_LINE.as_bytes());
    let _ = out.flush();
}

impl<W: Write + Send + 'static> ProgressObserver for TerminalProgress<W> {
    fn on_progress(&mut self, progress: &Progress) {
        let line = render_line(FRAMES[self.frame], &self.prefix, progress);
        self.frame = (self.frame + 1) % FRAMES.len();
        let _ = self.out.write_all(line.as_bytes());
        let _ = self.out.flush();
    }

    fn on_finished(&mut self, _progress: &Progress) {
        let _ = self.out.write_all(CLEAR_LINE.as_bytes());
        let _ = self.out.flush();
    }
}
