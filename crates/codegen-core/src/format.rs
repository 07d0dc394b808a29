//! Text layout of the output artifact and the progress line.

use crate::code::Code;
use jiff::Zoned;
use std::io::{self, Write};
use std::time::Duration;

/// Width of the dashed rule under the header.
pub const RULE_WIDTH: usize = 96;

pub const HELP_LINE: &str = "Each time you use a code, delete it. You can use [CTRL + X]";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Formats `n` with comma thousands separators, e.g. `1,000,000`.
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Renders a remaining-time estimate using its two most significant units.
pub fn format_remaining(d: Duration) -> String {
    let secs = d.as_secs();
    let days = secs / 86_400;
    let hours = (secs / 3_600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;

    if days > 0 {
        format!("{days} day {hours:02} hour")
    } else if hours > 0 {
        format!("{hours:02} hour {minutes:02} minute")
    } else if minutes > 0 {
        format!("{minutes:02} minute {seconds:02} second")
    } else {
        format!("{seconds:02} second")
    }
}

/// The three lines written ahead of the codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub target_count: u64,
}

impl Header {
    pub fn new(target_count: u64) -> Self {
        Self { target_count }
    }

    /// Label used in file names and the first header line.
    pub fn label(&self) -> &'static str {
        if self.target_count == 1 {
            "CODE"
        } else {
            "CODES"
        }
    }

    pub fn render(&self, at: &Zoned) -> String {
        let generated = if self.target_count == 1 {
            "code were generated at"
        } else {
            "codes were generated |"
        };
        format!(
            "{} {} {}\n{}\n{}\n",
            format_thousands(self.target_count),
            generated,
            at.strftime(TIMESTAMP_FORMAT),
            HELP_LINE,
            "-".repeat(RULE_WIDTH),
        )
    }

    pub fn write_to<W: Write>(&self, at: &Zoned, out: &mut W) -> io::Result<()> {
        out.write_all(self.render(at).as_bytes())
    }
}

/// Writes one code line, numbered from 1 when `line_numbers` is set.
pub fn write_code_line<W: Write>(
    out: &mut W,
    index: u64,
    code: &Code,
    line_numbers: bool,
) -> io::Result<()> {
    if line_numbers {
        writeln!(out, "{index}: {code}")
    } else {
        writeln!(out, "{code}")
    }
}
