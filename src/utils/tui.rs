//! Text User Interface (TUI) utilities.
//!
//! Console reporters and the CLI's header and listing output.

use crate::clock::Clock;
use crate::numeric::Magnitude;
use crate::report::Reporter;
use std::io::{self, Write};
use terminal_size::{terminal_size, Width};

/// Get the current terminal width, constrained to a reasonable range
fn get_term_width() -> usize {
    if let Some((Width(w), _)) = terminal_size() {
        (w as usize).clamp(40, 200)
    } else {
        80
    }
}

/// Truncate string with ellipsis if it exceeds width (character-wise)
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut result: String = s.chars().take(width.saturating_sub(3)).collect();
        result.push_str("...");
        result
    }
}

fn format_value(value: f64, unit: &str) -> String {
    format!("{:.2} {}", value, unit)
}

/// Keeps the first write error; reporters cannot fail mid-run.
fn remember(slot: &mut Option<io::Error>, result: io::Result<()>) {
    if let Err(e) = result {
        slot.get_or_insert(e);
    }
}

/// One tab-separated line per benchmark: name, iterations, mean, deviation.
pub struct TabReporter<W: Write = io::Stdout> {
    out: W,
    unit: &'static str,
    error: Option<io::Error>,
}

impl TabReporter<io::Stdout> {
    /// Print to stdout in the unit of clock `C`.
    pub fn for_clock<C: Clock>() -> Self {
        Self::new(io::stdout(), C::UNIT)
    }
}

impl<W: Write> TabReporter<W> {
    pub fn new(out: W, unit: &'static str) -> Self {
        Self {
            out,
            unit,
            error: None,
        }
    }

    /// Flush and return the writer, or the first error seen.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write, A: Magnitude> Reporter<A> for TabReporter<W> {
    fn report(&mut self, name: &str, iterations: usize, mean: A, std_dev: A) {
        let line = writeln!(
            self.out,
            "{}\t{}\t{}{}\t{}{}",
            name,
            iterations,
            mean.magnitude(),
            self.unit,
            std_dev.magnitude(),
            self.unit
        );
        remember(&mut self.error, line);
    }
}

/// Aligned results table sized to the terminal.
pub struct TableReporter<W: Write = io::Stdout> {
    out: W,
    unit: &'static str,
    name_width: usize,
    rows: usize,
    error: Option<io::Error>,
}

impl TableReporter<io::Stdout> {
    /// Print to stdout in the unit of clock `C`, as wide as the terminal.
    pub fn for_clock<C: Clock>() -> Self {
        Self::new(io::stdout(), C::UNIT, get_term_width())
    }
}

impl<W: Write> TableReporter<W> {
    // 12+16+16+9 columns + 4 spaces + 2 indent
    const FIXED_WIDTH: usize = 59;

    pub fn new(out: W, unit: &'static str, term_width: usize) -> Self {
        Self {
            out,
            unit,
            name_width: term_width.saturating_sub(Self::FIXED_WIDTH).max(15),
            rows: 0,
            error: None,
        }
    }

    fn table_width(&self) -> usize {
        self.name_width + Self::FIXED_WIDTH - 2
    }

    fn write_header(&mut self) -> io::Result<()> {
        let rule = "─".repeat(self.table_width());
        writeln!(self.out, "  {}", rule)?;
        writeln!(
            self.out,
            "  {:<n_width$} {:>12} {:>16} {:>16} {:>9}",
            "Benchmark",
            "Iterations",
            "Mean",
            "Std. Dev.",
            "CV",
            n_width = self.name_width
        )?;
        writeln!(self.out, "  {}", rule)
    }

    fn write_row(&mut self, name: &str, iterations: usize, mean: f64, std_dev: f64) -> io::Result<()> {
        if self.rows == 0 {
            self.write_header()?;
        }
        self.rows += 1;

        let cv = if mean > 0.0 { std_dev / mean } else { 0.0 };
        writeln!(
            self.out,
            "  {:<n_width$} {:>12} {:>16} {:>16} {:>8.2}%",
            truncate(name, self.name_width),
            iterations,
            format_value(mean, self.unit),
            format_value(std_dev, self.unit),
            cv * 100.0,
            n_width = self.name_width
        )
    }

    /// Close the table and return the writer, or the first error seen.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(e) = self.error.take() {
            return Err(e);
        }
        if self.rows > 0 {
            writeln!(self.out, "  {}", "─".repeat(self.table_width()))?;
        }
        self.out.flush()?;
        Ok(self.out)
    }
}

impl<W: Write, A: Magnitude> Reporter<A> for TableReporter<W> {
    fn report(&mut self, name: &str, iterations: usize, mean: A, std_dev: A) {
        let row = self.write_row(name, iterations, mean.magnitude(), std_dev.magnitude());
        remember(&mut self.error, row);
    }
}

/// Print the application header
pub fn print_header() {
    let term_width = get_term_width().min(80);
    let title = " EMB Micro-Benchmarks ";
    let padding = term_width.saturating_sub(title.len() + 2) / 2;
    let right_padding = term_width.saturating_sub(padding + title.len());

    let border = "═".repeat(term_width);

    println!("╔{}╗", border);
    println!(
        "║{}{}{}║",
        " ".repeat(padding),
        title,
        " ".repeat(right_padding)
    );
    println!("╚{}╝", border);
    println!();
}

/// Print registered benchmark names with their iteration counts
pub fn print_benchmark_list<'a>(benchmarks: impl IntoIterator<Item = (&'a str, usize)>) {
    println!("Available benchmarks:");
    println!();
    for (name, iterations) in benchmarks {
        println!("  {:<28} {:>10} iterations", name, iterations);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::Nanos;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a_rather_long_name", 10), "a_rathe...");
    }

    #[test]
    fn test_tab_reporter_lines() {
        let mut reporter = TabReporter::new(Vec::new(), "us");
        reporter.report("loop", 100, 2.5f64, 0.5f64);
        reporter.report("empty", 10, 1.0f64, 0.0f64);
        let out = String::from_utf8(reporter.finish().unwrap()).unwrap();
        assert_eq!(out, "loop\t100\t2.5us\t0.5us\nempty\t10\t1us\t0us\n");
    }

    #[test]
    fn test_tab_reporter_passes_nan_through() {
        let mut reporter = TabReporter::new(Vec::new(), "ns");
        reporter.report("single", 1, Nanos::new(4.0), Nanos::new(f64::NAN));
        let out = String::from_utf8(reporter.finish().unwrap()).unwrap();
        assert_eq!(out, "single\t1\t4ns\tNaNns\n");
    }

    #[test]
    fn test_table_reporter_rows() {
        let mut reporter = TableReporter::new(Vec::new(), "ns", 80);
        reporter.report("sort", 1000, 200.0f64, 20.0f64);
        let out = String::from_utf8(reporter.finish().unwrap()).unwrap();

        assert!(out.contains("Benchmark"));
        let row = out.lines().find(|l| l.contains("sort")).unwrap();
        assert!(row.contains("1000"));
        assert!(row.contains("200.00 ns"));
        assert!(row.contains("20.00 ns"));
        assert!(row.contains("10.00%"));
    }

    #[test]
    fn test_empty_table_prints_nothing() {
        let reporter = TableReporter::new(Vec::new(), "ns", 80);
        let out = reporter.finish().unwrap();
        assert!(out.is_empty());
    }
}
