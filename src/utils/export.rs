//! CSV export of benchmark statistics.

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::numeric::Magnitude;
use crate::report::Reporter;
use std::io::Write;
use std::path::Path;

/// One exported benchmark.
#[derive(Clone, Debug, PartialEq)]
pub struct CsvRow {
    pub name: String,
    pub iterations: usize,
    pub mean: f64,
    pub std_dev: f64,
}

/// Collects reports and writes them as CSV once the run is over.
#[derive(Clone, Debug)]
pub struct CsvReporter {
    unit: &'static str,
    rows: Vec<CsvRow>,
}

impl CsvReporter {
    pub fn new(unit: &'static str) -> Self {
        Self {
            unit,
            rows: Vec::new(),
        }
    }

    pub fn for_clock<C: Clock>() -> Self {
        Self::new(C::UNIT)
    }

    pub fn rows(&self) -> &[CsvRow] {
        &self.rows
    }

    /// Write the header and one line per report.
    pub fn write<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "benchmark,iterations,mean_{0},std_dev_{0}", self.unit)?;
        for row in &self.rows {
            writeln!(
                out,
                "{},{},{},{}",
                escape(&row.name),
                row.iterations,
                row.mean,
                row.std_dev
            )?;
        }
        out.flush()?;
        Ok(())
    }

    /// Write to a file at `path`, replacing it.
    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let export_err = |source| Error::Export {
            path: path.to_path_buf(),
            source,
        };
        let file = std::fs::File::create(path).map_err(export_err)?;
        match self.write(std::io::BufWriter::new(file)) {
            Err(Error::Io(source)) => Err(export_err(source)),
            other => other,
        }
    }
}

impl<A: Magnitude> Reporter<A> for CsvReporter {
    fn report(&mut self, name: &str, iterations: usize, mean: A, std_dev: A) {
        self.rows.push(CsvRow {
            name: name.to_string(),
            iterations,
            mean: mean.magnitude(),
            std_dev: std_dev.magnitude(),
        });
    }
}

/// Quote a field when it contains a separator, quote or newline.
fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
