//! User-supplied spectral energy distributions.
//!
//! Input is any text with two whitespace-separated numeric columns: photon energy
//! in Rydberg and a flux (or flux density) value. Rows that do not parse are
//! skipped silently. Surviving points are sorted by energy and deduplicated with
//! the first occurrence winning, then written in the fixed scientific format the
//! engine's `table SED` command reads.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use cr_core::fmt_sci6;

use crate::error::{ScriptError, ScriptResult};

/// File name the normalized table is stored under in the engine data directory.
pub const USER_TABLE_FILE: &str = "user_sed.dat";

#[derive(Debug, Clone, PartialEq)]
pub struct SpectralTable {
    points: Vec<(f64, f64)>,
    parsed_rows: usize,
}

impl SpectralTable {
    pub fn parse(raw: &str) -> ScriptResult<Self> {
        let mut lines = 0usize;
        let mut points: Vec<(f64, f64)> = Vec::new();

        for line in raw.lines() {
            lines += 1;
            let mut tokens = line.split_whitespace();
            let (Some(e), Some(f)) = (tokens.next(), tokens.next()) else {
                continue;
            };
            let (Ok(e), Ok(f)) = (e.parse::<f64>(), f.parse::<f64>()) else {
                continue;
            };
            if e.is_finite() && f.is_finite() {
                points.push((e, f));
            }
        }

        let parsed_rows = points.len();
        // stable sort: among equal energies the earliest row stays first
        points.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut kept: Vec<(f64, f64)> = Vec::with_capacity(points.len());
        for point in points {
            match kept.last() {
                Some(last) if point.0 <= last.0 => {}
                _ => kept.push(point),
            }
        }

        if kept.is_empty() {
            return Err(ScriptError::EmptySpectrum { lines });
        }

        Ok(Self {
            points: kept,
            parsed_rows,
        })
    }

    /// Read a spectrum file; bytes that are not valid UTF-8 are replaced.
    pub fn load(path: &Path) -> ScriptResult<Self> {
        let bytes = fs::read(path)?;
        Self::parse(&String::from_utf8_lossy(&bytes))
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of rows that held two numeric columns, before deduplication.
    pub fn parsed_rows(&self) -> usize {
        self.parsed_rows
    }

    pub fn duplicates_dropped(&self) -> usize {
        self.parsed_rows - self.points.len()
    }

    pub fn energy_range(&self) -> (f64, f64) {
        // parse() guarantees at least one point
        let first = self.points.first().map_or(0.0, |p| p.0);
        let last = self.points.last().map_or(0.0, |p| p.0);
        (first, last)
    }

    pub fn to_engine_text(&self) -> String {
        let mut out = String::with_capacity(self.points.len() * 28);
        for (e, f) in &self.points {
            out.push_str(&fmt_sci6(*e));
            out.push_str("  ");
            out.push_str(&fmt_sci6(*f));
            out.push('\n');
        }
        out
    }

    /// Write the table and force it to disk before returning, so an engine
    /// started right after never sees a partial file.
    pub fn write_durable(&self, path: &Path) -> ScriptResult<()> {
        let mut file = File::create(path)?;
        file.write_all(self.to_engine_text().as_bytes())?;
        file.flush()?;
        file.sync_all()?;
        Ok(())
    }
}

/// A normalized table as the engine will refer to it from a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    file_name: String,
}

impl TableRef {
    pub fn new(file_name: impl Into<String>) -> ScriptResult<Self> {
        let file_name = file_name.into();
        let reason = if file_name.is_empty() {
            Some("empty name")
        } else if file_name.contains('"') || file_name.chars().any(char::is_control) {
            Some("quotes and control characters are not allowed")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(ScriptError::InvalidTableName {
                name: file_name,
                reason,
            }),
            None => Ok(Self { file_name }),
        }
    }

    /// Name shown when no run is involved, e.g. in a script preview.
    pub fn user_table() -> Self {
        Self {
            file_name: USER_TABLE_FILE.to_string(),
        }
    }

    /// Per-run name, so concurrent runs sharing a data directory never read
    /// each other's table.
    pub fn for_run(run_id: &str) -> ScriptResult<Self> {
        Self::new(format!("user_sed_{run_id}.dat"))
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }
}
