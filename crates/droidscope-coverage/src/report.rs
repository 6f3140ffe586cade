//! Text renderings of coverage series and the files they are written to.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::aggregate::Statistic;
use crate::recorder::{CoverageError, CoverageSeries};

const CSV_HEADER: &str = "interaction,control,method";
const TABLE_HEADER: [&str; 3] = ["Interaction", "Control", "Method"];

/// `interaction,control,method` rows with two decimals.
pub fn render_csv(series: &CoverageSeries) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for (index, snapshot) in series.iter() {
        let _ = writeln!(
            out,
            "{index},{:.2},{:.2}",
            snapshot.interaction, snapshot.method
        );
    }
    out
}

/// Boxed, left-justified table of the series.
pub fn render_table(series: &CoverageSeries) -> String {
    let mut rows: Vec<[String; 3]> = Vec::with_capacity(series.len() + 1);
    rows.push(TABLE_HEADER.map(String::from));
    for (index, snapshot) in series.iter() {
        rows.push([
            index.to_string(),
            format!("{:.2}", snapshot.interaction),
            format!("{:.2}", snapshot.method),
        ]);
    }

    let mut widths = [0usize; 3];
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let separator: String = widths
        .iter()
        .fold(String::from("+"), |mut s, w| {
            s.push_str(&"-".repeat(w + 2));
            s.push('+');
            s
        });

    let mut out = String::new();
    out.push_str(&separator);
    out.push('\n');
    for (i, row) in rows.iter().enumerate() {
        out.push('|');
        for (cell, w) in row.iter().zip(widths) {
            let _ = write!(out, " {cell:<w$} |");
        }
        out.push('\n');
        if i == 0 {
            out.push_str(&separator);
            out.push('\n');
        }
    }
    out.push_str(&separator);
    out.push('\n');
    out
}

/// One `key: visits` line per vertex.
pub fn render_visit_status(status: &[(String, u32)]) -> String {
    status.iter().fold(String::new(), |mut out, (key, visits)| {
        let _ = writeln!(out, "{key}: {visits}");
        out
    })
}

/// Writes report files into one output directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Raw, readable and visit-status files for one run. `test` selects
    /// the numbered file names used in batch runs.
    pub fn write_run(
        &self,
        test: Option<u32>,
        series: &CoverageSeries,
        visit_status: &[(String, u32)],
    ) -> Result<Vec<PathBuf>, CoverageError> {
        let suffix = test.map(|n| format!("_{n}")).unwrap_or_default();
        Ok(vec![
            self.write(&format!("results_raw{suffix}.csv"), &render_csv(series))?,
            self.write(
                &format!("results_readable{suffix}.txt"),
                &render_table(series),
            )?,
            self.write(
                &format!("vertex_visit_status{suffix}.txt"),
                &render_visit_status(visit_status),
            )?,
        ])
    }

    /// Raw and readable files for an aggregate series.
    pub fn write_statistic(
        &self,
        statistic: Statistic,
        series: &CoverageSeries,
    ) -> Result<Vec<PathBuf>, CoverageError> {
        let name = statistic.name();
        Ok(vec![
            self.write(&format!("{name}_results_raw.csv"), &render_csv(series))?,
            self.write(
                &format!("{name}_results_readable.txt"),
                &render_table(series),
            )?,
        ])
    }

    fn write(&self, file_name: &str, contents: &str) -> Result<PathBuf, CoverageError> {
        fs::create_dir_all(&self.dir).map_err(|e| CoverageError::io(&self.dir, e))?;
        let path = self.dir.join(file_name);
        fs::write(&path, contents).map_err(|e| CoverageError::io(&path, e))?;
        tracing::debug!("Wrote {}", path.display());
        Ok(path)
    }
}
