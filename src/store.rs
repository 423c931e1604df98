use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::merge::MergedRow;
use crate::model::{EntryListRow, Event, LegResultRow, ResultRow};
use crate::scrape::ScrapeReport;

pub const EVENTS_FILE: &str = "events.csv";
pub const RESULTS_FILE: &str = "results.csv";
pub const ENTRIES_FILE: &str = "entries.csv";
pub const LEG_RESULTS_FILE: &str = "legresults.csv";
pub const MERGED_FILE: &str = "merged_data.csv";
pub const REPORT_FILE: &str = "scrape_report.json";

/// Flat-file layout of one data directory.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    pub fn write_events(&self, rows: &[Event]) -> Result<()> {
        self.write(EVENTS_FILE, rows)
    }

    pub fn read_events(&self) -> Result<Vec<Event>> {
        read_table(&self.path(EVENTS_FILE))
    }

    pub fn write_results(&self, rows: &[ResultRow]) -> Result<()> {
        self.write(RESULTS_FILE, rows)
    }

    pub fn read_results(&self) -> Result<Vec<ResultRow>> {
        read_table(&self.path(RESULTS_FILE))
    }

    pub fn write_entry_lists(&self, rows: &[EntryListRow]) -> Result<()> {
        self.write(ENTRIES_FILE, rows)
    }

    pub fn read_entry_lists(&self) -> Result<Vec<EntryListRow>> {
        read_table(&self.path(ENTRIES_FILE))
    }

    pub fn write_leg_results(&self, rows: &[LegResultRow]) -> Result<()> {
        self.write(LEG_RESULTS_FILE, rows)
    }

    pub fn read_leg_results(&self) -> Result<Vec<LegResultRow>> {
        read_table(&self.path(LEG_RESULTS_FILE))
    }

    pub fn write_merged(&self, rows: &[MergedRow]) -> Result<()> {
        self.write(MERGED_FILE, rows)
    }

    pub fn write_report(&self, report: &ScrapeReport) -> Result<()> {
        let json = serde_json::to_string_pretty(report).context("serialize scrape report")?;
        write_atomic(&self.path(REPORT_FILE), json.as_bytes())
    }

    fn write<T: Serialize>(&self, file: &str, rows: &[T]) -> Result<()> {
        write_table(&self.path(file), rows)
    }
}

/// Header row plus one line per record, swapped into place when complete.
pub fn write_table<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("serialize row for {}", path.display()))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| anyhow::anyhow!("flush csv for {}: {}", path.display(), err.error()))?;
    write_atomic(path, &bytes)
}

pub fn read_table<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("open {}", path.display()))?;
    let mut out = Vec::new();
    for (idx, row) in reader.deserialize::<T>().enumerate() {
        out.push(row.with_context(|| format!("decode {} record {}", path.display(), idx + 1))?);
    }
    Ok(out)
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}
