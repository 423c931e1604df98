use std::ops::RangeInclusive;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use serde::Serialize;

use crate::html;
use crate::model::{EntryListRow, Event, LegResultRow, ResultRow};
use crate::normalize::{SkipTally, keep_parsed};
use crate::paginate::{LegPage, Paginated, paginate_legs};
use crate::session::Fetch;

/// Per-leg resources of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegResource {
    EntryList,
    LegResults,
}

impl LegResource {
    pub fn path(self, event_id: &str, leg: u32) -> String {
        match self {
            LegResource::EntryList => format!("/entries/{event_id}/?leg={leg}"),
            LegResource::LegResults => format!("/final/{event_id}/?leg={leg}"),
        }
    }
}

pub fn season_path(season: i32) -> String {
    format!("/season/{season}/1-wrc/")
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StageReport {
    pub pages_fetched: usize,
    pub rows_kept: usize,
    pub skipped: SkipTally,
    pub capped_events: usize,
    pub errors: Vec<String>,
}

impl StageReport {
    fn absorb_pages<T>(&mut self, paged: &Paginated<T>) {
        self.pages_fetched += paged.pages_fetched;
        self.rows_kept += paged.records.len();
        self.skipped.merge(&paged.skipped);
        if paged.capped {
            self.capped_events += 1;
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrapeReport {
    pub started_at: String,
    pub finished_at: Option<String>,
    pub events: StageReport,
    pub results: StageReport,
    pub entry_lists: StageReport,
    pub leg_results: StageReport,
}

impl ScrapeReport {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now().to_rfc3339(),
            finished_at: None,
            events: StageReport::default(),
            results: StageReport::default(),
            entry_lists: StageReport::default(),
            leg_results: StageReport::default(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now().to_rfc3339());
    }
}

pub struct Scraper<F> {
    fetcher: F,
    max_legs: u32,
}

impl<F: Fetch> Scraper<F> {
    pub fn new(fetcher: F, max_legs: u32) -> Self {
        Self {
            fetcher,
            max_legs: max_legs.max(1),
        }
    }

    pub fn season_events(&self, season: i32, stage: &mut StageReport) -> Result<Vec<Event>> {
        let page = self
            .fetcher
            .fetch(&season_path(season))
            .with_context(|| format!("fetch season {season}"))?;
        stage.pages_fetched += 1;
        let events = keep_parsed(html::parse_season(&page, season), &mut stage.skipped);
        stage.rows_kept += events.len();
        Ok(events)
    }

    pub fn event_results(&self, event: &Event, stage: &mut StageReport) -> Result<Vec<ResultRow>> {
        let page = self
            .fetcher
            .fetch(&event.url)
            .with_context(|| format!("fetch results of {}", event.name))?;
        stage.pages_fetched += 1;
        let rows = keep_parsed(html::parse_results(&page, event), &mut stage.skipped);
        stage.rows_kept += rows.len();
        Ok(rows)
    }

    pub fn event_entry_list(
        &self,
        event: &Event,
        stage: &mut StageReport,
    ) -> Result<Vec<EntryListRow>> {
        let paged = self.paginate(event, LegResource::EntryList, |page, leg| {
            LegPage::from_rows(html::parse_entry_list(page, event, leg))
        })?;
        stage.absorb_pages(&paged);
        Ok(paged.records)
    }

    pub fn event_leg_results(
        &self,
        event: &Event,
        stage: &mut StageReport,
    ) -> Result<Vec<LegResultRow>> {
        let paged = self.paginate(event, LegResource::LegResults, |page, leg| {
            LegPage::from_rows(html::parse_leg_results(page, event, leg))
        })?;
        stage.absorb_pages(&paged);
        Ok(paged.records)
    }

    fn paginate<T, P>(&self, event: &Event, resource: LegResource, parse: P) -> Result<Paginated<T>>
    where
        P: Fn(&str, u32) -> LegPage<T>,
    {
        let event_id = event
            .site_id()
            .ok_or_else(|| anyhow!("no event id in url `{}`", event.url))?;
        paginate_legs(self.max_legs, |leg| {
            let path = resource.path(event_id, leg);
            let page = self
                .fetcher
                .fetch(&path)
                .with_context(|| format!("fetch {path}"))?;
            Ok(parse(&page, leg))
        })
    }

    /// Events of every season in the range. A failed season is recorded and
    /// skipped.
    pub fn collect_events(&self, seasons: RangeInclusive<i32>, report: &mut ScrapeReport) -> Vec<Event> {
        let mut out = Vec::new();
        for season in seasons {
            match self.season_events(season, &mut report.events) {
                Ok(events) => {
                    tracing::info!(season, events = events.len(), "season listed");
                    out.extend(events);
                }
                Err(err) => {
                    tracing::warn!(season, "season failed: {err:#}");
                    report.events.errors.push(format!("season {season}: {err:#}"));
                }
            }
        }
        out
    }

    pub fn collect_results(&self, events: &[Event], report: &mut ScrapeReport) -> Vec<ResultRow> {
        self.collect_per_event(events, &mut report.results, |event, stage| {
            self.event_results(event, stage)
        })
    }

    pub fn collect_entry_lists(&self, events: &[Event], report: &mut ScrapeReport) -> Vec<EntryListRow> {
        self.collect_per_event(events, &mut report.entry_lists, |event, stage| {
            self.event_entry_list(event, stage)
        })
    }

    pub fn collect_leg_results(&self, events: &[Event], report: &mut ScrapeReport) -> Vec<LegResultRow> {
        self.collect_per_event(events, &mut report.leg_results, |event, stage| {
            self.event_leg_results(event, stage)
        })
    }

    fn collect_per_event<T, S>(&self, events: &[Event], stage: &mut StageReport, mut scrape: S) -> Vec<T>
    where
        S: FnMut(&Event, &mut StageReport) -> Result<Vec<T>>,
    {
        let mut out = Vec::new();
        for event in events {
            let skipped_before = stage.skipped.total;
            match scrape(event, stage) {
                Ok(rows) => {
                    tracing::info!(
                        season = event.season,
                        round = event.round,
                        rows = rows.len(),
                        skipped = stage.skipped.total - skipped_before,
                        "{}",
                        event.name
                    );
                    out.extend(rows);
                }
                Err(err) => {
                    tracing::warn!(season = event.season, round = event.round, "{}: {err:#}", event.name);
                    stage.errors.push(format!(
                        "{} round {} ({}): {err:#}",
                        event.season, event.round, event.name
                    ));
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leg_resource_paths() {
        assert_eq!(LegResource::EntryList.path("123-x", 2), "/entries/123-x/?leg=2");
        assert_eq!(LegResource::LegResults.path("123-x", 1), "/final/123-x/?leg=1");
        assert_eq!(season_path(2021), "/season/2021/1-wrc/");
    }
}
