use std::str::FromStr;

use anyhow::{Context, Result, anyhow};

use rally_ranker::args::positional;
use rally_ranker::config::AppConfig;
use rally_ranker::logging::init_logging;
use rally_ranker::model::Event;
use rally_ranker::scrape::{ScrapeReport, Scraper, StageReport};
use rally_ranker::session::Session;
use rally_ranker::store::{self, DataDir};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Events,
    Results,
    Legs,
    All,
}

impl Stage {
    fn lists_events(self) -> bool {
        matches!(self, Stage::Events | Stage::All)
    }

    fn scrapes_results(self) -> bool {
        matches!(self, Stage::Results | Stage::All)
    }

    fn scrapes_legs(self) -> bool {
        matches!(self, Stage::Legs | Stage::All)
    }
}

impl FromStr for Stage {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim() {
            "events" => Ok(Stage::Events),
            "results" => Ok(Stage::Results),
            "legs" => Ok(Stage::Legs),
            "all" => Ok(Stage::All),
            other => Err(anyhow!(
                "unknown stage `{other}` (expected events, results, legs or all)"
            )),
        }
    }
}

fn main() -> Result<()> {
    init_logging();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let stage = positional(&args).unwrap_or("all").parse::<Stage>()?;

    let mut cfg = AppConfig::from_env();
    cfg.apply_args(&args);
    let data = DataDir::new(&cfg.data_dir);

    let mut session = Session::open(&cfg.http)?;
    if let Some(credentials) = &cfg.credentials {
        session.login(credentials).context("login failed")?;
    } else {
        tracing::info!("no credentials set, scraping anonymously");
    }

    let scraper = Scraper::new(&session, cfg.max_legs);
    let mut report = ScrapeReport::start();

    let events = if stage.lists_events() {
        let events = scraper.collect_events(cfg.seasons.clone(), &mut report);
        data.write_events(&events)?;
        events
    } else {
        let events = data
            .read_events()
            .with_context(|| format!("run the `events` stage first ({})", store::EVENTS_FILE))?;
        events
            .into_iter()
            .filter(|e| cfg.seasons.contains(&e.season))
            .collect::<Vec<Event>>()
    };

    if stage.scrapes_results() {
        let results = scraper.collect_results(&events, &mut report);
        data.write_results(&results)?;
    }
    if stage.scrapes_legs() {
        let entries = scraper.collect_entry_lists(&events, &mut report);
        data.write_entry_lists(&entries)?;
        let legs = scraper.collect_leg_results(&events, &mut report);
        data.write_leg_results(&legs)?;
    }

    report.finish();
    data.write_report(&report)?;

    println!("Scrape complete ({stage:?})");
    println!("Data dir: {}", data.root().display());
    println!(
        "Seasons: {}..={}",
        cfg.seasons.start(),
        cfg.seasons.end()
    );
    println!("Session: {}", if session.is_authenticated() { "logged in" } else { "anonymous" });
    print_stage("events", &report.events);
    if stage.scrapes_results() {
        print_stage("results", &report.results);
    }
    if stage.scrapes_legs() {
        print_stage("entry lists", &report.entry_lists);
        print_stage("leg results", &report.leg_results);
    }

    Ok(())
}

fn print_stage(name: &str, stage: &StageReport) {
    println!(
        "{name}: pages={} kept={} skipped={} capped={}",
        stage.pages_fetched, stage.rows_kept, stage.skipped.total, stage.capped_events
    );
    for (reason, count) in &stage.skipped.by_reason {
        println!("  {reason}: {count}");
    }
    if !stage.errors.is_empty() {
        println!("  errors: {}", stage.errors.len());
        for err in stage.errors.iter().take(6) {
            println!("   - {err}");
        }
    }
}
