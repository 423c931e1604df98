use anyhow::{Context, Result, anyhow};

use rally_ranker::args::flag_value;
use rally_ranker::config::AppConfig;
use rally_ranker::logging::init_logging;
use rally_ranker::model::{Event, ResultRow};
use rally_ranker::predict::{self, Entrant};
use rally_ranker::store::DataDir;

fn main() -> Result<()> {
    init_logging();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut cfg = AppConfig::from_env();
    cfg.apply_args(&args);
    let data = DataDir::new(&cfg.data_dir);

    let season = flag_value(&args, "--season")
        .and_then(|raw| raw.parse::<i32>().ok())
        .context("missing or invalid --season")?;
    let round = flag_value(&args, "--round")
        .and_then(|raw| raw.parse::<u32>().ok())
        .context("missing or invalid --round")?;

    let results = data.read_results()?;
    let event = find_event(&data, &results, season, round)?;
    let observed = results
        .iter()
        .filter(|row| row.event_key() == event.key())
        .cloned()
        .collect::<Vec<_>>();

    // Before the rally has run there is no classification; start from leg 1.
    let entrants = if observed.is_empty() {
        data.read_entry_lists()
            .context("no results for this event and no entry list to predict from")?
            .iter()
            .filter(|row| (row.season, row.round, row.leg) == (season, round, 1))
            .map(Entrant::from)
            .collect::<Vec<_>>()
    } else {
        observed.iter().map(Entrant::from).collect()
    };
    if entrants.is_empty() {
        return Err(anyhow!("no entrants found for {season} round {round}"));
    }

    let fc = predict::forecast(&results, &event, entrants, &observed);
    let finishes = observed
        .iter()
        .map(|r| (r.entry_number.as_str(), r.final_finish))
        .collect::<std::collections::HashMap<_, _>>();

    println!("{} {} round {} (bucket `{}`)", fc.event_name, fc.season, fc.round, fc.bucket);
    for p in &fc.predictions {
        let actual = finishes
            .get(p.entrant.entry_number.as_str())
            .map(|f| f.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:>3}. #{:<4} {:<24} {:<24} {:<28} mean={:>6.2} sd={:>6.2} known={} actual={}",
            p.predicted_position,
            p.entrant.entry_number,
            p.entrant.driver,
            p.entrant.codriver,
            p.entrant.car,
            p.rating.rating,
            p.rating.uncertainty,
            p.known_factors.len(),
            actual
        );
    }
    match fc.spearman {
        Some(rho) => println!("Spearman: {rho:.4}"),
        None => println!("Spearman: n/a"),
    }

    Ok(())
}

fn find_event(data: &DataDir, results: &[ResultRow], season: i32, round: u32) -> Result<Event> {
    if let Ok(events) = data.read_events()
        && let Some(event) = events.into_iter().find(|e| e.key() == (season, round))
    {
        return Ok(event);
    }
    predict::events_from_results(results)
        .into_iter()
        .find(|e| e.key() == (season, round))
        .ok_or_else(|| anyhow!("event {season} round {round} not found"))
}
