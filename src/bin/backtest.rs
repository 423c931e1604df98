use anyhow::Result;

use rally_ranker::args::has_flag;
use rally_ranker::config::AppConfig;
use rally_ranker::logging::init_logging;
use rally_ranker::predict;
use rally_ranker::store::DataDir;

fn main() -> Result<()> {
    init_logging();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut cfg = AppConfig::from_env();
    cfg.apply_args(&args);

    let results = DataDir::new(&cfg.data_dir).read_results()?;
    let summary = predict::backtest(&results, cfg.seasons.clone());

    if has_flag(&args, "--json") {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Rating backtest");
    println!("Data dir: {}", cfg.data_dir.display());
    println!("Seasons: {}..={}", cfg.seasons.start(), cfg.seasons.end());
    for score in &summary.events {
        println!(
            "{} r{:<2} {:<36} bucket={:<10} entrants={:<3} spearman={}",
            score.season,
            score.round,
            score.event_name,
            score.bucket,
            score.entrants,
            score
                .spearman
                .map(|rho| format!("{rho:.4}"))
                .unwrap_or_else(|| "n/a".to_string())
        );
    }
    println!("Events: {} (scored {})", summary.events.len(), summary.scored);
    match summary.mean_spearman {
        Some(rho) => println!("Mean Spearman: {rho:.4}"),
        None => println!("Mean Spearman: n/a"),
    }

    Ok(())
}
