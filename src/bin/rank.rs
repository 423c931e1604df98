use anyhow::Result;

use rally_ranker::args::flag_value;
use rally_ranker::config::AppConfig;
use rally_ranker::logging::init_logging;
use rally_ranker::rating::{ConditionBucket, Factor, RatingTable};
use rally_ranker::store::DataDir;

const DEFAULT_TOP: usize = 20;

fn main() -> Result<()> {
    init_logging();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut cfg = AppConfig::from_env();
    cfg.apply_args(&args);

    let factors = match flag_value(&args, "--factor") {
        Some(raw) => vec![raw.parse::<Factor>()?],
        None => Factor::ALL.to_vec(),
    };
    let bucket = ConditionBucket::from_arg(flag_value(&args, "--condition").as_deref());
    let top = flag_value(&args, "--top")
        .and_then(|raw| raw.parse::<usize>().ok())
        .unwrap_or(DEFAULT_TOP)
        .max(1);

    let results = DataDir::new(&cfg.data_dir).read_results()?;
    let in_range = results
        .iter()
        .filter(|row| cfg.seasons.contains(&row.season));
    let table = RatingTable::build(in_range, bucket);

    println!(
        "Ratings for {}..={} in bucket `{}`",
        cfg.seasons.start(),
        cfg.seasons.end(),
        table.bucket()
    );
    if table.is_empty() {
        println!("No results in range.");
        return Ok(());
    }

    for factor in factors {
        let board = table.leaderboard(factor);
        println!();
        println!("{factor} ({} rated)", board.len());
        for (idx, (name, group)) in board.iter().take(top).enumerate() {
            println!(
                "{:>3}. {:<32} mean={:>6.2} sd={:>6.2} starts={}",
                idx + 1,
                name,
                group.rating.rating,
                group.rating.uncertainty,
                group.starts
            );
        }
    }

    Ok(())
}
