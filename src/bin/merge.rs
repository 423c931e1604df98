use anyhow::Result;

use rally_ranker::config::AppConfig;
use rally_ranker::logging::init_logging;
use rally_ranker::merge::merge_tables;
use rally_ranker::store::{self, DataDir};

fn main() -> Result<()> {
    init_logging();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut cfg = AppConfig::from_env();
    cfg.apply_args(&args);
    let data = DataDir::new(&cfg.data_dir);

    let entries = data.read_entry_lists()?;
    let legs = data.read_leg_results()?;
    let results = data.read_results()?;

    let (rows, stats) = merge_tables(&entries, &legs, &results);
    data.write_merged(&rows)?;

    println!("Merge complete");
    println!("Output: {}", data.path(store::MERGED_FILE).display());
    println!("Entry-list rows: {}", stats.entries);
    println!("Without leg result: {}", stats.without_leg_result);
    println!("Without final result: {}", stats.without_final_result);
    println!("Merged rows: {}", stats.merged);

    Ok(())
}
