use rally_ranker::model::{Conditions, Event, ResultRow};
use rally_ranker::predict::{self, Entrant};
use rally_ranker::rating::{ConditionBucket, Factor, RatingTable, default_uncertainty};

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn result(season: i32, round: u32, tags: &str, number: &str, driver: &str, car: &str, finish: u32) -> ResultRow {
    ResultRow {
        season,
        round,
        event_name: format!("Event {season}-{round}"),
        event_url: format!("/final/{season}{round:02}-event/"),
        conditions: Conditions::from(tags),
        entry_number: number.into(),
        driver: driver.into(),
        codriver: format!("{driver} Co"),
        car: car.into(),
        tyre: None,
        final_finish: finish,
        final_time: 10_000.0 + f64::from(finish) * 30.0,
    }
}

/// Gravel rounds 1, 3 and 4 led by Ogier; asphalt round 2 with Neuville
/// winning instead.
fn history() -> Vec<ResultRow> {
    vec![
        result(2021, 1, "gravel", "1", "Ogier", "Yaris", 1),
        result(2021, 1, "gravel", "33", "Evans", "Yaris", 2),
        result(2021, 1, "gravel", "11", "Neuville", "i20", 3),
        result(2021, 2, "asphalt", "1", "Ogier", "Yaris", 3),
        result(2021, 2, "asphalt", "33", "Evans", "Yaris", 2),
        result(2021, 2, "asphalt", "11", "Neuville", "i20", 1),
        result(2021, 3, "gravel", "1", "Ogier", "Yaris", 1),
        result(2021, 3, "gravel", "33", "Evans", "Yaris", 3),
        result(2021, 3, "gravel", "11", "Neuville", "i20", 2),
        result(2021, 4, "gravel", "1", "Ogier", "Yaris", 1),
        result(2021, 4, "gravel", "33", "Evans", "Yaris", 2),
        result(2021, 4, "gravel", "11", "Neuville", "i20", 3),
    ]
}

fn event(round: u32, tags: &str) -> Event {
    Event {
        season: 2021,
        round,
        name: format!("Event 2021-{round}"),
        url: format!("/final/2021{round:02}-event/"),
        conditions: Conditions::from(tags),
    }
}

#[test]
fn history_is_strictly_before_the_event() {
    let rows = history();
    assert_eq!(predict::history_before(&rows, 2021, 1).len(), 0);
    assert_eq!(predict::history_before(&rows, 2021, 3).len(), 6);
    assert_eq!(predict::history_before(&rows, 2022, 1).len(), 12);
}

#[test]
fn gravel_forecast_uses_gravel_history_only() {
    let rows = history();
    let target = event(4, "gravel");
    let observed = rows
        .iter()
        .filter(|r| r.round == 4)
        .cloned()
        .collect::<Vec<_>>();
    let entrants = observed.iter().map(Entrant::from).collect::<Vec<_>>();

    let fc = predict::forecast(&rows, &target, entrants, &observed);
    assert_eq!(fc.bucket, ConditionBucket::Tag("gravel".into()));

    let order = fc
        .predictions
        .iter()
        .map(|p| p.entrant.driver.as_str())
        .collect::<Vec<_>>();
    assert_eq!(order, vec!["Ogier", "Evans", "Neuville"]);

    let ogier = &fc.predictions[0];
    assert_eq!(ogier.predicted_position, 1);
    // Tyre is unknown, the other three factors all have gravel history.
    assert_eq!(ogier.known_factors, vec![Factor::Driver, Factor::Codriver, Factor::Car]);
    // (3 * 1.0 + 1 * 1.0 + 2 * 1.75) / 6
    assert!(approx(ogier.rating.rating, 1.25));

    assert!(approx(fc.spearman.expect("three observed finishers"), 1.0));
}

#[test]
fn first_event_falls_back_to_default_ratings() {
    let rows = history();
    let observed = rows.iter().filter(|r| r.round == 1).cloned().collect::<Vec<_>>();
    let entrants = observed.iter().map(Entrant::from).collect::<Vec<_>>();

    let fc = predict::forecast(&rows, &event(1, "gravel"), entrants, &observed);
    assert!(fc.predictions.iter().all(|p| p.known_factors.is_empty()));
    assert!(fc
        .predictions
        .iter()
        .all(|p| approx(p.rating.uncertainty, default_uncertainty())));
    // Equal ratings fall back to entry-number order: 1, 11, 33.
    let numbers = fc
        .predictions
        .iter()
        .map(|p| p.entrant.entry_number.as_str())
        .collect::<Vec<_>>();
    assert_eq!(numbers, vec!["1", "11", "33"]);
}

#[test]
fn rating_table_over_whole_history() {
    let rows = history();
    let table = RatingTable::build(&rows, ConditionBucket::Any);
    let neuville = table.get(Factor::Driver, "Neuville").expect("rated");
    assert_eq!(neuville.starts, 4);
    assert!(approx(neuville.rating.rating, 9.0 / 4.0));

    let board = table.leaderboard(Factor::Car);
    assert_eq!(board.len(), 2);
    assert_eq!(board[0].0, "Yaris");
}

#[test]
fn backtest_scores_each_event_in_range() {
    let rows = history();
    let summary = predict::backtest(&rows, 2021..=2021);
    assert_eq!(summary.events.len(), 4);
    assert_eq!(
        summary.events.iter().map(|e| e.round).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
    assert_eq!(summary.events[3].bucket, "gravel");
    assert!(approx(summary.events[3].spearman.expect("defined"), 1.0));
    assert_eq!(summary.scored, 4);
    assert!(summary.mean_spearman.is_some());

    let empty = predict::backtest(&rows, 2019..=2020);
    assert!(empty.events.is_empty());
    assert_eq!(empty.mean_spearman, None);
}
