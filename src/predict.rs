use std::collections::{BTreeMap, HashMap};
use std::ops::RangeInclusive;

use serde::Serialize;

use crate::model::{EntryListRow, Event, ResultRow};
use crate::rating::{self, ConditionBucket, Factor, Rating, RatingTable};

/// One crew/car combination taking the start.
#[derive(Debug, Clone, PartialEq)]
pub struct Entrant {
    pub entry_number: String,
    pub driver: String,
    pub codriver: String,
    pub car: String,
    pub tyre: Option<String>,
}

impl Entrant {
    fn key(&self, factor: Factor) -> Option<&str> {
        factor.pick(&self.driver, &self.codriver, &self.car, self.tyre.as_deref())
    }
}

impl From<&ResultRow> for Entrant {
    fn from(row: &ResultRow) -> Self {
        Self {
            entry_number: row.entry_number.clone(),
            driver: row.driver.clone(),
            codriver: row.codriver.clone(),
            car: row.car.clone(),
            tyre: row.tyre.clone(),
        }
    }
}

impl From<&EntryListRow> for Entrant {
    fn from(row: &EntryListRow) -> Self {
        Self {
            entry_number: row.entry_number.clone(),
            driver: row.driver.clone(),
            codriver: row.codriver.clone(),
            car: row.car.clone(),
            tyre: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Prediction {
    pub entrant: Entrant,
    pub rating: Rating,
    /// Factors that had history in the bucket and fed the combination.
    pub known_factors: Vec<Factor>,
    pub predicted_position: usize,
}

/// Combined rating of one entrant. Factors without history are left out;
/// with none known the entrant gets the default rating.
pub fn rate_entrant(table: &RatingTable, entrant: &Entrant) -> (Rating, Vec<Factor>) {
    let mut components = Vec::new();
    let mut known = Vec::new();
    for factor in Factor::ALL {
        let Some(group) = entrant.key(factor).and_then(|key| table.get(factor, key)) else {
            continue;
        };
        components.push((factor.weight(), group.rating));
        known.push(factor);
    }
    let combined = rating::combine(&components).unwrap_or_else(rating::default_rating);
    (combined, known)
}

/// Entrants ordered by ascending combined mean (lower is a better finish).
pub fn predict(table: &RatingTable, entrants: Vec<Entrant>) -> Vec<Prediction> {
    let mut rated = entrants
        .into_iter()
        .map(|entrant| {
            let (rating, known_factors) = rate_entrant(table, &entrant);
            Prediction {
                entrant,
                rating,
                known_factors,
                predicted_position: 0,
            }
        })
        .collect::<Vec<_>>();

    rated.sort_by(|a, b| {
        a.rating
            .rating
            .total_cmp(&b.rating.rating)
            .then(a.rating.uncertainty.total_cmp(&b.rating.uncertainty))
            .then_with(|| entry_order(&a.entrant.entry_number, &b.entrant.entry_number))
    });
    for (idx, p) in rated.iter_mut().enumerate() {
        p.predicted_position = idx + 1;
    }
    rated
}

/// Numeric entry numbers first, in numeric order; the rest by text.
fn entry_order(a: &str, b: &str) -> std::cmp::Ordering {
    entry_sort_key(a).cmp(&entry_sort_key(b))
}

fn entry_sort_key(number: &str) -> (bool, Option<u32>, &str) {
    let numeric = number.parse::<u32>().ok();
    (numeric.is_none(), numeric, number)
}

/// Results of events run strictly before `(season, round)`.
pub fn history_before(history: &[ResultRow], season: i32, round: u32) -> Vec<&ResultRow> {
    history
        .iter()
        .filter(|row| row.event_key() < (season, round))
        .collect()
}

#[derive(Debug, Clone)]
pub struct EventForecast {
    pub season: i32,
    pub round: u32,
    pub event_name: String,
    pub bucket: ConditionBucket,
    pub predictions: Vec<Prediction>,
    /// `None` until the event has a classification to compare with.
    pub spearman: Option<f64>,
}

pub fn forecast(
    history: &[ResultRow],
    event: &Event,
    entrants: Vec<Entrant>,
    observed: &[ResultRow],
) -> EventForecast {
    let bucket = ConditionBucket::for_event(&event.conditions);
    let prior = history_before(history, event.season, event.round);
    let table = RatingTable::build(prior, bucket.clone());
    let predictions = predict(&table, entrants);
    let spearman = observed_correlation(&predictions, observed);
    EventForecast {
        season: event.season,
        round: event.round,
        event_name: event.name.clone(),
        bucket,
        predictions,
        spearman,
    }
}

/// Spearman between predicted positions and observed finishes, over the
/// entrants found in both (matched by entry number).
pub fn observed_correlation(predictions: &[Prediction], observed: &[ResultRow]) -> Option<f64> {
    let finishes: HashMap<&str, u32> = observed
        .iter()
        .map(|r| (r.entry_number.as_str(), r.final_finish))
        .collect();
    let (predicted, actual): (Vec<f64>, Vec<f64>) = predictions
        .iter()
        .filter_map(|p| {
            let finish = finishes.get(p.entrant.entry_number.as_str())?;
            Some((p.predicted_position as f64, f64::from(*finish)))
        })
        .unzip();
    spearman(&predicted, &actual)
}

/// Spearman rank correlation with average ranks for ties. Undefined for fewer
/// than two pairs or when either side has no spread.
pub fn spearman(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let rx = average_ranks(xs);
    let ry = average_ranks(ys);
    let mx = rating::mean(&rx)?;
    let my = rating::mean(&ry)?;

    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (a, b) in rx.iter().zip(&ry) {
        cov += (a - mx) * (b - my);
        vx += (a - mx).powi(2);
        vy += (b - my).powi(2);
    }
    if vx <= 0.0 || vy <= 0.0 {
        return None;
    }
    Some(cov / (vx * vy).sqrt())
}

fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order = (0..values.len()).collect::<Vec<_>>();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && values[order[end + 1]] == values[order[start]] {
            end += 1;
        }
        // 1-based ranks start+1 ..= end+1 share their average.
        let avg = (start + end) as f64 / 2.0 + 1.0;
        for &idx in &order[start..=end] {
            ranks[idx] = avg;
        }
        start = end + 1;
    }
    ranks
}

#[derive(Debug, Clone, Serialize)]
pub struct EventScore {
    pub season: i32,
    pub round: u32,
    pub event_name: String,
    pub bucket: String,
    pub entrants: usize,
    pub spearman: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BacktestSummary {
    pub events: Vec<EventScore>,
    pub scored: usize,
    pub mean_spearman: Option<f64>,
}

/// Events present in the results table, in `(season, round)` order.
pub fn events_from_results(results: &[ResultRow]) -> Vec<Event> {
    let mut events = BTreeMap::new();
    for row in results {
        events.entry(row.event_key()).or_insert_with(|| Event {
            season: row.season,
            round: row.round,
            name: row.event_name.clone(),
            url: row.event_url.clone(),
            conditions: row.conditions.clone(),
        });
    }
    events.into_values().collect()
}

/// Predict every event of the range from its own prior history and score the
/// order against the classification.
pub fn backtest(results: &[ResultRow], seasons: RangeInclusive<i32>) -> BacktestSummary {
    let mut by_event: HashMap<(i32, u32), Vec<ResultRow>> = HashMap::new();
    for row in results {
        by_event.entry(row.event_key()).or_default().push(row.clone());
    }

    let mut scores = Vec::new();
    for event in events_from_results(results) {
        if !seasons.contains(&event.season) {
            continue;
        }
        let observed = by_event.get(&event.key()).map(Vec::as_slice).unwrap_or_default();
        let entrants = observed.iter().map(Entrant::from).collect::<Vec<_>>();
        let fc = forecast(results, &event, entrants, observed);
        tracing::debug!(
            season = fc.season,
            round = fc.round,
            bucket = %fc.bucket,
            spearman = ?fc.spearman,
            "{}",
            fc.event_name
        );
        scores.push(EventScore {
            season: fc.season,
            round: fc.round,
            event_name: fc.event_name,
            bucket: fc.bucket.to_string(),
            entrants: fc.predictions.len(),
            spearman: fc.spearman,
        });
    }

    let defined = scores.iter().filter_map(|s| s.spearman).collect::<Vec<_>>();
    BacktestSummary {
        scored: defined.len(),
        mean_spearman: rating::mean(&defined),
        events: scores,
    }
}
