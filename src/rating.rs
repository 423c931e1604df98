use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use skillratings::trueskill::TrueSkillRating;

use crate::model::{Conditions, ResultRow};

/// `(mean, uncertainty)` of finishing positions; lower mean is better.
pub type Rating = TrueSkillRating;

pub fn make_rating(mean: f64, uncertainty: f64) -> Rating {
    TrueSkillRating {
        rating: mean,
        uncertainty,
    }
}

pub fn default_rating() -> Rating {
    TrueSkillRating::new()
}

/// Uncertainty used when a group has a single result (or no spread at all).
pub fn default_uncertainty() -> f64 {
    default_rating().uncertainty
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Factor {
    Driver,
    Codriver,
    Car,
    Tyre,
}

impl Factor {
    pub const ALL: [Factor; 4] = [Factor::Driver, Factor::Codriver, Factor::Car, Factor::Tyre];

    pub fn weight(self) -> f64 {
        match self {
            Factor::Driver => 3.0,
            Factor::Codriver => 1.0,
            Factor::Car => 2.0,
            Factor::Tyre => 1.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Factor::Driver => "driver",
            Factor::Codriver => "codriver",
            Factor::Car => "car",
            Factor::Tyre => "tyre",
        }
    }

    /// This factor's value out of a crew/car description; blank is unknown.
    pub fn pick<'a>(
        self,
        driver: &'a str,
        codriver: &'a str,
        car: &'a str,
        tyre: Option<&'a str>,
    ) -> Option<&'a str> {
        let key = match self {
            Factor::Driver => driver,
            Factor::Codriver => codriver,
            Factor::Car => car,
            Factor::Tyre => tyre?,
        };
        let key = key.trim();
        (!key.is_empty()).then_some(key)
    }

    pub fn key_of(self, row: &ResultRow) -> Option<&str> {
        self.pick(&row.driver, &row.codriver, &row.car, row.tyre.as_deref())
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Factor {
    type Err = anyhow::Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "driver" => Ok(Factor::Driver),
            "codriver" | "co-driver" => Ok(Factor::Codriver),
            "car" => Ok(Factor::Car),
            "tyre" | "tire" => Ok(Factor::Tyre),
            other => Err(anyhow!("unknown factor `{other}`")),
        }
    }
}

/// Condition scope of a rating table: one tag, or all history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionBucket {
    Any,
    Tag(String),
}

impl ConditionBucket {
    /// Bucket of an event: its first tag.
    pub fn for_event(conditions: &Conditions) -> Self {
        match conditions.primary() {
            Some(tag) => ConditionBucket::Tag(tag.to_string()),
            None => ConditionBucket::Any,
        }
    }

    pub fn from_arg(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") | Some("any") | Some("all") => ConditionBucket::Any,
            Some(tag) => ConditionBucket::Tag(tag.to_string()),
        }
    }

    pub fn admits(&self, conditions: &Conditions) -> bool {
        match self {
            ConditionBucket::Any => true,
            ConditionBucket::Tag(tag) => conditions.contains(tag),
        }
    }
}

impl fmt::Display for ConditionBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionBucket::Any => f.write_str("any"),
            ConditionBucket::Tag(tag) => f.write_str(tag),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GroupRating {
    pub rating: Rating,
    pub starts: usize,
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample (n - 1) standard deviation; undefined below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss = values.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

pub fn rating_from_positions(positions: &[f64]) -> Option<Rating> {
    let mu = mean(positions)?;
    let sigma = sample_std(positions)
        .filter(|s| *s > 0.0)
        .unwrap_or_else(default_uncertainty);
    Some(make_rating(mu, sigma))
}

/// Ratings of every factor value seen in one condition bucket.
#[derive(Debug, Clone)]
pub struct RatingTable {
    bucket: ConditionBucket,
    tables: BTreeMap<Factor, BTreeMap<String, GroupRating>>,
}

impl RatingTable {
    pub fn build<'a, I>(rows: I, bucket: ConditionBucket) -> Self
    where
        I: IntoIterator<Item = &'a ResultRow>,
    {
        let mut positions: BTreeMap<Factor, BTreeMap<String, Vec<f64>>> = BTreeMap::new();
        for row in rows {
            if !bucket.admits(&row.conditions) {
                continue;
            }
            for factor in Factor::ALL {
                let Some(key) = factor.key_of(row) else {
                    continue;
                };
                positions
                    .entry(factor)
                    .or_default()
                    .entry(key.to_string())
                    .or_default()
                    .push(f64::from(row.final_finish));
            }
        }

        let tables = positions
            .into_iter()
            .map(|(factor, groups)| {
                let rated = groups
                    .into_iter()
                    .filter_map(|(key, finishes)| {
                        let rating = rating_from_positions(&finishes)?;
                        Some((
                            key,
                            GroupRating {
                                rating,
                                starts: finishes.len(),
                            },
                        ))
                    })
                    .collect();
                (factor, rated)
            })
            .collect();

        Self { bucket, tables }
    }

    pub fn bucket(&self) -> &ConditionBucket {
        &self.bucket
    }

    pub fn get(&self, factor: Factor, key: &str) -> Option<&GroupRating> {
        self.tables.get(&factor)?.get(key.trim())
    }

    pub fn len(&self, factor: Factor) -> usize {
        self.tables.get(&factor).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.values().all(BTreeMap::is_empty)
    }

    /// Best (lowest mean) first; ties by uncertainty, then name.
    pub fn leaderboard(&self, factor: Factor) -> Vec<(&str, &GroupRating)> {
        let mut rows = self
            .tables
            .get(&factor)
            .map(|groups| groups.iter().map(|(k, v)| (k.as_str(), v)).collect::<Vec<_>>())
            .unwrap_or_default();
        rows.sort_by(|a, b| {
            a.1.rating
                .rating
                .total_cmp(&b.1.rating.rating)
                .then(a.1.rating.uncertainty.total_cmp(&b.1.rating.uncertainty))
                .then(a.0.cmp(b.0))
        });
        rows
    }
}

/// Weighted mean of component means; uncertainty propagated assuming
/// independence: `sqrt(Σ w²σ²) / Σ w`.
pub fn combine(components: &[(f64, Rating)]) -> Option<Rating> {
    let total = components.iter().map(|(w, _)| *w).sum::<f64>();
    if components.is_empty() || total <= 0.0 {
        return None;
    }
    let mu = components.iter().map(|(w, r)| w * r.rating).sum::<f64>() / total;
    let var = components
        .iter()
        .map(|(w, r)| w.powi(2) * r.uncertainty.powi(2))
        .sum::<f64>();
    Some(make_rating(mu, var.sqrt() / total))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn row(driver: &str, car: &str, finish: u32, tags: &[&str]) -> ResultRow {
        ResultRow {
            season: 2020,
            round: 1,
            event_name: "Test".into(),
            event_url: "/final/1-test/".into(),
            conditions: Conditions::new(tags.iter().map(|t| t.to_string()).collect()),
            entry_number: finish.to_string(),
            driver: driver.into(),
            codriver: format!("{driver} co"),
            car: car.into(),
            tyre: None,
            final_finish: finish,
            final_time: 3600.0 + f64::from(finish),
        }
    }

    #[test]
    fn single_observation_gets_default_uncertainty() {
        let r = rating_from_positions(&[4.0]).unwrap();
        assert!(approx(r.rating, 4.0));
        assert!(approx(r.uncertainty, default_uncertainty()));
    }

    #[test]
    fn three_observations_use_sample_std() {
        let r = rating_from_positions(&[1.0, 2.0, 3.0]).unwrap();
        assert!(approx(r.rating, 2.0));
        assert!(approx(r.uncertainty, 1.0));
    }

    #[test]
    fn identical_finishes_fall_back_to_default_uncertainty() {
        let r = rating_from_positions(&[2.0, 2.0]).unwrap();
        assert!(approx(r.uncertainty, default_uncertainty()));
    }

    #[test]
    fn combine_without_tyre() {
        let combined = combine(&[
            (Factor::Driver.weight(), make_rating(2.0, 1.0)),
            (Factor::Codriver.weight(), make_rating(4.0, 1.0)),
            (Factor::Car.weight(), make_rating(6.0, 1.0)),
        ])
        .unwrap();
        assert!(approx(combined.rating, 28.0 / 6.0));
        assert!(approx(combined.uncertainty, 14f64.sqrt() / 6.0));
    }

    #[test]
    fn combine_all_four_with_tyre() {
        let combined = combine(&[
            (Factor::Driver.weight(), make_rating(2.0, 1.0)),
            (Factor::Codriver.weight(), make_rating(4.0, 1.0)),
            (Factor::Car.weight(), make_rating(6.0, 1.0)),
            (Factor::Tyre.weight(), make_rating(8.0, 1.0)),
        ])
        .unwrap();
        // (3*2 + 1*4 + 2*6 + 1*8) / 7
        assert!(approx(combined.rating, 30.0 / 7.0));
        assert!(approx(combined.uncertainty, 15f64.sqrt() / 7.0));
    }

    #[test]
    fn blank_values_are_unknown() {
        assert_eq!(Factor::Driver.pick(" Ogier ", "", "Yaris", None), Some("Ogier"));
        assert_eq!(Factor::Codriver.pick("Ogier", "  ", "Yaris", None), None);
        assert_eq!(Factor::Tyre.pick("Ogier", "Ingrassia", "Yaris", None), None);
        assert_eq!(Factor::Tyre.pick("Ogier", "Ingrassia", "Yaris", Some("Pirelli")), Some("Pirelli"));
    }

    #[test]
    fn combine_nothing_is_none() {
        assert!(combine(&[]).is_none());
    }

    #[test]
    fn table_is_scoped_to_bucket() {
        let rows = vec![
            row("Ogier", "Yaris", 1, &["gravel"]),
            row("Ogier", "Yaris", 3, &["gravel"]),
            row("Ogier", "Yaris", 9, &["asphalt"]),
            row("Evans", "Yaris", 2, &["gravel"]),
        ];
        let gravel = RatingTable::build(&rows, ConditionBucket::Tag("gravel".into()));
        let ogier = gravel.get(Factor::Driver, "Ogier").unwrap();
        assert_eq!(ogier.starts, 2);
        assert!(approx(ogier.rating.rating, 2.0));
        assert_eq!(gravel.get(Factor::Car, "Yaris").unwrap().starts, 3);
        assert_eq!(gravel.len(Factor::Tyre), 0);

        let any = RatingTable::build(&rows, ConditionBucket::Any);
        assert_eq!(any.get(Factor::Driver, "Ogier").unwrap().starts, 3);

        let board = gravel.leaderboard(Factor::Driver);
        assert_eq!(board[0].0, "Ogier");
        assert_eq!(board[1].0, "Evans");
    }

    #[test]
    fn factor_parses_from_cli_text() {
        assert_eq!("Co-Driver".parse::<Factor>().unwrap(), Factor::Codriver);
        assert!("engine".parse::<Factor>().is_err());
    }
}
