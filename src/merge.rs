use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::{Conditions, EntryListRow, LegResultRow, ResultRow};

/// One entrant on one leg, with its final classification attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRow {
    pub season: i32,
    pub round: u32,
    pub event_name: String,
    pub event_url: String,
    pub conditions: Conditions,
    pub entry_number: String,
    pub driver: String,
    pub codriver: String,
    pub car: String,
    #[serde(default)]
    pub tyre: Option<String>,
    pub final_finish: u32,
    pub final_time: f64,
    pub leg: u32,
    pub start_number: u32,
    pub start_time: String,
    pub leg_finish: u32,
    pub leg_time: f64,
}

type LegKey<'a> = (i32, u32, u32, &'a str);
type CrewKey<'a> = (i32, u32, &'a str, &'a str, &'a str, &'a str);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub entries: usize,
    pub without_leg_result: usize,
    pub without_final_result: usize,
    pub merged: usize,
}

/// Inner join. An entry-list row survives only when its leg has a result for
/// the same entry number and the event's final classification lists the same
/// crew and car under that number. Output keeps entry-list order.
pub fn merge_tables(
    entries: &[EntryListRow],
    leg_results: &[LegResultRow],
    results: &[ResultRow],
) -> (Vec<MergedRow>, MergeStats) {
    let legs: HashMap<LegKey<'_>, &LegResultRow> = leg_results
        .iter()
        .map(|r| ((r.season, r.round, r.leg, r.entry_number.as_str()), r))
        .collect();
    let finals: HashMap<CrewKey<'_>, &ResultRow> = results
        .iter()
        .map(|r| {
            (
                (
                    r.season,
                    r.round,
                    r.entry_number.as_str(),
                    r.driver.as_str(),
                    r.codriver.as_str(),
                    r.car.as_str(),
                ),
                r,
            )
        })
        .collect();

    let mut stats = MergeStats {
        entries: entries.len(),
        ..MergeStats::default()
    };
    let mut out = Vec::new();
    for entry in entries {
        let Some(leg) = legs.get(&(entry.season, entry.round, entry.leg, entry.entry_number.as_str())) else {
            stats.without_leg_result += 1;
            continue;
        };
        let crew_key = (
            entry.season,
            entry.round,
            entry.entry_number.as_str(),
            entry.driver.as_str(),
            entry.codriver.as_str(),
            entry.car.as_str(),
        );
        let Some(result) = finals.get(&crew_key) else {
            stats.without_final_result += 1;
            continue;
        };
        out.push(MergedRow {
            season: entry.season,
            round: entry.round,
            event_name: result.event_name.clone(),
            event_url: result.event_url.clone(),
            conditions: result.conditions.clone(),
            entry_number: entry.entry_number.clone(),
            driver: entry.driver.clone(),
            codriver: entry.codriver.clone(),
            car: entry.car.clone(),
            tyre: result.tyre.clone(),
            final_finish: result.final_finish,
            final_time: result.final_time,
            leg: entry.leg,
            start_number: entry.start_number,
            start_time: entry.start_time.clone(),
            leg_finish: leg.leg_finish,
            leg_time: leg.leg_time,
        });
    }
    stats.merged = out.len();
    (out, stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(leg: u32, number: &str, driver: &str) -> EntryListRow {
        EntryListRow {
            season: 2021,
            round: 3,
            leg,
            start_number: 1,
            entry_number: number.into(),
            driver: driver.into(),
            codriver: "Julien Ingrassia".into(),
            car: "Toyota Yaris WRC".into(),
            start_time: "08:05".into(),
        }
    }

    fn leg_result(leg: u32, number: &str, finish: u32) -> LegResultRow {
        LegResultRow {
            season: 2021,
            round: 3,
            leg,
            leg_finish: finish,
            entry_number: number.into(),
            leg_time: 1000.0 + f64::from(finish),
        }
    }

    fn final_result(number: &str, driver: &str) -> ResultRow {
        ResultRow {
            season: 2021,
            round: 3,
            event_name: "Croatia Rally".into(),
            event_url: "/final/66000-croatia-rally-2021/".into(),
            conditions: Conditions::from("asphalt"),
            entry_number: number.into(),
            driver: driver.into(),
            codriver: "Julien Ingrassia".into(),
            car: "Toyota Yaris WRC".into(),
            tyre: None,
            final_finish: 1,
            final_time: 10_000.0,
        }
    }

    #[test]
    fn drops_rows_missing_on_either_side() {
        let entries = vec![
            entry(1, "1", "Sébastien Ogier"),
            entry(2, "1", "Sébastien Ogier"),
            entry(1, "33", "Elfyn Evans"),
        ];
        let legs = vec![leg_result(1, "1", 2), leg_result(1, "33", 1)];
        let finals = vec![final_result("1", "Sébastien Ogier"), final_result("33", "Someone Else")];

        let (rows, stats) = merge_tables(&entries, &legs, &finals);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].leg, 1);
        assert_eq!(rows[0].leg_finish, 2);
        assert_eq!(rows[0].event_name, "Croatia Rally");
        assert_eq!(stats.without_leg_result, 1);
        assert_eq!(stats.without_final_result, 1);
        assert_eq!(stats.merged, 1);
    }
}
