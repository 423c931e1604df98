use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Ordered surface/weather tags attached to an event, e.g. `["gravel"]`.
///
/// Persisted as one `;`-joined CSV field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Conditions(Vec<String>);

impl Conditions {
    pub fn new(tags: Vec<String>) -> Self {
        Self(tags)
    }

    pub fn tags(&self) -> &[String] {
        &self.0
    }

    pub fn primary(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.0.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Conditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(";"))
    }
}

impl From<&str> for Conditions {
    fn from(raw: &str) -> Self {
        Self(
            raw.split(';')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }
}

impl Serialize for Conditions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Conditions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Conditions::from(raw.as_str()))
    }
}

/// One round of a season listing. Key is `(season, round)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub season: i32,
    pub round: u32,
    pub name: String,
    pub url: String,
    pub conditions: Conditions,
}

impl Event {
    pub fn key(&self) -> (i32, u32) {
        (self.season, self.round)
    }

    /// Site identifier of the event, the third `/` segment of its url
    /// (`/final/54321-rallye-monte-carlo-2021/` -> `54321-rallye-monte-carlo-2021`).
    pub fn site_id(&self) -> Option<&str> {
        self.url.split('/').nth(2).filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
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
}

impl ResultRow {
    pub fn event_key(&self) -> (i32, u32) {
        (self.season, self.round)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryListRow {
    pub season: i32,
    pub round: u32,
    pub leg: u32,
    pub start_number: u32,
    pub entry_number: String,
    pub driver: String,
    pub codriver: String,
    pub car: String,
    pub start_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegResultRow {
    pub season: i32,
    pub round: u32,
    pub leg: u32,
    pub leg_finish: u32,
    pub entry_number: String,
    pub leg_time: f64,
}

#[cfg(test)]
mod tests {
    use super::{Conditions, Event};

    #[test]
    fn conditions_round_trip_through_display() {
        let c = Conditions::new(vec!["asphalt".into(), "snow".into()]);
        assert_eq!(c.to_string(), "asphalt;snow");
        assert_eq!(Conditions::from("asphalt; snow;"), c);
        assert!(Conditions::from("").is_empty());
    }

    #[test]
    fn site_id_is_third_path_segment() {
        let event = Event {
            season: 2021,
            round: 1,
            name: "Rallye Monte-Carlo".into(),
            url: "/final/54321-rallye-monte-carlo-2021/".into(),
            conditions: Conditions::default(),
        };
        assert_eq!(event.site_id(), Some("54321-rallye-monte-carlo-2021"));

        let bare = Event {
            url: "/final/".into(),
            ..event
        };
        assert_eq!(bare.site_id(), None);
    }
}
