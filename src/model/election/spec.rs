use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::common::election::ElectionStatus;

use super::election_core::Election;

fn default_threshold() -> u32 {
    5
}

fn default_total_trustees() -> u32 {
    9
}

/// An election specification, as submitted by an administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSpec {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default = "default_threshold")]
    pub threshold_t: u32,
    #[serde(default = "default_total_trustees")]
    pub total_trustees_n: u32,
}

impl ElectionSpec {
    pub fn validate(&self) -> Result<()> {
        validate_title(&self.title)?;
        validate_schedule(&self.start_time, &self.end_time)?;
        validate_threshold(self.threshold_t, self.total_trustees_n)
    }

    /// Convert this spec into a new draft election.
    pub fn into_election(self, now: DateTime<Utc>) -> Election {
        Election {
            title: self.title.trim().to_string(),
            description: self.description,
            start_time: self.start_time,
            end_time: self.end_time,
            status: ElectionStatus::Draft,
            threshold: self.threshold_t,
            total_trustees: self.total_trustees_n,
            candidates: Vec::new(),
            public_key: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A partial update to an election's details. Absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElectionUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub threshold_t: Option<u32>,
    #[serde(default)]
    pub total_trustees_n: Option<u32>,
}

impl ElectionUpdate {
    /// Names of the fields this update sets.
    pub fn fields(&self) -> Vec<&'static str> {
        [
            ("title", self.title.is_some()),
            ("description", self.description.is_some()),
            ("start_time", self.start_time.is_some()),
            ("end_time", self.end_time.is_some()),
            ("threshold_t", self.threshold_t.is_some()),
            ("total_trustees_n", self.total_trustees_n.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

pub(crate) fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(Error::Validation("Title must not be empty".to_string()));
    }
    Ok(())
}

pub(crate) fn validate_schedule(start: &DateTime<Utc>, end: &DateTime<Utc>) -> Result<()> {
    if end <= start {
        return Err(Error::Validation(
            "End time must be after start time".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn validate_threshold(threshold: u32, total: u32) -> Result<()> {
    if threshold < 1 {
        return Err(Error::Validation("Threshold must be at least 1".to_string()));
    }
    if threshold > total {
        return Err(Error::Validation(format!(
            "Threshold ({threshold}) cannot be greater than total trustees ({total})"
        )));
    }
    Ok(())
}

/// Example data for tests.
#[cfg(test)]
pub(crate) mod examples {
    use super::*;

    use chrono::{Duration, Timelike};

    impl ElectionSpec {
        /// A 2-of-3 election running for the next week.
        pub fn example() -> Self {
            let start_time = Utc::now().with_nanosecond(0).unwrap();
            Self {
                title: "Student Union President".to_string(),
                description: Some("Annual election".to_string()),
                start_time,
                end_time: start_time + Duration::days(7),
                threshold_t: 2,
                total_trustees_n: 3,
            }
        }
    }
}
