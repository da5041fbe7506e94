use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::crypto::CryptoError;
use crate::model::{common::election::CandidateId, election::Candidate};

/// The published outcome of an election. Written once by the tally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionResult {
    /// Per-candidate results, in display order.
    pub candidates: Vec<CandidateResult>,
    pub total_votes: u64,
    pub verified: bool,
    pub trustees_used: u32,
    pub threshold_required: u32,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub tallied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub candidate_id: CandidateId,
    pub name: String,
    pub party: Option<String>,
    pub vote_count: u64,
    /// Share of all votes, rounded to 2 decimal places.
    pub percentage: f64,
}

/// Percentage of `total` that `count` makes up, to 2 decimal places.
pub fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (count as f64 / total as f64 * 10_000.0).round() / 100.0
}

impl ElectionResult {
    /// Pair decrypted counts with the candidates they were computed for.
    ///
    /// `counts` must be in the same order as `candidates`. Counts whose total does
    /// not fit a `u64` cannot be genuine and are rejected.
    pub fn new(
        candidates: &[Candidate],
        counts: &[u64],
        trustees_used: u32,
        threshold_required: u32,
        tallied_at: DateTime<Utc>,
    ) -> Result<Self, CryptoError> {
        let total_votes = counts
            .iter()
            .try_fold(0u64, |total, &count| total.checked_add(count))
            .ok_or_else(|| CryptoError::Malformed("vote counts overflow".to_string()))?;
        let candidates = candidates
            .iter()
            .zip(counts)
            .map(|(candidate, &vote_count)| CandidateResult {
                candidate_id: candidate.id,
                name: candidate.name.clone(),
                party: candidate.party.clone(),
                vote_count,
                percentage: percentage(vote_count, total_votes),
            })
            .collect();
        Ok(Self {
            candidates,
            total_votes,
            verified: true,
            trustees_used,
            threshold_required,
            tallied_at,
        })
    }

    /// Results ordered by vote count descending, then name ascending.
    pub fn ranked(&self) -> Vec<&CandidateResult> {
        let mut ranked: Vec<&CandidateResult> = self.candidates.iter().collect();
        ranked.sort_by(|a, b| {
            b.vote_count
                .cmp(&a.vote_count)
                .then_with(|| a.name.cmp(&b.name))
        });
        ranked
    }

    /// The leading candidate, if any votes were cast.
    pub fn winner(&self) -> Option<&CandidateResult> {
        if self.total_votes == 0 {
            return None;
        }
        self.ranked().into_iter().next()
    }
}
