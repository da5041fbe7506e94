use chrono::{DateTime, SecondsFormat, Utc};
use rocket::serde::json::{json, Value};
use serde::{Deserialize, Serialize};

use crate::crypto::{CombineRequest, CryptoError, DecryptionShare, KeyMaterial};
use crate::error::{Conflict, Error, Result};
use crate::model::{
    bulletin::{BulletinEvent, EntryType},
    common::election::{
        check_transition, ensure_permitted, CandidateId, ElectionId, ElectionStatus, Initiator,
        Operation, TrusteeId,
    },
    tally::ElectionResult,
    trustee::{DecryptionStatus, SubmittedShare, Trustee},
};

use super::election_core::{Candidate, Election};
use super::spec::{
    validate_schedule, validate_threshold, validate_title, ElectionSpec, ElectionUpdate,
};

/// Everything the coordinator knows about one election, stored as a single document.
///
/// Every method that changes the record returns the bulletin event describing
/// the change; callers must seal and persist that event together with the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionRecord {
    #[serde(rename = "_id")]
    pub id: ElectionId,
    pub election: Election,
    /// The trustee roster, in creation order.
    pub trustees: Vec<Trustee>,
    pub key: Option<KeyMaterial>,
    pub shares: Vec<SubmittedShare>,
    pub result: Option<ElectionResult>,
    /// Number of `BALLOT_CAST` entries recorded.
    #[serde(default)]
    pub ballots_cast: u64,
}

const PUBLIC_KEY_PREVIEW: usize = 64;

impl ElectionRecord {
    /// Create a new draft election from an administrator's spec.
    pub fn create(spec: ElectionSpec, now: DateTime<Utc>) -> Result<(Self, BulletinEvent)> {
        spec.validate()?;
        let record = Self {
            id: ElectionId::new(),
            election: spec.into_election(now),
            trustees: Vec::new(),
            key: None,
            shares: Vec::new(),
            result: None,
            ballots_cast: 0,
        };
        let event = BulletinEvent::new(
            EntryType::ElectionCreated,
            json!({
                "election_title": record.election.title,
                "threshold": record.election.threshold,
                "total_trustees": record.election.total_trustees,
                "action": "Election initialized",
            }),
        );
        Ok((record, event))
    }

    pub fn status(&self) -> ElectionStatus {
        self.election.status
    }

    /// Has the key ceremony run? Once it has, the roster and `(t, n)` are frozen.
    pub fn ceremony_run(&self) -> bool {
        self.key.is_some() || self.trustees.iter().any(|t| t.has_key_share)
    }

    pub fn trustee(&self, trustee_id: TrusteeId) -> Option<&Trustee> {
        self.trustees.iter().find(|t| t.id == trustee_id)
    }

    pub fn decryption_status(&self) -> DecryptionStatus {
        let submitted = self.trustees.iter().filter(|t| t.shares_submitted).count();
        DecryptionStatus::new(self.election.threshold, submitted as u32)
    }

    /// Edit the election's details. Only drafts may be edited.
    pub fn update(&mut self, update: ElectionUpdate, now: DateTime<Utc>) -> Result<BulletinEvent> {
        ensure_permitted(Operation::EditElection, self.status())?;
        let fields = update.fields();
        if fields.is_empty() {
            return Err(Error::Validation("No fields to update".to_string()));
        }

        let election = &self.election;
        let threshold = update.threshold_t.unwrap_or(election.threshold);
        let total = update.total_trustees_n.unwrap_or(election.total_trustees);
        if (threshold, total) != (election.threshold, election.total_trustees) {
            if self.ceremony_run() {
                return Err(Conflict::CeremonyAlreadyRun.into());
            }
            validate_threshold(threshold, total)?;
            if (total as usize) < self.trustees.len() {
                return Err(Error::Validation(format!(
                    "Total trustees ({total}) cannot be fewer than the {} already assigned",
                    self.trustees.len()
                )));
            }
        }
        if let Some(title) = &update.title {
            validate_title(title)?;
        }
        let start_time = update.start_time.unwrap_or(election.start_time);
        let end_time = update.end_time.unwrap_or(election.end_time);
        validate_schedule(&start_time, &end_time)?;

        let election = &mut self.election;
        if let Some(title) = update.title {
            election.title = title.trim().to_string();
        }
        if let Some(description) = update.description {
            election.description = Some(description);
        }
        election.start_time = start_time;
        election.end_time = end_time;
        election.threshold = threshold;
        election.total_trustees = total;
        election.updated_at = now;

        Ok(BulletinEvent::new(
            EntryType::ElectionUpdated,
            json!({
                "fields": fields,
                "threshold": threshold,
                "total_trustees": total,
                "action": "Election details updated",
            }),
        ))
    }

    /// Move the election to `to` on an administrator's request.
    pub fn set_status(&mut self, to: ElectionStatus, now: DateTime<Utc>) -> Result<BulletinEvent> {
        let from = self.status();
        check_transition(from, to, Initiator::Admin, self.ceremony_run())?;
        self.election.status = to;
        self.election.updated_at = now;

        Ok(if to == ElectionStatus::Closed {
            BulletinEvent::new(
                EntryType::ElectionClosed,
                json!({
                    "total_votes": self.ballots_cast,
                    "close_time": now.to_rfc3339_opts(SecondsFormat::Millis, true),
                    "previous_status": from,
                    "action": "Voting period ended",
                }),
            )
        } else {
            BulletinEvent::new(
                EntryType::StatusChanged,
                json!({
                    "from": from,
                    "to": to,
                    "action": "Election status changed",
                }),
            )
        })
    }

    pub fn add_candidate(
        &mut self,
        name: String,
        party: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(Candidate, BulletinEvent)> {
        ensure_permitted(Operation::EditCandidates, self.status())?;
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(Error::Validation("Candidate name must not be empty".to_string()));
        }
        let party = party
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty());

        let candidate = Candidate {
            id: CandidateId::new(),
            name,
            party,
            display_order: self.election.next_display_order(),
        };
        self.election.candidates.push(candidate.clone());
        self.election.updated_at = now;

        let event = BulletinEvent::new(
            EntryType::CandidateAdded,
            json!({
                "candidate_id": candidate.id.to_string(),
                "name": candidate.name,
                "party": candidate.party,
                "display_order": candidate.display_order,
                "action": "Candidate added",
            }),
        );
        Ok((candidate, event))
    }

    /// Reassign display orders so that `order` lists every candidate exactly once, first to last.
    pub fn reorder_candidates(
        &mut self,
        order: &[CandidateId],
        now: DateTime<Utc>,
    ) -> Result<BulletinEvent> {
        ensure_permitted(Operation::EditCandidates, self.status())?;
        let candidates = &mut self.election.candidates;
        if order.len() != candidates.len() {
            return Err(Error::Validation(format!(
                "Expected {} candidate IDs, got {}",
                candidates.len(),
                order.len()
            )));
        }
        for (position, id) in order.iter().enumerate() {
            if order[..position].contains(id) {
                return Err(Error::Validation(format!("Candidate {id} listed twice")));
            }
            if !candidates.iter().any(|c| c.id == *id) {
                return Err(Error::NotFound(format!("candidate {id}")));
            }
        }

        for candidate in candidates.iter_mut() {
            if let Some(position) = order.iter().position(|id| *id == candidate.id) {
                candidate.display_order = position as u32 + 1;
            }
        }
        candidates.sort_by_key(|c| c.display_order);
        self.election.updated_at = now;

        let order: Vec<String> = order.iter().map(ToString::to_string).collect();
        Ok(BulletinEvent::new(
            EntryType::CandidatesReordered,
            json!({ "order": order, "action": "Candidates reordered" }),
        ))
    }

    pub fn add_trustee(
        &mut self,
        user_id: String,
        now: DateTime<Utc>,
    ) -> Result<(Trustee, BulletinEvent)> {
        let user_id = user_id.trim().to_string();
        if user_id.is_empty() {
            return Err(Error::Validation("User ID must not be empty".to_string()));
        }
        if self.ceremony_run() {
            return Err(Conflict::CeremonyAlreadyRun.into());
        }
        ensure_permitted(Operation::EditRoster, self.status())?;
        if self.trustees.iter().any(|t| t.user_id == user_id) {
            return Err(Conflict::DuplicateTrustee(user_id).into());
        }
        let total = self.election.total_trustees;
        if self.trustees.len() >= total as usize {
            return Err(Conflict::RosterFull(total).into());
        }

        let trustee = Trustee::new(self.id, user_id, now);
        self.trustees.push(trustee.clone());
        self.election.updated_at = now;

        let event = BulletinEvent::new(
            EntryType::TrusteeAdded,
            json!({
                "trustee_id": trustee.id.to_string(),
                "user_id": trustee.user_id,
                "roster_size": self.trustees.len(),
                "action": "Trustee assigned",
            }),
        );
        Ok((trustee, event))
    }

    pub fn remove_trustee(
        &mut self,
        trustee_id: TrusteeId,
        now: DateTime<Utc>,
    ) -> Result<(Trustee, BulletinEvent)> {
        let position = self
            .trustees
            .iter()
            .position(|t| t.id == trustee_id)
            .ok_or_else(|| Error::NotFound(format!("trustee {trustee_id}")))?;
        if self.ceremony_run() {
            return Err(Conflict::CeremonyAlreadyRun.into());
        }
        ensure_permitted(Operation::EditRoster, self.status())?;

        let trustee = self.trustees.remove(position);
        self.election.updated_at = now;

        let event = BulletinEvent::new(
            EntryType::TrusteeRemoved,
            json!({
                "trustee_id": trustee.id.to_string(),
                "user_id": trustee.user_id,
                "roster_size": self.trustees.len(),
                "action": "Trustee removed",
            }),
        );
        Ok((trustee, event))
    }

    /// Check that the key ceremony may run now.
    pub fn check_ceremony(&self) -> Result<()> {
        ensure_permitted(Operation::KeyCeremony, self.status())?;
        if self.ceremony_run() {
            return Err(Conflict::CeremonyAlreadyRun.into());
        }
        let need = self.election.total_trustees;
        let have = self.trustees.len() as u32;
        if have != need {
            return Err(Conflict::InsufficientTrustees { have, need }.into());
        }
        Ok(())
    }

    /// Distribute freshly generated key material to the whole roster at once.
    ///
    /// Returns the number of trustees that received a share.
    pub fn apply_key_material(
        &mut self,
        key: KeyMaterial,
        now: DateTime<Utc>,
    ) -> Result<(u32, BulletinEvent)> {
        self.check_ceremony()?;
        let total = self.election.total_trustees;
        if key.verification_keys.len() != total as usize {
            return Err(CryptoError::Malformed(format!(
                "expected {total} verification keys, got {}",
                key.verification_keys.len()
            ))
            .into());
        }

        for (position, trustee) in self.trustees.iter_mut().enumerate() {
            trustee.share_index = Some(position as u32 + 1);
            trustee.has_key_share = true;
        }
        let preview: String = key.public_key.chars().take(PUBLIC_KEY_PREVIEW).collect();
        self.election.public_key = Some(key.public_key.clone());
        self.election.updated_at = now;
        self.key = Some(key);

        let event = BulletinEvent::new(
            EntryType::KeyGenerated,
            json!({
                "public_key": format!("{preview}..."),
                "threshold": self.election.threshold,
                "participants": total,
                "action": "Election public key generated",
            }),
        );
        Ok((total, event))
    }

    /// Check that `trustee_id` may submit a share now, returning the key it
    /// must verify against and its share index.
    pub fn check_share(&self, trustee_id: TrusteeId) -> Result<(&KeyMaterial, u32)> {
        let trustee = self
            .trustee(trustee_id)
            .ok_or_else(|| Error::NotFound(format!("trustee {trustee_id}")))?;
        ensure_permitted(Operation::SubmitShare, self.status())?;
        if trustee.shares_submitted {
            return Err(Conflict::AlreadySubmitted.into());
        }
        match (&self.key, trustee.has_key_share, trustee.share_index) {
            (Some(key), true, Some(index)) => Ok((key, index)),
            _ => Err(Conflict::NoKeyShare.into()),
        }
    }

    /// Record a verified decryption share.
    pub fn accept_share(
        &mut self,
        trustee_id: TrusteeId,
        share: String,
        now: DateTime<Utc>,
    ) -> Result<(Trustee, BulletinEvent)> {
        let (_, index) = self.check_share(trustee_id)?;
        self.shares.push(SubmittedShare {
            trustee_id,
            index,
            share,
            submitted_at: now,
        });
        let trustee = self
            .trustees
            .iter_mut()
            .find(|t| t.id == trustee_id)
            .ok_or_else(|| Error::NotFound(format!("trustee {trustee_id}")))?;
        trustee.shares_submitted = true;
        let trustee = trustee.clone();
        self.election.updated_at = now;

        let event = BulletinEvent::new(
            EntryType::TrusteeShare,
            json!({
                "trustee_id": trustee_id.to_string(),
                "share_count": self.shares.len(),
                "action": "Trustee decryption share submitted",
            }),
        );
        Ok((trustee, event))
    }

    /// Check that the tally may run now, returning what to combine.
    pub fn prepare_tally(&self) -> Result<CombineRequest> {
        if self.result.is_some() {
            return Err(Conflict::AlreadyTallied.into());
        }
        ensure_permitted(Operation::Tally, self.status())?;
        let status = self.decryption_status();
        if !status.can_decrypt {
            return Err(Error::ThresholdNotMet {
                submitted: status.trustees_submitted,
                threshold: status.threshold,
            });
        }
        if self.election.candidates.is_empty() {
            return Err(Error::Validation(
                "No candidates found for this election".to_string(),
            ));
        }
        let key = self.key.clone().ok_or(Conflict::NoKeyShare)?;
        Ok(CombineRequest {
            election_id: self.id,
            key,
            threshold: self.election.threshold,
            shares: self
                .shares
                .iter()
                .map(|s| DecryptionShare {
                    index: s.index,
                    share: s.share.clone(),
                })
                .collect(),
            candidates: self.election.candidates.iter().map(|c| c.id).collect(),
        })
    }

    /// Publish the decrypted counts and close the election for good.
    pub fn record_result(
        &mut self,
        counts: &[u64],
        now: DateTime<Utc>,
    ) -> Result<(ElectionResult, BulletinEvent)> {
        self.prepare_tally()?;
        let candidates = &self.election.candidates;
        if counts.len() != candidates.len() {
            return Err(CryptoError::Malformed(format!(
                "expected {} counts, got {}",
                candidates.len(),
                counts.len()
            ))
            .into());
        }
        check_transition(self.status(), ElectionStatus::Tallied, Initiator::Tally, true)?;

        let result = ElectionResult::new(
            candidates,
            counts,
            self.shares.len() as u32,
            self.election.threshold,
            now,
        )?;
        let mut data = json!({
            "total_votes": result.total_votes,
            "action": "Election results published",
        });
        if let Some(winner) = result.winner() {
            data["winner"] = Value::String(winner.name.clone());
        }

        self.election.status = ElectionStatus::Tallied;
        self.election.updated_at = now;
        self.result = Some(result.clone());
        Ok((result, BulletinEvent::new(EntryType::ResultPublished, data)))
    }

    /// The published result, once tallied.
    pub fn published_result(&self) -> Result<&ElectionResult> {
        self.result
            .as_ref()
            .ok_or_else(|| Conflict::ResultsNotAvailable(self.status()).into())
    }

    /// Record a ballot cast by the vote service.
    pub fn record_ballot(&mut self, data: Value) -> Result<BulletinEvent> {
        ensure_permitted(Operation::RecordBallot, self.status())?;
        if !data.is_object() {
            return Err(Error::Validation(
                "entry_data must be a JSON object".to_string(),
            ));
        }
        self.ballots_cast += 1;
        Ok(BulletinEvent::new(EntryType::BallotCast, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::mongodb::Id;

    fn now() -> DateTime<Utc> {
        mongodb::bson::DateTime::now().to_chrono()
    }

    fn draft() -> ElectionRecord {
        ElectionRecord::create(ElectionSpec::example(), now()).unwrap().0
    }

    fn fake_key(n: usize) -> KeyMaterial {
        KeyMaterial {
            public_key: "k".repeat(100),
            verification_keys: (1..=n).map(|i| format!("vk{i}")).collect(),
        }
    }

    /// A 2-of-3 election with a full roster and keys distributed.
    fn keyed() -> ElectionRecord {
        let mut record = draft();
        for user in ["alice", "bob", "carol"] {
            record.add_trustee(user.to_string(), now()).unwrap();
        }
        record.apply_key_material(fake_key(3), now()).unwrap();
        record
    }

    /// A keyed election with two candidates, whose voting has ended.
    fn closed() -> ElectionRecord {
        let mut record = keyed();
        record.add_candidate("Amy".into(), None, now()).unwrap();
        record.add_candidate("Bob".into(), None, now()).unwrap();
        record.set_status(ElectionStatus::Active, now()).unwrap();
        record.set_status(ElectionStatus::Closed, now()).unwrap();
        record
    }

    #[test]
    fn create_emits_election_created() {
        let (record, event) = ElectionRecord::create(ElectionSpec::example(), now()).unwrap();
        assert_eq!(record.status(), ElectionStatus::Draft);
        assert_eq!(event.entry_type, EntryType::ElectionCreated);
        assert_eq!(event.data["threshold"], 2);
        assert_eq!(event.data["total_trustees"], 3);
    }

    #[test]
    fn candidates_get_increasing_display_orders() {
        let mut record = draft();
        let (a, _) = record.add_candidate("Amy".into(), None, now()).unwrap();
        let (b, event) = record
            .add_candidate(" Bob ".into(), Some("Green".into()), now())
            .unwrap();
        assert_eq!((a.display_order, b.display_order), (1, 2));
        assert_eq!(b.name, "Bob");
        assert_eq!(event.data["display_order"], 2);
        assert!(record.add_candidate("  ".into(), None, now()).is_err());
    }

    #[test]
    fn reorder_requires_a_permutation() {
        let mut record = draft();
        let (a, _) = record.add_candidate("Amy".into(), None, now()).unwrap();
        let (b, _) = record.add_candidate("Bob".into(), None, now()).unwrap();

        record.reorder_candidates(&[b.id, a.id], now()).unwrap();
        let names: Vec<_> = record.election.candidates.iter().map(|c| &c.name).collect();
        assert_eq!(names, ["Bob", "Amy"]);
        assert_eq!(record.election.candidates[0].display_order, 1);

        assert!(matches!(
            record.reorder_candidates(&[a.id, a.id], now()),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            record.reorder_candidates(&[a.id], now()),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            record.reorder_candidates(&[a.id, Id::new()], now()),
            Err(Error::NotFound(_))
        ));
        // A new candidate still lands at the end.
        let (c, _) = record.add_candidate("Cat".into(), None, now()).unwrap();
        assert_eq!(c.display_order, 3);
    }

    #[test]
    fn roster_guards() {
        let mut record = draft();
        record.add_trustee("alice".into(), now()).unwrap();
        assert!(matches!(
            record.add_trustee("alice".into(), now()),
            Err(Error::Conflict(Conflict::DuplicateTrustee(_)))
        ));
        record.add_trustee("bob".into(), now()).unwrap();
        record.add_trustee("carol".into(), now()).unwrap();
        assert!(matches!(
            record.add_trustee("dave".into(), now()),
            Err(Error::Conflict(Conflict::RosterFull(3)))
        ));
        assert!(matches!(
            record.remove_trustee(Id::new(), now()),
            Err(Error::NotFound(_))
        ));
        let bob = record.trustees[1].id;
        let (removed, event) = record.remove_trustee(bob, now()).unwrap();
        assert_eq!(removed.user_id, "bob");
        assert_eq!(event.data["roster_size"], 2);
    }

    #[test]
    fn ceremony_needs_a_full_roster() {
        let mut record = draft();
        record.add_trustee("alice".into(), now()).unwrap();
        assert!(matches!(
            record.check_ceremony(),
            Err(Error::Conflict(Conflict::InsufficientTrustees { have: 1, need: 3 }))
        ));
    }

    #[test]
    fn ceremony_distributes_indices_and_freezes_roster() {
        let mut record = keyed();
        let indices: Vec<_> = record.trustees.iter().map(|t| t.share_index).collect();
        assert_eq!(indices, [Some(1), Some(2), Some(3)]);
        assert!(record.trustees.iter().all(|t| t.has_key_share));
        assert_eq!(record.election.public_key.as_deref(), Some("k".repeat(100).as_str()));

        assert!(matches!(
            record.check_ceremony(),
            Err(Error::Conflict(Conflict::CeremonyAlreadyRun))
        ));
        assert!(matches!(
            record.add_trustee("dave".into(), now()),
            Err(Error::Conflict(Conflict::CeremonyAlreadyRun))
        ));
        let alice = record.trustees[0].id;
        assert!(matches!(
            record.remove_trustee(alice, now()),
            Err(Error::Conflict(Conflict::CeremonyAlreadyRun))
        ));
        assert!(matches!(
            record.update(
                ElectionUpdate {
                    threshold_t: Some(3),
                    ..Default::default()
                },
                now()
            ),
            Err(Error::Conflict(Conflict::CeremonyAlreadyRun))
        ));
    }

    #[test]
    fn key_generated_payload_truncates_the_key() {
        let mut record = draft();
        for user in ["alice", "bob", "carol"] {
            record.add_trustee(user.to_string(), now()).unwrap();
        }
        let (updated, event) = record.apply_key_material(fake_key(3), now()).unwrap();
        assert_eq!(updated, 3);
        assert_eq!(event.data["public_key"], format!("{}...", "k".repeat(64)));
        assert_eq!(event.data["participants"], 3);
    }

    #[test]
    fn wrong_number_of_verification_keys_changes_nothing() {
        let mut record = draft();
        for user in ["alice", "bob", "carol"] {
            record.add_trustee(user.to_string(), now()).unwrap();
        }
        let before = record.clone();
        assert!(matches!(
            record.apply_key_material(fake_key(2), now()),
            Err(Error::Crypto(_))
        ));
        assert_eq!(record, before);
    }

    #[test]
    fn shares_are_accepted_once() {
        let mut record = closed();
        let alice = record.trustees[0].id;
        let (trustee, event) = record.accept_share(alice, "s1".into(), now()).unwrap();
        assert!(trustee.shares_submitted);
        assert_eq!(event.data["share_count"], 1);
        assert!(matches!(
            record.accept_share(alice, "s1".into(), now()),
            Err(Error::Conflict(Conflict::AlreadySubmitted))
        ));
        assert_eq!(record.decryption_status(), DecryptionStatus::new(2, 1));
    }

    #[test]
    fn shares_need_a_key_share() {
        let mut record = draft();
        let (trustee, _) = record.add_trustee("alice".into(), now()).unwrap();
        record.set_status(ElectionStatus::Closed, now()).unwrap();
        assert!(matches!(
            record.check_share(trustee.id),
            Err(Error::Conflict(Conflict::NoKeyShare))
        ));
        assert!(matches!(record.check_share(Id::new()), Err(Error::NotFound(_))));
    }

    #[test]
    fn shares_and_tally_wait_for_the_close() {
        let mut record = keyed();
        let alice = record.trustees[0].id;
        for status in [ElectionStatus::Draft, ElectionStatus::Active] {
            if record.status() != status {
                record.set_status(status, now()).unwrap();
            }
            assert!(matches!(
                record.accept_share(alice, "s1".into(), now()),
                Err(Error::Conflict(Conflict::NotPermitted {
                    operation: Operation::SubmitShare,
                    ..
                }))
            ));
            assert!(matches!(
                record.prepare_tally(),
                Err(Error::Conflict(Conflict::NotPermitted {
                    operation: Operation::Tally,
                    ..
                }))
            ));
        }
        assert!(record.shares.is_empty());
    }

    #[test]
    fn tally_needs_candidates() {
        let mut record = keyed();
        record.set_status(ElectionStatus::Closed, now()).unwrap();
        let (alice, bob) = (record.trustees[0].id, record.trustees[1].id);
        record.accept_share(alice, "s1".into(), now()).unwrap();
        record.accept_share(bob, "s2".into(), now()).unwrap();
        assert!(matches!(record.prepare_tally(), Err(Error::Validation(_))));
    }

    #[test]
    fn tally_gates() {
        let mut record = closed();
        assert!(matches!(
            record.prepare_tally(),
            Err(Error::ThresholdNotMet {
                submitted: 0,
                threshold: 2
            })
        ));
        let (alice, bob) = (record.trustees[0].id, record.trustees[1].id);
        record.accept_share(alice, "s1".into(), now()).unwrap();
        record.accept_share(bob, "s2".into(), now()).unwrap();
        let request = record.prepare_tally().unwrap();
        assert_eq!(request.shares.len(), 2);
        assert_eq!(request.candidates.len(), 2);

        assert!(record.record_result(&[1], now()).is_err());
        let (result, event) = record.record_result(&[1, 3], now()).unwrap();
        assert_eq!(result.total_votes, 4);
        assert_eq!(result.trustees_used, 2);
        assert_eq!(event.data["winner"], "Bob");
        assert_eq!(record.status(), ElectionStatus::Tallied);

        assert!(matches!(
            record.prepare_tally(),
            Err(Error::Conflict(Conflict::AlreadyTallied))
        ));
        let carol = record.trustees[2].id;
        assert!(matches!(
            record.accept_share(carol, "s3".into(), now()),
            Err(Error::Conflict(Conflict::AlreadyTallied))
        ));
    }

    #[test]
    fn overflowing_counts_publish_nothing() {
        let mut record = closed();
        let (alice, bob) = (record.trustees[0].id, record.trustees[1].id);
        record.accept_share(alice, "s1".into(), now()).unwrap();
        record.accept_share(bob, "s2".into(), now()).unwrap();
        let before = record.clone();
        assert!(matches!(
            record.record_result(&[u64::MAX, 1], now()),
            Err(Error::Crypto(CryptoError::Malformed(_)))
        ));
        assert_eq!(record, before);
    }

    #[test]
    fn results_only_after_tally() {
        let record = draft();
        assert!(matches!(
            record.published_result(),
            Err(Error::Conflict(Conflict::ResultsNotAvailable(
                ElectionStatus::Draft
            )))
        ));
    }

    #[test]
    fn closing_reports_ballots_cast() {
        let mut record = draft();
        record.set_status(ElectionStatus::Active, now()).unwrap();
        record.record_ballot(json!({"ballot_hash": "ab"})).unwrap();
        record.record_ballot(json!({"ballot_hash": "cd"})).unwrap();
        assert!(record.record_ballot(json!("not an object")).is_err());
        let event = record.set_status(ElectionStatus::Closed, now()).unwrap();
        assert_eq!(event.entry_type, EntryType::ElectionClosed);
        assert_eq!(event.data["total_votes"], 2);
        assert_eq!(event.data["previous_status"], "ACTIVE");
        assert!(record.record_ballot(json!({})).is_err());
    }

    #[test]
    fn edits_only_in_draft() {
        let mut record = draft();
        let update = ElectionUpdate {
            title: Some("Renamed".into()),
            ..Default::default()
        };
        let event = record.update(update.clone(), now()).unwrap();
        assert_eq!(event.data["fields"], json!(["title"]));
        assert_eq!(record.election.title, "Renamed");
        assert!(matches!(
            record.update(ElectionUpdate::default(), now()),
            Err(Error::Validation(_))
        ));

        record.set_status(ElectionStatus::Active, now()).unwrap();
        assert!(matches!(
            record.update(update, now()),
            Err(Error::Conflict(Conflict::NotPermitted { .. }))
        ));
    }

    #[test]
    fn shrinking_below_roster_is_rejected() {
        let mut record = draft();
        record.add_trustee("alice".into(), now()).unwrap();
        record.add_trustee("bob".into(), now()).unwrap();
        let update = ElectionUpdate {
            threshold_t: Some(1),
            total_trustees_n: Some(1),
            ..Default::default()
        };
        assert!(matches!(record.update(update, now()), Err(Error::Validation(_))));
    }
}
