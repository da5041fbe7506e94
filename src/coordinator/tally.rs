use log::{info, warn};

use crate::error::Result;
use crate::model::{common::election::ElectionId, election::ElectionRecord, tally::ElectionResult};

use super::{now, Coordinator};

impl Coordinator {
    /// Combine the submitted decryption shares and publish the result.
    ///
    /// Runs at most once per election: the check and the commit happen under the
    /// same lock, and a failed combine records nothing.
    pub async fn tally(&self, election_id: ElectionId) -> Result<ElectionResult> {
        let slot = self.slot(election_id).await?;
        let mut slot = slot.lock().await;
        let request = match slot.record.prepare_tally() {
            Ok(request) => request,
            Err(err) => {
                warn!("Refused to tally election {election_id}: {err}");
                return Err(err);
            }
        };

        info!(
            "Tallying election {election_id} with {} of {} required shares",
            request.shares.len(),
            request.threshold
        );
        let counts = self
            .bounded("threshold decryption", self.crypto.combine(request))
            .await?;

        let mut record = slot.record.clone();
        let (result, event) = record.record_result(&counts, now())?;
        self.commit(&mut slot, record, event).await?;
        info!(
            "Published results for election {election_id}: {} votes",
            result.total_votes
        );
        Ok(result)
    }

    /// The published result of a tallied election.
    pub async fn results(&self, election_id: ElectionId) -> Result<(ElectionRecord, ElectionResult)> {
        let record = self.snapshot(election_id).await?;
        let result = record.published_result()?.clone();
        Ok((record, result))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::error::{Conflict, Error};
    use crate::model::{
        bulletin::EntryType,
        common::election::{ElectionStatus, Operation},
    };
    use crate::testing::Harness;

    #[rocket::async_test]
    async fn two_of_three_scenario() {
        let harness = Harness::new();
        let election = harness.keyed_election().await;
        let coordinator = &harness.coordinator;
        let amy = coordinator
            .add_candidate(election.id, "Amy".into(), None)
            .await
            .unwrap();
        let bob = coordinator
            .add_candidate(election.id, "Bob".into(), None)
            .await
            .unwrap();
        coordinator
            .set_status(election.id, ElectionStatus::Active)
            .await
            .unwrap();
        for candidate in [&amy, &bob, &bob] {
            harness.cast_ballot(election.id, candidate.id).await.unwrap();
        }
        coordinator
            .set_status(election.id, ElectionStatus::Closed)
            .await
            .unwrap();

        let trustees = coordinator.list_trustees(election.id).await.unwrap();
        harness.submit_share(election.id, &trustees[0]).await.unwrap();
        assert!(matches!(
            coordinator.tally(election.id).await,
            Err(Error::ThresholdNotMet {
                submitted: 1,
                threshold: 2
            })
        ));
        harness.submit_share(election.id, &trustees[2]).await.unwrap();

        let result = coordinator.tally(election.id).await.unwrap();
        assert_eq!(result.total_votes, 3);
        assert_eq!(result.trustees_used, 2);
        assert_eq!(result.threshold_required, 2);

        let (record, published) = coordinator.results(election.id).await.unwrap();
        assert_eq!(record.status(), ElectionStatus::Tallied);
        let ranked: Vec<_> = published
            .ranked()
            .into_iter()
            .map(|c| (c.name.as_str(), c.vote_count, c.percentage))
            .collect();
        assert_eq!(ranked, [("Bob", 2, 66.67), ("Amy", 1, 33.33)]);

        let chain = coordinator.read_chain(election.id).await.unwrap();
        let last = chain.last().unwrap();
        assert_eq!(last.entry_type, EntryType::ResultPublished);
        assert_eq!(last.data["winner"], "Bob");
        assert!(coordinator.verify_chain(election.id).await.unwrap().valid);

        // The late trustee is turned away.
        assert!(matches!(
            harness.submit_share(election.id, &trustees[1]).await,
            Err(Error::Conflict(Conflict::AlreadyTallied))
        ));
    }

    #[rocket::async_test]
    async fn tally_runs_once() {
        let harness = Harness::new();
        let election = harness.ready_to_tally().await;
        let coordinator = Arc::clone(&harness.coordinator);

        let (a, b) = rocket::tokio::join!(
            coordinator.tally(election.id),
            coordinator.tally(election.id)
        );
        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(outcomes
            .iter()
            .any(|r| matches!(r, Err(Error::Conflict(Conflict::AlreadyTallied)))));

        let published = coordinator
            .read_chain(election.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| e.entry_type == EntryType::ResultPublished)
            .count();
        assert_eq!(published, 1);
    }

    #[rocket::async_test]
    async fn no_votes_means_no_winner() {
        let harness = Harness::new();
        let election = harness.ready_to_tally().await;
        let result = harness.coordinator.tally(election.id).await.unwrap();
        assert_eq!(result.total_votes, 0);
        assert!(result.candidates.iter().all(|c| c.percentage == 0.0));

        let chain = harness.coordinator.read_chain(election.id).await.unwrap();
        assert!(chain.last().unwrap().data.get("winner").is_none());
    }

    #[rocket::async_test]
    async fn tally_waits_for_the_close() {
        let harness = Harness::new();
        let election = harness.keyed_election().await;
        let coordinator = &harness.coordinator;
        let amy = coordinator
            .add_candidate(election.id, "Amy".into(), None)
            .await
            .unwrap();

        for status in [ElectionStatus::Draft, ElectionStatus::Active] {
            if status == ElectionStatus::Active {
                coordinator.set_status(election.id, status).await.unwrap();
                harness.cast_ballot(election.id, amy.id).await.unwrap();
            }
            assert!(matches!(
                coordinator.tally(election.id).await,
                Err(Error::Conflict(Conflict::NotPermitted {
                    operation: Operation::Tally,
                    status: refused,
                })) if refused == status
            ));
            let record = coordinator.get_election(election.id).await.unwrap();
            assert_eq!(record.status(), status);
        }

        // Voting carries on after the refused tally.
        harness.cast_ballot(election.id, amy.id).await.unwrap();
        let chain = coordinator.read_chain(election.id).await.unwrap();
        assert!(chain
            .iter()
            .all(|e| e.entry_type != EntryType::ResultPublished));
    }

    #[rocket::async_test]
    async fn results_wait_for_the_tally() {
        let harness = Harness::new();
        let election = harness.election().await;
        assert!(matches!(
            harness.coordinator.results(election.id).await,
            Err(Error::Conflict(Conflict::ResultsNotAvailable(
                ElectionStatus::Draft
            )))
        ));
    }
}
