use std::sync::Arc;

use rocket::{serde::json::Json, Route, State};

use crate::coordinator::Coordinator;
use crate::error::Result;
use crate::model::{
    api::election::{
        CandidateDescription, CandidateOrder, CandidateSpec, ElectionDescription, ElectionResults,
        StatusChange, TallySummary,
    },
    election::{ElectionSpec, ElectionUpdate},
    mongodb::Id,
};

pub fn routes() -> Vec<Route> {
    routes![
        list_elections,
        get_election,
        create_election,
        update_election,
        set_status,
        add_candidate,
        reorder_candidates,
        tally,
        get_results,
    ]
}

#[get("/election/list")]
async fn list_elections(coordinator: &State<Arc<Coordinator>>) -> Json<Vec<ElectionDescription>> {
    let records = coordinator.list_elections().await;
    Json(records.iter().map(Into::into).collect())
}

#[get("/election/<election_id>")]
async fn get_election(
    election_id: Id,
    coordinator: &State<Arc<Coordinator>>,
) -> Result<Json<ElectionDescription>> {
    let record = coordinator.get_election(election_id).await?;
    Ok(Json((&record).into()))
}

#[post("/election/create", data = "<spec>", format = "json")]
async fn create_election(
    spec: Json<ElectionSpec>,
    coordinator: &State<Arc<Coordinator>>,
) -> Result<Json<ElectionDescription>> {
    let record = coordinator.create_election(spec.0).await?;
    Ok(Json((&record).into()))
}

#[put("/election/<election_id>", data = "<update>", format = "json")]
async fn update_election(
    election_id: Id,
    update: Json<ElectionUpdate>,
    coordinator: &State<Arc<Coordinator>>,
) -> Result<Json<ElectionDescription>> {
    let record = coordinator.update_election(election_id, update.0).await?;
    Ok(Json((&record).into()))
}

#[put("/election/<election_id>/status", data = "<change>", format = "json")]
async fn set_status(
    election_id: Id,
    change: Json<StatusChange>,
    coordinator: &State<Arc<Coordinator>>,
) -> Result<Json<ElectionDescription>> {
    let record = coordinator.set_status(election_id, change.status).await?;
    Ok(Json((&record).into()))
}

#[post("/election/candidate/add", data = "<spec>", format = "json")]
async fn add_candidate(
    spec: Json<CandidateSpec>,
    coordinator: &State<Arc<Coordinator>>,
) -> Result<Json<CandidateDescription>> {
    let CandidateSpec {
        election_id,
        name,
        party,
    } = spec.0;
    let candidate = coordinator
        .add_candidate(election_id.into(), name, party)
        .await?;
    Ok(Json(CandidateDescription::new(election_id.into(), &candidate)))
}

#[put("/election/<election_id>/candidates/order", data = "<order>", format = "json")]
async fn reorder_candidates(
    election_id: Id,
    order: Json<CandidateOrder>,
    coordinator: &State<Arc<Coordinator>>,
) -> Result<Json<Vec<CandidateDescription>>> {
    let order = order.0.candidate_ids.into_iter().map(Into::into).collect();
    let candidates = coordinator.reorder_candidates(election_id, order).await?;
    Ok(Json(
        candidates
            .iter()
            .map(|c| CandidateDescription::new(election_id, c))
            .collect(),
    ))
}

#[post("/election/<election_id>/tally")]
async fn tally(
    election_id: Id,
    coordinator: &State<Arc<Coordinator>>,
) -> Result<Json<TallySummary>> {
    let result = coordinator.tally(election_id).await?;
    Ok(Json((&result).into()))
}

#[get("/election/<election_id>/results")]
async fn get_results(
    election_id: Id,
    coordinator: &State<Arc<Coordinator>>,
) -> Result<Json<ElectionResults>> {
    let (record, result) = coordinator.results(election_id).await?;
    Ok(Json(ElectionResults::new(&record, &result)))
}
