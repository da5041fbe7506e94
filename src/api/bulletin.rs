use std::sync::Arc;

use rocket::{serde::json::Json, Route, State};

use crate::coordinator::Coordinator;
use crate::error::Result;
use crate::model::{
    api::bulletin::AppendRequest,
    bulletin::{BulletinEntry, ChainVerification},
    mongodb::Id,
};

pub fn routes() -> Vec<Route> {
    routes![get_chain, verify_chain, append_entry]
}

#[get("/bulletin/<election_id>/chain")]
async fn get_chain(
    election_id: Id,
    coordinator: &State<Arc<Coordinator>>,
) -> Result<Json<Vec<BulletinEntry>>> {
    Ok(Json(coordinator.read_chain(election_id).await?))
}

#[get("/bulletin/<election_id>/verify")]
async fn verify_chain(
    election_id: Id,
    coordinator: &State<Arc<Coordinator>>,
) -> Result<Json<ChainVerification>> {
    Ok(Json(coordinator.verify_chain(election_id).await?))
}

/// Entry point for collaborating services, such as the vote service recording ballots.
#[post("/bulletin/append", data = "<request>", format = "json")]
async fn append_entry(
    request: Json<AppendRequest>,
    coordinator: &State<Arc<Coordinator>>,
) -> Result<Json<BulletinEntry>> {
    let AppendRequest {
        election_id,
        entry_type,
        entry_data,
    } = request.0;
    let entry = coordinator
        .append(election_id.into(), &entry_type, entry_data)
        .await?;
    Ok(Json(entry))
}
