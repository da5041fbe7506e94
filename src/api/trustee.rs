use std::sync::Arc;

use rocket::{serde::json::Json, Route, State};

use crate::coordinator::Coordinator;
use crate::error::Result;
use crate::model::{
    api::trustee::{
        KeyCeremonyOutcome, KeyCeremonyRequest, ShareSubmission, TrusteeDescription,
        TrusteeRequest,
    },
    mongodb::Id,
    trustee::DecryptionStatus,
};

pub fn routes() -> Vec<Route> {
    routes![
        list_trustees,
        add_trustee,
        remove_trustee,
        key_ceremony,
        submit_share,
        decryption_status,
    ]
}

#[get("/trustee/election/<election_id>")]
async fn list_trustees(
    election_id: Id,
    coordinator: &State<Arc<Coordinator>>,
) -> Result<Json<Vec<TrusteeDescription>>> {
    let trustees = coordinator.list_trustees(election_id).await?;
    Ok(Json(trustees.iter().map(Into::into).collect()))
}

#[post("/trustee/add", data = "<request>", format = "json")]
async fn add_trustee(
    request: Json<TrusteeRequest>,
    coordinator: &State<Arc<Coordinator>>,
) -> Result<Json<TrusteeDescription>> {
    let TrusteeRequest {
        election_id,
        user_id,
    } = request.0;
    let trustee = coordinator.add_trustee(election_id.into(), user_id).await?;
    Ok(Json((&trustee).into()))
}

#[delete("/trustee/<trustee_id>")]
async fn remove_trustee(trustee_id: Id, coordinator: &State<Arc<Coordinator>>) -> Result<()> {
    coordinator.remove_trustee(trustee_id).await?;
    Ok(())
}

#[post("/trustee/key-ceremony", data = "<request>", format = "json")]
async fn key_ceremony(
    request: Json<KeyCeremonyRequest>,
    coordinator: &State<Arc<Coordinator>>,
) -> Result<Json<KeyCeremonyOutcome>> {
    let trustees_updated = coordinator
        .run_key_ceremony(request.election_id.into())
        .await?;
    Ok(Json(KeyCeremonyOutcome { trustees_updated }))
}

#[post("/trustee/<trustee_id>/decryption-share", data = "<submission>", format = "json")]
async fn submit_share(
    trustee_id: Id,
    submission: Json<ShareSubmission>,
    coordinator: &State<Arc<Coordinator>>,
) -> Result<Json<TrusteeDescription>> {
    let trustee = coordinator
        .submit_share(trustee_id, submission.0.share)
        .await?;
    Ok(Json((&trustee).into()))
}

#[get("/trustee/election/<election_id>/decryption-status")]
async fn decryption_status(
    election_id: Id,
    coordinator: &State<Arc<Coordinator>>,
) -> Result<Json<DecryptionStatus>> {
    Ok(Json(coordinator.decryption_status(election_id).await?))
}
