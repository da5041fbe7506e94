use rocket::serde::json::Value;
use serde::{Deserialize, Serialize};

use crate::model::api::ApiId;

/// An entry appended by a collaborating service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppendRequest {
    pub election_id: ApiId,
    pub entry_type: String,
    pub entry_data: Value,
}
