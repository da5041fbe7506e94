use rocket::{Catcher, Request, Route};

use crate::error::Error;

mod bulletin;
mod election;
mod trustee;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(election::routes());
    routes.extend(trustee::routes());
    routes.extend(bulletin::routes());
    routes
}

/// Catchers that keep failures outside the routes in the same `{kind, detail}` shape.
pub fn catchers() -> Vec<Catcher> {
    catchers![bad_request, not_found, unprocessable]
}

#[catch(400)]
fn bad_request(_req: &Request) -> Error {
    Error::Validation("Malformed request".to_string())
}

#[catch(404)]
fn not_found(req: &Request) -> Error {
    Error::NotFound(req.uri().path().to_string())
}

/// Bodies that parse as JSON but not as the expected type, and path
/// parameters that fail to parse.
#[catch(422)]
fn unprocessable(_req: &Request) -> Error {
    Error::Validation("Malformed request data".to_string())
}
