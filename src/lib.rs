#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

pub mod api;
pub mod config;
pub mod coordinator;
pub mod crypto;
pub mod error;
pub mod logging;
pub mod model;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use coordinator::Coordinator;

use config::{ConfigFairing, StoreFairing};
use coordinator::CoordinatorFairing;
use logging::LoggerFairing;

/// The full server: config, store and coordinator are set up from the
/// environment when the rocket ignites.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(StoreFairing)
        .attach(CoordinatorFairing)
        .mount("/api", api::routes())
        .register("/", api::catchers())
}

/// A server around an existing coordinator, for tests.
#[cfg(test)]
pub(crate) fn rocket_for_coordinator(coordinator: std::sync::Arc<Coordinator>) -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .manage(coordinator)
        .mount("/api", api::routes())
        .register("/", api::catchers())
}
