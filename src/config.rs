use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::crypto::{Cryptography, DevCryptography, RemoteCryptography};
use crate::model::mongodb::ensure_indexes_exist;
use crate::store::{MemoryStore, MongoStore, Store};

fn default_crypto_timeout_secs() -> u64 {
    10
}

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Deserialize)]
pub struct Config {
    #[serde(default = "default_crypto_timeout_secs")]
    crypto_timeout_secs: u64,
    #[serde(default)]
    crypto_url: Option<String>,
}

impl Config {
    /// Upper bound on any single call to the cryptography service.
    pub fn crypto_timeout(&self) -> Duration {
        Duration::from_secs(self.crypto_timeout_secs)
    }

    /// The cryptography provider to use: the remote service if `crypto_url` is
    /// set, otherwise the in-process development stand-in.
    pub fn cryptography(&self) -> Arc<dyn Cryptography> {
        match &self.crypto_url {
            Some(url) => {
                info!("Using cryptography service at {url}");
                Arc::new(RemoteCryptography::new(url.as_str()))
            }
            None => {
                warn!("No `crypto_url` set, using development cryptography. Not for real elections!");
                Arc::new(DevCryptography::new())
            }
        }
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the other fairings and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// Configuration for the database.
#[derive(Deserialize)]
struct DbConfig {
    // secrets
    #[serde(default)]
    db_uri: Option<String>,
}

/// A fairing that loads the store config and places an `Arc<dyn Store>` into
/// managed state: MongoDB if `db_uri` is set, otherwise an in-memory store.
pub struct StoreFairing;

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<DbConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load database config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };
        let db_uri = match config.db_uri {
            Some(db_uri) => db_uri,
            None => {
                warn!("No `db_uri` set, using an in-memory store. Nothing will survive a restart!");
                let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
                return Ok(rocket.manage(store));
            }
        };

        info!("Loaded database config, connecting...");
        // Construct the connection.
        let client = match MongoClient::with_uri_str(db_uri).await {
            Ok(client) => client,
            Err(e) => {
                error!("Failed to connect to database: {e}");
                return Err(rocket);
            }
        };
        let db = client.database(DATABASE);

        // Ensure the required indexes exist.
        if let Err(e) = ensure_indexes_exist(&db).await {
            error!("Failed to connect to database: {e}");
            return Err(rocket);
        }
        info!("...database connection online!");

        // Manage the state.
        let store: Arc<dyn Store> = Arc::new(MongoStore::new(client, &db));
        rocket = rocket.manage(store);
        Ok(rocket)
    }
}

/// Name of the database to use.
const DATABASE: &str = "securevote";

#[cfg(test)]
mod tests {
    use rocket::figment::{providers::Serialized, Figment};

    use super::*;

    #[test]
    fn defaults() {
        let config: Config = Figment::new().extract().unwrap();
        assert_eq!(config.crypto_timeout(), Duration::from_secs(10));
        assert_eq!(config.crypto_url, None);
    }

    #[test]
    fn overrides() {
        let config: Config = Figment::new()
            .merge(Serialized::default("crypto_timeout_secs", 3))
            .merge(Serialized::default("crypto_url", "http://crypto:8010/"))
            .extract()
            .unwrap();
        assert_eq!(config.crypto_timeout(), Duration::from_secs(3));
        assert_eq!(config.crypto_url.as_deref(), Some("http://crypto:8010/"));
    }

    #[rocket::async_test]
    async fn store_defaults_to_memory() {
        let rocket = rocket::custom(Figment::from(rocket::Config::debug_default()))
            .attach(StoreFairing)
            .ignite()
            .await
            .unwrap();
        let store = rocket.state::<Arc<dyn Store>>().unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }
}
