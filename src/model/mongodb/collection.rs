use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::{bulletin::BulletinDoc, election::ElectionRecord};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Election aggregates: metadata, candidates, roster, key material and result.
const ELECTIONS: &str = "elections";
impl MongoCollection for ElectionRecord {
    const NAME: &'static str = ELECTIONS;
}

// Bulletin board entries, one document per entry.
const BULLETIN: &str = "bulletin";
impl MongoCollection for BulletinDoc {
    const NAME: &'static str = BULLETIN;
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Bulletin collection: at most one entry per sequence number per election.
    let bulletin_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "seq": 1})
        .options(unique)
        .build();
    Coll::<BulletinDoc>::from_db(db)
        .create_index(bulletin_index, None)
        .await?;

    Ok(())
}
