use log::{debug, error};
use mongodb::{
    bson::doc,
    options::{FindOneOptions, FindOptions, ReplaceOptions},
    Client, Database,
};
use rocket::futures::TryStreamExt;

use crate::error::{Error, Result};
use crate::model::{
    bulletin::{BulletinDoc, BulletinEntry},
    common::election::ElectionId,
    election::ElectionRecord,
    mongodb::{is_duplicate_key_error, Coll},
};

use super::{Store, StoredElection};

/// A MongoDB-backed store. Requires a replica set, since every commit is a transaction.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    elections: Coll<ElectionRecord>,
    bulletin: Coll<BulletinDoc>,
}

impl MongoStore {
    pub fn new(client: Client, db: &Database) -> Self {
        Self {
            client,
            elections: Coll::from_db(db),
            bulletin: Coll::from_db(db),
        }
    }

    async fn tail(&self, election_id: ElectionId) -> Result<Option<BulletinEntry>> {
        let options = FindOneOptions::builder().sort(doc! {"seq": -1}).build();
        let last = self
            .bulletin
            .find_one(doc! {"election_id": election_id}, options)
            .await?;
        Ok(last.map(Into::into))
    }
}

#[rocket::async_trait]
impl Store for MongoStore {
    async fn load(&self) -> Result<Vec<StoredElection>> {
        let records: Vec<ElectionRecord> = self.elections.find(None, None).await?.try_collect().await?;
        debug!("Loaded {} elections from the database", records.len());

        let mut stored = Vec::with_capacity(records.len());
        for record in records {
            let tail = self.tail(record.id).await?;
            stored.push((record, tail));
        }
        Ok(stored)
    }

    async fn commit(&self, record: &ElectionRecord, entry: &BulletinEntry) -> Result<()> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let upsert = ReplaceOptions::builder().upsert(true).build();
        self.elections
            .replace_one_with_session(record.id.as_doc(), record, upsert, &mut session)
            .await?;

        // The unique (election_id, seq) index rejects a second writer at the same position.
        let doc = BulletinDoc::new(record.id, entry.clone());
        if let Err(err) = self
            .bulletin
            .insert_one_with_session(doc, None, &mut session)
            .await
        {
            return Err(if is_duplicate_key_error(&err) {
                error!(
                    "Bulletin entry {} for election {} already exists",
                    entry.seq, record.id
                );
                Error::Store(format!("bulletin entry {} already exists", entry.seq))
            } else {
                err.into()
            });
        }

        session.commit_transaction().await?;
        Ok(())
    }

    async fn read_chain(&self, election_id: ElectionId) -> Result<Vec<BulletinEntry>> {
        let options = FindOptions::builder().sort(doc! {"seq": 1}).build();
        let docs: Vec<BulletinDoc> = self
            .bulletin
            .find(doc! {"election_id": election_id}, options)
            .await?
            .try_collect()
            .await?;
        Ok(docs.into_iter().map(Into::into).collect())
    }
}
