// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;
use tracing::{debug, info};

use super::backend;
use super::schema::documents;
use crate::DocumentStore;
use crate::batch::{Batch, CommitReceipt, plan_changes};
use crate::document::{ChangeKind, Document, DocumentChange};
use crate::error::StoreError;
use crate::feed::{ChangeFeed, Subscription, SubscriptionFilter};

/// Atomic counter for generating unique in-memory database names.
///
/// Each call to `new_in_memory()` receives a unique sequential ID so tests
/// never share a database.
static DB_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Queryable, Selectable)]
#[diesel(table_name = documents)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct DocumentRow {
    collection: String,
    doc_key: String,
    body: String,
    revision: i64,
}

impl DocumentRow {
    fn into_document(self) -> Result<Document, StoreError> {
        let revision: u64 = u64::try_from(self.revision).map_err(|_| {
            StoreError::Database(format!(
                "Negative revision stored for {}/{}",
                self.collection, self.doc_key
            ))
        })?;
        Ok(Document {
            body: serde_json::from_str(&self.body)?,
            collection: self.collection,
            key: self.doc_key,
            revision,
        })
    }
}

#[derive(Insertable)]
#[diesel(table_name = documents)]
struct NewDocumentRow<'a> {
    collection: &'a str,
    doc_key: &'a str,
    body: String,
    revision: i64,
    updated_at: String,
}

/// Document store persisted in `SQLite`.
pub struct SqliteStore {
    conn: Mutex<SqliteConnection>,
    feed: ChangeFeed,
}

impl SqliteStore {
    /// Creates a store backed by a fresh in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be initialized.
    pub fn new_in_memory() -> Result<Self, StoreError> {
        let db_id: u64 = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
        let shared_memory_url: String =
            format!("file:memdb_store_{db_id}?mode=memory&cache=shared");
        let conn: SqliteConnection = backend::initialize_database(&shared_memory_url)?;
        Ok(Self::from_connection(conn))
    }

    /// Opens or creates a file-based database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or initialized.
    pub fn new_with_file<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path_str: &str = path
            .as_ref()
            .to_str()
            .ok_or_else(|| StoreError::Initialization(String::from("Invalid database path")))?;

        let mut conn: SqliteConnection = backend::initialize_database(path_str)?;
        backend::enable_wal_mode(&mut conn)?;
        info!(path = path_str, "Opened SQLite document store");

        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: SqliteConnection) -> Self {
        Self {
            conn: Mutex::new(conn),
            feed: ChangeFeed::new(),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SqliteConnection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable(String::from("Database connection lock poisoned")))
    }
}

fn load(
    conn: &mut SqliteConnection,
    collection: &str,
    key: &str,
) -> Result<Option<Document>, StoreError> {
    documents::table
        .filter(documents::collection.eq(collection))
        .filter(documents::doc_key.eq(key))
        .select(DocumentRow::as_select())
        .first::<DocumentRow>(conn)
        .optional()?
        .map(DocumentRow::into_document)
        .transpose()
}

fn to_db_revision(revision: u64) -> Result<i64, StoreError> {
    i64::try_from(revision)
        .map_err(|_| StoreError::Database(format!("Revision {revision} out of range")))
}

fn apply_change(
    conn: &mut SqliteConnection,
    change: &DocumentChange,
    updated_at: &str,
) -> Result<(), StoreError> {
    let target = documents::table
        .filter(documents::collection.eq(change.collection.as_str()))
        .filter(documents::doc_key.eq(change.key.as_str()));

    match (change.kind, change.body.as_ref()) {
        (ChangeKind::Deleted, _) => {
            diesel::delete(target).execute(conn)?;
        }
        (ChangeKind::Created, Some(body)) => {
            diesel::insert_into(documents::table)
                .values(NewDocumentRow {
                    collection: &change.collection,
                    doc_key: &change.key,
                    body: serde_json::to_string(body)?,
                    revision: to_db_revision(change.revision)?,
                    updated_at: updated_at.to_string(),
                })
                .execute(conn)?;
        }
        (ChangeKind::Updated, Some(body)) => {
            diesel::update(target)
                .set((
                    documents::body.eq(serde_json::to_string(body)?),
                    documents::revision.eq(to_db_revision(change.revision)?),
                    documents::updated_at.eq(updated_at),
                ))
                .execute(conn)?;
        }
        (_, None) => {
            return Err(StoreError::Database(format!(
                "Write to {}/{} carried no body",
                change.collection, change.key
            )));
        }
    }
    Ok(())
}

impl DocumentStore for SqliteStore {
    fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        let mut conn = self.lock()?;
        load(&mut conn, collection, key)
    }

    fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let mut conn = self.lock()?;
        let rows: Vec<DocumentRow> = documents::table
            .filter(documents::collection.eq(collection))
            .order(documents::doc_key.asc())
            .select(DocumentRow::as_select())
            .load::<DocumentRow>(&mut *conn)?;
        rows.into_iter().map(DocumentRow::into_document).collect()
    }

    fn commit(&self, batch: Batch) -> Result<CommitReceipt, StoreError> {
        let updated_at: String = Utc::now().to_rfc3339();
        let changes: Vec<DocumentChange> = {
            let mut conn = self.lock()?;
            conn.immediate_transaction::<_, StoreError, _>(|conn| {
                let changes: Vec<DocumentChange> =
                    plan_changes(&batch, |collection, key| load(conn, collection, key))?;
                for change in &changes {
                    apply_change(conn, change, &updated_at)?;
                }
                Ok(changes)
            })?
        };

        debug!(changes = changes.len(), "Committed batch to SQLite store");
        self.feed.publish(&changes);
        Ok(CommitReceipt { changes })
    }

    fn subscribe(&self, filter: SubscriptionFilter) -> Subscription {
        self.feed.subscribe(filter)
    }
}
