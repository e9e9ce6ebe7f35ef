//! Database operations for the knowledge store

use chrono::Utc;
use libsql::{Connection, Row, Rows, Value, params};
use serde_json::Map;
use tracing::{debug, instrument};

use crate::knowledge::error::StoreError;
use crate::knowledge::schema;
use crate::knowledge::{KnowledgeRecord, NewKnowledge, UPDATE_COUNT_KEY};
use crate::model::embedding::blob_to_vec;

const RECORD_COLUMNS: &str = "id, title, content, source, source_url, category, author, language, \
     metadata, embedding, is_active, created_at, updated_at";

const INSERT_KNOWLEDGE: &str = "INSERT INTO knowledge
        (title, content, source, source_url, category, author, language, metadata, embedding,
         is_active, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, json(?8), ?9, 1, ?10, ?10)";

/// Shared update clause; `update_count` is carried over from the stored row and incremented
const UPDATE_KNOWLEDGE: &str = "DO UPDATE SET
        title = excluded.title,
        content = excluded.content,
        source = excluded.source,
        category = excluded.category,
        author = excluded.author,
        language = excluded.language,
        metadata = json_set(excluded.metadata, '$.update_count',
            COALESCE(json_extract(knowledge.metadata, '$.update_count'), 0) + 1),
        embedding = excluded.embedding,
        is_active = 1,
        updated_at = excluded.updated_at";

/// Database manager for knowledge records
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Create a new database manager
    #[instrument(skip(conn))]
    pub async fn new(conn: Connection) -> Result<Self, StoreError> {
        schema::initialize_schema(&conn).await?;
        Ok(Self { conn })
    }

    /// Create a new database manager from a path
    pub async fn new_from_path(path: &str) -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to open database: {}", e)))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to connect to database: {}", e)))?;

        Self::new(conn).await
    }

    /// The underlying connection, shared with the run-state table
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Create or update a record in one statement.
    ///
    /// Records with a `source_url` are keyed by it; records without one are
    /// keyed by title. On conflict the stored row is updated in place and its
    /// `update_count` incremented.
    #[instrument(skip(self, entry, embedding), fields(title = %entry.title, url = ?entry.source_url))]
    pub async fn upsert(
        &self,
        entry: &NewKnowledge,
        embedding: Option<Vec<u8>>,
    ) -> Result<KnowledgeRecord, StoreError> {
        let conflict_target = if entry.source_url.is_some() {
            "ON CONFLICT(source_url)"
        } else {
            "ON CONFLICT(title) WHERE source_url IS NULL"
        };
        let sql = format!(
            "{INSERT_KNOWLEDGE} {conflict_target} {UPDATE_KNOWLEDGE} RETURNING {RECORD_COLUMNS}"
        );

        let mut metadata = entry.metadata.clone();
        metadata.insert(UPDATE_COUNT_KEY.to_string(), 0.into());
        let metadata = serde_json::to_string(&metadata)?;
        let embedding = embedding.map(Value::Blob).unwrap_or(Value::Null);
        let now = Utc::now().timestamp();

        let mut rows = self
            .conn
            .query(
                &sql,
                params![
                    entry.title.clone(),
                    entry.content.clone(),
                    entry.source.clone(),
                    entry.source_url.clone(),
                    entry.category.clone(),
                    entry.author.clone(),
                    entry.language.clone(),
                    metadata,
                    embedding,
                    now,
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to upsert knowledge: {}", e)))?;

        let row = rows
            .next()
            .await?
            .ok_or_else(|| StoreError::Data("Upsert returned no row".to_string()))?;
        let record = row_to_record(&row)?;
        debug!(
            id = record.id,
            update_count = record.update_count(),
            "Upserted knowledge record"
        );
        Ok(record)
    }

    /// Get a record by its source URL
    pub async fn get_by_url(&self, url: &str) -> Result<Option<KnowledgeRecord>, StoreError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM knowledge WHERE source_url = ?");
        let mut rows = self
            .conn
            .query(&sql, params![url])
            .await
            .map_err(|e| StoreError::Query(format!("Failed to get record: {}", e)))?;

        match rows.next().await? {
            Some(row) => Ok(Some(row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    /// All active records, oldest first
    #[instrument(skip(self))]
    pub async fn list_active(&self) -> Result<Vec<KnowledgeRecord>, StoreError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM knowledge WHERE is_active = 1 ORDER BY id");
        let rows = self
            .conn
            .query(&sql, params![])
            .await
            .map_err(|e| StoreError::Query(format!("Failed to list records: {}", e)))?;
        collect_records(rows).await
    }

    /// Number of stored records, active or not
    pub async fn count(&self) -> Result<u64, StoreError> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM knowledge", params![])
            .await
            .map_err(|e| StoreError::Query(format!("Failed to count records: {}", e)))?;

        let row = rows
            .next()
            .await?
            .ok_or_else(|| StoreError::Data("COUNT returned no row".to_string()))?;
        let count: i64 = row
            .get(0)
            .map_err(|e| StoreError::Data(format!("Failed to get count: {}", e)))?;
        Ok(count.max(0) as u64)
    }
}

async fn collect_records(mut rows: Rows) -> Result<Vec<KnowledgeRecord>, StoreError> {
    let mut records = Vec::new();
    while let Some(row) = rows.next().await? {
        records.push(row_to_record(&row)?);
    }
    Ok(records)
}

fn optional_text(row: &Row, idx: i32, name: &str) -> Result<Option<String>, StoreError> {
    match row
        .get_value(idx)
        .map_err(|e| StoreError::Data(format!("Failed to get {}: {}", name, e)))?
    {
        Value::Text(text) => Ok(Some(text)),
        Value::Null => Ok(None),
        other => Err(StoreError::Data(format!("Unexpected {} value: {:?}", name, other))),
    }
}

/// Convert a row selected with `RECORD_COLUMNS`
fn row_to_record(row: &Row) -> Result<KnowledgeRecord, StoreError> {
    let metadata: String = row
        .get(8)
        .map_err(|e| StoreError::Data(format!("Failed to get metadata: {}", e)))?;
    let metadata: Map<String, serde_json::Value> = serde_json::from_str(&metadata)?;

    let embedding = match row
        .get_value(9)
        .map_err(|e| StoreError::Data(format!("Failed to get embedding: {}", e)))?
    {
        Value::Blob(blob) => Some(blob_to_vec(&blob)),
        _ => None,
    };

    let is_active: i64 = row
        .get(10)
        .map_err(|e| StoreError::Data(format!("Failed to get is_active: {}", e)))?;

    Ok(KnowledgeRecord {
        id: row
            .get(0)
            .map_err(|e| StoreError::Data(format!("Failed to get id: {}", e)))?,
        title: row
            .get(1)
            .map_err(|e| StoreError::Data(format!("Failed to get title: {}", e)))?,
        content: row
            .get(2)
            .map_err(|e| StoreError::Data(format!("Failed to get content: {}", e)))?,
        source: row
            .get(3)
            .map_err(|e| StoreError::Data(format!("Failed to get source: {}", e)))?,
        source_url: optional_text(row, 4, "source_url")?,
        category: row
            .get(5)
            .map_err(|e| StoreError::Data(format!("Failed to get category: {}", e)))?,
        author: optional_text(row, 6, "author")?,
        language: row
            .get(7)
            .map_err(|e| StoreError::Data(format!("Failed to get language: {}", e)))?,
        metadata,
        embedding,
        is_active: is_active != 0,
        created_at: row
            .get(11)
            .map_err(|e| StoreError::Data(format!("Failed to get created_at: {}", e)))?,
        updated_at: row
            .get(12)
            .map_err(|e| StoreError::Data(format!("Failed to get updated_at: {}", e)))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    async fn setup_test_db() -> Result<(Database, tempfile::TempDir), StoreError> {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir
            .path()
            .join("knowledge.db")
            .to_string_lossy()
            .to_string();

        let db = Database::new_from_path(&db_path).await?;

        Ok((db, temp_dir))
    }

    fn page(url: &str, content: &str) -> NewKnowledge {
        NewKnowledge::new("Page One", content, "website", "general", "en").with_source_url(url)
    }

    #[tokio::test]
    async fn test_upsert_by_url_updates_in_place() {
        let (db, _temp_dir) = setup_test_db().await.unwrap();
        let url = "https://example.org/x";

        let first = db
            .upsert(&page(url, "Hello world, this is page one."), None)
            .await
            .unwrap();
        assert_eq!(first.update_count(), 0);
        assert_eq!(first.source_url.as_deref(), Some(url));

        let second = db
            .upsert(
                &page(url, "Hello world, this is an updated page one, now longer."),
                None,
            )
            .await
            .unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.content, "Hello world, this is an updated page one, now longer.");
        assert_eq!(second.update_count(), 1);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(db.count().await.unwrap(), 1);

        let third = db.upsert(&page(url, "Third time."), None).await.unwrap();
        assert_eq!(third.update_count(), 2);
        assert_eq!(db.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_manual_entries_dedup_by_title() {
        let (db, _temp_dir) = setup_test_db().await.unwrap();
        let entry = NewKnowledge::new("Opening hours", "9 to 5", "manual", "general", "en");

        let first = db.upsert(&entry, None).await.unwrap();
        let mut changed = entry.clone();
        changed.content = "8 to 6".to_string();
        let second = db.upsert(&changed, None).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.content, "8 to 6");
        assert_eq!(second.update_count(), 1);

        // Same title, but keyed by URL: a separate record
        let with_url = entry.clone().with_source_url("https://example.org/hours");
        let third = db.upsert(&with_url, None).await.unwrap();
        assert_ne!(third.id, first.id);
        assert_eq!(db.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_embedding_and_metadata_round_trip() {
        let (db, _temp_dir) = setup_test_db().await.unwrap();
        let entry = page("https://example.org/e", "content")
            .with_author(Some("Editor".to_string()))
            .with_metadata("quality", "low");
        let blob: Vec<u8> = [0.5f32, -1.0].iter().flat_map(|f| f.to_le_bytes()).collect();

        db.upsert(&entry, Some(blob)).await.unwrap();
        let stored = db.get_by_url("https://example.org/e").await.unwrap().unwrap();

        assert_eq!(stored.embedding, Some(vec![0.5, -1.0]));
        assert_eq!(stored.author.as_deref(), Some("Editor"));
        assert_eq!(stored.metadata.get("quality").and_then(|v| v.as_str()), Some("low"));
        assert!(stored.is_active);
        assert!(db.get_by_url("https://example.org/missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_active_in_insertion_order() {
        let (db, _temp_dir) = setup_test_db().await.unwrap();
        db.upsert(&page("https://example.org/1", "one"), None).await.unwrap();
        db.upsert(&page("https://example.org/2", "two"), None).await.unwrap();

        let records = db.list_active().await.unwrap();
        let contents: Vec<_> = records.iter().map(|r| r.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "two"]);
    }
}
