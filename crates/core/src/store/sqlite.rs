//! SQLite-backed torrent store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection};
use tracing::debug;

use super::{SortDirection, SortField, StoreError, StoredTorrent, TorrentSearchQuery, TorrentStore};
use crate::torrent::{FetchedItem, InfoHash};

/// SQLite-backed torrent store.
pub struct SqliteTorrentStore {
    conn: Mutex<Connection>,
}

/// Columns as read from a row, before domain conversion.
struct RawRow {
    source_id: u32,
    source_item_id: i64,
    title: String,
    info_hash: Vec<u8>,
    description: String,
    publication_time: String,
    size: i64,
}

const SELECT_COLUMNS: &str = "i.source_id, i.source_item_id, i.title, i.info_hash, \
                              i.description, i.publication_time, i.size";

impl SqliteTorrentStore {
    /// Open the store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS info (
                source_id INTEGER NOT NULL,
                source_item_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                info_hash BLOB NOT NULL CHECK (length(info_hash) = 20),
                description TEXT NOT NULL,
                publication_time TEXT NOT NULL,
                size INTEGER NOT NULL,
                PRIMARY KEY (source_id, source_item_id)
            );

            CREATE INDEX IF NOT EXISTS idx_info_info_hash ON info(info_hash);

            -- Full-text index over titles and descriptions
            CREATE VIRTUAL TABLE IF NOT EXISTS info_fts USING fts5(
                title,
                description,
                content = 'info',
                content_rowid = 'rowid'
            );

            CREATE TRIGGER IF NOT EXISTS info_fts_insert AFTER INSERT ON info BEGIN
                INSERT INTO info_fts(rowid, title, description)
                VALUES (new.rowid, new.title, new.description);
            END;
            "#,
        )
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))
    }

    fn read_row(row: &rusqlite::Row) -> rusqlite::Result<RawRow> {
        Ok(RawRow {
            source_id: row.get(0)?,
            source_item_id: row.get(1)?,
            title: row.get(2)?,
            info_hash: row.get(3)?,
            description: row.get(4)?,
            publication_time: row.get(5)?,
            size: row.get(6)?,
        })
    }
}

impl RawRow {
    fn into_stored(self) -> Result<StoredTorrent, StoreError> {
        let info_hash = InfoHash::from_slice(&self.info_hash)
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        let published_at = DateTime::parse_from_rfc3339(&self.publication_time)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::InvalidData(format!("publication time: {}", e)))?;
        let source_item_id = u64::try_from(self.source_item_id)
            .map_err(|_| StoreError::InvalidData(format!("item id {}", self.source_item_id)))?;
        let size_bytes = u64::try_from(self.size)
            .map_err(|_| StoreError::InvalidData(format!("size {}", self.size)))?;

        Ok(StoredTorrent {
            source_id: self.source_id,
            source_item_id,
            title: self.title,
            info_hash,
            description: self.description,
            published_at,
            size_bytes,
        })
    }
}

/// Build an FTS5 match expression requiring every word of the query.
///
/// Each word is quoted so FTS5 operators in user input are matched literally.
fn fts_match_expression(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(|word| format!("\"{}\"", word.replace('"', "\"\"")))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

fn order_clause(field: SortField, direction: SortDirection) -> String {
    let column = match field {
        SortField::Name => "i.title",
        SortField::Size => "i.size",
        SortField::Time => "i.publication_time",
    };
    let direction = match direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    };
    format!("{column} {direction}, i.source_id ASC, i.source_item_id ASC")
}

fn to_sql_int(value: u64, what: &str) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::InvalidData(format!("{what} {value} out of range")))
}

impl TorrentStore for SqliteTorrentStore {
    fn max_stored_id(&self, source_id: u32) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let max: i64 = conn
            .query_row(
                "SELECT COALESCE(MAX(source_item_id), 0) FROM info WHERE source_id = ?",
                params![source_id],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        u64::try_from(max).map_err(|_| StoreError::InvalidData(format!("item id {}", max)))
    }

    fn append_batch(&self, source_id: u32, items: &[FetchedItem]) -> Result<usize, StoreError> {
        if items.is_empty() {
            return Ok(0);
        }

        let mut conn = self.lock()?;
        // Dropping the transaction without commit rolls it back.
        let tx = conn
            .transaction()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO info (source_id, source_item_id, title, info_hash, description, publication_time, size)
                     VALUES (?, ?, ?, ?, ?, ?, ?)",
                )
                .map_err(|e| StoreError::Database(e.to_string()))?;

            for item in items {
                let record = &item.record;
                stmt.execute(params![
                    source_id,
                    to_sql_int(item.item_id, "item id")?,
                    &record.title,
                    record.info_hash.as_bytes(),
                    &record.body,
                    record
                        .published_at
                        .to_rfc3339_opts(SecondsFormat::Secs, true),
                    to_sql_int(record.size_bytes, "size")?,
                ])
                .map_err(|e| StoreError::Database(e.to_string()))?;
            }
        }

        tx.commit()
            .map_err(|e| StoreError::Database(e.to_string()))?;

        debug!(source_id, rows = items.len(), "Appended batch");
        Ok(items.len())
    }

    fn get_by_info_hash(&self, info_hash: &InfoHash) -> Result<StoredTorrent, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM info i WHERE i.info_hash = ?
             ORDER BY i.source_id, i.source_item_id LIMIT 1"
        );

        let raw = conn
            .query_row(&sql, params![info_hash.as_bytes()], Self::read_row)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound(info_hash.to_hex()),
                e => StoreError::Database(e.to_string()),
            })?;

        raw.into_stored()
    }

    fn search(&self, query: &TorrentSearchQuery) -> Result<Vec<StoredTorrent>, StoreError> {
        let Some(expression) = fts_match_expression(&query.query) else {
            return Ok(Vec::new());
        };

        let conn = self.lock()?;
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM info_fts
             JOIN info i ON i.rowid = info_fts.rowid
             WHERE info_fts MATCH ?
             ORDER BY {}
             LIMIT ?",
            order_clause(query.order_by, query.effective_direction())
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![expression, query.effective_limit()], Self::read_row)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let mut results = Vec::new();
        for row in rows {
            let raw = row.map_err(|e| StoreError::Database(e.to_string()))?;
            results.push(raw.into_stored()?);
        }
        Ok(results)
    }

    fn count(&self, source_id: Option<u32>) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM info WHERE ?1 IS NULL OR source_id = ?1",
                params![source_id],
                |row| row.get(0),
            )
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    fn create_test_store() -> SqliteTorrentStore {
        SqliteTorrentStore::in_memory().unwrap()
    }

    #[test]
    fn test_max_stored_id_empty() {
        let store = create_test_store();
        assert_eq!(store.max_stored_id(1).unwrap(), 0);
    }

    #[test]
    fn test_append_and_max_stored_id() {
        let store = create_test_store();
        let written = store.append_batch(1, &fixtures::items(1..=5)).unwrap();

        assert_eq!(written, 5);
        assert_eq!(store.max_stored_id(1).unwrap(), 5);
        // Other sources are unaffected
        assert_eq!(store.max_stored_id(2).unwrap(), 0);
    }

    #[test]
    fn test_append_empty_batch() {
        let store = create_test_store();
        assert_eq!(store.append_batch(1, &[]).unwrap(), 0);
        assert_eq!(store.count(None).unwrap(), 0);
    }

    #[test]
    fn test_max_stored_id_ignores_gaps() {
        let store = create_test_store();
        let items = vec![fixtures::item(3), fixtures::item(10), fixtures::item(7)];
        store.append_batch(1, &items).unwrap();
        assert_eq!(store.max_stored_id(1).unwrap(), 10);
    }

    #[test]
    fn test_duplicate_key_rolls_back_batch() {
        let store = create_test_store();
        store.append_batch(1, &[fixtures::item(1)]).unwrap();

        let batch = vec![fixtures::item(2), fixtures::item(1)];
        let result = store.append_batch(1, &batch);

        assert!(matches!(result, Err(StoreError::Database(_))));
        assert_eq!(store.count(Some(1)).unwrap(), 1);
        assert_eq!(store.max_stored_id(1).unwrap(), 1);
    }

    #[test]
    fn test_oversized_item_id_rejected() {
        let store = create_test_store();
        let mut item = fixtures::item(1);
        item.item_id = u64::MAX;

        let result = store.append_batch(1, &[fixtures::item(2), item]);
        assert!(matches!(result, Err(StoreError::InvalidData(_))));
        assert_eq!(store.count(None).unwrap(), 0);
    }

    #[test]
    fn test_get_by_info_hash() {
        let store = create_test_store();
        store.append_batch(2, &fixtures::items(1..=3)).unwrap();

        let found = store.get_by_info_hash(&fixtures::info_hash(2)).unwrap();
        assert_eq!(found.source_id, 2);
        assert_eq!(found.source_item_id, 2);
        assert_eq!(found.title, fixtures::record(2).title);
        assert_eq!(found.published_at, fixtures::record(2).published_at);
        assert_eq!(found.size_bytes, fixtures::record(2).size_bytes);
    }

    #[test]
    fn test_get_nonexistent() {
        let store = create_test_store();
        let result = store.get_by_info_hash(&fixtures::info_hash(42));
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_count_per_source() {
        let store = create_test_store();
        store.append_batch(1, &fixtures::items(1..=4)).unwrap();
        store.append_batch(2, &fixtures::items(1..=2)).unwrap();

        assert_eq!(store.count(None).unwrap(), 6);
        assert_eq!(store.count(Some(1)).unwrap(), 4);
        assert_eq!(store.count(Some(2)).unwrap(), 2);
        assert_eq!(store.count(Some(3)).unwrap(), 0);
    }

    fn titled(id: u64, title: &str, size: u64) -> FetchedItem {
        let mut item = fixtures::item(id);
        item.record.title = title.to_string();
        item.record.size_bytes = size;
        item
    }

    #[test]
    fn test_search_matches_all_words() {
        let store = create_test_store();
        store
            .append_batch(
                1,
                &[
                    titled(1, "Ubuntu 24.04 Desktop", 100),
                    titled(2, "Ubuntu 24.04 Server", 200),
                    titled(3, "Debian 12 Server", 300),
                ],
            )
            .unwrap();

        let results = store
            .search(&TorrentSearchQuery::new("ubuntu server"))
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source_item_id, 2);

        let results = store.search(&TorrentSearchQuery::new("server")).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_search_matches_description() {
        let store = create_test_store();
        let mut item = fixtures::item(1);
        item.record.body = "Contains the rare keyword zanzibar".to_string();
        store.append_batch(1, &[item, fixtures::item(2)]).unwrap();

        let results = store.search(&TorrentSearchQuery::new("zanzibar")).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].source_item_id, 1);
    }

    #[test]
    fn test_search_default_order_is_newest_first() {
        let store = create_test_store();
        store.append_batch(1, &fixtures::items(1..=3)).unwrap();

        let results = store.search(&TorrentSearchQuery::new("torrent")).unwrap();
        let ids: Vec<u64> = results.iter().map(|t| t.source_item_id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
    }

    #[test]
    fn test_search_order_by_size_and_name() {
        let store = create_test_store();
        store
            .append_batch(
                1,
                &[
                    titled(1, "Bravo release", 300),
                    titled(2, "Alpha release", 100),
                    titled(3, "Charlie release", 200),
                ],
            )
            .unwrap();

        let by_size = store
            .search(&TorrentSearchQuery::new("release").order_by(SortField::Size, None))
            .unwrap();
        let ids: Vec<u64> = by_size.iter().map(|t| t.source_item_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);

        let by_name_desc = store
            .search(
                &TorrentSearchQuery::new("release")
                    .order_by(SortField::Name, Some(SortDirection::Desc)),
            )
            .unwrap();
        let ids: Vec<u64> = by_name_desc.iter().map(|t| t.source_item_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_search_respects_limit() {
        let store = create_test_store();
        store.append_batch(1, &fixtures::items(1..=20)).unwrap();

        let results = store
            .search(&TorrentSearchQuery::new("torrent").with_limit(5))
            .unwrap();
        assert_eq!(results.len(), 5);
    }

    #[test]
    fn test_search_empty_query() {
        let store = create_test_store();
        store.append_batch(1, &fixtures::items(1..=3)).unwrap();

        assert!(store.search(&TorrentSearchQuery::new("   ")).unwrap().is_empty());
    }

    #[test]
    fn test_search_quotes_operators() {
        let store = create_test_store();
        store.append_batch(1, &fixtures::items(1..=3)).unwrap();

        // Unquoted, OR would match every row
        let results = store
            .search(&TorrentSearchQuery::new("torrent OR nothing"))
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_cyrillic_case_insensitive_search() {
        let store = create_test_store();
        store
            .append_batch(1, &[titled(1, "Война и мир", 100)])
            .unwrap();

        let results = store.search(&TorrentSearchQuery::new("ВОЙНА")).unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("torrents.db");

        {
            let store = SqliteTorrentStore::new(&path).unwrap();
            store.append_batch(1, &fixtures::items(1..=3)).unwrap();
        }

        let store = SqliteTorrentStore::new(&path).unwrap();
        assert_eq!(store.max_stored_id(1).unwrap(), 3);
        assert_eq!(store.search(&TorrentSearchQuery::new("torrent")).unwrap().len(), 3);
    }

    #[test]
    fn test_fts_match_expression() {
        assert_eq!(fts_match_expression(""), None);
        assert_eq!(fts_match_expression("a  b").as_deref(), Some("\"a\" \"b\""));
        assert_eq!(
            fts_match_expression("say \"hi\"").as_deref(),
            Some("\"say\" \"\"\"hi\"\"\"")
        );
    }
}
