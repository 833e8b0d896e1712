use std::collections::BTreeMap;
use std::fs;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConsoleError;

/// Bump when adding a migration step in [`migrate`].
const SCHEMA_VERSION: i64 = 1;

/// A cached catalog entry for one downloadable work on a site.
///
/// Rows are only ever created or deleted in bulk, one site at a time; the
/// local `id` is assigned by the database and carries no meaning beyond it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub id: Option<i64>,
    pub site: String,
    pub title: String,
    pub number: String,
    pub author: String,
    pub tags: Vec<String>,
    pub resource_id: String,
    /// Unix timestamp (seconds).
    pub time: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    ResourcesChanged,
    MetaChanged,
}

/// Persistent local metadata store backed by SQLite.
///
/// Holds the `resources` catalog cache and the flat `meta` key/value table.
/// Cloning shares the underlying connection; consumers that want
/// push-on-change reads call [`MetadataStore::subscribe`].
#[derive(Clone)]
pub struct MetadataStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    conn: Mutex<Connection>,
    subscribers: Mutex<Vec<Sender<StoreEvent>>>,
}

impl MetadataStore {
    /// Opens the store at the platform data directory
    /// (`<data_dir>/resource-console/catalog.db`).
    pub fn open_default() -> Result<Self, ConsoleError> {
        let path = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(
                    dirs.data_dir().join("resource-console").join("catalog.db"),
                )
                .ok()
            })
            .ok_or(ConsoleError::DataDir)?;
        Self::open(&path)
    }

    pub fn open(path: &Utf8Path) -> Result<Self, ConsoleError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| ConsoleError::Store(err.to_string()))?;
        }
        let conn = Connection::open(path.as_std_path())?;
        Self::from_connection(conn)
    }

    /// Private throwaway database, used by tests.
    pub fn open_in_memory() -> Result<Self, ConsoleError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, ConsoleError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrate(&conn)?;
        Ok(Self {
            inner: Arc::new(StoreInner {
                conn: Mutex::new(conn),
                subscribers: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Atomically replaces the catalog slice for `site`: deletes every row
    /// whose site matches, then inserts `rows`. Readers see either the old
    /// full set or the new one, never a mix; on any failure the transaction
    /// rolls back and prior data is untouched. Rows for other sites are
    /// never affected.
    pub fn replace_site_resources(
        &self,
        site: &str,
        rows: &[Resource],
    ) -> Result<(), ConsoleError> {
        {
            let mut conn = self.lock_conn()?;
            let tx = conn.transaction()?;
            // Tag index rows cascade with their resource rows.
            tx.execute("DELETE FROM resources WHERE site = ?1", params![site])?;
            {
                let mut insert = tx.prepare(
                    "INSERT INTO resources (site, title, number, author, tags, resource_id, time)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )?;
                let mut insert_tag =
                    tx.prepare("INSERT INTO resource_tags (resource_rowid, tag) VALUES (?1, ?2)")?;
                for row in rows {
                    let tags = collapse_tags(&row.tags);
                    let tags_json = serde_json::to_string(&tags)
                        .map_err(|err| ConsoleError::Store(err.to_string()))?;
                    insert.execute(params![
                        site,
                        row.title,
                        row.number,
                        row.author,
                        tags_json,
                        row.resource_id,
                        row.time,
                    ])?;
                    let rowid = tx.last_insert_rowid();
                    for tag in &tags {
                        insert_tag.execute(params![rowid, tag])?;
                    }
                }
            }
            tx.commit()?;
        }
        debug!(site, rows = rows.len(), "replaced site resources");
        self.notify(StoreEvent::ResourcesChanged);
        Ok(())
    }

    /// Full catalog across all sites, in insertion (id) order.
    pub fn all_resources(&self) -> Result<Vec<Resource>, ConsoleError> {
        self.query_resources("SELECT * FROM resources ORDER BY id", &[])
    }

    pub fn site_resources(&self, site: &str) -> Result<Vec<Resource>, ConsoleError> {
        self.query_resources("SELECT * FROM resources WHERE site = ?1 ORDER BY id", &[site])
    }

    /// Catalog entries carrying `tag`, through the multi-valued tag index.
    pub fn resources_with_tag(&self, tag: &str) -> Result<Vec<Resource>, ConsoleError> {
        self.query_resources(
            "SELECT r.* FROM resources r
             JOIN resource_tags t ON t.resource_rowid = r.id
             WHERE t.tag = ?1 ORDER BY r.id",
            &[tag],
        )
    }

    pub fn resource_count(&self) -> Result<i64, ConsoleError> {
        let conn = self.lock_conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM resources", [], |row| row.get(0))?;
        Ok(count)
    }

    /// The `meta` table as a key → value map.
    pub fn meta(&self) -> Result<BTreeMap<String, String>, ConsoleError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare("SELECT key, value FROM meta ORDER BY id")?;
        let entries = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<BTreeMap<_, _>, _>>()?;
        Ok(entries)
    }

    pub fn set_meta(&self, key: &str, value: &str) -> Result<(), ConsoleError> {
        {
            let conn = self.lock_conn()?;
            conn.execute(
                "INSERT INTO meta (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
        }
        self.notify(StoreEvent::MetaChanged);
        Ok(())
    }

    /// Registers a change listener. Events are delivered after commit; a
    /// receiver that has been dropped is silently forgotten.
    pub fn subscribe(&self) -> Receiver<StoreEvent> {
        let (tx, rx) = channel();
        if let Ok(mut subscribers) = self.inner.subscribers.lock() {
            subscribers.push(tx);
        }
        rx
    }

    fn notify(&self, event: StoreEvent) {
        if let Ok(mut subscribers) = self.inner.subscribers.lock() {
            subscribers.retain(|tx| tx.send(event).is_ok());
        }
    }

    fn query_resources(&self, sql: &str, args: &[&str]) -> Result<Vec<Resource>, ConsoleError> {
        let conn = self.lock_conn()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(args), row_to_resource)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter()
            .map(|(resource, tags_json)| {
                let tags = serde_json::from_str(&tags_json)
                    .map_err(|err| ConsoleError::Store(err.to_string()))?;
                Ok(Resource { tags, ..resource })
            })
            .collect()
    }

    fn lock_conn(&self) -> Result<std::sync::MutexGuard<'_, Connection>, ConsoleError> {
        self.inner
            .conn
            .lock()
            .map_err(|_| ConsoleError::Store("store lock poisoned".to_string()))
    }
}

fn row_to_resource(row: &Row<'_>) -> rusqlite::Result<(Resource, String)> {
    Ok((
        Resource {
            id: Some(row.get("id")?),
            site: row.get("site")?,
            title: row.get("title")?,
            number: row.get("number")?,
            author: row.get("author")?,
            tags: Vec::new(),
            resource_id: row.get("resource_id")?,
            time: row.get("time")?,
        },
        row.get("tags")?,
    ))
}

/// Tags are a set: duplicates collapse, first occurrence wins.
fn collapse_tags(tags: &[String]) -> Vec<String> {
    let mut seen = Vec::with_capacity(tags.len());
    for tag in tags {
        if !seen.contains(tag) {
            seen.push(tag.clone());
        }
    }
    seen
}

fn migrate(conn: &Connection) -> Result<(), ConsoleError> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version >= SCHEMA_VERSION {
        return Ok(());
    }
    if version < 1 {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS resources (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                site TEXT NOT NULL,
                title TEXT NOT NULL,
                number TEXT NOT NULL,
                author TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',
                resource_id TEXT NOT NULL,
                time INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_resources_site ON resources (site);
            CREATE INDEX IF NOT EXISTS idx_resources_title ON resources (title);
            CREATE INDEX IF NOT EXISTS idx_resources_number ON resources (number);
            CREATE INDEX IF NOT EXISTS idx_resources_author ON resources (author);
            CREATE TABLE IF NOT EXISTS resource_tags (
                resource_rowid INTEGER NOT NULL
                    REFERENCES resources (id) ON DELETE CASCADE,
                tag TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_resource_tags_tag ON resource_tags (tag);
            CREATE TABLE IF NOT EXISTS meta (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                key TEXT NOT NULL UNIQUE,
                value TEXT NOT NULL
            );",
        )?;
    }
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}
