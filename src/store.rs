use std::path::Path;

use rusqlite::{params, types::ValueRef, Connection};

use crate::error::{Error, Result};
use crate::hash::{ContentHash, HASH_LEN};

/// one captured path: file contents by hash, or a symlink by target text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    File(ContentHash),
    Symlink(String),
}

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS files (
    name          TEXT PRIMARY KEY,
    content_hash  BLOB,
    symlink_path  TEXT
);
CREATE TABLE IF NOT EXISTS contents (
    content_hash  BLOB PRIMARY KEY,
    bytes         BLOB NOT NULL
);
";

/// transactional two-table façade over the package's embedded database
///
/// names and hashes are treated as opaque byte strings. the store is
/// exclusively owned by one package and is not meant for concurrent use.
pub struct Store {
    conn: Connection,
}

impl Store {
    /// open the database at `path`, creating it and the schema when absent
    pub fn open(path: &Path) -> Result<Store> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Store { conn })
    }

    /// upsert a file row and its compressed contents in one transaction
    ///
    /// re-registering a name replaces its hash. the previous blob stays in
    /// the contents table; nothing garbage-collects it.
    pub fn register_file(&self, name: &str, hash: &ContentHash, frame: &[u8]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.prepare_cached(
            "INSERT OR REPLACE INTO files (name, content_hash, symlink_path) VALUES (?1, ?2, NULL)",
        )?
        .execute(params![name, &hash.as_bytes()[..]])?;
        tx.prepare_cached("INSERT OR REPLACE INTO contents (content_hash, bytes) VALUES (?1, ?2)")?
            .execute(params![&hash.as_bytes()[..], frame])?;
        tx.commit()?;
        Ok(())
    }

    /// upsert a symlink row
    pub fn register_symlink(&self, name: &str, target: &str) -> Result<()> {
        self.conn
            .prepare_cached(
                "INSERT OR REPLACE INTO files (name, content_hash, symlink_path) VALUES (?1, NULL, ?2)",
            )?
            .execute(params![name, target])?;
        Ok(())
    }

    /// every registered entry
    ///
    /// a row with both or neither of its content columns populated is a
    /// corruption and fails the whole listing, as does a content hash of
    /// the wrong width.
    pub fn entries(&self) -> Result<Vec<(String, Entry)>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT name, content_hash, symlink_path FROM files")?;
        let mut rows = stmt.query([])?;

        let mut results = Vec::new();
        while let Some(row) = rows.next()? {
            let name: String = row.get(0)?;
            let hash: Option<Vec<u8>> = row.get(1)?;
            let target: Option<String> = row.get(2)?;

            let hash = hash.filter(|h| !h.is_empty());
            let target = target.filter(|t| !t.is_empty());
            let entry = match (hash, target) {
                (Some(_), Some(_)) => return Err(Error::AmbiguousEntry(name)),
                (None, None) => return Err(Error::EmptyEntry(name)),
                (Some(hash), None) => {
                    let width = hash.len();
                    let Ok(bytes) = <[u8; HASH_LEN]>::try_from(hash) else {
                        return Err(Error::BadHashWidth { name, width });
                    };
                    Entry::File(ContentHash::from_bytes(bytes))
                }
                (None, Some(target)) => Entry::Symlink(target),
            };
            results.push((name, entry));
        }
        Ok(results)
    }

    /// look up the compressed bytes for `hash` and hand them to `sink`
    ///
    /// the slice borrows the row and is only valid for the duration of the
    /// callback.
    pub fn read_blob<T>(
        &self,
        hash: &ContentHash,
        sink: impl FnOnce(&[u8]) -> Result<T>,
    ) -> Result<T> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT bytes FROM contents WHERE content_hash = ?1")?;
        let mut rows = stmt.query(params![&hash.as_bytes()[..]])?;
        let Some(row) = rows.next()? else {
            return Err(Error::BlobMissing(*hash));
        };
        match row.get_ref(0)? {
            ValueRef::Blob(bytes) => sink(bytes),
            _ => Err(Error::CorruptBlob(*hash)),
        }
    }
}
