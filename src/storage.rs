use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::sync::{Mutex, MutexGuard};

use crate::cache::http::Response;
use crate::cache::store::CacheStorage;
use crate::error::StorageError;

/// File-backed cache stores. Survive process restarts the way the
/// browser's cache storage survives page reloads.
pub struct SqliteCacheStorage {
    conn: Mutex<Connection>,
}

impl SqliteCacheStorage {
    pub fn new(path: &str) -> Result<Self, StorageError> {
        Ok(Self { conn: Mutex::new(Connection::open(path)?) })
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Ok(Self { conn: Mutex::new(Connection::open_in_memory()?) })
    }

    pub fn init(&self) -> Result<(), StorageError> {
        self.lock()?.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS stores (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE
            );
            CREATE TABLE IF NOT EXISTS entries (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                store TEXT NOT NULL,
                key TEXT NOT NULL,
                status INTEGER NOT NULL,
                status_text TEXT NOT NULL,
                headers TEXT NOT NULL,
                body BLOB NOT NULL,
                digest TEXT NOT NULL,
                UNIQUE (store, key)
            );
            COMMIT;",
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Backend("sqlite connection lock poisoned".to_string()))
    }
}

pub fn body_digest(body: &[u8]) -> String {
    hex::encode(Sha256::digest(body))
}

#[async_trait]
impl CacheStorage for SqliteCacheStorage {
    async fn store_names(&self) -> Result<Vec<String>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT name FROM stores ORDER BY id")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    async fn open(&self, store: &str) -> Result<(), StorageError> {
        self.lock()?
            .execute("INSERT OR IGNORE INTO stores (name) VALUES (?1)", params![store])?;
        Ok(())
    }

    async fn delete_store(&self, store: &str) -> Result<bool, StorageError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM entries WHERE store = ?1", params![store])?;
        let removed = tx.execute("DELETE FROM stores WHERE name = ?1", params![store])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    async fn get(&self, store: &str, key: &str) -> Result<Option<Response>, StorageError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT status, status_text, headers, body, digest FROM entries
                 WHERE store = ?1 AND key = ?2",
                params![store, key],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Vec<u8>>(3)?,
                        row.get::<_, String>(4)?,
                    ))
                },
            )
            .optional()?;

        let Some((status, status_text, headers, body, digest)) = row else {
            return Ok(None);
        };
        if body_digest(&body) != digest {
            return Err(StorageError::Corrupt(key.to_string()));
        }
        let headers: Vec<(String, String)> = serde_json::from_str(&headers)
            .map_err(|_| StorageError::Corrupt(key.to_string()))?;
        Ok(Some(Response {
            status: status as u16,
            status_text,
            headers,
            body,
        }))
    }

    async fn put(&self, store: &str, key: &str, response: Response) -> Result<(), StorageError> {
        let headers = serde_json::to_string(&response.headers)
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        let digest = body_digest(&response.body);

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("INSERT OR IGNORE INTO stores (name) VALUES (?1)", params![store])?;
        tx.execute(
            "DELETE FROM entries WHERE store = ?1 AND key = ?2",
            params![store, key],
        )?;
        tx.execute(
            "INSERT INTO entries (store, key, status, status_text, headers, body, digest)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                store,
                key,
                response.status as i64,
                response.status_text,
                headers,
                response.body,
                digest
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    async fn delete(&self, store: &str, key: &str) -> Result<bool, StorageError> {
        let removed = self.lock()?.execute(
            "DELETE FROM entries WHERE store = ?1 AND key = ?2",
            params![store, key],
        )?;
        Ok(removed > 0)
    }

    async fn keys(&self, store: &str) -> Result<Vec<String>, StorageError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT key FROM entries WHERE store = ?1 ORDER BY id")?;
        let keys = stmt
            .query_map(params![store], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> SqliteCacheStorage {
        let s = SqliteCacheStorage::in_memory().unwrap();
        s.init().unwrap();
        s
    }

    #[tokio::test]
    async fn roundtrips_headers_and_body() {
        let s = storage();
        let resp = Response::ok("text/csv", "Date,Time\n").with_header("cache-control", "max-age=300");
        s.put("data", "http://x/data.csv", resp.clone()).await.unwrap();
        assert_eq!(s.get("data", "http://x/data.csv").await.unwrap(), Some(resp));
        assert_eq!(s.store_names().await.unwrap(), vec!["data"]);
    }

    #[tokio::test]
    async fn overwrite_moves_key_to_newest() {
        let s = storage();
        for key in ["a", "b", "c"] {
            s.put("data", key, Response::ok("text/plain", key)).await.unwrap();
        }
        s.put("data", "a", Response::ok("text/plain", "again")).await.unwrap();
        assert_eq!(s.keys("data").await.unwrap(), vec!["b", "c", "a"]);
    }

    #[tokio::test]
    async fn tampered_body_is_reported_corrupt() {
        let s = storage();
        s.put("data", "k", Response::ok("text/plain", "good")).await.unwrap();
        s.lock()
            .unwrap()
            .execute("UPDATE entries SET body = ?1", params![b"evil".to_vec()])
            .unwrap();
        assert_eq!(s.get("data", "k").await, Err(StorageError::Corrupt("k".to_string())));
    }

    #[tokio::test]
    async fn delete_store_drops_its_entries() {
        let s = storage();
        s.put("old", "k", Response::ok("text/plain", "x")).await.unwrap();
        s.open("new").await.unwrap();
        assert!(s.delete_store("old").await.unwrap());
        assert_eq!(s.store_names().await.unwrap(), vec!["new"]);
        assert!(s.keys("old").await.unwrap().is_empty());
    }
}
