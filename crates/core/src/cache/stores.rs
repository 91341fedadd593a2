//! Named response stores.
//!
//! A store is a named key-value map from normalized requests to captured
//! responses. Stores are created on first open, enumerated in creation order,
//! and deleted as a unit.

use super::connection::CacheDb;
use super::hash::compute_request_key;
use crate::Error;
use crate::http::{Headers, Request, Response, ResponseType};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, OptionalExtension};
use url::Url;

/// A stored entry as listed by inspection tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEntry {
    pub cache_name: String,
    pub method: String,
    pub url: String,
    pub vary: Vec<String>,
    pub response: Response,
    pub stored_at: String,
}

/// Row shape shared by the match queries.
struct EntryRow {
    vary_json: String,
    request_headers_json: String,
    status: u16,
    status_text: String,
    headers_json: String,
    body: Vec<u8>,
    response_url: Option<String>,
    response_type: String,
}

const ENTRY_COLUMNS: &str =
    "vary_json, request_headers_json, status, status_text, headers_json, body, response_url, response_type";

impl EntryRow {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            vary_json: row.get(0)?,
            request_headers_json: row.get(1)?,
            status: row.get(2)?,
            status_text: row.get(3)?,
            headers_json: row.get(4)?,
            body: row.get(5)?,
            response_url: row.get(6)?,
            response_type: row.get(7)?,
        })
    }

    /// Apply the `Vary` rule: every varied header must carry the same value
    /// on the incoming request as on the request that was stored. `*` never
    /// matches.
    fn matches(&self, request_headers: &Headers) -> Result<bool, Error> {
        let vary: Vec<String> = serde_json::from_str(&self.vary_json)?;
        if vary.iter().any(|h| h == "*") {
            return Ok(false);
        }
        let stored: Headers = serde_json::from_str(&self.request_headers_json)?;
        Ok(vary.iter().all(|h| stored.get(h) == request_headers.get(h)))
    }

    fn into_response(self) -> Result<Response, Error> {
        let response_type = ResponseType::parse(&self.response_type)
            .ok_or_else(|| Error::CorruptEntry(format!("unknown response type {}", self.response_type)))?;
        let url = self
            .response_url
            .map(|u| Url::parse(&u))
            .transpose()
            .map_err(|e| Error::CorruptEntry(e.to_string()))?;

        Ok(Response {
            status: self.status,
            status_text: self.status_text,
            headers: serde_json::from_str(&self.headers_json)?,
            body: Bytes::from(self.body),
            url,
            response_type,
        })
    }
}

/// Serialized form of one `put`, prepared outside the database thread.
struct PendingPut {
    request_key: String,
    method: String,
    url: String,
    vary_json: String,
    request_headers_json: String,
    response: Response,
}

impl PendingPut {
    fn prepare(request: &Request, response: &Response) -> Result<Self, Error> {
        if !request.is_retrieval() {
            return Err(Error::InvalidInput(format!("cannot store a {} request", request.method)));
        }

        let vary = response.vary();
        let varied: Headers = vary
            .iter()
            .filter_map(|h| request.headers.get(h).map(|v| (h.clone(), v.clone())))
            .collect();

        Ok(Self {
            request_key: compute_request_key(&request.method, request.url.as_str()),
            method: request.method.clone(),
            url: request.url.to_string(),
            vary_json: serde_json::to_string(&vary)?,
            request_headers_json: serde_json::to_string(&varied)?,
            response: response.clone(),
        })
    }

    fn write(&self, conn: &rusqlite::Connection, cache_name: &str, stored_at: &str) -> Result<(), Error> {
        let headers_json = serde_json::to_string(&self.response.headers)?;
        conn.execute(
            "INSERT INTO entries (
                cache_name, request_key, method, url, vary_json, request_headers_json,
                status, status_text, headers_json, body, response_url, response_type, stored_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ON CONFLICT(cache_name, request_key) DO UPDATE SET
                method = excluded.method,
                url = excluded.url,
                vary_json = excluded.vary_json,
                request_headers_json = excluded.request_headers_json,
                status = excluded.status,
                status_text = excluded.status_text,
                headers_json = excluded.headers_json,
                body = excluded.body,
                response_url = excluded.response_url,
                response_type = excluded.response_type,
                stored_at = excluded.stored_at",
            params![
                cache_name,
                &self.request_key,
                &self.method,
                &self.url,
                &self.vary_json,
                &self.request_headers_json,
                self.response.status,
                &self.response.status_text,
                headers_json,
                self.response.body.as_ref(),
                self.response.url.as_ref().map(Url::as_str),
                self.response.response_type.as_str(),
                stored_at,
            ],
        )?;
        Ok(())
    }
}

fn ensure_store(conn: &rusqlite::Connection, name: &str) -> Result<(), Error> {
    conn.execute(
        "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
        params![name, chrono::Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn match_in(
    conn: &rusqlite::Connection, cache_name: &str, request_key: &str, headers: &Headers,
) -> Result<Option<Response>, Error> {
    let row = conn
        .query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE cache_name = ?1 AND request_key = ?2"),
            params![cache_name, request_key],
            EntryRow::from_row,
        )
        .optional()?;

    let Some(row) = row else {
        return Ok(None);
    };
    if !row.matches(headers)? {
        return Ok(None);
    }
    row.into_response().map(Some)
}

impl CacheDb {
    /// Open a store, creating it if absent.
    pub async fn open_store(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| ensure_store(conn, &name))
            .await
            .map_err(Error::from)
    }

    /// Whether a store with this name exists.
    pub async fn has_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool =
                    conn.query_row("SELECT EXISTS(SELECT 1 FROM caches WHERE name = ?1)", params![name], |row| {
                        row.get(0)
                    })?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// All store names in creation order.
    pub async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY rowid")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a store and every entry in it.
    ///
    /// Returns false if no such store existed.
    pub async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute("DELETE FROM caches WHERE name = ?1", params![name])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Store a response for a request, replacing any previous entry.
    ///
    /// The store is opened implicitly.
    pub async fn put(&self, cache_name: &str, request: &Request, response: &Response) -> Result<(), Error> {
        let pending = PendingPut::prepare(request, response)?;
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let stored_at = chrono::Utc::now().to_rfc3339();
                ensure_store(conn, &cache_name)?;
                pending.write(conn, &cache_name, &stored_at)
            })
            .await
            .map_err(Error::from)
    }

    /// Store every pair in one transaction: all entries land or none do.
    pub async fn put_all(&self, cache_name: &str, pairs: &[(Request, Response)]) -> Result<(), Error> {
        let pending = pairs
            .iter()
            .map(|(req, resp)| PendingPut::prepare(req, resp))
            .collect::<Result<Vec<_>, _>>()?;
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                let stored_at = chrono::Utc::now().to_rfc3339();
                let tx = conn.transaction()?;
                ensure_store(&tx, &cache_name)?;
                for put in &pending {
                    put.write(&tx, &cache_name, &stored_at)?;
                }
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up a request in one store.
    pub async fn match_request(&self, cache_name: &str, request: &Request) -> Result<Option<Response>, Error> {
        let cache_name = cache_name.to_string();
        let key = compute_request_key(&request.method, request.url.as_str());
        let headers = request.headers.clone();
        self.conn
            .call(move |conn| match_in(conn, &cache_name, &key, &headers))
            .await
            .map_err(Error::from)
    }

    /// Look up a request across every store in creation order.
    pub async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        let key = compute_request_key(&request.method, request.url.as_str());
        let headers = request.headers.clone();
        self.conn
            .call(move |conn| -> Result<Option<Response>, Error> {
                let names = {
                    let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY rowid")?;
                    stmt.query_map([], |row| row.get::<_, String>(0))?
                        .collect::<Result<Vec<_>, _>>()?
                };
                for name in names {
                    if let Some(response) = match_in(conn, &name, &key, &headers)? {
                        return Ok(Some(response));
                    }
                }
                Ok(None)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in a store.
    pub async fn entry_count(&self, cache_name: &str) -> Result<u64, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM entries WHERE cache_name = ?1", params![cache_name], |row| {
                        row.get(0)
                    })?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// URLs stored in a store, oldest first.
    pub async fn keys(&self, cache_name: &str) -> Result<Vec<String>, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT url FROM entries WHERE cache_name = ?1 ORDER BY rowid")?;
                let urls = stmt
                    .query_map(params![cache_name], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(urls)
            })
            .await
            .map_err(Error::from)
    }

    /// Fetch the entry stored for a URL, ignoring `Vary`.
    pub async fn get_entry(&self, cache_name: &str, url: &str) -> Result<Option<StoredEntry>, Error> {
        let cache_name = cache_name.to_string();
        let key = compute_request_key("GET", url);
        self.conn
            .call(move |conn| -> Result<Option<StoredEntry>, Error> {
                let row = conn
                    .query_row(
                        &format!(
                            "SELECT {ENTRY_COLUMNS}, method, url, stored_at FROM entries
                             WHERE cache_name = ?1 AND request_key = ?2"
                        ),
                        params![cache_name, key],
                        |row| {
                            Ok((
                                EntryRow::from_row(row)?,
                                row.get::<_, String>(8)?,
                                row.get::<_, String>(9)?,
                                row.get::<_, String>(10)?,
                            ))
                        },
                    )
                    .optional()?;

                let Some((entry, method, url, stored_at)) = row else {
                    return Ok(None);
                };
                let vary = serde_json::from_str(&entry.vary_json)?;
                Ok(Some(StoredEntry { cache_name, method, url, vary, response: entry.into_response()?, stored_at }))
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(url: &str) -> Request {
        Request::parse_get(url).unwrap()
    }

    #[tokio::test]
    async fn test_open_store_is_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("app-static-v1").await.unwrap();
        db.open_store("app-static-v1").await.unwrap();

        assert!(db.has_store("app-static-v1").await.unwrap());
        assert_eq!(db.store_names().await.unwrap(), vec!["app-static-v1".to_string()]);
    }

    #[tokio::test]
    async fn test_store_names_in_creation_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for name in ["b-static-v1", "a-dynamic-v1", "c-static-v2"] {
            db.open_store(name).await.unwrap();
        }
        assert_eq!(db.store_names().await.unwrap(), vec!["b-static-v1", "a-dynamic-v1", "c-static-v2"]);
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = get("https://example.com/api/courses");
        let resp = Response::new(200, "[1,2,3]").with_header("content-type", "application/json");

        db.put("app-dynamic-v1", &req, &resp).await.unwrap();

        let found = db.match_request("app-dynamic-v1", &req).await.unwrap().unwrap();
        assert_eq!(found, resp);
        assert!(db.match_request("app-static-v1", &req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_last_write_wins() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = get("https://example.com/feed");

        db.put("dyn", &req, &Response::new(200, "first")).await.unwrap();
        db.put("dyn", &req, &Response::new(200, "second")).await.unwrap();

        let found = db.match_request("dyn", &req).await.unwrap().unwrap();
        assert_eq!(found.body.as_ref(), b"second");
        assert_eq!(db.entry_count("dyn").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_put_rejects_non_get() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = Request::new("POST", Url::parse("https://example.com/submit").unwrap());
        let result = db.put("dyn", &req, &Response::new(200, "")).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_vary_header_must_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = get("https://example.com/page").with_header("Accept-Language", "en");
        let resp = Response::new(200, "hello").with_header("Vary", "Accept-Language");
        db.put("dyn", &req, &resp).await.unwrap();

        assert!(db.match_request("dyn", &req).await.unwrap().is_some());

        let other = get("https://example.com/page").with_header("Accept-Language", "sw");
        assert!(db.match_request("dyn", &other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_vary_star_never_matches() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = get("https://example.com/page");
        db.put("dyn", &req, &Response::new(200, "x").with_header("Vary", "*")).await.unwrap();
        assert!(db.match_request("dyn", &req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_store_cascades() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = get("https://example.com/a");
        db.put("old-static-v1", &req, &Response::new(200, "a")).await.unwrap();

        assert!(db.delete_store("old-static-v1").await.unwrap());
        assert!(!db.delete_store("old-static-v1").await.unwrap());
        assert!(!db.has_store("old-static-v1").await.unwrap());
        assert_eq!(db.entry_count("old-static-v1").await.unwrap(), 0);
        assert!(db.match_any(&req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_all_writes_every_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let pairs = vec![
            (get("https://example.com/"), Response::new(200, "<html>")),
            (get("https://example.com/static/js/main.js"), Response::new(200, "js")),
        ];
        db.put_all("app-static-v1", &pairs).await.unwrap();

        assert_eq!(db.entry_count("app-static-v1").await.unwrap(), 2);
        assert_eq!(
            db.keys("app-static-v1").await.unwrap(),
            vec!["https://example.com/", "https://example.com/static/js/main.js"]
        );
    }

    #[tokio::test]
    async fn test_put_all_rejects_whole_batch() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let pairs = vec![
            (get("https://example.com/"), Response::new(200, "<html>")),
            (Request::new("PUT", Url::parse("https://example.com/x").unwrap()), Response::new(200, "")),
        ];
        assert!(db.put_all("app-static-v1", &pairs).await.is_err());
        assert_eq!(db.entry_count("app-static-v1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_match_any_searches_in_creation_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = get("https://example.com/");
        db.put("first", &req, &Response::new(200, "one")).await.unwrap();
        db.put("second", &req, &Response::new(200, "two")).await.unwrap();

        let found = db.match_any(&req).await.unwrap().unwrap();
        assert_eq!(found.body.as_ref(), b"one");
    }

    #[tokio::test]
    async fn test_get_entry() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let req = get("https://example.com/static/css/custom.css");
        db.put("app-static-v1", &req, &Response::new(200, "body{}")).await.unwrap();

        let entry = db
            .get_entry("app-static-v1", "https://example.com/static/css/custom.css")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.method, "GET");
        assert_eq!(entry.response.body.as_ref(), b"body{}");
        assert!(db.get_entry("app-static-v1", "https://example.com/nope").await.unwrap().is_none());
    }
}
