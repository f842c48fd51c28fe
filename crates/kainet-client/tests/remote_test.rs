//! Integration tests for the hosted-database store, run against a local
//! `/v2/pipeline` endpoint that executes statements on an in-memory SQLite
//! database the way the libSQL service does.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;
use rusqlite::types::Value as SqlValue;
use serde_json::{Value as Json, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use kainet_client::{MessageStore, RemoteStore, StoreError};

const TOKEN: &str = "s3cr3t";
const TIMEOUT: Duration = Duration::from_secs(5);

const LEGACY_TABLE: &str = "
    CREATE TABLE messages (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        username    TEXT NOT NULL,
        message     TEXT NOT NULL,
        timestamp   INTEGER NOT NULL
    );
    INSERT INTO messages (username, message, timestamp) VALUES ('carol', 'T0xE', 1);
";

async fn spawn_libsql(conn: Connection) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let conn = Arc::new(Mutex::new(conn));

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(serve(socket, conn.clone()));
        }
    });

    format!("http://{}", addr)
}

async fn serve(mut socket: TcpStream, conn: Arc<Mutex<Connection>>) {
    let mut buf = Vec::new();
    while let Some((head, body)) = read_request(&mut socket, &mut buf).await {
        let authorized = head
            .to_ascii_lowercase()
            .contains(&format!("authorization: bearer {}", TOKEN));

        let (status, reply) = if authorized {
            let request: Json = serde_json::from_slice(&body).unwrap();
            let reply = pipeline(&conn.lock().unwrap(), &request);
            ("200 OK", reply)
        } else {
            ("401 Unauthorized", json!({ "error": "unauthorized" }))
        };

        let reply = reply.to_string();
        let response = format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            status,
            reply.len(),
            reply
        );
        if socket.write_all(response.as_bytes()).await.is_err() {
            return;
        }
    }
}

/// One HTTP/1.1 request: head and body. `None` once the client hangs up.
async fn read_request(socket: &mut TcpStream, buf: &mut Vec<u8>) -> Option<(String, Vec<u8>)> {
    let mut chunk = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).into_owned();
    let len = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + len {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body = buf[head_end..head_end + len].to_vec();
    buf.drain(..head_end + len);
    Some((head, body))
}

fn pipeline(conn: &Connection, request: &Json) -> Json {
    let results: Vec<Json> = request["requests"]
        .as_array()
        .into_iter()
        .flatten()
        .map(|req| match req["type"].as_str() {
            Some("execute") => match execute(conn, &req["stmt"]) {
                Ok(result) => json!({ "type": "ok", "response": { "type": "execute", "result": result } }),
                Err(e) => json!({ "type": "error", "error": { "message": e.to_string(), "code": "SQLITE_ERROR" } }),
            },
            _ => json!({ "type": "ok", "response": { "type": "close" } }),
        })
        .collect();

    json!({ "baton": null, "base_url": null, "results": results })
}

fn execute(conn: &Connection, stmt: &Json) -> rusqlite::Result<Json> {
    let sql = stmt["sql"].as_str().unwrap_or_default();
    let args: Vec<SqlValue> = stmt["args"]
        .as_array()
        .into_iter()
        .flatten()
        .map(to_sql)
        .collect();

    let mut prepared = conn.prepare(sql)?;
    let cols: Vec<Json> = prepared
        .column_names()
        .into_iter()
        .map(|name| json!({ "name": name }))
        .collect();

    if cols.is_empty() {
        let affected = prepared.execute(rusqlite::params_from_iter(args))?;
        return Ok(json!({
            "cols": [],
            "rows": [],
            "affected_row_count": affected,
            "last_insert_rowid": conn.last_insert_rowid().to_string(),
        }));
    }

    let width = cols.len();
    let mut rows = Vec::new();
    let mut cursor = prepared.query(rusqlite::params_from_iter(args))?;
    while let Some(row) = cursor.next()? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(from_sql(row.get::<_, SqlValue>(i)?));
        }
        rows.push(Json::Array(values));
    }

    Ok(json!({ "cols": cols, "rows": rows, "affected_row_count": 0, "last_insert_rowid": null }))
}

fn to_sql(value: &Json) -> SqlValue {
    match value["type"].as_str() {
        Some("integer") => SqlValue::Integer(
            value["value"].as_str().and_then(|v| v.parse().ok()).unwrap_or_default(),
        ),
        Some("float") => SqlValue::Real(value["value"].as_f64().unwrap_or_default()),
        Some("text") => SqlValue::Text(value["value"].as_str().unwrap_or_default().to_owned()),
        _ => SqlValue::Null,
    }
}

fn from_sql(value: SqlValue) -> Json {
    match value {
        SqlValue::Integer(v) => json!({ "type": "integer", "value": v.to_string() }),
        SqlValue::Real(v) => json!({ "type": "float", "value": v }),
        SqlValue::Text(v) => json!({ "type": "text", "value": v }),
        SqlValue::Null | SqlValue::Blob(_) => json!({ "type": "null" }),
    }
}

#[tokio::test]
async fn initialize_upgrades_legacy_table_then_round_trips() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(LEGACY_TABLE).unwrap();
    let url = spawn_libsql(conn).await;

    let store = RemoteStore::new(&url, TOKEN, TIMEOUT).unwrap();
    store.initialize().await.unwrap();
    // Second run finds the column and index already there
    store.initialize().await.unwrap();

    let legacy = store.query("default", 0).await.unwrap();
    assert_eq!(legacy.len(), 1);
    assert_eq!(legacy[0].author, "carol");

    let first = store.append("ops", "alice", "QUJD", 1_700_000_000).await.unwrap();
    let second = store.append("ops", "bob", "REVG", 1_700_000_001).await.unwrap();
    assert_eq!((first, second), (2, 3));

    let since = store.query("ops", first).await.unwrap();
    assert_eq!(since.len(), 1);
    assert_eq!(since[0].id, 3);
    assert_eq!(since[0].room, "ops");
    assert_eq!(since[0].envelope, "REVG");
    assert_eq!(since[0].timestamp, 1_700_000_001);

    let recent: Vec<i64> = store.recent("ops", 20).await.unwrap().iter().map(|m| m.id).collect();
    assert_eq!(recent, vec![2, 3]);
    assert_eq!(store.last_id("ops").await.unwrap(), 3);

    assert_eq!(store.purge("ops").await.unwrap(), 2);
    assert_eq!(store.last_id("ops").await.unwrap(), 0);
    assert_eq!(store.query("default", 0).await.unwrap().len(), 1);
}

#[tokio::test]
async fn initialize_creates_missing_table() {
    let url = spawn_libsql(Connection::open_in_memory().unwrap()).await;
    let store = RemoteStore::new(&url, TOKEN, TIMEOUT).unwrap();

    store.initialize().await.unwrap();
    assert_eq!(store.last_id("ops").await.unwrap(), 0);
    assert_eq!(store.append("ops", "alice", "QUJD", 1).await.unwrap(), 1);
}

#[tokio::test]
async fn statement_error_is_a_service_error() {
    let url = spawn_libsql(Connection::open_in_memory().unwrap()).await;
    let store = RemoteStore::new(&url, TOKEN, TIMEOUT).unwrap();

    match store.query("ops", 0).await {
        Err(StoreError::Service(message)) => assert!(message.contains("no such table")),
        other => panic!("expected service error, got {:?}", other),
    }
}

#[tokio::test]
async fn rejected_token_is_an_http_error() {
    let url = spawn_libsql(Connection::open_in_memory().unwrap()).await;
    let store = RemoteStore::new(&url, "wrong", TIMEOUT).unwrap();

    match store.last_id("ops").await {
        Err(StoreError::Http(e)) => assert_eq!(e.status(), Some(reqwest::StatusCode::UNAUTHORIZED)),
        other => panic!("expected http error, got {:?}", other),
    }
}

#[tokio::test]
async fn unanswered_request_times_out() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let store = RemoteStore::new(&url, TOKEN, Duration::from_millis(200)).unwrap();
    let result = tokio::time::timeout(Duration::from_secs(3), store.last_id("ops")).await;

    match result {
        Ok(Err(StoreError::Http(e))) => assert!(e.is_timeout()),
        other => panic!("expected request timeout, got {:?}", other),
    }
}
