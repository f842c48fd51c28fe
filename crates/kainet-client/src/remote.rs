use std::time::Duration;

use kainet_db::{migrations, queries};
use kainet_types::{Cursor, Message, RecordId};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::hrana::{PipelineRequest, PipelineResponse, StmtResult, Value};
use crate::store::MessageStore;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Hosted libSQL (Turso) database reached over HTTPS.
///
/// The same bearer token authorizes every request and, elsewhere, derives the
/// room key.
pub struct RemoteStore {
    client: reqwest::Client,
    pipeline_url: String,
    auth_token: String,
}

impl RemoteStore {
    /// `timeout` bounds every request end to end, so a stalled connection
    /// surfaces as [`StoreError::Http`] and the next poll retries.
    pub fn new(db_url: &str, auth_token: &str, timeout: Duration) -> Result<Self, StoreError> {
        let pipeline_url = pipeline_url(db_url)?;
        let client = reqwest::Client::builder()
            .connect_timeout(timeout.min(CONNECT_TIMEOUT))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            pipeline_url,
            auth_token: auth_token.to_owned(),
        })
    }

    pub fn pipeline_url(&self) -> &str {
        &self.pipeline_url
    }

    async fn execute(&self, sql: &str, args: Vec<Value>) -> Result<StmtResult, StoreError> {
        let response = self
            .client
            .post(&self.pipeline_url)
            .bearer_auth(&self.auth_token)
            .json(&PipelineRequest::single(sql, args))
            .send()
            .await?
            .error_for_status()?;

        let body: PipelineResponse = response.json().await?;
        body.into_execute_result()
    }

    async fn select_messages(&self, sql: &str, args: Vec<Value>) -> Result<Vec<Message>, StoreError> {
        let result = self.execute(sql, args).await?;
        result.rows.into_iter().map(decode_message).collect()
    }
}

/// Map a `libsql://` or `http(s)://` database URL to its pipeline endpoint.
pub fn pipeline_url(db_url: &str) -> Result<String, StoreError> {
    let db_url = db_url.trim().trim_end_matches('/');

    let base = if let Some(host) = db_url.strip_prefix("libsql://") {
        format!("https://{}", host)
    } else if db_url.starts_with("https://") || db_url.starts_with("http://") {
        db_url.to_string()
    } else {
        return Err(StoreError::InvalidUrl(db_url.to_string()));
    };

    Ok(format!("{}/v2/pipeline", base))
}

/// Columns in the order the message selects return them.
fn decode_message(row: Vec<Value>) -> Result<Message, StoreError> {
    let [id, room, author, envelope, timestamp]: [Value; 5] = row
        .try_into()
        .map_err(|row: Vec<Value>| StoreError::Protocol(format!("expected 5 columns, got {}", row.len())))?;

    Ok(Message {
        id: id.as_i64()?,
        room: room.into_text()?,
        author: author.into_text()?,
        envelope: envelope.into_text()?,
        timestamp: timestamp.as_i64()?,
    })
}

impl MessageStore for RemoteStore {
    async fn initialize(&self) -> Result<(), StoreError> {
        let table_exists = self.execute(migrations::TABLE_EXISTS, vec![]).await?.scalar_i64()? != 0;

        if table_exists {
            let has_room = self.execute(migrations::HAS_ROOM_COLUMN, vec![]).await?.scalar_i64()? != 0;
            if !has_room {
                info!("Migrating legacy messages table: adding room_name");
                self.execute(migrations::LEGACY_ROOM_COLUMN, vec![]).await?;
            }
        } else {
            self.execute(migrations::CREATE_MESSAGES, vec![]).await?;
        }

        self.execute(migrations::CREATE_ROOM_INDEX, vec![]).await?;
        info!("Remote schema ready");
        Ok(())
    }

    async fn append(
        &self,
        room: &str,
        author: &str,
        envelope: &str,
        timestamp: i64,
    ) -> Result<RecordId, StoreError> {
        let args = vec![
            Value::text(room),
            Value::text(author),
            Value::text(envelope),
            Value::integer(timestamp),
        ];
        let id = self.execute(queries::INSERT_MESSAGE, args).await?.inserted_id()?;
        debug!(id, "Appended message");
        Ok(id)
    }

    async fn query(&self, room: &str, since: Cursor) -> Result<Vec<Message>, StoreError> {
        self.select_messages(queries::SELECT_SINCE, vec![Value::text(room), Value::integer(since)])
            .await
    }

    async fn recent(&self, room: &str, limit: u32) -> Result<Vec<Message>, StoreError> {
        let mut rows = self
            .select_messages(
                queries::SELECT_RECENT,
                vec![Value::text(room), Value::integer(i64::from(limit))],
            )
            .await?;
        rows.reverse();
        Ok(rows)
    }

    async fn last_id(&self, room: &str) -> Result<RecordId, StoreError> {
        self.execute(queries::SELECT_LAST_ID, vec![Value::text(room)])
            .await?
            .scalar_i64()
    }

    async fn purge(&self, room: &str) -> Result<u64, StoreError> {
        let result = self.execute(queries::DELETE_ROOM, vec![Value::text(room)]).await?;
        Ok(result.affected_row_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn libsql_scheme_becomes_https() {
        assert_eq!(
            pipeline_url("libsql://chat-example.turso.io").unwrap(),
            "https://chat-example.turso.io/v2/pipeline"
        );
    }

    #[test]
    fn http_urls_are_kept_and_trailing_slash_dropped() {
        assert_eq!(
            pipeline_url("http://127.0.0.1:8080/").unwrap(),
            "http://127.0.0.1:8080/v2/pipeline"
        );
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        assert!(matches!(pipeline_url("ftp://x"), Err(StoreError::InvalidUrl(_))));
        assert!(matches!(pipeline_url("libsql://"), Err(StoreError::InvalidUrl(_))));
    }

    #[test]
    fn message_row_decodes_by_position() {
        let row = vec![
            Value::integer(9),
            Value::text("ops"),
            Value::text("alice"),
            Value::text("QUJD"),
            Value::integer(1_700_000_000),
        ];
        let message = decode_message(row).unwrap();
        assert_eq!(message.id, 9);
        assert_eq!(message.author, "alice");
        assert_eq!(message.timestamp, 1_700_000_000);
    }

    #[test]
    fn short_row_is_a_protocol_error() {
        let err = decode_message(vec![Value::integer(1)]).unwrap_err();
        assert!(matches!(err, StoreError::Protocol(_)));
    }
}
