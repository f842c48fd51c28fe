//! Wire types for the libSQL "Hrana over HTTP" v2 pipeline endpoint.
//!
//! Only the subset the client needs: one `execute` followed by `close` per
//! request, with positional arguments.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

#[derive(Debug, Serialize)]
pub struct PipelineRequest<'a> {
    pub baton: Option<String>,
    pub requests: Vec<StreamRequest<'a>>,
}

impl<'a> PipelineRequest<'a> {
    /// A single statement on a fresh stream, closed afterwards.
    pub fn single(sql: &'a str, args: Vec<Value>) -> Self {
        Self {
            baton: None,
            requests: vec![
                StreamRequest::Execute {
                    stmt: Stmt {
                        sql,
                        args,
                        want_rows: true,
                    },
                },
                StreamRequest::Close,
            ],
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamRequest<'a> {
    Execute { stmt: Stmt<'a> },
    Close,
}

#[derive(Debug, Serialize)]
pub struct Stmt<'a> {
    pub sql: &'a str,
    pub args: Vec<Value>,
    pub want_rows: bool,
}

/// A SQL value. Integers travel as decimal strings so 64-bit ids survive JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Value {
    Null,
    Integer { value: String },
    Float { value: f64 },
    Text { value: String },
    Blob { base64: String },
}

impl Value {
    pub fn integer(v: i64) -> Self {
        Self::Integer { value: v.to_string() }
    }

    pub fn text(v: &str) -> Self {
        Self::Text { value: v.to_owned() }
    }

    pub fn as_i64(&self) -> Result<i64, StoreError> {
        match self {
            Self::Integer { value } => value
                .parse()
                .map_err(|_| StoreError::Protocol(format!("bad integer '{}'", value))),
            other => Err(StoreError::Protocol(format!("expected integer, got {:?}", other))),
        }
    }

    pub fn into_text(self) -> Result<String, StoreError> {
        match self {
            Self::Text { value } => Ok(value),
            other => Err(StoreError::Protocol(format!("expected text, got {:?}", other))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PipelineResponse {
    #[serde(default)]
    pub baton: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    pub results: Vec<StreamResult>,
}

impl PipelineResponse {
    /// The result of the first `execute`, or the error the service reported.
    pub fn into_execute_result(self) -> Result<StmtResult, StoreError> {
        let first = self
            .results
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Protocol("empty pipeline response".into()))?;

        match first {
            StreamResult::Ok {
                response: StreamResponse::Execute { result },
            } => Ok(result),
            StreamResult::Ok { response } => Err(StoreError::Protocol(format!(
                "expected execute response, got {:?}",
                response
            ))),
            StreamResult::Error { error } => Err(StoreError::Service(error.message)),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamResult {
    Ok { response: StreamResponse },
    Error { error: HranaError },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamResponse {
    Execute { result: StmtResult },
    Close,
}

#[derive(Debug, Deserialize)]
pub struct HranaError {
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StmtResult {
    #[serde(default)]
    pub cols: Vec<Col>,
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
    #[serde(default)]
    pub affected_row_count: u64,
    #[serde(default)]
    pub last_insert_rowid: Option<String>,
}

impl StmtResult {
    pub fn inserted_id(&self) -> Result<i64, StoreError> {
        self.last_insert_rowid
            .as_deref()
            .ok_or_else(|| StoreError::Protocol("insert returned no rowid".into()))?
            .parse()
            .map_err(|_| StoreError::Protocol("unparseable rowid".into()))
    }

    /// First column of the first row as an integer (`COUNT`, `MAX`, ...).
    pub fn scalar_i64(&self) -> Result<i64, StoreError> {
        self.rows
            .first()
            .and_then(|row| row.first())
            .ok_or_else(|| StoreError::Protocol("scalar query returned no rows".into()))?
            .as_i64()
    }
}

#[derive(Debug, Deserialize)]
pub struct Col {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub decltype: Option<String>,
}
