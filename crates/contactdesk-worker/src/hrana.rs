//! Wire format of libSQL's Hrana-over-HTTP pipeline protocol and its mapping onto
//! sea-orm values.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use sea_orm::{DbErr, RuntimeErr, Statement, Value};
use serde::{Deserialize, Serialize};

pub const PIPELINE_PATH: &str = "/v2/pipeline";

/// A single SQL value. Integers travel as strings so 64-bit values survive JSON.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HranaValue {
    Null,
    Integer { value: String },
    Float { value: f64 },
    Text { value: String },
    Blob { base64: String },
}

#[derive(Debug, Serialize)]
pub struct Stmt {
    pub sql: String,
    pub args: Vec<HranaValue>,
    pub want_rows: bool,
}

impl Stmt {
    pub fn control(sql: String) -> Self {
        Self {
            sql,
            args: Vec::new(),
            want_rows: false,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamRequest {
    Execute { stmt: Stmt },
    Close,
}

/// Body of `POST /v2/pipeline`. `baton` continues a stream left open by the previous call.
#[derive(Debug, Serialize)]
pub struct PipelineRequest {
    pub baton: Option<String>,
    pub requests: Vec<StreamRequest>,
}

#[derive(Debug, Deserialize)]
pub struct PipelineResponse {
    pub baton: Option<String>,
    pub base_url: Option<String>,
    pub results: Vec<StreamResult>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamResult {
    Ok { response: StreamResponse },
    Error { error: HranaError },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamResponse {
    Execute { result: ExecuteResult },
    Close {},
}

#[derive(Debug, Deserialize)]
pub struct HranaError {
    pub message: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExecuteResult {
    #[serde(default)]
    pub cols: Vec<Col>,
    #[serde(default)]
    pub rows: Vec<Vec<HranaValue>>,
    #[serde(default)]
    pub affected_row_count: u64,
    pub last_insert_rowid: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Col {
    pub name: Option<String>,
    pub decltype: Option<String>,
}

/// Rust-side shape of a result column, read from its declared SQLite type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Int,
    BigInt,
    Bool,
    Float,
    Text,
    Blob,
    Untyped,
}

impl ColumnKind {
    pub fn from_decltype(decltype: Option<&str>) -> Self {
        let Some(decltype) = decltype else {
            return Self::Untyped;
        };
        let t = decltype.to_ascii_lowercase();
        if t.starts_with("bool") {
            Self::Bool
        } else if t.starts_with("bigint") || t == "int8" {
            Self::BigInt
        } else if t.contains("int") {
            Self::Int
        } else if t.contains("char") || t.contains("text") || t.contains("clob") {
            Self::Text
        } else if t.contains("real") || t.contains("floa") || t.contains("doub") {
            Self::Float
        } else if t.contains("blob") || t.contains("binary") {
            Self::Blob
        } else {
            Self::Untyped
        }
    }

    pub fn null(self) -> Value {
        match self {
            Self::Int => Value::Int(None),
            Self::BigInt => Value::BigInt(None),
            Self::Bool => Value::Bool(None),
            Self::Float => Value::Double(None),
            Self::Blob => Value::Bytes(None),
            Self::Text | Self::Untyped => Value::String(None),
        }
    }
}

pub fn query_err(message: impl Into<String>) -> DbErr {
    DbErr::Query(RuntimeErr::Internal(message.into()))
}

pub fn conn_err(message: impl Into<String>) -> DbErr {
    DbErr::Conn(RuntimeErr::Internal(message.into()))
}

fn integer(n: impl ToString) -> HranaValue {
    HranaValue::Integer { value: n.to_string() }
}

pub fn to_arg(value: Value) -> Result<HranaValue, DbErr> {
    let arg = match value {
        Value::Bool(v) => v.map(|b| integer(i64::from(b))),
        Value::TinyInt(v) => v.map(integer),
        Value::SmallInt(v) => v.map(integer),
        Value::Int(v) => v.map(integer),
        Value::BigInt(v) => v.map(integer),
        Value::TinyUnsigned(v) => v.map(integer),
        Value::SmallUnsigned(v) => v.map(integer),
        Value::Unsigned(v) => v.map(integer),
        Value::BigUnsigned(v) => v.map(integer),
        Value::Float(v) => v.map(|n| HranaValue::Float { value: f64::from(n) }),
        Value::Double(v) => v.map(|n| HranaValue::Float { value: n }),
        Value::String(v) => v.map(|s| HranaValue::Text { value: *s }),
        Value::Char(v) => v.map(|c| HranaValue::Text { value: c.to_string() }),
        Value::Bytes(v) => v.map(|b| HranaValue::Blob { base64: STANDARD.encode(*b) }),
        Value::Json(v) => v.map(|j| HranaValue::Text { value: j.to_string() }),
        other => return Err(query_err(format!("unsupported libSQL argument: {other:?}"))),
    };
    Ok(arg.unwrap_or(HranaValue::Null))
}

pub fn from_hrana(kind: ColumnKind, value: HranaValue) -> Result<Value, DbErr> {
    Ok(match value {
        HranaValue::Null => kind.null(),
        HranaValue::Integer { value } => {
            let n: i64 = value
                .parse()
                .map_err(|_| query_err(format!("malformed integer {value:?}")))?;
            match kind {
                ColumnKind::Bool => Value::Bool(Some(n != 0)),
                ColumnKind::BigInt => Value::BigInt(Some(n)),
                ColumnKind::Float => Value::Double(Some(n as f64)),
                ColumnKind::Text => Value::String(Some(Box::new(value))),
                // Aggregates such as COUNT(*) carry no declared type and are read as i32.
                ColumnKind::Int | ColumnKind::Untyped | ColumnKind::Blob => match i32::try_from(n) {
                    Ok(small) => Value::Int(Some(small)),
                    Err(_) => Value::BigInt(Some(n)),
                },
            }
        }
        HranaValue::Float { value } => Value::Double(Some(value)),
        HranaValue::Text { value } => Value::String(Some(Box::new(value))),
        HranaValue::Blob { base64 } => {
            let bytes = STANDARD
                .decode(base64.as_bytes())
                .map_err(|e| query_err(format!("malformed blob: {e}")))?;
            Value::Bytes(Some(Box::new(bytes)))
        }
    })
}

/// Positional `?` arguments, as sea-query renders them for SQLite.
pub fn to_stmt(stmt: Statement, want_rows: bool) -> Result<Stmt, DbErr> {
    let args = stmt
        .values
        .map(|values| values.0.into_iter().map(to_arg).collect::<Result<Vec<_>, _>>())
        .transpose()?
        .unwrap_or_default();
    Ok(Stmt {
        sql: stmt.sql,
        args,
        want_rows,
    })
}

/// `libsql://` and `wss://` database URLs are served over HTTPS as well.
pub fn http_base(url: &str) -> String {
    let url = url.trim_end_matches('/');
    for scheme in ["libsql://", "wss://"] {
        if let Some(rest) = url.strip_prefix(scheme) {
            return format!("https://{rest}");
        }
    }
    if let Some(rest) = url.strip_prefix("ws://") {
        return format!("http://{rest}");
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_types_pick_the_rust_shape() {
        assert_eq!(ColumnKind::from_decltype(Some("bigint")), ColumnKind::BigInt);
        assert_eq!(ColumnKind::from_decltype(Some("INTEGER")), ColumnKind::Int);
        assert_eq!(ColumnKind::from_decltype(Some("boolean")), ColumnKind::Bool);
        assert_eq!(ColumnKind::from_decltype(Some("varchar")), ColumnKind::Text);
        assert_eq!(ColumnKind::from_decltype(None), ColumnKind::Untyped);
    }

    #[test]
    fn integers_follow_the_column_kind() {
        let one = || HranaValue::Integer { value: "1".to_string() };
        assert_eq!(from_hrana(ColumnKind::Bool, one()).unwrap(), Value::Bool(Some(true)));
        assert_eq!(from_hrana(ColumnKind::BigInt, one()).unwrap(), Value::BigInt(Some(1)));
        assert_eq!(from_hrana(ColumnKind::Untyped, one()).unwrap(), Value::Int(Some(1)));
        assert_eq!(from_hrana(ColumnKind::BigInt, HranaValue::Null).unwrap(), Value::BigInt(None));
    }

    #[test]
    fn hrana_values_use_the_wire_layout() {
        let args = vec![to_arg(Value::Bool(Some(true))).unwrap(), to_arg(Value::String(None)).unwrap()];
        assert_eq!(
            serde_json::to_value(&args).unwrap(),
            serde_json::json!([{ "type": "integer", "value": "1" }, { "type": "null" }])
        );
    }

    #[test]
    fn statements_carry_positional_arguments() {
        let stmt = Statement::from_sql_and_values(
            sea_orm::DbBackend::Sqlite,
            "SELECT * FROM contacts WHERE organisation_id = ? AND archived = ?",
            [Value::from("org-1"), Value::from(false)],
        );
        let stmt = to_stmt(stmt, true).unwrap();
        assert_eq!(
            serde_json::to_value(&stmt).unwrap(),
            serde_json::json!({
                "sql": "SELECT * FROM contacts WHERE organisation_id = ? AND archived = ?",
                "args": [{ "type": "text", "value": "org-1" }, { "type": "integer", "value": "0" }],
                "want_rows": true,
            })
        );
    }

    #[test]
    fn pipeline_responses_parse() {
        let body = serde_json::json!({
            "baton": "b-1",
            "base_url": null,
            "results": [
                { "type": "ok", "response": { "type": "execute", "result": {
                    "cols": [{ "name": "num_items", "decltype": null }],
                    "rows": [[{ "type": "integer", "value": "3" }]],
                    "affected_row_count": 0,
                    "last_insert_rowid": null,
                } } },
                { "type": "error", "error": { "message": "no such table: users", "code": "SQLITE_ERROR" } },
                { "type": "ok", "response": { "type": "close" } },
            ],
        });
        let parsed: PipelineResponse = serde_json::from_value(body).unwrap();
        assert_eq!(parsed.baton.as_deref(), Some("b-1"));
        assert_eq!(parsed.results.len(), 3);
        let StreamResult::Ok {
            response: StreamResponse::Execute { result },
        } = &parsed.results[0]
        else {
            panic!("expected an execute result");
        };
        assert_eq!(result.cols[0].name.as_deref(), Some("num_items"));
        assert!(matches!(&parsed.results[1], StreamResult::Error { error } if error.message == "no such table: users"));
    }

    #[test]
    fn database_urls_map_to_https() {
        assert_eq!(http_base("libsql://crm-acme.turso.io/"), "https://crm-acme.turso.io");
        assert_eq!(http_base("http://127.0.0.1:8080"), "http://127.0.0.1:8080");
    }
}
