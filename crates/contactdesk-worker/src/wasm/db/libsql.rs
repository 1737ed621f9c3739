//! sea-orm proxy backend speaking libSQL's Hrana-over-HTTP pipeline protocol.
//!
//! Outside a transaction every pipeline closes its stream. Inside one the stream is kept
//! open through the server's baton so `BEGIN`, savepoints and `COMMIT` share a connection.

use std::collections::BTreeMap;

use parking_lot::Mutex;
use sea_orm::{DbErr, ProxyDatabaseTrait, ProxyExecResult, ProxyRow, Statement};
use worker::send::SendFuture;
use worker::{Fetch, Headers, Method, Request, RequestInit};

use crate::hrana::{
    conn_err, from_hrana, http_base, query_err, to_stmt, ColumnKind, ExecuteResult, PipelineRequest,
    PipelineResponse, Stmt, StreamRequest, StreamResponse, StreamResult, PIPELINE_PATH,
};

fn to_rows(result: ExecuteResult) -> Result<Vec<ProxyRow>, DbErr> {
    let columns: Vec<(String, ColumnKind)> = result
        .cols
        .iter()
        .enumerate()
        .map(|(idx, col)| {
            let name = col.name.clone().unwrap_or_else(|| idx.to_string());
            (name, ColumnKind::from_decltype(col.decltype.as_deref()))
        })
        .collect();

    result
        .rows
        .into_iter()
        .map(|row| {
            let mut values = BTreeMap::new();
            for ((name, kind), value) in columns.iter().zip(row) {
                values.insert(name.clone(), from_hrana(*kind, value)?);
            }
            Ok(ProxyRow { values })
        })
        .collect()
}

async fn post_pipeline(url: String, token: Option<String>, body: String) -> Result<PipelineResponse, DbErr> {
    let send = async {
        let headers = Headers::new();
        headers.set("Content-Type", "application/json")?;
        if let Some(token) = &token {
            headers.set("Authorization", &format!("Bearer {token}"))?;
        }
        let mut init = RequestInit::new();
        init.with_method(Method::Post);
        init.with_headers(headers);
        init.with_body(Some(body.into()));

        let req = Request::new_with_init(&format!("{url}{PIPELINE_PATH}"), &init)?;
        let mut resp = Fetch::Request(req).send().await?;
        let status = resp.status_code();
        let text = resp.text().await?;
        Ok::<_, worker::Error>((status, text))
    };
    let (status, text) = send.await.map_err(|e| conn_err(e.to_string()))?;
    if !(200..=299).contains(&status) {
        return Err(conn_err(format!("libSQL pipeline failed (status={status}): {text}")));
    }
    serde_json::from_str(&text).map_err(|e| conn_err(format!("malformed libSQL response: {e}")))
}

#[derive(Default)]
struct StreamState {
    baton: Option<String>,
    base_url: Option<String>,
    depth: usize,
    // Owed by transactions dropped without commit or rollback.
    pending: Vec<String>,
    failure: Option<String>,
}

/// One logical database connection per request.
pub struct LibsqlHttp {
    url: String,
    auth_token: Option<String>,
    state: Mutex<StreamState>,
}

impl std::fmt::Debug for LibsqlHttp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibsqlHttp")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl LibsqlHttp {
    pub fn new(url: &str, auth_token: Option<String>) -> Self {
        Self {
            url: http_base(url),
            auth_token,
            state: Mutex::new(StreamState::default()),
        }
    }

    async fn pipeline(&self, statements: Vec<Stmt>) -> Result<Vec<ExecuteResult>, DbErr> {
        let (url, baton, pending, close) = {
            let mut state = self.state.lock();
            if state.depth > 0 {
                if let Some(failure) = &state.failure {
                    return Err(conn_err(format!("transaction unavailable: {failure}")));
                }
            }
            let url = state.base_url.clone().unwrap_or_else(|| self.url.clone());
            (url, state.baton.clone(), std::mem::take(&mut state.pending), state.depth == 0)
        };

        let owed = pending.len();
        let mut requests: Vec<StreamRequest> = pending
            .into_iter()
            .map(|sql| StreamRequest::Execute { stmt: Stmt::control(sql) })
            .collect();
        requests.extend(statements.into_iter().map(|stmt| StreamRequest::Execute { stmt }));
        if close {
            requests.push(StreamRequest::Close);
        }
        let body = serde_json::to_string(&PipelineRequest { baton, requests })
            .map_err(|e| query_err(e.to_string()))?;

        let response = SendFuture::new(post_pipeline(url, self.auth_token.clone(), body)).await;
        let response = match response {
            Ok(response) => response,
            Err(e) => {
                // The server drops the stream along with any open transaction.
                let mut state = self.state.lock();
                state.baton = None;
                state.base_url = None;
                if state.depth > 0 {
                    state.failure = Some(e.to_string());
                }
                return Err(e);
            }
        };

        {
            let mut state = self.state.lock();
            if close {
                state.baton = None;
                state.base_url = None;
            } else {
                state.baton = response.baton;
                if response.base_url.is_some() {
                    state.base_url = response.base_url;
                }
            }
        }

        let mut results = Vec::new();
        for (idx, result) in response.results.into_iter().enumerate() {
            match result {
                StreamResult::Ok {
                    response: StreamResponse::Execute { result },
                } if idx >= owed => results.push(result),
                StreamResult::Ok { .. } => {}
                StreamResult::Error { error } if idx < owed => {
                    tracing::warn!(error = %error.message, "deferred rollback failed");
                }
                StreamResult::Error { error } => return Err(query_err(error.message)),
            }
        }
        Ok(results)
    }

    async fn single(&self, stmt: Stmt) -> Result<ExecuteResult, DbErr> {
        self.pipeline(vec![stmt])
            .await?
            .pop()
            .ok_or_else(|| query_err("libSQL returned no result"))
    }

    async fn control(&self, sqls: Vec<String>) {
        let statements = sqls.into_iter().map(Stmt::control).collect();
        if let Err(e) = self.pipeline(statements).await {
            tracing::error!(error = %e, "libSQL transaction control failed");
            let mut state = self.state.lock();
            if state.depth > 0 {
                state.failure = Some(e.to_string());
            }
        }
    }

    /// Statements that end the innermost open transaction or savepoint.
    fn unwind(&self, commit: bool) -> Vec<String> {
        let mut state = self.state.lock();
        let depth = state.depth;
        state.depth = depth.saturating_sub(1);
        if state.depth == 0 {
            state.failure = None;
        }
        match (depth <= 1, commit) {
            (true, true) => vec!["COMMIT".to_string()],
            (true, false) => vec!["ROLLBACK".to_string()],
            (false, true) => vec![format!("RELEASE sp{depth}")],
            (false, false) => vec![format!("ROLLBACK TO sp{depth}"), format!("RELEASE sp{depth}")],
        }
    }
}

#[async_trait::async_trait]
impl ProxyDatabaseTrait for LibsqlHttp {
    async fn query(&self, statement: Statement) -> Result<Vec<ProxyRow>, DbErr> {
        let result = self.single(to_stmt(statement, true)?).await?;
        to_rows(result)
    }

    async fn execute(&self, statement: Statement) -> Result<ProxyExecResult, DbErr> {
        let result = self.single(to_stmt(statement, false)?).await?;
        Ok(ProxyExecResult {
            last_insert_id: result
                .last_insert_rowid
                .and_then(|id| id.parse().ok())
                .unwrap_or(0),
            rows_affected: result.affected_row_count,
        })
    }

    async fn begin(&self) {
        let sql = {
            let mut state = self.state.lock();
            state.depth += 1;
            if state.depth == 1 {
                "BEGIN".to_string()
            } else {
                format!("SAVEPOINT sp{}", state.depth)
            }
        };
        self.control(vec![sql]).await;
    }

    async fn commit(&self) {
        let sqls = self.unwind(true);
        self.control(sqls).await;
    }

    async fn rollback(&self) {
        let sqls = self.unwind(false);
        self.control(sqls).await;
    }

    fn start_rollback(&self) {
        let sqls = self.unwind(false);
        self.state.lock().pending.extend(sqls);
    }

    async fn ping(&self) -> Result<(), DbErr> {
        self.single(Stmt::control("SELECT 1".to_string())).await.map(|_| ())
    }
}
