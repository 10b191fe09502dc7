use crate::{
    error::SinkError,
    retry::{RetryDisposition, RetryError, RetryPolicy},
    sink::RecordSink,
};
use async_trait::async_trait;
use model::records::processed::{ProcessedRow, RecordStatus};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;
use tokio_postgres::{Client, Config, NoTls, config::SslMode, error::SqlState};
use tracing::{error, info, warn};

const CREATE_TABLE_SQL: &str = r#"
    CREATE TABLE IF NOT EXISTS processed_record (
        id BIGINT PRIMARY KEY,
        payload JSONB,
        processed_at TIMESTAMPTZ NOT NULL,
        status VARCHAR(32) NOT NULL
    )
"#;

const UPSERT_SQL: &str = r#"
    INSERT INTO processed_record (id, payload, processed_at, status)
    VALUES ($1, $2, $3, $4)
    ON CONFLICT (id)
    DO UPDATE SET
        payload = EXCLUDED.payload,
        processed_at = EXCLUDED.processed_at,
        status = EXCLUDED.status
"#;

const SELECT_ONE_SQL: &str =
    "SELECT id, payload::text, processed_at, status FROM processed_record WHERE id = $1";

const COUNT_SQL: &str = "SELECT COUNT(*) FROM processed_record";

/// `processed_record` table in Postgres. One transaction per `upsert_batch`.
pub struct PostgresRecordStore {
    client: Mutex<Client>,
}

impl PostgresRecordStore {
    /// Connects (retrying transient failures) and creates the table if needed.
    pub async fn connect(url: &str) -> Result<Self, SinkError> {
        let client = RetryPolicy::for_database()
            .run(|| connect_client(url), classify_connect_error)
            .await
            .map_err(RetryError::into_inner)?;

        client.batch_execute(CREATE_TABLE_SQL).await?;
        info!("Connected to Postgres record store");

        Ok(Self {
            client: Mutex::new(client),
        })
    }
}

#[async_trait]
impl RecordSink for PostgresRecordStore {
    async fn upsert_batch(&self, rows: &[ProcessedRow]) -> Result<(), SinkError> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut client = self.client.lock().await;
        let tx = client.transaction().await?;
        let stmt = tx.prepare(UPSERT_SQL).await?;

        for row in rows {
            let payload = payload_json(&row.payload);
            let status = row.status.as_str();
            tx.execute(&stmt, &[&row.id, &payload, &row.processed_at, &status])
                .await?;
        }

        // Dropping `tx` on an early return above rolls the chunk back.
        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Option<ProcessedRow>, SinkError> {
        let client = self.client.lock().await;
        let Some(row) = client.query_opt(SELECT_ONE_SQL, &[&id]).await? else {
            return Ok(None);
        };

        let payload: Option<String> = row.try_get(1)?;
        let status: String = row.try_get(3)?;
        Ok(Some(ProcessedRow {
            id: row.try_get(0)?,
            payload: payload.unwrap_or_else(|| "null".to_string()),
            processed_at: row.try_get(2)?,
            status: status
                .parse::<RecordStatus>()
                .map_err(SinkError::Serialization)?,
        }))
    }

    async fn count(&self) -> Result<u64, SinkError> {
        let client = self.client.lock().await;
        let row = client.query_one(COUNT_SQL, &[]).await?;
        let count: i64 = row.try_get(0)?;
        Ok(count.max(0) as u64)
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}

/// Payloads are stored as JSONB; text that is not JSON is stored as a JSON string.
fn payload_json(payload: &str) -> JsonValue {
    serde_json::from_str(payload).unwrap_or_else(|_| JsonValue::String(payload.to_string()))
}

async fn connect_client(url: &str) -> Result<Client, SinkError> {
    let config = url
        .parse::<Config>()
        .map_err(|e| SinkError::InvalidUrl(e.to_string()))?;

    match config.get_ssl_mode() {
        SslMode::Disable => connect_without_tls(config).await,
        SslMode::Prefer => match connect_with_tls(config.clone()).await {
            Ok(client) => Ok(client),
            Err(error) => {
                warn!(%error, "Postgres TLS handshake failed, retrying without TLS");
                connect_without_tls(config).await
            }
        },
        _ => connect_with_tls(config).await,
    }
}

async fn connect_with_tls(config: Config) -> Result<Client, SinkError> {
    let connector = TlsConnector::builder().build()?;
    let tls = MakeTlsConnector::new(connector);
    let (client, connection) = config.connect(tls).await?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            error!(%err, "Postgres connection error");
        }
    });
    Ok(client)
}

async fn connect_without_tls(config: Config) -> Result<Client, SinkError> {
    let (client, connection) = config.connect(NoTls).await?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            error!(%err, "Postgres connection error");
        }
    });
    Ok(client)
}

fn classify_connect_error(err: &SinkError) -> RetryDisposition {
    match err {
        SinkError::Postgres(pg_err) => classify_pg_error(pg_err),
        SinkError::Io(_) | SinkError::Tls(_) => RetryDisposition::Retry,
        _ => RetryDisposition::Stop,
    }
}

/// Transient Postgres failures: closed connections, socket errors, and the
/// serialization/lock/availability SQLSTATEs.
pub fn classify_pg_error(err: &tokio_postgres::Error) -> RetryDisposition {
    if err.is_closed() {
        return RetryDisposition::Retry;
    }

    if let Some(code) = err.code() {
        return if is_retryable_pg_code(code) {
            RetryDisposition::Retry
        } else {
            RetryDisposition::Stop
        };
    }

    let io_source = std::error::Error::source(err)
        .and_then(|source| source.downcast_ref::<std::io::Error>())
        .is_some();
    if io_source {
        RetryDisposition::Retry
    } else {
        RetryDisposition::Stop
    }
}

fn is_retryable_pg_code(code: &SqlState) -> bool {
    matches!(
        *code,
        SqlState::T_R_SERIALIZATION_FAILURE
            | SqlState::T_R_DEADLOCK_DETECTED
            | SqlState::LOCK_NOT_AVAILABLE
            | SqlState::TOO_MANY_CONNECTIONS
            | SqlState::ADMIN_SHUTDOWN
            | SqlState::CRASH_SHUTDOWN
            | SqlState::CANNOT_CONNECT_NOW
            | SqlState::CONNECTION_FAILURE
            | SqlState::CONNECTION_DOES_NOT_EXIST
            | SqlState::CONNECTION_EXCEPTION
            | SqlState::QUERY_CANCELED
    )
}
