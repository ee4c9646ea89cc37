//! Document-style persistence over libsql

use std::future::Future;

use chrono::{SecondsFormat, Utc};
use libsql::{params, Connection};
use serde_json::{Map, Value};
use tracing::{debug, instrument};
use uuid::Uuid;

use super::error::StoreError;
use super::schema;

/// A stored JSON object
pub type Record = Map<String, Value>;

/// Comparison applied by a [`Filter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl FilterOp {
    fn sql(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::Lt => "<",
            FilterOp::Le => "<=",
            FilterOp::Gt => ">",
            FilterOp::Ge => ">=",
        }
    }
}

/// A condition on one top-level record field
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }
}

/// Storage engine seam. Records come back with their `id` merged in;
/// `createdAt`/`updatedAt` are assigned by the store.
pub trait DatabaseAdapter: Send + Sync {
    /// Insert a record and return its new id
    fn create(
        &self,
        collection: &str,
        data: Record,
    ) -> impl Future<Output = Result<String, StoreError>> + Send;

    fn get_by_id(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<Option<Record>, StoreError>> + Send;

    /// Shallow-merge `patch` into an existing record
    fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Record,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove a record; `false` when there was nothing to remove
    fn delete(
        &self,
        collection: &str,
        id: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Records matching every filter, oldest first
    fn query(
        &self,
        collection: &str,
        filters: &[Filter],
    ) -> impl Future<Output = Result<Vec<Record>, StoreError>> + Send;
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn sql_value(value: &Value) -> libsql::Value {
    match value {
        Value::Null => libsql::Value::Null,
        Value::Bool(b) => libsql::Value::Integer(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => libsql::Value::Integer(i),
            None => libsql::Value::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => libsql::Value::Text(s.clone()),
        other => libsql::Value::Text(other.to_string()),
    }
}

fn parse_record(id: String, data: &str) -> Result<Record, StoreError> {
    let mut record = match serde_json::from_str::<Value>(data)? {
        Value::Object(map) => map,
        _ => return Err(StoreError::Data(format!("Record {id} is not an object"))),
    };
    record.insert("id".to_string(), Value::String(id));
    Ok(record)
}

/// [`DatabaseAdapter`] on a libsql connection
#[derive(Clone)]
pub struct LibsqlStore {
    conn: Connection,
}

impl LibsqlStore {
    /// Wrap a connection, creating the schema if needed
    #[instrument(skip(conn))]
    pub async fn new(conn: Connection) -> Result<Self, StoreError> {
        schema::initialize_schema(&conn).await?;
        Ok(Self { conn })
    }

    /// Open (or create) a database file
    pub async fn open(path: &str) -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Connection(format!("Failed to open database: {}", e)))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Connection(format!("Failed to connect to database: {}", e)))?;

        Self::new(conn).await
    }

    async fn load_data(&self, collection: &str, id: &str) -> Result<Option<String>, StoreError> {
        let mut rows = self
            .conn
            .query(
                "SELECT data FROM records WHERE collection = ? AND id = ?",
                params![collection, id],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to get record: {}", e)))?;

        match rows.next().await? {
            Some(row) => {
                let data: String = row
                    .get(0)
                    .map_err(|e| StoreError::Data(format!("Failed to get data: {}", e)))?;
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }
}

impl DatabaseAdapter for LibsqlStore {
    #[instrument(skip(self, data))]
    async fn create(&self, collection: &str, mut data: Record) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        let timestamp = now();
        data.remove("id");
        data.insert("createdAt".to_string(), Value::String(timestamp.clone()));
        data.insert("updatedAt".to_string(), Value::String(timestamp.clone()));
        let body = serde_json::to_string(&data)?;

        self.conn
            .execute(
                "INSERT INTO records (collection, id, data, created_at, updated_at)
                 VALUES (?, ?, ?, ?, ?)",
                params![collection, id.clone(), body, timestamp.clone(), timestamp],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to create record: {}", e)))?;

        debug!(collection, %id, "Record created");
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, collection: &str, id: &str) -> Result<Option<Record>, StoreError> {
        match self.load_data(collection, id).await? {
            Some(data) => parse_record(id.to_string(), &data).map(Some),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, collection: &str, id: &str, patch: Record) -> Result<(), StoreError> {
        let data = self
            .load_data(collection, id)
            .await?
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        let mut record = match serde_json::from_str::<Value>(&data)? {
            Value::Object(map) => map,
            _ => return Err(StoreError::Data(format!("Record {id} is not an object"))),
        };

        let timestamp = now();
        for (key, value) in patch {
            if key != "id" && key != "createdAt" {
                record.insert(key, value);
            }
        }
        record.insert("updatedAt".to_string(), Value::String(timestamp.clone()));
        let body = serde_json::to_string(&record)?;

        self.conn
            .execute(
                "UPDATE records SET data = ?, updated_at = ? WHERE collection = ? AND id = ?",
                params![body, timestamp, collection, id],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to update record: {}", e)))?;

        debug!(collection, id, "Record updated");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let affected = self
            .conn
            .execute(
                "DELETE FROM records WHERE collection = ? AND id = ?",
                params![collection, id],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to delete record: {}", e)))?;
        Ok(affected > 0)
    }

    #[instrument(skip(self, filters), fields(filters = filters.len()))]
    async fn query(&self, collection: &str, filters: &[Filter]) -> Result<Vec<Record>, StoreError> {
        let mut sql = String::from("SELECT id, data FROM records WHERE collection = ?");
        let mut values = vec![libsql::Value::Text(collection.to_string())];

        for filter in filters {
            let path = libsql::Value::Text(format!("$.{}", filter.field));
            match (&filter.value, filter.op) {
                (Value::Null, FilterOp::Eq) => {
                    sql.push_str(" AND json_extract(data, ?) IS NULL");
                    values.push(path);
                }
                (Value::Null, FilterOp::Ne) => {
                    sql.push_str(" AND json_extract(data, ?) IS NOT NULL");
                    values.push(path);
                }
                (value, op) => {
                    sql.push_str(&format!(" AND json_extract(data, ?) {} ?", op.sql()));
                    values.push(path);
                    values.push(sql_value(value));
                }
            }
        }
        sql.push_str(" ORDER BY created_at, rowid");

        let mut rows = self
            .conn
            .query(&sql, libsql::params_from_iter(values))
            .await
            .map_err(|e| StoreError::Query(format!("Failed to query records: {}", e)))?;

        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            let id: String = row
                .get(0)
                .map_err(|e| StoreError::Data(format!("Failed to get id: {}", e)))?;
            let data: String = row
                .get(1)
                .map_err(|e| StoreError::Data(format!("Failed to get data: {}", e)))?;
            records.push(parse_record(id, &data)?);
        }
        Ok(records)
    }
}
