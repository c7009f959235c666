use super::{DocumentStore, Filter, GroupCount, QueryPlanDescription, StoredDocument};
use crate::config::StoreConfig;
use crate::error::{EduHubError, Result};
use crate::index::{render_key, IndexSpec};
use crate::schema::CollectionDefinition;
use crate::store::filter::check_field_path;
use crate::validation;
use regex::Regex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

/// Document store embedded in SQLite.
///
/// Each collection is a table of `(id, doc)` rows holding JSON text. The
/// `_collections` catalog keeps each collection's validator and `_indexes`
/// keeps the declared indexes, which are built as expression indexes over
/// `json_extract(doc, '$.field')`.
pub struct SqliteStore {
    conn: Connection,
    busy_timeout: Duration,
}

impl SqliteStore {
    /// Open or create a store at the given path.
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| {
            EduHubError::StoreUnavailable(format!("cannot open {}: {e}", path.display()))
        })?;
        log::debug!("Opened SQLite store at {}", path.display());
        Self::init(conn, busy_timeout)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| EduHubError::StoreUnavailable(e.to_string()))?;
        Self::init(conn, Duration::from_millis(StoreConfig::DEFAULT_BUSY_TIMEOUT_MS))
    }

    /// Open the store described by the configuration; `:memory:` selects an
    /// in-memory database.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        if config.path.as_os_str() == StoreConfig::IN_MEMORY {
            let mut store = Self::open_in_memory()?;
            store.busy_timeout = config.busy_timeout();
            store.check(store.conn.busy_timeout(store.busy_timeout))?;
            return Ok(store);
        }
        Self::open(&config.path, config.busy_timeout())
    }

    fn init(conn: Connection, busy_timeout: Duration) -> Result<Self> {
        let store = SqliteStore { conn, busy_timeout };
        store.check(store.conn.busy_timeout(busy_timeout))?;
        store.initialize_tables()?;
        Ok(store)
    }

    fn initialize_tables(&self) -> Result<()> {
        self.check(self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS _collections (
                name TEXT PRIMARY KEY,
                validator_json TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE IF NOT EXISTS _indexes (
                collection TEXT NOT NULL,
                name TEXT NOT NULL,
                spec_json TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (collection, name)
            );
            ",
        ))
    }

    // ── Error mapping ────────────────────────────────────────────────

    fn check<T>(&self, result: rusqlite::Result<T>) -> Result<T> {
        result.map_err(|e| self.classify(e))
    }

    /// Separate transport trouble (retryable) from everything else.
    fn classify(&self, err: rusqlite::Error) -> EduHubError {
        let code = match &err {
            rusqlite::Error::SqliteFailure(failure, _) => failure.code,
            _ => return EduHubError::Sqlite(err),
        };
        match code {
            ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked => EduHubError::StoreTimeout {
                waited_ms: self.busy_timeout.as_millis() as u64,
            },
            ErrorCode::CannotOpen
            | ErrorCode::SystemIoFailure
            | ErrorCode::NotADatabase
            | ErrorCode::DatabaseCorrupt
            | ErrorCode::DiskFull
            | ErrorCode::ReadOnly
            | ErrorCode::PermissionDenied => EduHubError::StoreUnavailable(err.to_string()),
            _ => EduHubError::Sqlite(err),
        }
    }

    /// Turn a unique-index violation into `DuplicateKey`, naming the
    /// declared index's fields and the values the rejected document carries.
    fn write_error(&self, collection: &str, document: &Value, err: rusqlite::Error) -> EduHubError {
        let sql_index = match &err {
            rusqlite::Error::SqliteFailure(failure, Some(message))
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                unique_index_name(message)
            }
            _ => None,
        };

        let Some(sql_index) = sql_index else {
            return self.classify(err);
        };

        let spec = self
            .list_indexes(collection)
            .ok()
            .and_then(|specs| specs.into_iter().find(|s| sql_index_name(s) == sql_index));

        match spec {
            Some(spec) => EduHubError::DuplicateKey {
                collection: collection.to_string(),
                field: spec.field_label(),
                value: spec
                    .key_values(document)
                    .map(|values| render_key(&values))
                    .unwrap_or_default(),
            },
            None => self.classify(err),
        }
    }

    // ── Catalog ──────────────────────────────────────────────────────

    fn validator(&self, collection: &str) -> Result<CollectionDefinition> {
        let json: Option<String> = self.check(
            self.conn
                .query_row(
                    "SELECT validator_json FROM _collections WHERE name = ?1",
                    params![collection],
                    |row| row.get(0),
                )
                .optional(),
        )?;
        match json {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Err(EduHubError::UnknownCollection(collection.to_string())),
        }
    }

    fn collection_exists(&self, collection: &str) -> Result<bool> {
        let found: Option<i64> = self.check(
            self.conn
                .query_row(
                    "SELECT 1 FROM _collections WHERE name = ?1",
                    params![collection],
                    |row| row.get(0),
                )
                .optional(),
        )?;
        Ok(found.is_some())
    }

    fn require_collection(&self, collection: &str) -> Result<()> {
        if self.collection_exists(collection)? {
            Ok(())
        } else {
            Err(EduHubError::UnknownCollection(collection.to_string()))
        }
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Validate against the attached rule set and write one row.
    fn write_document(
        &self,
        collection: &str,
        validator: &CollectionDefinition,
        document: &Value,
    ) -> Result<String> {
        validation::validate_document(validator, document).into_result()?;

        let id = ulid::Ulid::new().to_string().to_lowercase();
        let doc_json = serde_json::to_string(document)?;
        let sql = format!("INSERT INTO {} (id, doc) VALUES (?1, ?2)", quote_ident(collection));
        self.conn
            .execute(&sql, params![id, doc_json])
            .map_err(|e| self.write_error(collection, document, e))?;
        Ok(id)
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Build the `SELECT` for a filter, returning SQL and bound values.
    fn select_sql(&self, columns: &str, collection: &str, filter: &Filter) -> Result<(String, Vec<SqlValue>)> {
        filter.check()?;

        let mut clauses = Vec::new();
        let mut values = Vec::new();
        for predicate in filter.predicates() {
            let expr = json_path_expr(&predicate.field);
            match to_sql_value(&predicate.value) {
                None => {
                    let op = match predicate.op {
                        super::Comparison::Ne => "IS NOT NULL",
                        _ => "IS NULL",
                    };
                    clauses.push(format!("{expr} {op}"));
                }
                Some(value) => {
                    clauses.push(format!("{expr} {} ?", sql_operator(predicate.op)));
                    values.push(value);
                }
            }
        }

        let mut sql = format!("SELECT {columns} FROM {}", quote_ident(collection));
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        if let Some((field, order)) = filter.sort() {
            sql.push_str(&format!(" ORDER BY {} {}, rowid", json_path_expr(field), order.as_sql()));
        }
        Ok((sql, values))
    }
}

impl DocumentStore for SqliteStore {
    fn create_collection(&self, name: &str, validator: &CollectionDefinition) -> Result<()> {
        check_collection_name(name)?;
        validator.check(name)?;

        if self.collection_exists(name)? {
            if self.validator(name)? != *validator {
                return Err(EduHubError::ValidatorConflict {
                    collection: name.to_string(),
                });
            }
            return Err(EduHubError::CollectionAlreadyExists {
                name: name.to_string(),
            });
        }

        let validator_json = serde_json::to_string(validator)?;
        let tx = self.check(self.conn.unchecked_transaction())?;
        self.check(tx.execute(
            &format!(
                "CREATE TABLE {} (id TEXT PRIMARY KEY, doc TEXT NOT NULL)",
                quote_ident(name)
            ),
            [],
        ))?;
        self.check(tx.execute(
            "INSERT INTO _collections (name, validator_json) VALUES (?1, ?2)",
            params![name, validator_json],
        ))?;
        self.check(tx.commit())?;

        log::info!("Created collection '{name}'");
        Ok(())
    }

    fn list_collections(&self) -> Result<Vec<String>> {
        let mut stmt = self.check(self.conn.prepare("SELECT name FROM _collections ORDER BY name"))?;
        let rows = self.check(stmt.query_map([], |row| row.get(0)))?;

        let mut names = Vec::new();
        for row in rows {
            names.push(self.check(row)?);
        }
        Ok(names)
    }

    fn insert_one(&self, collection: &str, document: &Value) -> Result<String> {
        let validator = self.validator(collection)?;
        let id = self.write_document(collection, &validator, document)?;
        log::debug!("Inserted {collection}/{id}");
        Ok(id)
    }

    fn insert_many(&self, collection: &str, documents: &[Value]) -> Result<Vec<String>> {
        if documents.is_empty() {
            return Ok(Vec::new());
        }
        let validator = self.validator(collection)?;

        // Dropping the transaction without commit rolls every row back.
        let tx = self.check(self.conn.unchecked_transaction())?;
        let mut ids = Vec::with_capacity(documents.len());
        for (index, document) in documents.iter().enumerate() {
            let id = self
                .write_document(collection, &validator, document)
                .map_err(|source| EduHubError::BatchRejected {
                    index,
                    source: Box::new(source),
                })?;
            ids.push(id);
        }
        self.check(tx.commit())?;

        log::debug!("Inserted {} documents into {collection}", ids.len());
        Ok(ids)
    }

    fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<StoredDocument>> {
        self.require_collection(collection)?;
        let (sql, values) = self.select_sql("id, doc", collection, filter)?;

        let mut stmt = self.check(self.conn.prepare(&sql))?;
        let rows = self.check(stmt.query_map(params_from_iter(values.iter()), |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        }))?;

        let mut docs = Vec::new();
        for row in rows {
            let (id, doc_json) = self.check(row)?;
            docs.push(StoredDocument {
                id,
                data: serde_json::from_str(&doc_json)?,
            });
        }
        Ok(docs)
    }

    fn count(&self, collection: &str, filter: &Filter) -> Result<u64> {
        self.require_collection(collection)?;
        let (sql, values) = self.select_sql("COUNT(*)", collection, filter)?;
        let count: i64 = self.check(self.conn.query_row(
            &sql,
            params_from_iter(values.iter()),
            |row| row.get(0),
        ))?;
        Ok(count.max(0) as u64)
    }

    fn aggregate_count(&self, collection: &str, group_key: &str) -> Result<Vec<GroupCount>> {
        self.require_collection(collection)?;
        check_field_path(group_key)?;

        let sql = format!(
            "SELECT {expr} AS grp, COUNT(*) FROM {table} GROUP BY grp ORDER BY grp",
            expr = json_path_expr(group_key),
            table = quote_ident(collection),
        );
        let mut stmt = self.check(self.conn.prepare(&sql))?;
        let rows = self.check(stmt.query_map([], |row| {
            Ok((row.get::<_, SqlValue>(0)?, row.get::<_, i64>(1)?))
        }))?;

        let mut groups = Vec::new();
        for row in rows {
            let (key, count) = self.check(row)?;
            groups.push(GroupCount {
                key: sql_to_json(key),
                count: count.max(0) as u64,
            });
        }
        Ok(groups)
    }

    fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        self.require_collection(&spec.collection)?;
        if spec.keys.is_empty() {
            return Err(EduHubError::Schema(format!(
                "index on '{}' declares no keys",
                spec.collection
            )));
        }
        for key in &spec.keys {
            check_field_path(&key.field)?;
        }

        let name = spec.name();
        if let Some(existing) = self
            .list_indexes(&spec.collection)?
            .into_iter()
            .find(|s| s.name() == name)
        {
            if existing == *spec {
                log::debug!("Index {}.{name} already exists", spec.collection);
                return Ok(());
            }
            return Err(EduHubError::Schema(format!(
                "index {}.{name} already exists with different options",
                spec.collection
            )));
        }

        let columns = spec
            .keys
            .iter()
            .map(|k| format!("{} {}", json_path_expr(&k.field), k.order.as_sql()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "CREATE {unique}INDEX IF NOT EXISTS {index} ON {table} ({columns})",
            unique = if spec.unique { "UNIQUE " } else { "" },
            index = quote_ident(&sql_index_name(spec)),
            table = quote_ident(&spec.collection),
        );

        let spec_json = serde_json::to_string(spec)?;
        let tx = self.check(self.conn.unchecked_transaction())?;
        self.check(tx.execute(&sql, []))?;
        self.check(tx.execute(
            "INSERT INTO _indexes (collection, name, spec_json) VALUES (?1, ?2, ?3)",
            params![spec.collection, name, spec_json],
        ))?;
        self.check(tx.commit())?;

        log::info!("Created index {}.{name} (unique: {})", spec.collection, spec.unique);
        Ok(())
    }

    fn list_indexes(&self, collection: &str) -> Result<Vec<IndexSpec>> {
        let mut stmt = self.check(
            self.conn
                .prepare("SELECT spec_json FROM _indexes WHERE collection = ?1 ORDER BY name"),
        )?;
        let rows = self.check(stmt.query_map(params![collection], |row| row.get::<_, String>(0)))?;

        let mut specs = Vec::new();
        for row in rows {
            specs.push(serde_json::from_str(&self.check(row)?)?);
        }
        Ok(specs)
    }

    fn explain(&self, collection: &str, filter: &Filter) -> Result<QueryPlanDescription> {
        self.require_collection(collection)?;
        let (sql, values) = self.select_sql("id, doc", collection, filter)?;

        let mut stmt = self.check(self.conn.prepare(&format!("EXPLAIN QUERY PLAN {sql}")))?;
        let rows = self.check(stmt.query_map(params_from_iter(values.iter()), |row| {
            row.get::<_, String>(3)
        }))?;

        let mut steps = Vec::new();
        for row in rows {
            steps.push(self.check(row)?);
        }

        let prefix = format!("{collection}__");
        let selected_index = steps
            .iter()
            .filter_map(|step| plan_index_name(step))
            .find_map(|sql_name| sql_name.strip_prefix(&prefix).map(str::to_string));

        Ok(QueryPlanDescription {
            collection: collection.to_string(),
            predicates: filter.predicates().iter().map(|p| p.to_string()).collect(),
            selected_index,
            steps,
        })
    }
}

fn check_collection_name(name: &str) -> Result<()> {
    static NAME: OnceLock<Regex> = OnceLock::new();
    let re = NAME.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_]*$").unwrap());
    if re.is_match(name) && !name.to_ascii_lowercase().starts_with("sqlite_") {
        Ok(())
    } else {
        Err(EduHubError::Schema(format!("invalid collection name '{name}'")))
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Field paths are checked before they reach this point, so the literal is
/// safe to inline. Inlining keeps the expression identical to the one the
/// expression indexes were built on.
fn json_path_expr(field: &str) -> String {
    format!("json_extract(doc, '$.{field}')")
}

fn sql_index_name(spec: &IndexSpec) -> String {
    format!("{}__{}", spec.collection, spec.name())
}

fn sql_operator(op: super::Comparison) -> &'static str {
    use super::Comparison::*;
    match op {
        Eq => "=",
        Ne => "IS NOT",
        Gt => ">",
        Gte => ">=",
        Lt => "<",
        Lte => "<=",
    }
}

/// `json_extract` yields 1/0 for JSON booleans, so booleans bind as integers.
/// An integer 1 or 0 therefore also matches a stored `true` or `false`;
/// schema validation keeps boolean fields boolean.
fn to_sql_value(value: &Value) -> Option<SqlValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(SqlValue::Integer(i64::from(*b))),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(SqlValue::Integer(i)),
            None => n.as_f64().map(SqlValue::Real),
        },
        Value::String(s) => Some(SqlValue::Text(s.clone())),
        other => Some(SqlValue::Text(other.to_string())),
    }
}

/// Convert a SQLite value back to JSON
fn sql_to_json(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(n) => Value::Number(n.into()),
        SqlValue::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        SqlValue::Text(s) => Value::String(s),
        SqlValue::Blob(b) => Value::String(String::from_utf8_lossy(&b).into()),
    }
}

/// Index named by a `UNIQUE constraint failed: index '...'` message.
fn unique_index_name(message: &str) -> Option<String> {
    static UNIQUE: OnceLock<Regex> = OnceLock::new();
    let re = UNIQUE.get_or_init(|| {
        Regex::new(r"UNIQUE constraint failed: index '([^']+)'").unwrap()
    });
    re.captures(message).map(|c| c[1].to_string())
}

/// Index named by a plan step such as `SEARCH users USING INDEX users__email_1 (<expr>=?)`.
fn plan_index_name(step: &str) -> Option<&str> {
    static USING_INDEX: OnceLock<Regex> = OnceLock::new();
    let re = USING_INDEX.get_or_init(|| {
        Regex::new(r"USING (?:COVERING )?INDEX (\S+)").unwrap()
    });
    re.captures(step).and_then(|c| c.get(1)).map(|m| m.as_str())
}
