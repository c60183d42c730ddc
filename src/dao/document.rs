//! Backend-neutral document model: slash separated paths, JSON field maps,
//! equality/order queries and the server-timestamp sentinel resolved at commit.

use std::{
    cmp::Ordering,
    fmt,
    sync::atomic::{AtomicI64, Ordering as AtomicOrdering},
    time::{SystemTime, UNIX_EPOCH},
};

use serde_json::{Map, Value, json};

use crate::dao::storage::{StorageError, StorageResult};

/// Field map stored for a single document.
pub type DocumentData = Map<String, Value>;

/// Key of the marker object replaced by the commit time of a write.
const SERVER_TIMESTAMP_KEY: &str = "$serverTimestamp";

/// Root collection of sessions.
pub const SESSIONS: &str = "sessions";
/// Songs collection, under a session or at the root for the library.
pub const SONGS: &str = "songs";
/// Players of a session.
pub const PLAYERS: &str = "players";
/// Per-session collection holding the playback document.
pub const STATE: &str = "state";
/// Id of the single playback document.
pub const CURRENT_GAME: &str = "current_game";

/// Placeholder value that the store replaces with its commit timestamp.
pub fn server_timestamp() -> Value {
    json!({ SERVER_TIMESTAMP_KEY: true })
}

fn is_server_timestamp(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|map| map.len() == 1 && map.get(SERVER_TIMESTAMP_KEY) == Some(&Value::Bool(true)))
}

/// Replace every top-level sentinel in `data` with `now`.
pub fn resolve_server_timestamps(data: &mut DocumentData, now: i64) {
    for value in data.values_mut() {
        if is_server_timestamp(value) {
            *value = Value::from(now);
        }
    }
}

/// Field map of a JSON object; any other value yields an empty map.
pub fn fields(value: Value) -> DocumentData {
    match value {
        Value::Object(map) => map,
        _ => DocumentData::new(),
    }
}

/// Shallow merge: fields present in `update` overwrite those in `target`.
pub fn merge_into(target: &mut DocumentData, update: DocumentData) {
    for (key, value) in update {
        target.insert(key, value);
    }
}

fn split_segments<'a>(raw: &'a str, path: &str) -> StorageResult<Vec<&'a str>> {
    let segments: Vec<&str> = raw.split('/').collect();
    for segment in &segments {
        if segment.is_empty() {
            return Err(StorageError::InvalidPath {
                path: path.to_owned(),
                reason: "empty segment",
            });
        }
        if segment.contains("::") {
            return Err(StorageError::InvalidPath {
                path: path.to_owned(),
                reason: "segment contains `::`",
            });
        }
    }
    Ok(segments)
}

/// Path of a single document, e.g. `sessions/123456/songs/<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath(String);

impl DocPath {
    /// Validate a raw path: non-empty segments, even segment count.
    pub fn parse(raw: impl Into<String>) -> StorageResult<Self> {
        let raw = raw.into();
        let segments = split_segments(&raw, &raw)?;
        if segments.len() % 2 != 0 {
            return Err(StorageError::InvalidPath {
                path: raw,
                reason: "document paths need an even number of segments",
            });
        }
        Ok(Self(raw))
    }

    /// `sessions/{code}`
    pub fn session(code: &str) -> Self {
        Self(format!("{SESSIONS}/{code}"))
    }

    /// `sessions/{code}/state/current_game`
    pub fn game_state(code: &str) -> Self {
        Self(format!("{SESSIONS}/{code}/{STATE}/{CURRENT_GAME}"))
    }

    /// Last path segment.
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Collection that directly contains this document.
    pub fn parent(&self) -> CollectionPath {
        match self.0.rsplit_once('/') {
            Some((parent, _)) => CollectionPath(parent.to_owned()),
            None => CollectionPath(String::new()),
        }
    }

    /// Full slash separated path.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Path of a collection, e.g. `sessions/123456/players` or `songs`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

impl CollectionPath {
    /// Validate a raw path: non-empty segments, odd segment count.
    pub fn parse(raw: impl Into<String>) -> StorageResult<Self> {
        let raw = raw.into();
        let segments = split_segments(&raw, &raw)?;
        if segments.len() % 2 != 1 {
            return Err(StorageError::InvalidPath {
                path: raw,
                reason: "collection paths need an odd number of segments",
            });
        }
        Ok(Self(raw))
    }

    /// Songs attached to a session.
    pub fn session_songs(code: &str) -> Self {
        Self(format!("{SESSIONS}/{code}/{SONGS}"))
    }

    /// Players attached to a session.
    pub fn session_players(code: &str) -> Self {
        Self(format!("{SESSIONS}/{code}/{PLAYERS}"))
    }

    /// Top-level song library shared by every session.
    pub fn library_songs() -> Self {
        Self(SONGS.to_owned())
    }

    /// Document `id` inside this collection.
    pub fn doc(&self, id: &str) -> DocPath {
        DocPath(format!("{}/{id}", self.0))
    }

    /// Whether `path` is a direct child of this collection.
    pub fn contains(&self, path: &DocPath) -> bool {
        path.parent() == *self
    }

    /// Full slash separated path; empty for the root.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A committed document as returned by the store.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Location of the document.
    pub path: DocPath,
    /// Committed fields, with sentinels already resolved.
    pub data: DocumentData,
}

impl Document {
    /// Last path segment.
    pub fn id(&self) -> &str {
        self.path.id()
    }

    /// Decode the field map into a typed value.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> StorageResult<T> {
        serde_json::from_value(Value::Object(self.data.clone())).map_err(|source| {
            StorageError::Decode {
                path: self.path.to_string(),
                source,
            }
        })
    }
}

/// How a write combines with an existing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Overwrite only the provided fields.
    Merge,
    /// Replace the whole document.
    Replace,
}

/// Sort order of a [`Query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Smallest first.
    Ascending,
    Descending,
}

/// Equality constraint on a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    /// Field name.
    pub field: String,
    /// Value the field must equal.
    pub value: Value,
}

/// Sort key of a [`Query`]; a missing field compares lowest.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// Field name.
    pub field: String,
    /// Ascending or descending.
    pub direction: Direction,
}

/// Equality filters, a single ordering and an optional limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// All must hold.
    pub filters: Vec<FieldFilter>,
    /// Optional sort.
    pub order_by: Option<OrderBy>,
    /// Maximum number of documents returned.
    pub limit: Option<usize>,
}

impl Query {
    /// Every document of the collection.
    pub fn all() -> Self {
        Self::default()
    }

    /// Add an equality filter.
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(FieldFilter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    /// Sort by `field`.
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Keep at most `limit` documents.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a document satisfies every filter.
    pub fn matches(&self, data: &DocumentData) -> bool {
        self.filters
            .iter()
            .all(|filter| data.get(&filter.field) == Some(&filter.value))
    }

    /// Evaluate the query in memory over already-fetched documents.
    pub fn apply(&self, documents: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut selected: Vec<Document> = documents
            .into_iter()
            .filter(|doc| self.matches(&doc.data))
            .collect();

        if let Some(order) = &self.order_by {
            selected.sort_by(|a, b| {
                let ordering = compare_values(a.data.get(&order.field), b.data.get(&order.field));
                match order.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            selected.truncate(limit);
        }
        selected
    }
}

/// Total order over JSON scalars: missing < null < bool < number < string < other.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(value: Option<&Value>) -> u8 {
        match value {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(_) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// Commit clock producing strictly increasing epoch milliseconds.
#[derive(Debug, Default)]
pub struct TimestampClock {
    last: AtomicI64,
}

impl TimestampClock {
    /// Clock starting at the current wall time.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wall-clock milliseconds, bumped past the previous value when needed.
    pub fn next(&self) -> i64 {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as i64)
            .unwrap_or_default();

        let mut previous = self.last.load(AtomicOrdering::Relaxed);
        loop {
            let candidate = wall.max(previous + 1);
            match self.last.compare_exchange_weak(
                previous,
                candidate,
                AtomicOrdering::Relaxed,
                AtomicOrdering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => previous = actual,
            }
        }
    }
}
