use mongodb::options::ClientOptions;

use super::error::{MongoDaoError, MongoResult};

const DEFAULT_DATABASE: &str = "song_guess";
const DEFAULT_URI: &str = "mongodb://localhost:27017";

/// Parsed client options plus the database holding the `documents` collection.
#[derive(Clone)]
pub struct MongoConfig {
    /// Parsed driver options.
    pub options: ClientOptions,
    /// Database name.
    pub database_name: String,
}

impl MongoConfig {
    /// Parse `uri`, falling back to the default database when `db_name` is `None`.
    pub async fn from_uri(uri: &str, db_name: Option<&str>) -> MongoResult<Self> {
        let options =
            ClientOptions::parse(uri)
                .await
                .map_err(|source| MongoDaoError::InvalidUri {
                    uri: uri.to_owned(),
                    source,
                })?;

        Ok(Self {
            options,
            database_name: db_name.unwrap_or(DEFAULT_DATABASE).to_owned(),
        })
    }

    /// `MONGO_URI` defaults to a local server, `MONGO_DB` to `song_guess`.
    pub async fn from_env() -> MongoResult<Self> {
        let uri = std::env::var("MONGO_URI").unwrap_or_else(|_| DEFAULT_URI.to_owned());
        let database = std::env::var("MONGO_DB").ok();
        Self::from_uri(&uri, database.as_deref()).await
    }
}
