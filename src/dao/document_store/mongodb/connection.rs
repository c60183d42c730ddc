use std::time::Duration;

use mongodb::{Client, Database, bson::doc, options::ClientOptions};
use tokio::time::sleep;
use tracing::debug;

use super::error::{MongoDaoError, MongoResult};

const MAX_PING_ATTEMPTS: u32 = 10;
const FIRST_RETRY_DELAY: Duration = Duration::from_millis(250);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Build a client and wait until the server answers a ping.
pub async fn establish_connection(
    options: &ClientOptions,
    database_name: &str,
) -> MongoResult<(Client, Database)> {
    let client = Client::with_options(options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(database_name);

    let mut attempts = 0;
    let mut delay = FIRST_RETRY_DELAY;

    while let Err(source) = database.run_command(doc! { "ping": 1 }).await {
        attempts += 1;
        if attempts >= MAX_PING_ATTEMPTS {
            return Err(MongoDaoError::InitialPing { attempts, source });
        }
        debug!(attempts, ?delay, "MongoDB not answering yet");
        sleep(delay).await;
        delay = (delay * 2).min(MAX_RETRY_DELAY);
    }

    Ok((client, database))
}
