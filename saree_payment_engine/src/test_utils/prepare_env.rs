use log::*;
use sqlx::{migrate::MigrateDatabase, Sqlite};
use tempfile::TempDir;

use crate::SqliteDatabase;

/// A migrated SQLite database in a temporary directory. The directory lives as long as this
/// struct does, so keep it bound for the duration of the test.
pub struct TestDatabase {
    pub db: SqliteDatabase,
    pub url: String,
    _dir: TempDir,
}

pub async fn prepare_test_env() -> TestDatabase {
    dotenvy::from_filename(".env.test").ok();
    let _ = env_logger::try_init();
    debug!("🚀️ Logging initialised");
    let dir = tempfile::tempdir().expect("Error creating temp dir for the test database");
    let url = format!("sqlite://{}/test_store.db", dir.path().display());
    create_database(&url).await;
    let db = SqliteDatabase::new(&url, 5).await.expect("Error creating connection to database");
    info!("🚀️ Test database ready at {url}");
    TestDatabase { db, url, _dir: dir }
}

pub async fn create_database(url: &str) {
    if let Err(e) = Sqlite::drop_database(url).await {
        warn!("Error dropping database {url}: {e:?}");
    }
    Sqlite::create_database(url).await.expect("Error creating database");
    info!("Created Sqlite database {url}");
}
