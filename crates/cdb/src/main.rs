use std::sync::Arc;

use cdb_core::config::Config;
use cdb_store::SqliteStore;

#[tokio::main]
async fn main() -> Result<(), cdb_core::Error> {
    cdb_core::logging::init("cdb")?;

    let cfg = Arc::new(Config::load()?);
    let store = Arc::new(SqliteStore::open(&cfg.db_path)?);

    cdb_telegram::router::run_polling(cfg, store)
        .await
        .map_err(|e| cdb_core::Error::External(format!("bot failed: {e}")))?;

    Ok(())
}
