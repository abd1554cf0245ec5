//! Schema setup for the PostgreSQL backends (`users`, `embeddings`).

use sqlx::PgPool;
use sqlx::migrate::{MigrateError, Migrator};
use tracing::debug;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apply any pending migrations from `aiyou_core/migrations/`.
pub async fn migrate(pool: &PgPool) -> Result<(), MigrateError> {
    debug!(count = MIGRATOR.iter().count(), "applying embedded migrations");
    MIGRATOR.run(pool).await
}
