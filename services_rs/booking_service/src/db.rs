use sqlx::postgres::{PgPool, PgPoolOptions};

fn table_name(schema: &Option<String>, name: &str) -> String {
    match schema {
        Some(s) => format!("{s}.{name}"),
        None => name.to_string(),
    }
}

pub async fn connect(db_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(db_url)
        .await
}

pub async fn ensure_schema(
    pool: &PgPool,
    db_schema: &Option<String>,
    duplicate_guard: bool,
) -> Result<(), sqlx::Error> {
    if let Some(schema) = db_schema {
        let ddl = format!("CREATE SCHEMA IF NOT EXISTS {schema}");
        let _ = sqlx::query(&ddl).execute(pool).await;
    }

    let bookings = table_name(db_schema, "bookings");

    let ddls = [
        format!(
            "CREATE TABLE IF NOT EXISTS {bookings} (\
             id BIGSERIAL PRIMARY KEY,\
             trek_id BIGINT NOT NULL DEFAULT 0,\
             trek_name VARCHAR(160) NOT NULL,\
             client_name VARCHAR(120) NOT NULL,\
             client_email VARCHAR(160) NOT NULL,\
             client_phone VARCHAR(32),\
             id_type VARCHAR(32) NOT NULL DEFAULT 'passport',\
             id_number VARCHAR(64),\
             id_document_path VARCHAR(255),\
             participants INTEGER NOT NULL DEFAULT 1,\
             booking_date TEXT NOT NULL,\
             amount NUMERIC(12,2) NOT NULL DEFAULT 0,\
             payment_id VARCHAR(64),\
             gateway VARCHAR(32) NOT NULL DEFAULT 'manual',\
             status VARCHAR(16) NOT NULL DEFAULT 'confirmed',\
             created_at TEXT NOT NULL,\
             updated_at TEXT NOT NULL\
             )"
        ),
        format!("CREATE INDEX IF NOT EXISTS idx_bookings_client_email ON {bookings}(client_email)"),
        format!("CREATE INDEX IF NOT EXISTS idx_bookings_created_at ON {bookings}(created_at)"),
    ];

    for ddl in ddls {
        let _ = sqlx::query(&ddl).execute(pool).await;
    }

    let _ = sqlx::query(&format!(
        "ALTER TABLE {bookings} ADD COLUMN IF NOT EXISTS id_document_path VARCHAR(255)"
    ))
    .execute(pool)
    .await;
    let _ = sqlx::query(&format!(
        "ALTER TABLE {bookings} ADD COLUMN IF NOT EXISTS payment_id VARCHAR(64)"
    ))
    .execute(pool)
    .await;
    let _ = sqlx::query(&format!(
        "ALTER TABLE {bookings} ADD COLUMN IF NOT EXISTS gateway VARCHAR(32) DEFAULT 'manual'"
    ))
    .execute(pool)
    .await;
    let _ = sqlx::query(&format!(
        "ALTER TABLE {bookings} ADD COLUMN IF NOT EXISTS updated_at TEXT"
    ))
    .execute(pool)
    .await;
    let _ = sqlx::query(&format!(
        "UPDATE {bookings} SET updated_at=created_at WHERE updated_at IS NULL"
    ))
    .execute(pool)
    .await;

    // The duplicate guard lives in storage so concurrent inserts are
    // arbitrated atomically; a guard that fails to materialize must stop
    // startup rather than silently admit repeat bookings.
    let guard_index = table_name(db_schema, "idx_bookings_client_trek");
    if duplicate_guard {
        sqlx::query(&format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_bookings_client_trek ON {bookings}(client_email, trek_id)"
        ))
        .execute(pool)
        .await?;
    } else {
        let _ = sqlx::query(&format!("DROP INDEX IF EXISTS {guard_index}"))
            .execute(pool)
            .await;
    }

    Ok(())
}
