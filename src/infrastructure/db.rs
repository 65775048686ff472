use std::str::FromStr;
use std::time::Duration;

use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, SqlxSqliteConnector, Statement};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

use crate::domain::DomainError;
use crate::infrastructure::config::Config;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

/// Open the database with default pool settings and make sure the schema exists.
pub async fn init_db(database_url: &str) -> Result<DatabaseConnection, DomainError> {
    connect(database_url, DEFAULT_MAX_CONNECTIONS, DEFAULT_LOCK_TIMEOUT).await
}

/// Open the database described by `config` and make sure the schema exists.
pub async fn init_db_with(config: &Config) -> Result<DatabaseConnection, DomainError> {
    connect(
        &config.database_url,
        config.max_connections,
        config.lock_timeout,
    )
    .await
}

async fn connect(
    database_url: &str,
    max_connections: u32,
    lock_timeout: Duration,
) -> Result<DatabaseConnection, DomainError> {
    let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");

    // busy_timeout bounds how long a writer waits on another writer's lock
    let mut options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(lock_timeout);
    if !in_memory {
        options = options.journal_mode(SqliteJournalMode::Wal);
    }

    // Every pooled connection to `:memory:` would be its own database,
    // so in-memory stores keep exactly one connection alive forever.
    let pool_options = if in_memory {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections.max(1))
    };

    let pool = pool_options
        .acquire_timeout(lock_timeout)
        .connect_with(options)
        .await?;
    let db = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool);

    run_migrations(&db).await?;
    tracing::debug!("Database ready at {}", database_url);

    Ok(db)
}

async fn execute(db: &DatabaseConnection, sql: &str) -> Result<(), DbErr> {
    db.execute(Statement::from_string(db.get_database_backend(), sql.to_owned()))
        .await?;
    Ok(())
}

async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Shelves: occupancy is a cached count, bounded by capacity at the store level too
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS shelves (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            location_code TEXT NOT NULL UNIQUE,
            section TEXT NOT NULL,
            main_topic TEXT NOT NULL,
            material TEXT,
            total_capacity INTEGER NOT NULL,
            current_book_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CONSTRAINT chk_location_code_format
                CHECK (location_code GLOB '[A-Z][0-9]' OR location_code GLOB '[A-Z][0-9][0-9]'),
            CONSTRAINT chk_section_not_empty CHECK (LENGTH(TRIM(section)) > 0),
            CONSTRAINT chk_main_topic_not_empty CHECK (LENGTH(TRIM(main_topic)) > 0),
            CONSTRAINT chk_total_capacity_positive CHECK (total_capacity > 0),
            CONSTRAINT chk_current_book_count_valid
                CHECK (current_book_count >= 0 AND current_book_count <= total_capacity),
            CONSTRAINT chk_material_valid
                CHECK (material IS NULL OR material IN ('Wood', 'Metal', 'Plastic', 'Glass', 'Composite'))
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS books (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            isbn TEXT UNIQUE,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            publisher TEXT,
            publication_year INTEGER,
            book_type TEXT NOT NULL DEFAULT 'physical'
                CHECK (book_type IN ('physical', 'digital')),
            shelf_id INTEGER REFERENCES shelves(id) ON UPDATE CASCADE ON DELETE RESTRICT,
            status TEXT NOT NULL DEFAULT 'available'
                CHECK (status IN ('available', 'loaned', 'maintenance', 'lost')),
            acquisition_date TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CONSTRAINT chk_title_not_empty CHECK (LENGTH(TRIM(title)) > 0),
            CONSTRAINT chk_author_not_empty CHECK (LENGTH(TRIM(author)) > 0),
            CONSTRAINT chk_physical_book_has_shelf CHECK (book_type = 'digital' OR shelf_id IS NOT NULL),
            CONSTRAINT chk_digital_book_no_shelf CHECK (book_type = 'physical' OR shelf_id IS NULL)
        )
        "#,
    )
    .await?;

    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS patrons (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            patron_number TEXT NOT NULL UNIQUE,
            first_name TEXT NOT NULL,
            last_name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            phone TEXT,
            program TEXT,
            status TEXT NOT NULL DEFAULT 'active'
                CHECK (status IN ('active', 'inactive', 'graduated')),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CONSTRAINT chk_names_not_empty
                CHECK (LENGTH(TRIM(first_name)) > 0 AND LENGTH(TRIM(last_name)) > 0)
        )
        "#,
    )
    .await?;

    // Loans pin their book and patron
    execute(
        db,
        r#"
        CREATE TABLE IF NOT EXISTS loans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            book_id INTEGER NOT NULL REFERENCES books(id) ON UPDATE CASCADE ON DELETE RESTRICT,
            patron_id INTEGER NOT NULL REFERENCES patrons(id) ON UPDATE CASCADE ON DELETE RESTRICT,
            loan_date TEXT NOT NULL,
            estimated_return_date TEXT NOT NULL,
            actual_return_date TEXT,
            status TEXT NOT NULL DEFAULT 'active'
                CHECK (status IN ('active', 'returned', 'overdue', 'lost')),
            renewal_count INTEGER NOT NULL DEFAULT 0,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CONSTRAINT chk_estimated_return_after_loan CHECK (estimated_return_date > loan_date),
            CONSTRAINT chk_reasonable_loan_period
                CHECK (julianday(estimated_return_date) - julianday(loan_date) <= 365),
            CONSTRAINT chk_actual_return_after_loan
                CHECK (actual_return_date IS NULL OR actual_return_date >= loan_date),
            CONSTRAINT chk_renewal_count_positive CHECK (renewal_count >= 0),
            CONSTRAINT chk_returned_loan_has_return_date
                CHECK (status != 'returned' OR actual_return_date IS NOT NULL),
            CONSTRAINT chk_active_loan_no_return_date
                CHECK (status != 'active' OR actual_return_date IS NULL)
        )
        "#,
    )
    .await?;

    let indexes = [
        // At most one open loan per book, enforced by the store as well
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_loans_unique_open_book ON loans(book_id) WHERE status IN ('active', 'overdue')",
        "CREATE INDEX IF NOT EXISTS idx_loans_patron_status ON loans(patron_id, status)",
        "CREATE INDEX IF NOT EXISTS idx_loans_due ON loans(estimated_return_date, status)",
        "CREATE INDEX IF NOT EXISTS idx_books_shelf_id ON books(shelf_id)",
        "CREATE INDEX IF NOT EXISTS idx_books_status ON books(status)",
    ];
    for sql in indexes {
        execute(db, sql).await?;
    }

    Ok(())
}
