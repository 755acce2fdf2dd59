//! Database test fixtures
//!
//! Integration tests need a real PostgreSQL instance. When `DATABASE_URL`
//! is not set the fixture returns `None` and the test body returns early,
//! so the suite stays green on machines without a database.

use sqlx::PgPool;

/// Test database fixture: a pool with migrations applied.
pub struct TestDatabase {
    pool: PgPool,
}

impl TestDatabase {
    /// Connect and migrate, or `None` when `DATABASE_URL` is unset.
    pub async fn new() -> Option<Self> {
        let Ok(database_url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set; skipping database test");
            return None;
        };

        let pool = PgPool::connect(&database_url)
            .await
            .expect("connect to the test database");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("run migrations");

        Some(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Empty every table and restart the message id sequence, so each test
    /// starts from a blank, deterministic world. Tests run `#[serial]`.
    pub async fn reset(&self) {
        sqlx::query(
            r#"
            TRUNCATE TABLE
                notifications,
                message_attachments,
                messages,
                conversation_participants,
                conversations,
                tickets,
                procurements,
                project_members,
                projects,
                users,
                organizations
            RESTART IDENTITY CASCADE
            "#,
        )
        .execute(&self.pool)
        .await
        .expect("reset test database");
    }
}
