use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 =
        conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (accounts, jobs, applications)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                email       TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE refresh_tokens (
                token       TEXT PRIMARY KEY,
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE password_resets (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                email         TEXT NOT NULL,
                requested_at  TEXT NOT NULL
            );

            CREATE TABLE profiles (
                id                  TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                role                TEXT NOT NULL CHECK (role IN ('farmer', 'worker')),
                full_name           TEXT,
                phone               TEXT,
                bio                 TEXT,
                experience_years    INTEGER,
                experience_details  TEXT,
                resume_url          TEXT
            );

            CREATE TABLE jobs (
                id           TEXT PRIMARY KEY,
                farmer_id    TEXT NOT NULL REFERENCES profiles(id),
                title        TEXT NOT NULL,
                location     TEXT,
                pay_rate     TEXT NOT NULL,
                description  TEXT,
                created_at   TEXT NOT NULL
            );

            CREATE INDEX idx_jobs_farmer ON jobs(farmer_id, created_at);

            CREATE TABLE applications (
                id              TEXT PRIMARY KEY,
                job_id          TEXT NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
                worker_id       TEXT NOT NULL REFERENCES profiles(id),
                status          TEXT NOT NULL DEFAULT 'pending'
                                CHECK (status IN ('pending', 'accepted', 'rejected')),
                applicant_name  TEXT,
                created_at      TEXT NOT NULL,
                UNIQUE(job_id, worker_id)
            );

            CREATE INDEX idx_applications_worker ON applications(worker_id);

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (community, chat, objects)");
        conn.execute_batch(
            "
            CREATE TABLE posts (
                id           TEXT PRIMARY KEY,
                content      TEXT NOT NULL,
                author_id    TEXT NOT NULL REFERENCES profiles(id),
                author_name  TEXT NOT NULL,
                author_role  TEXT NOT NULL,
                likes        INTEGER NOT NULL DEFAULT 0,
                created_at   TEXT NOT NULL
            );

            CREATE TABLE post_likes (
                post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES profiles(id),
                created_at  TEXT NOT NULL,
                PRIMARY KEY (post_id, user_id)
            );

            CREATE TABLE comments (
                id          TEXT PRIMARY KEY,
                post_id     TEXT NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
                user_id     TEXT NOT NULL REFERENCES profiles(id),
                user_name   TEXT,
                content     TEXT NOT NULL,
                created_at  TEXT NOT NULL
            );

            CREATE INDEX idx_comments_post ON comments(post_id, created_at);

            CREATE TABLE messages (
                id              TEXT PRIMARY KEY,
                application_id  TEXT NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
                sender_id       TEXT NOT NULL REFERENCES profiles(id),
                content         TEXT NOT NULL,
                created_at      TEXT NOT NULL
            );

            CREATE INDEX idx_messages_application ON messages(application_id, created_at);

            CREATE TABLE objects (
                bucket        TEXT NOT NULL,
                key           TEXT NOT NULL,
                content_type  TEXT NOT NULL,
                data          BLOB NOT NULL,
                created_at    TEXT NOT NULL,
                PRIMARY KEY (bucket, key)
            );

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
