use crate::models::{
    ApplicationRow, CommentRow, JobRow, LikeRow, MessageRow, ObjectRow, PostRow, ProfileChanges,
    ProfileRow, UserRow,
};
use crate::{Database, now_timestamp};
use anyhow::{Result, anyhow};
use rusqlite::{Connection, Row, params};

const PROFILE_COLUMNS: &str =
    "id, role, full_name, phone, bio, experience_years, experience_details, resume_url";
const JOB_COLUMNS: &str = "id, farmer_id, title, location, pay_rate, description, created_at";
const APPLICATION_COLUMNS: &str = "id, job_id, worker_id, status, applicant_name, created_at";
const POST_COLUMNS: &str = "id, content, author_id, author_name, author_role, likes, created_at";
const COMMENT_COLUMNS: &str = "id, post_id, user_id, user_name, content, created_at";
const MESSAGE_COLUMNS: &str = "id, application_id, sender_id, content, created_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, email: &str, password_hash: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, email, password, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![id, email, password_hash, now_timestamp()],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, email, password, created_at FROM users WHERE email = ?1",
                [email],
                map_user,
            )
            .optional()
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, email, password, created_at FROM users WHERE id = ?1",
                [id],
                map_user,
            )
            .optional()
        })
    }

    pub fn insert_refresh_token(&self, token: &str, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO refresh_tokens (token, user_id, created_at) VALUES (?1, ?2, ?3)",
                params![token, user_id, now_timestamp()],
            )?;
            Ok(())
        })
    }

    /// Consume a refresh token. Returns the owning user id if it existed.
    pub fn take_refresh_token(&self, token: &str) -> Result<Option<String>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let user_id: Option<String> = tx
                .query_row("SELECT user_id FROM refresh_tokens WHERE token = ?1", [token], |row| {
                    row.get(0)
                })
                .optional()?;
            if user_id.is_some() {
                tx.execute("DELETE FROM refresh_tokens WHERE token = ?1", [token])?;
            }
            tx.commit()?;
            Ok(user_id)
        })
    }

    pub fn revoke_refresh_tokens(&self, user_id: &str) -> Result<usize> {
        self.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM refresh_tokens WHERE user_id = ?1", [user_id])?)
        })
    }

    pub fn record_password_reset(&self, email: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO password_resets (email, requested_at) VALUES (?1, ?2)",
                params![email, now_timestamp()],
            )?;
            Ok(())
        })
    }

    pub fn count_password_resets(&self, email: &str) -> Result<i64> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM password_resets WHERE email = ?1",
                [email],
                |row| row.get(0),
            )?)
        })
    }

    // -- Profiles --

    pub fn insert_profile(&self, id: &str, role: &str, full_name: &str) -> Result<ProfileRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO profiles (id, role, full_name) VALUES (?1, ?2, ?3)",
                params![id, role, full_name],
            )?;
            query_profile(conn, id)?.ok_or_else(|| anyhow!("Profile vanished after insert: {}", id))
        })
    }

    pub fn get_profile(&self, id: &str) -> Result<Option<ProfileRow>> {
        self.with_conn(|conn| query_profile(conn, id))
    }

    pub fn get_profiles(&self, ids: &[String]) -> Result<Vec<ProfileRow>> {
        self.with_conn(|conn| {
            query_in(
                conn,
                &format!("SELECT {} FROM profiles WHERE id IN", PROFILE_COLUMNS),
                ids,
                "",
                map_profile,
            )
        })
    }

    /// Apply the given changes. Returns the updated row, `None` if no such profile.
    pub fn update_profile(&self, id: &str, changes: &ProfileChanges<'_>) -> Result<Option<ProfileRow>> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            if let Some(v) = changes.full_name {
                tx.execute("UPDATE profiles SET full_name = ?2 WHERE id = ?1", params![id, v])?;
            }
            if let Some(v) = changes.phone {
                tx.execute("UPDATE profiles SET phone = ?2 WHERE id = ?1", params![id, v])?;
            }
            if let Some(v) = changes.bio {
                tx.execute("UPDATE profiles SET bio = ?2 WHERE id = ?1", params![id, v])?;
            }
            if let Some(v) = changes.experience_years {
                tx.execute("UPDATE profiles SET experience_years = ?2 WHERE id = ?1", params![id, v])?;
            }
            if let Some(v) = changes.experience_details {
                tx.execute(
                    "UPDATE profiles SET experience_details = ?2 WHERE id = ?1",
                    params![id, v],
                )?;
            }
            if let Some(v) = changes.resume_url {
                tx.execute("UPDATE profiles SET resume_url = ?2 WHERE id = ?1", params![id, v])?;
            }
            let row = query_profile(&tx, id)?;
            tx.commit()?;
            Ok(row)
        })
    }

    // -- Jobs --

    pub fn insert_job(
        &self,
        id: &str,
        farmer_id: &str,
        title: &str,
        location: Option<&str>,
        pay_rate: &str,
        description: Option<&str>,
    ) -> Result<JobRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO jobs (id, farmer_id, title, location, pay_rate, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![id, farmer_id, title, location, pay_rate, description, now_timestamp()],
            )?;
            query_job(conn, id)?.ok_or_else(|| anyhow!("Job vanished after insert: {}", id))
        })
    }

    pub fn get_job(&self, id: &str) -> Result<Option<JobRow>> {
        self.with_conn(|conn| query_job(conn, id))
    }

    /// Newest first. `farmer_id = None` lists every job.
    pub fn list_jobs(&self, farmer_id: Option<&str>) -> Result<Vec<JobRow>> {
        self.with_conn(|conn| {
            let rows = match farmer_id {
                Some(fid) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {} FROM jobs WHERE farmer_id = ?1 ORDER BY created_at DESC, rowid DESC",
                        JOB_COLUMNS
                    ))?;
                    let rows =
                        stmt.query_map([fid], map_job)?.collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {} FROM jobs ORDER BY created_at DESC, rowid DESC",
                        JOB_COLUMNS
                    ))?;
                    let rows =
                        stmt.query_map([], map_job)?.collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
            };
            Ok(rows)
        })
    }

    /// Delete a job owned by `farmer_id`. Applications go with it (ON DELETE CASCADE).
    pub fn delete_job(&self, id: &str, farmer_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM jobs WHERE id = ?1 AND farmer_id = ?2",
                params![id, farmer_id],
            )?;
            Ok(n > 0)
        })
    }

    // -- Applications --

    pub fn insert_application(
        &self,
        id: &str,
        job_id: &str,
        worker_id: &str,
        applicant_name: Option<&str>,
    ) -> Result<ApplicationRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO applications (id, job_id, worker_id, status, applicant_name, created_at)
                 VALUES (?1, ?2, ?3, 'pending', ?4, ?5)",
                params![id, job_id, worker_id, applicant_name, now_timestamp()],
            )?;
            query_application(conn, id)?
                .ok_or_else(|| anyhow!("Application vanished after insert: {}", id))
        })
    }

    pub fn get_application(&self, id: &str) -> Result<Option<ApplicationRow>> {
        self.with_conn(|conn| query_application(conn, id))
    }

    pub fn list_applications_for_jobs(&self, job_ids: &[String]) -> Result<Vec<ApplicationRow>> {
        self.with_conn(|conn| {
            query_in(
                conn,
                &format!("SELECT {} FROM applications WHERE job_id IN", APPLICATION_COLUMNS),
                job_ids,
                "ORDER BY created_at ASC, rowid ASC",
                map_application,
            )
        })
    }

    /// A worker's applications, each with its job (`None` if the job is gone).
    pub fn list_worker_applications(
        &self,
        worker_id: &str,
    ) -> Result<Vec<(ApplicationRow, Option<JobRow>)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT a.id, a.job_id, a.worker_id, a.status, a.applicant_name, a.created_at,
                        j.id, j.farmer_id, j.title, j.location, j.pay_rate, j.description, j.created_at
                 FROM applications a
                 LEFT JOIN jobs j ON a.job_id = j.id
                 WHERE a.worker_id = ?1
                 ORDER BY a.created_at DESC, a.rowid DESC",
            )?;

            let rows = stmt
                .query_map([worker_id], |row| {
                    let app = map_application(row)?;
                    let job = match row.get::<_, Option<String>>(6)? {
                        Some(id) => Some(JobRow {
                            id,
                            farmer_id: row.get(7)?,
                            title: row.get(8)?,
                            location: row.get(9)?,
                            pay_rate: row.get(10)?,
                            description: row.get(11)?,
                            created_at: row.get(12)?,
                        }),
                        None => None,
                    };
                    Ok((app, job))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    /// Move an application from `from` to `to`. The update only matches a row
    /// still in `from` on a job owned by `farmer_id`; returns `None` when nothing matched.
    pub fn update_application_status(
        &self,
        id: &str,
        farmer_id: &str,
        from: &str,
        to: &str,
    ) -> Result<Option<ApplicationRow>> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE applications SET status = ?4
                 WHERE id = ?1 AND status = ?3
                   AND job_id IN (SELECT id FROM jobs WHERE farmer_id = ?2)",
                params![id, farmer_id, from, to],
            )?;
            if n == 0 {
                return Ok(None);
            }
            query_application(conn, id)
        })
    }

    // -- Posts --

    pub fn insert_post(
        &self,
        id: &str,
        content: &str,
        author_id: &str,
        author_name: &str,
        author_role: &str,
    ) -> Result<PostRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, content, author_id, author_name, author_role, likes, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
                params![id, content, author_id, author_name, author_role, now_timestamp()],
            )?;
            query_post(conn, id)?.ok_or_else(|| anyhow!("Post vanished after insert: {}", id))
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| query_post(conn, id))
    }

    /// Newest first.
    pub fn list_posts(&self) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM posts ORDER BY created_at DESC, rowid DESC",
                POST_COLUMNS
            ))?;
            let rows = stmt.query_map([], map_post)?.collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Batch-fetch likes for a set of post IDs.
    pub fn get_likes_for_posts(&self, post_ids: &[String]) -> Result<Vec<LikeRow>> {
        self.with_conn(|conn| {
            query_in(
                conn,
                "SELECT post_id, user_id FROM post_likes WHERE post_id IN",
                post_ids,
                "",
                |row| {
                    Ok(LikeRow {
                        post_id: row.get(0)?,
                        user_id: row.get(1)?,
                    })
                },
            )
        })
    }

    pub fn insert_like(&self, post_id: &str, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO post_likes (post_id, user_id, created_at) VALUES (?1, ?2, ?3)",
                params![post_id, user_id, now_timestamp()],
            )?;
            Ok(())
        })
    }

    pub fn delete_like(&self, post_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM post_likes WHERE post_id = ?1 AND user_id = ?2",
                params![post_id, user_id],
            )?;
            Ok(n > 0)
        })
    }

    /// Recompute `posts.likes` from the like rows in one statement and return it.
    pub fn recount_likes(&self, post_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE posts SET likes = (SELECT COUNT(*) FROM post_likes WHERE post_id = ?1)
                 WHERE id = ?1",
                [post_id],
            )?;
            if n == 0 {
                return Err(anyhow!("Post not found: {}", post_id));
            }
            Ok(conn.query_row("SELECT likes FROM posts WHERE id = ?1", [post_id], |row| row.get(0))?)
        })
    }

    // -- Comments --

    pub fn insert_comment(
        &self,
        id: &str,
        post_id: &str,
        user_id: &str,
        user_name: Option<&str>,
        content: &str,
    ) -> Result<CommentRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO comments (id, post_id, user_id, user_name, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, post_id, user_id, user_name, content, now_timestamp()],
            )?;
            conn.query_row(
                &format!("SELECT {} FROM comments WHERE id = ?1", COMMENT_COLUMNS),
                [id],
                map_comment,
            )
            .map_err(Into::into)
        })
    }

    /// Oldest first.
    pub fn list_comments(&self, post_id: &str) -> Result<Vec<CommentRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM comments WHERE post_id = ?1 ORDER BY created_at ASC, rowid ASC",
                COMMENT_COLUMNS
            ))?;
            let rows =
                stmt.query_map([post_id], map_comment)?.collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    pub fn insert_message(
        &self,
        id: &str,
        application_id: &str,
        sender_id: &str,
        content: &str,
    ) -> Result<MessageRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, application_id, sender_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, application_id, sender_id, content, now_timestamp()],
            )?;
            conn.query_row(
                &format!("SELECT {} FROM messages WHERE id = ?1", MESSAGE_COLUMNS),
                [id],
                map_message,
            )
            .map_err(Into::into)
        })
    }

    /// Oldest first.
    pub fn list_messages(&self, application_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM messages WHERE application_id = ?1 ORDER BY created_at ASC, rowid ASC",
                MESSAGE_COLUMNS
            ))?;
            let rows = stmt
                .query_map([application_id], map_message)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Objects --

    /// Store a new object. Fails with a UNIQUE violation if the key is taken.
    pub fn put_object(&self, bucket: &str, key: &str, content_type: &str, data: &[u8]) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO objects (bucket, key, content_type, data, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![bucket, key, content_type, data, now_timestamp()],
            )?;
            Ok(())
        })
    }

    pub fn get_object(&self, bucket: &str, key: &str) -> Result<Option<ObjectRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT bucket, key, content_type, data FROM objects WHERE bucket = ?1 AND key = ?2",
                params![bucket, key],
                |row| {
                    Ok(ObjectRow {
                        bucket: row.get(0)?,
                        key: row.get(1)?,
                        content_type: row.get(2)?,
                        data: row.get(3)?,
                    })
                },
            )
            .optional()
        })
    }

    pub fn delete_object(&self, bucket: &str, key: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM objects WHERE bucket = ?1 AND key = ?2",
                params![bucket, key],
            )?;
            Ok(n > 0)
        })
    }
}

/// Run `{select} (?1, ?2, ...) {suffix}` for a list of ids. Empty lists skip the query.
fn query_in<T, F>(conn: &Connection, select: &str, ids: &[String], suffix: &str, map: F) -> Result<Vec<T>>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    if ids.is_empty() {
        return Ok(vec![]);
    }

    let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!("{} ({}) {}", select, placeholders.join(", "), suffix);

    let mut stmt = conn.prepare(&sql)?;
    let params: Vec<&dyn rusqlite::types::ToSql> =
        ids.iter().map(|id| id as &dyn rusqlite::types::ToSql).collect();

    let rows = stmt
        .query_map(params.as_slice(), map)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(rows)
}

fn query_profile(conn: &Connection, id: &str) -> Result<Option<ProfileRow>> {
    conn.query_row(
        &format!("SELECT {} FROM profiles WHERE id = ?1", PROFILE_COLUMNS),
        [id],
        map_profile,
    )
    .optional()
}

fn query_job(conn: &Connection, id: &str) -> Result<Option<JobRow>> {
    conn.query_row(&format!("SELECT {} FROM jobs WHERE id = ?1", JOB_COLUMNS), [id], map_job)
        .optional()
}

fn query_application(conn: &Connection, id: &str) -> Result<Option<ApplicationRow>> {
    conn.query_row(
        &format!("SELECT {} FROM applications WHERE id = ?1", APPLICATION_COLUMNS),
        [id],
        map_application,
    )
    .optional()
}

fn query_post(conn: &Connection, id: &str) -> Result<Option<PostRow>> {
    conn.query_row(&format!("SELECT {} FROM posts WHERE id = ?1", POST_COLUMNS), [id], map_post)
        .optional()
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        password: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn map_profile(row: &Row<'_>) -> rusqlite::Result<ProfileRow> {
    Ok(ProfileRow {
        id: row.get(0)?,
        role: row.get(1)?,
        full_name: row.get(2)?,
        phone: row.get(3)?,
        bio: row.get(4)?,
        experience_years: row.get(5)?,
        experience_details: row.get(6)?,
        resume_url: row.get(7)?,
    })
}

fn map_job(row: &Row<'_>) -> rusqlite::Result<JobRow> {
    Ok(JobRow {
        id: row.get(0)?,
        farmer_id: row.get(1)?,
        title: row.get(2)?,
        location: row.get(3)?,
        pay_rate: row.get(4)?,
        description: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_application(row: &Row<'_>) -> rusqlite::Result<ApplicationRow> {
    Ok(ApplicationRow {
        id: row.get(0)?,
        job_id: row.get(1)?,
        worker_id: row.get(2)?,
        status: row.get(3)?,
        applicant_name: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn map_post(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        content: row.get(1)?,
        author_id: row.get(2)?,
        author_name: row.get(3)?,
        author_role: row.get(4)?,
        likes: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_comment(row: &Row<'_>) -> rusqlite::Result<CommentRow> {
    Ok(CommentRow {
        id: row.get(0)?,
        post_id: row.get(1)?,
        user_id: row.get(2)?,
        user_name: row.get(3)?,
        content: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn map_message(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        application_id: row.get(1)?,
        sender_id: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::is_unique_violation;
    use uuid::Uuid;

    fn id() -> String {
        Uuid::new_v4().to_string()
    }

    fn seed_profile(db: &Database, role: &str) -> String {
        let uid = id();
        db.create_user(&uid, &format!("{}@example.com", uid), "hash").unwrap();
        db.insert_profile(&uid, role, "New User").unwrap();
        uid
    }

    #[test]
    fn duplicate_application_is_a_unique_violation() {
        let db = Database::open_in_memory().unwrap();
        let farmer = seed_profile(&db, "farmer");
        let worker = seed_profile(&db, "worker");
        let job = db.insert_job(&id(), &farmer, "Paddy Harvest", None, "RM100/day", None).unwrap();

        db.insert_application(&id(), &job.id, &worker, Some("Ali")).unwrap();
        let err = db.insert_application(&id(), &job.id, &worker, Some("Ali")).unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[test]
    fn deleting_a_job_cascades_to_applications() {
        let db = Database::open_in_memory().unwrap();
        let farmer = seed_profile(&db, "farmer");
        let worker = seed_profile(&db, "worker");
        let job = db.insert_job(&id(), &farmer, "Durian picking", None, "RM80/day", None).unwrap();
        db.insert_application(&id(), &job.id, &worker, None).unwrap();

        assert!(!db.delete_job(&job.id, &worker).unwrap(), "only the owner may delete");
        assert!(db.delete_job(&job.id, &farmer).unwrap());
        assert!(db.list_worker_applications(&worker).unwrap().is_empty());
    }

    #[test]
    fn status_update_only_matches_expected_state() {
        let db = Database::open_in_memory().unwrap();
        let farmer = seed_profile(&db, "farmer");
        let worker = seed_profile(&db, "worker");
        let job = db.insert_job(&id(), &farmer, "Weeding", None, "RM60/day", None).unwrap();
        let app = db.insert_application(&id(), &job.id, &worker, None).unwrap();

        let accepted = db.update_application_status(&app.id, &farmer, "pending", "accepted").unwrap();
        assert_eq!(accepted.unwrap().status, "accepted");
        assert!(db.update_application_status(&app.id, &farmer, "pending", "rejected").unwrap().is_none());
        assert_eq!(db.get_application(&app.id).unwrap().unwrap().status, "accepted");
    }

    #[test]
    fn status_update_only_matches_the_job_owner() {
        let db = Database::open_in_memory().unwrap();
        let owner = seed_profile(&db, "farmer");
        let rival = seed_profile(&db, "farmer");
        let worker = seed_profile(&db, "worker");
        let job = db.insert_job(&id(), &owner, "Weeding", None, "RM60/day", None).unwrap();
        let app = db.insert_application(&id(), &job.id, &worker, None).unwrap();

        assert!(db.update_application_status(&app.id, &rival, "pending", "rejected").unwrap().is_none());
        assert_eq!(db.get_application(&app.id).unwrap().unwrap().status, "pending");
        assert!(db.update_application_status(&app.id, &owner, "pending", "rejected").unwrap().is_some());
    }

    #[test]
    fn recount_likes_follows_like_rows() {
        let db = Database::open_in_memory().unwrap();
        let a = seed_profile(&db, "farmer");
        let b = seed_profile(&db, "worker");
        let post = db.insert_post(&id(), "Rain tomorrow?", &a, "Aminah", "farmer").unwrap();

        db.insert_like(&post.id, &a).unwrap();
        db.insert_like(&post.id, &b).unwrap();
        assert_eq!(db.recount_likes(&post.id).unwrap(), 2);

        let err = db.insert_like(&post.id, &b).unwrap_err();
        assert!(is_unique_violation(&err));

        assert!(db.delete_like(&post.id, &a).unwrap());
        assert_eq!(db.recount_likes(&post.id).unwrap(), 1);
        assert_eq!(db.get_post(&post.id).unwrap().unwrap().likes, 1);
    }

    #[test]
    fn empty_id_sets_skip_queries() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_profiles(&[]).unwrap().is_empty());
        assert!(db.list_applications_for_jobs(&[]).unwrap().is_empty());
        assert!(db.get_likes_for_posts(&[]).unwrap().is_empty());
    }

    #[test]
    fn profile_update_leaves_unset_columns() {
        let db = Database::open_in_memory().unwrap();
        let uid = seed_profile(&db, "worker");

        let changes = ProfileChanges {
            phone: Some("012-3456789"),
            experience_years: Some(4),
            ..Default::default()
        };
        let row = db.update_profile(&uid, &changes).unwrap().unwrap();
        assert_eq!(row.full_name.as_deref(), Some("New User"));
        assert_eq!(row.phone.as_deref(), Some("012-3456789"));
        assert_eq!(row.experience_years, Some(4));
        assert!(db.update_profile(&id(), &changes).unwrap().is_none());
    }

    #[test]
    fn refresh_tokens_are_single_use() {
        let db = Database::open_in_memory().unwrap();
        let uid = id();
        db.create_user(&uid, "a@example.com", "hash").unwrap();
        db.insert_refresh_token("tok", &uid).unwrap();

        assert_eq!(db.take_refresh_token("tok").unwrap().as_deref(), Some(uid.as_str()));
        assert!(db.take_refresh_token("tok").unwrap().is_none());
    }
}
