//! Row → model conversions. Corrupt rows are logged and skipped.

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use uuid::Uuid;

use agrilink_db::models::{
    ApplicationRow, CommentRow, JobRow, MessageRow, PostRow, ProfileRow,
};
use agrilink_types::models::{Application, Comment, Job, Message, Post, Profile};

fn uuid(table: &str, column: &str, raw: &str) -> Option<Uuid> {
    raw.parse()
        .map_err(|e| warn!("Corrupt {}.{} '{}': {}", table, column, raw, e))
        .ok()
}

fn timestamp(table: &str, id: &str, raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // Rows written by hand through sqlite3 use "YYYY-MM-DD HH:MM:SS".
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .map_err(|e| warn!("Corrupt created_at '{}' on {} '{}': {}", raw, table, id, e))
        .ok()
}

pub fn profile(row: ProfileRow) -> Option<Profile> {
    Some(Profile {
        id: uuid("profiles", "id", &row.id)?,
        role: row
            .role
            .parse()
            .map_err(|e| warn!("Corrupt role on profile '{}': {}", row.id, e))
            .ok()?,
        full_name: row.full_name,
        phone: row.phone,
        bio: row.bio,
        experience_years: row.experience_years,
        experience_details: row.experience_details,
        resume_url: row.resume_url,
    })
}

pub fn job(row: JobRow) -> Option<Job> {
    Some(Job {
        id: uuid("jobs", "id", &row.id)?,
        farmer_id: uuid("jobs", "farmer_id", &row.farmer_id)?,
        created_at: timestamp("jobs", &row.id, &row.created_at)?,
        title: row.title,
        location: row.location,
        pay_rate: row.pay_rate,
        description: row.description,
    })
}

pub fn application(row: ApplicationRow) -> Option<Application> {
    Some(Application {
        id: uuid("applications", "id", &row.id)?,
        job_id: uuid("applications", "job_id", &row.job_id)?,
        worker_id: uuid("applications", "worker_id", &row.worker_id)?,
        status: row
            .status
            .parse()
            .map_err(|e| warn!("Corrupt status on application '{}': {}", row.id, e))
            .ok()?,
        created_at: timestamp("applications", &row.id, &row.created_at)?,
        applicant_name: row.applicant_name,
    })
}

pub fn post(row: PostRow) -> Option<Post> {
    Some(Post {
        id: uuid("posts", "id", &row.id)?,
        author_id: uuid("posts", "author_id", &row.author_id)?,
        created_at: timestamp("posts", &row.id, &row.created_at)?,
        content: row.content,
        author_name: row.author_name,
        author_role: row.author_role,
        likes: row.likes,
    })
}

pub fn comment(row: CommentRow) -> Option<Comment> {
    Some(Comment {
        id: uuid("comments", "id", &row.id)?,
        post_id: uuid("comments", "post_id", &row.post_id)?,
        user_id: uuid("comments", "user_id", &row.user_id)?,
        created_at: timestamp("comments", &row.id, &row.created_at)?,
        user_name: row.user_name,
        content: row.content,
    })
}

pub fn message(row: MessageRow) -> Option<Message> {
    Some(Message {
        id: uuid("messages", "id", &row.id)?,
        application_id: uuid("messages", "application_id", &row.application_id)?,
        sender_id: uuid("messages", "sender_id", &row.sender_id)?,
        created_at: timestamp("messages", &row.id, &row.created_at)?,
        content: row.content,
    })
}

pub fn ids_to_strings(ids: &[Uuid]) -> Vec<String> {
    ids.iter().map(Uuid::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_both_timestamp_shapes() {
        assert!(timestamp("jobs", "x", "2025-06-01T07:30:00.123456Z").is_some());
        assert!(timestamp("jobs", "x", "2025-06-01 07:30:00").is_some());
        assert!(timestamp("jobs", "x", "yesterday").is_none());
    }

    #[test]
    fn corrupt_rows_are_skipped() {
        let row = ApplicationRow {
            id: Uuid::new_v4().to_string(),
            job_id: "not-a-uuid".into(),
            worker_id: Uuid::new_v4().to_string(),
            status: "pending".into(),
            applicant_name: None,
            created_at: "2025-06-01T07:30:00Z".into(),
        };
        assert!(application(row).is_none());

        let row = ProfileRow {
            id: Uuid::new_v4().to_string(),
            role: "landlord".into(),
            full_name: None,
            phone: None,
            bio: None,
            experience_years: None,
            experience_details: None,
            resume_url: None,
        };
        assert!(profile(row).is_none());
    }
}
