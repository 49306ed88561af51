/// Database row types — these map directly to SQLite rows.
/// Distinct from agrilink-types models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct ProfileRow {
    pub id: String,
    pub role: String,
    pub full_name: Option<String>,
    pub phone: Option<String>,
    pub bio: Option<String>,
    pub experience_years: Option<i32>,
    pub experience_details: Option<String>,
    pub resume_url: Option<String>,
}

/// Editable profile columns; `None` leaves a column untouched.
#[derive(Default)]
pub struct ProfileChanges<'a> {
    pub full_name: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub bio: Option<&'a str>,
    pub experience_years: Option<i32>,
    pub experience_details: Option<&'a str>,
    pub resume_url: Option<&'a str>,
}

pub struct JobRow {
    pub id: String,
    pub farmer_id: String,
    pub title: String,
    pub location: Option<String>,
    pub pay_rate: String,
    pub description: Option<String>,
    pub created_at: String,
}

#[derive(Debug)]
pub struct ApplicationRow {
    pub id: String,
    pub job_id: String,
    pub worker_id: String,
    pub status: String,
    pub applicant_name: Option<String>,
    pub created_at: String,
}

pub struct PostRow {
    pub id: String,
    pub content: String,
    pub author_id: String,
    pub author_name: String,
    pub author_role: String,
    pub likes: i64,
    pub created_at: String,
}

pub struct LikeRow {
    pub post_id: String,
    pub user_id: String,
}

pub struct CommentRow {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    pub user_name: Option<String>,
    pub content: String,
    pub created_at: String,
}

pub struct MessageRow {
    pub id: String,
    pub application_id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: String,
}

pub struct ObjectRow {
    pub bucket: String,
    pub key: String,
    pub content_type: String,
    pub data: Vec<u8>,
}
