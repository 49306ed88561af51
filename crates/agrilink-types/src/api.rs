use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Application, ApplicationStatus, Job, Post, Role};

// -- Auth --

/// JWT claims carried by access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix seconds.
    pub expires_at: i64,
    pub user: AuthUser,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now.timestamp()
    }
}

// -- Profiles --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProfile {
    pub id: Uuid,
    pub role: Role,
    pub full_name: String,
}

/// Editable profile fields. Role is not among them; `None` leaves a field as it is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_years: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub experience_details: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

// -- Jobs --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub title: String,
    pub location: Option<String>,
    pub pay_rate: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInsert {
    pub farmer_id: Uuid,
    #[serde(flatten)]
    pub job: NewJob,
}

// -- Applications --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewApplication {
    pub job_id: Uuid,
    pub worker_id: Uuid,
    pub applicant_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub status: ApplicationStatus,
}

/// An application row with its parent job embedded. `job` is `None` when the
/// job has been deleted underneath the application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationWithJob {
    #[serde(flatten)]
    pub application: Application,
    #[serde(rename = "jobs")]
    pub job: Option<Job>,
}

// -- Community --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPost {
    pub content: String,
    pub author_id: Uuid,
    pub author_name: String,
    pub author_role: String,
}

/// A post together with the ids of everyone who liked it.
#[derive(Debug, Clone, PartialEq)]
pub struct PostWithLikers {
    pub post: Post,
    pub liker_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewComment {
    pub post_id: Uuid,
    pub user_id: Uuid,
    pub user_name: Option<String>,
    pub content: String,
}

// -- Chat --

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub application_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_with_missing_job_deserializes() {
        let raw = serde_json::json!({
            "id": Uuid::new_v4(),
            "job_id": Uuid::new_v4(),
            "worker_id": Uuid::new_v4(),
            "status": "pending",
            "applicant_name": null,
            "created_at": "2025-03-01T08:00:00Z",
            "jobs": null,
        });
        let row: ApplicationWithJob = serde_json::from_value(raw).unwrap();
        assert!(row.job.is_none());
        assert_eq!(row.application.status, ApplicationStatus::Pending);
    }

    #[test]
    fn job_insert_flattens_fields() {
        let insert = JobInsert {
            farmer_id: Uuid::nil(),
            job: NewJob {
                title: "Paddy Harvest".into(),
                location: Some("Kedah".into()),
                pay_rate: "RM100/day".into(),
                description: None,
            },
        };
        let value = serde_json::to_value(&insert).unwrap();
        assert_eq!(value["title"], "Paddy Harvest");
        assert_eq!(value["farmer_id"], Uuid::nil().to_string());
    }
}
