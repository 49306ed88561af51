mod common;

use bytes::Bytes;

use agrilink_core::{AppError, PickedFile, WorkerBoard};
use agrilink_types::api::ProfileUpdate;
use agrilink_types::models::ApplicationStatus;

use common::{BUCKET, World};

fn pdf(name: &str) -> PickedFile {
    PickedFile {
        name: name.into(),
        content_type: "application/pdf".into(),
        data: Bytes::from_static(b"%PDF-1.4\n1 0 obj <<>> endobj\n%%EOF"),
    }
}

#[tokio::test]
async fn profile_update_round_trips() {
    let world = World::new();
    let worker = world.worker("Ani").await;

    let update = ProfileUpdate {
        full_name: Some("Ani Rahman".into()),
        phone: Some("+60 12-345 6789".into()),
        bio: Some("Five seasons on paddy fields".into()),
        experience_years: Some(5),
        experience_details: Some("Harvesting, threshing".into()),
    };
    let saved = worker.services.profiles.update(worker.user.user_id(), update.clone()).await.unwrap();
    let fetched = worker.services.profiles.fetch(worker.user.user_id()).await.unwrap();
    assert_eq!(saved, fetched);
    assert_eq!(fetched.full_name, update.full_name);
    assert_eq!(fetched.phone, update.phone);
    assert_eq!(fetched.bio, update.bio);
    assert_eq!(fetched.experience_years, Some(5));
    assert_eq!(fetched.experience_details, update.experience_details);
    assert_eq!(fetched.role, worker.user.role());

    // Untouched fields stay.
    let partial = ProfileUpdate { bio: Some("Now also durian".into()), ..Default::default() };
    let fetched = worker.services.profiles.update(worker.user.user_id(), partial).await.unwrap();
    assert_eq!(fetched.phone.as_deref(), Some("+60 12-345 6789"));

    let bad = ProfileUpdate { experience_years: Some(-1), ..Default::default() };
    assert!(matches!(
        worker.services.profiles.update(worker.user.user_id(), bad).await,
        Err(AppError::Validation(_))
    ));
}

#[tokio::test]
async fn resume_upload_updates_profile() {
    let world = World::new();
    let mut worker = world.worker("Ani").await;
    let id = worker.user.user_id();

    let profile = worker.services.resumes.upload(&mut worker.user, pdf("cv.pdf")).await.unwrap();
    let url = profile.resume_url.clone().unwrap();
    assert!(url.starts_with(&format!("local://{}/{}_", BUCKET, id)));
    assert!(url.ends_with(".pdf"));
    assert_eq!(worker.user.profile, profile);

    let key = url.trim_start_matches(&format!("local://{}/", BUCKET));
    let stored = world.db.get_object(BUCKET, key).unwrap().unwrap();
    assert_eq!(stored.content_type, "application/pdf");
}

#[tokio::test]
async fn non_pdf_is_refused_before_upload() {
    let world = World::new();
    let mut worker = world.worker("Ani").await;
    let before = worker.user.clone();

    let png = PickedFile {
        name: "photo.png".into(),
        content_type: "image/png".into(),
        data: Bytes::from_static(b"\x89PNG\r\n"),
    };
    let r = worker.services.resumes.upload(&mut worker.user, png).await;
    assert!(matches!(r, Err(AppError::Validation(_))));
    assert_eq!(worker.user, before);

    let count: i64 = world
        .db
        .with_conn(|c| Ok(c.query_row("SELECT COUNT(*) FROM objects", [], |r| r.get(0))?))
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn failed_profile_write_removes_orphan() {
    let world = World::new();
    let mut worker = world.worker("Ani").await;
    let before = worker.user.clone();

    world.sql(&format!("DELETE FROM profiles WHERE id = '{}';", worker.user.user_id()));

    let r = worker.services.resumes.upload(&mut worker.user, pdf("cv.pdf")).await;
    assert!(matches!(r, Err(AppError::NotFound { .. })));
    assert_eq!(worker.user, before);

    let count: i64 = world
        .db
        .with_conn(|c| Ok(c.query_row("SELECT COUNT(*) FROM objects", [], |r| r.get(0))?))
        .unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn chat_opens_on_acceptance_for_the_two_parties() {
    let world = World::new();
    let farmer = world.farmer("Pak Hasan").await;
    let worker = world.worker("Ani").await;
    let outsider = world.worker("Budi").await;

    let job = farmer.post_job("Paddy Harvest", "RM100/day").await;
    worker
        .services
        .applications
        .apply(&worker.user, job.id, &WorkerBoard::default())
        .await
        .unwrap();
    let mut view = farmer.services.jobs.farmer_view(farmer.user.user_id()).await.unwrap();
    let app_id = view[0].applications[0].application.id;

    let r = worker.services.chat.send(&worker.user, app_id, "Hello").await;
    assert!(matches!(r, Err(AppError::Validation(_))));
    let r = worker.services.chat.open(&worker.user, app_id).await;
    assert!(matches!(r, Err(AppError::Validation(_))));

    farmer
        .services
        .applications
        .update_status(&farmer.user, &mut view, app_id, ApplicationStatus::Accepted)
        .await
        .unwrap();

    worker.services.chat.send(&worker.user, app_id, "Terima kasih!").await.unwrap();
    let thread = farmer.services.chat.send(&farmer.user, app_id, "See you at 7").await.unwrap();
    let lines: Vec<&str> = thread.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(lines, ["Terima kasih!", "See you at 7"]);
    assert_eq!(thread[0].sender_id, worker.user.user_id());

    let r = outsider.services.chat.send(&outsider.user, app_id, "Me too?").await;
    assert!(matches!(r, Err(AppError::Validation(_))));
    let r = worker.services.chat.send(&worker.user, app_id, "   ").await;
    assert!(matches!(r, Err(AppError::Validation(_))));

    // The thread is private to the two parties.
    let r = outsider.services.chat.open(&outsider.user, app_id).await;
    assert!(matches!(r, Err(AppError::Validation(_))));

    assert_eq!(worker.services.chat.open(&worker.user, app_id).await.unwrap(), thread);
    assert_eq!(farmer.services.chat.open(&farmer.user, app_id).await.unwrap(), thread);
}
