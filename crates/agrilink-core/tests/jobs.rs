mod common;

use agrilink_core::{AppError, WorkerBoard};
use agrilink_types::api::NewJob;
use agrilink_types::models::{ApplicationStatus, UNKNOWN_WORKER};

use common::World;

#[tokio::test]
async fn farmer_view_merges_by_key() {
    let world = World::new();
    let farmer = world.farmer("Pak Hasan").await;
    let neighbour = world.farmer("Mak Som").await;
    let ani = world.worker("Ani").await;
    let budi = world.worker("Budi").await;

    let older = farmer.post_job("Weeding", "RM60/day").await;
    let newer = farmer.post_job("Paddy Harvest", "RM100/day").await;
    neighbour.post_job("Fruit picking", "RM70/day").await;

    for worker in [&ani, &budi] {
        let board = worker.services.jobs.worker_view(worker.user.user_id()).await.unwrap();
        worker.services.applications.apply(&worker.user, newer.id, &board).await.unwrap();
    }
    ani.services
        .applications
        .apply(&ani.user, older.id, &WorkerBoard::default())
        .await
        .unwrap();

    let view = farmer.services.jobs.farmer_view(farmer.user.user_id()).await.unwrap();
    let titles: Vec<&str> = view.iter().map(|j| j.job.title.as_str()).collect();
    assert_eq!(titles, ["Paddy Harvest", "Weeding"]);

    let names: Vec<&str> = view[0].applications.iter().map(|a| a.applicant_name()).collect();
    assert_eq!(names, ["Ani", "Budi"]);
    assert!(view[0].applications.iter().all(|a| a.job.id == newer.id));
    assert_eq!(view[1].applications.len(), 1);
    assert_eq!(view[1].applications[0].applicant_name(), "Ani");
}

#[tokio::test]
async fn applicant_without_profile_is_unknown_worker() {
    let world = World::new();
    let farmer = world.farmer("Pak Hasan").await;
    let worker = world.worker("Ani").await;
    let job = farmer.post_job("Paddy Harvest", "RM100/day").await;
    worker
        .services
        .applications
        .apply(&worker.user, job.id, &WorkerBoard::default())
        .await
        .unwrap();

    world.sql(&format!("DELETE FROM profiles WHERE id = '{}';", worker.user.user_id()));

    let view = farmer.services.jobs.farmer_view(farmer.user.user_id()).await.unwrap();
    let entry = &view[0].applications[0];
    assert!(entry.applicant.is_none());
    assert_eq!(entry.applicant_name(), UNKNOWN_WORKER);
}

#[tokio::test]
async fn dangling_applications_are_never_listed() {
    let world = World::new();
    let farmer = world.farmer("Pak Hasan").await;
    let worker = world.worker("Ani").await;
    let kept = farmer.post_job("Weeding", "RM60/day").await;
    let doomed = farmer.post_job("Paddy Harvest", "RM100/day").await;

    let board = WorkerBoard::default();
    let board = worker.services.applications.apply(&worker.user, kept.id, &board).await.unwrap();
    worker.services.applications.apply(&worker.user, doomed.id, &board).await.unwrap();

    // Remove the job without cascading, leaving its application behind.
    world.sql(&format!("DELETE FROM jobs WHERE id = '{}';", doomed.id));

    let board = worker.services.jobs.worker_view(worker.user.user_id()).await.unwrap();
    assert_eq!(board.applications.len(), 1);
    assert_eq!(board.applications[0].job.id, kept.id);
    assert_eq!(board.status_for(doomed.id), None);
    assert!(board.jobs.iter().all(|j| j.id != doomed.id));
}

#[tokio::test]
async fn delete_job_with_two_applicants() {
    let world = World::new();
    let farmer = world.farmer("Pak Hasan").await;
    let ani = world.worker("Ani").await;
    let budi = world.worker("Budi").await;
    let job = farmer.post_job("Paddy Harvest", "RM100/day").await;

    for worker in [&ani, &budi] {
        worker
            .services
            .applications
            .apply(&worker.user, job.id, &WorkerBoard::default())
            .await
            .unwrap();
    }

    // Declined: nothing happens.
    let declined = farmer.services.jobs.delete_job(&farmer.user, &job, |_| false).await.unwrap();
    assert!(declined.is_none());
    let view = farmer.services.jobs.farmer_view(farmer.user.user_id()).await.unwrap();
    assert_eq!(view[0].applications.len(), 2);

    let fresh = farmer
        .services
        .jobs
        .delete_job(&farmer.user, &job, |j| j.title == "Paddy Harvest")
        .await
        .unwrap()
        .unwrap();
    assert!(fresh.is_empty());

    for worker in [&ani, &budi] {
        let board = worker.services.jobs.worker_view(worker.user.user_id()).await.unwrap();
        assert!(board.jobs.is_empty());
        assert!(board.applications.is_empty());
    }

    // Gone now.
    let again = farmer.services.jobs.delete_job(&farmer.user, &job, |_| true).await;
    assert!(matches!(again, Err(AppError::NotFound { .. })));
}

#[tokio::test]
async fn only_the_owner_can_delete() {
    let world = World::new();
    let farmer = world.farmer("Pak Hasan").await;
    let neighbour = world.farmer("Mak Som").await;
    let job = farmer.post_job("Paddy Harvest", "RM100/day").await;

    let r = neighbour.services.jobs.delete_job(&neighbour.user, &job, |_| true).await;
    assert!(matches!(r, Err(AppError::NotFound { .. })));
    assert_eq!(farmer.services.jobs.farmer_view(farmer.user.user_id()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn post_job_requires_farmer_title_and_pay() {
    let world = World::new();
    let farmer = world.farmer("Pak Hasan").await;
    let worker = world.worker("Ani").await;

    let blank_pay = NewJob {
        title: "Weeding".into(),
        location: None,
        pay_rate: "  ".into(),
        description: None,
    };
    let r = farmer.services.jobs.post_job(&farmer.user, blank_pay.clone()).await;
    assert!(matches!(r, Err(AppError::Validation(_))));

    let r = worker.services.jobs.post_job(&worker.user, NewJob { pay_rate: "RM60".into(), ..blank_pay }).await;
    assert!(matches!(r, Err(AppError::WrongRole { .. })));

    let job = farmer.post_job(" Weeding ", "RM60/day").await;
    assert_eq!(job.title, "Weeding");
    assert_eq!(job.farmer_id, farmer.user.user_id());
    assert_eq!(
        worker.services.jobs.worker_view(worker.user.user_id()).await.unwrap().status_for(job.id),
        None::<ApplicationStatus>
    );
}
