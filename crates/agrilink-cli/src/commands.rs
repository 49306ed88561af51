use std::io::{self, BufRead, BufReader, Write};

use tracing::{error, warn};

use agrilink_core::{
    AppError, AppResult, FeedPost, JobWithApplicants, SessionState, Services, UserContext, ViewScope,
    WorkerBoard, read_pdf,
};
use agrilink_types::api::{NewJob, ProfileUpdate};
use agrilink_types::models::{Comment, Job, Message, Profile, Role};

use crate::{Command, ProfileAction};

pub(crate) async fn run(command: Command, services: &Services, scope: &ViewScope) -> AppResult<()> {
    match command {
        Command::Signup { email, password, role } => {
            scope.run(services.session.sign_up(&email, &password, role.into())).await?;
            println!("Account created! Please log in.");
        }
        Command::Login { email, password, role } => {
            let state = scope
                .run(services.session.sign_in(&email, &password, role.map(Into::into)))
                .await?;
            match state {
                SessionState::Ready(user) => println!("Welcome, {} ({}).", user.profile.display_name(), user.role()),
                SessionState::IncompleteSignup(_) => {
                    println!("Signed in, but your profile is missing. Log in again with --role farmer|worker.")
                }
                SessionState::SignedOut | SessionState::Unreachable(_) => {}
            }
        }
        Command::Logout => {
            scope.run(services.session.sign_out()).await?;
            println!("Signed out.");
        }
        Command::ResetPassword { email } => {
            scope.run(services.session.send_password_reset(&email)).await?;
            println!("Password reset link sent to {}", email.trim());
        }
        Command::Whoami => {
            let user = signed_in(services, scope).await?;
            println!("{} <{}>", user.profile.display_name(), user.session.user.email);
            print_profile(&user.profile);
        }
        Command::Jobs => {
            let user = signed_in(services, scope).await?;
            match user.role() {
                Role::Farmer => {
                    let view = scope.run(services.jobs.farmer_view(user.user_id())).await?;
                    print_farmer_view(&view);
                }
                Role::Worker => {
                    let board = scope.run(services.jobs.worker_view(user.user_id())).await?;
                    print_worker_board(&board);
                }
            }
        }
        Command::PostJob { title, pay, location, description } => {
            let user = signed_in(services, scope).await?;
            let job = NewJob { title, pay_rate: pay, location, description };
            let job = scope.run(services.jobs.post_job(&user, job)).await?;
            println!("Job Posted! {}", job.id);
        }
        Command::DeleteJob { job, yes } => {
            let user = signed_in(services, scope).await?;
            let view = scope.run(services.jobs.farmer_view(user.user_id())).await?;
            let job = view
                .into_iter()
                .map(|j| j.job)
                .find(|j| j.id == job)
                .ok_or_else(|| AppError::not_found("job", job))?;

            let agreed = yes
                || ask(
                    format!("Delete '{}' and all its applications?", job.title),
                    BufReader::new(io::stdin()),
                )
                .await;
            let fresh = scope
                .run(services.jobs.delete_job(&user, &job, |_| agreed))
                .await?;
            match fresh {
                Some(view) => {
                    println!("Deleted '{}'.", job.title);
                    print_farmer_view(&view);
                }
                None => println!("Kept '{}'.", job.title),
            }
        }
        Command::Apply { job } => {
            let user = signed_in(services, scope).await?;
            let board = scope.run(services.jobs.worker_view(user.user_id())).await?;
            let board = scope.run(services.applications.apply(&user, job, &board)).await?;
            println!("Application Sent!");
            print_worker_board(&board);
        }
        Command::Decide { application, decision } => {
            let user = signed_in(services, scope).await?;
            let mut view = scope.run(services.jobs.farmer_view(user.user_id())).await?;
            let updated = scope
                .run(services.applications.update_status(&user, &mut view, application, decision.into()))
                .await?;
            println!("Application {} is now {}.", updated.id, updated.status);
        }
        Command::Feed => {
            let user = signed_in(services, scope).await?;
            let feed = scope.run(services.posts.list(user.user_id())).await?;
            print_feed(&feed);
        }
        Command::Post { content } => {
            let user = signed_in(services, scope).await?;
            let feed = scope.run(services.posts.create_post(&user, &content)).await?;
            println!("Posted!");
            print_feed(&feed);
        }
        Command::Like { post } => {
            let user = signed_in(services, scope).await?;
            let mut feed = scope.run(services.posts.list(user.user_id())).await?;
            scope
                .run(services.posts.toggle_like(user.user_id(), &mut feed, post))
                .await?;
            if let Some(p) = feed.iter().find(|p| p.post.id == post) {
                let verb = if p.liked_by_me { "Liked" } else { "Unliked" };
                println!("{}. {} likes.", verb, p.post.likes);
            }
        }
        Command::Comments { post } => {
            signed_in(services, scope).await?;
            let comments = scope.run(services.posts.open_comments(post)).await?;
            print_comments(&comments);
        }
        Command::Comment { post, content } => {
            let user = signed_in(services, scope).await?;
            let comments = scope.run(services.posts.post_comment(&user, post, &content)).await?;
            print_comments(&comments);
        }
        Command::Profile { action: ProfileAction::Show } => {
            let user = signed_in(services, scope).await?;
            let profile = scope.run(services.profiles.fetch(user.user_id())).await?;
            print_profile(&profile);
        }
        Command::Profile { action: ProfileAction::Edit { name, phone, bio, years, details } } => {
            let user = signed_in(services, scope).await?;
            let update = ProfileUpdate {
                full_name: name,
                phone,
                bio,
                experience_years: years,
                experience_details: details,
            };
            if update.is_empty() {
                return Err(AppError::Validation("Nothing to change.".into()));
            }
            let profile = scope.run(services.profiles.update(user.user_id(), update)).await?;
            println!("Profile Updated!");
            print_profile(&profile);
        }
        Command::Resume { path } => {
            let mut user = signed_in(services, scope).await?;
            let file = read_pdf(&path).await?;
            let profile = scope.run(services.resumes.upload(&mut user, file)).await?;
            println!("Resume Uploaded! {}", profile.resume_url.unwrap_or_default());
        }
        Command::Chat { application } => {
            let user = signed_in(services, scope).await?;
            let messages = scope.run(services.chat.open(&user, application)).await?;
            print_messages(&messages);
        }
        Command::Say { application, text } => {
            let user = signed_in(services, scope).await?;
            let messages = scope.run(services.chat.send(&user, application, &text)).await?;
            print_messages(&messages);
        }
    }
    Ok(())
}

async fn signed_in(services: &Services, scope: &ViewScope) -> AppResult<UserContext> {
    match scope.run(async { Ok::<_, AppError>(services.session.resolve().await) }).await? {
        SessionState::Ready(user) => Ok(user),
        SessionState::SignedOut => Err(AppError::Validation(
            "You are not signed in. Run `agrilink login` first.".into(),
        )),
        SessionState::IncompleteSignup(_) => Err(AppError::Validation(
            "Your profile is missing. Run `agrilink login --role farmer|worker`.".into(),
        )),
        SessionState::Unreachable(reason) => Err(AppError::Unreachable(reason)),
    }
}

/// Ask a yes/no question on stdout. The answer is read off the runtime so a
/// waiting prompt does not hold up Ctrl-C.
async fn ask<R>(question: String, mut input: R) -> bool
where
    R: BufRead + Send + 'static,
{
    print!("{} [y/N] ", question);
    if io::stdout().flush().is_err() {
        return false;
    }
    let answer = tokio::task::spawn_blocking(move || {
        let mut line = String::new();
        input.read_line(&mut line).map(|_| line)
    })
    .await;
    match answer {
        Ok(Ok(line)) => matches!(line.trim(), "y" | "Y" | "yes"),
        Ok(Err(e)) => {
            warn!("Could not read the answer: {}", e);
            false
        }
        Err(e) => {
            error!("spawn_blocking join error: {}", e);
            false
        }
    }
}

fn print_job(job: &Job) {
    println!(
        "{}  {}  {}  {}",
        job.id,
        job.title,
        job.pay_rate,
        job.location.as_deref().unwrap_or("-")
    );
    if let Some(d) = &job.description {
        println!("    {}", d);
    }
}

fn print_farmer_view(view: &[JobWithApplicants]) {
    if view.is_empty() {
        println!("You have not posted any jobs.");
    }
    for entry in view {
        print_job(&entry.job);
        for a in &entry.applications {
            println!("    {}  {:<20} {}", a.application.id, a.applicant_name(), a.application.status);
        }
    }
}

fn print_worker_board(board: &WorkerBoard) {
    if board.jobs.is_empty() {
        println!("No jobs posted yet.");
    }
    for job in &board.jobs {
        print_job(job);
        match board.status_for(job.id) {
            Some(status) => println!("    applied: {}", status),
            None => println!("    not applied"),
        }
    }
}

fn print_feed(feed: &[FeedPost]) {
    for p in feed {
        let heart = if p.liked_by_me { "♥" } else { "♡" };
        println!(
            "{}  {} ({})  {} {}",
            p.post.id, p.post.author_name, p.post.author_role, heart, p.post.likes
        );
        println!("    {}", p.post.content);
    }
}

fn print_comments(comments: &[Comment]) {
    if comments.is_empty() {
        println!("No comments yet.");
    }
    for c in comments {
        println!("{}: {}", c.user_name.as_deref().unwrap_or("Anonymous"), c.content);
    }
}

fn print_messages(messages: &[Message]) {
    for m in messages {
        println!("[{}] {}: {}", m.created_at.format("%Y-%m-%d %H:%M"), m.sender_id, m.content);
    }
}

fn print_profile(profile: &Profile) {
    println!("role:       {}", profile.role);
    println!("name:       {}", profile.display_name());
    println!("phone:      {}", profile.phone.as_deref().unwrap_or("-"));
    println!("bio:        {}", profile.bio.as_deref().unwrap_or("-"));
    match profile.experience_years {
        Some(y) => println!("experience: {} years", y),
        None => println!("experience: -"),
    }
    if let Some(d) = &profile.experience_details {
        println!("            {}", d);
    }
    println!("resume:     {}", profile.resume_url.as_deref().unwrap_or("-"));
}
