mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;
use uuid::Uuid;

use agrilink_core::{AppError, Services, ViewScope};
use agrilink_types::models::{ApplicationStatus, Role};

use crate::config::Config;

#[derive(Debug, Parser)]
#[command(name = "agrilink")]
#[command(about = "Post farm jobs, apply to them, and talk shop with the community")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum RoleArg {
    Farmer,
    Worker,
}

impl From<RoleArg> for Role {
    fn from(r: RoleArg) -> Self {
        match r {
            RoleArg::Farmer => Role::Farmer,
            RoleArg::Worker => Role::Worker,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Decision {
    Accept,
    Reject,
}

impl From<Decision> for ApplicationStatus {
    fn from(d: Decision) -> Self {
        match d {
            Decision::Accept => ApplicationStatus::Accepted,
            Decision::Reject => ApplicationStatus::Rejected,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create an account as a farmer or a worker
    Signup {
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, value_enum)]
        role: RoleArg,
    },
    /// Sign in. --role completes a signup whose profile was never created
    Login {
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long, value_enum)]
        role: Option<RoleArg>,
    },
    Logout,
    /// Email a password reset link
    ResetPassword { email: String },
    /// Show who is signed in
    Whoami,
    /// Your jobs and applicants (farmer) or all jobs and your applications (worker)
    Jobs,
    PostJob {
        #[arg(long)]
        title: String,
        /// e.g. "RM100/day"
        #[arg(long)]
        pay: String,
        #[arg(long)]
        location: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// Delete one of your jobs and every application to it
    DeleteJob {
        job: Uuid,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    Apply { job: Uuid },
    /// Accept or reject an application to one of your jobs
    Decide {
        application: Uuid,
        #[arg(value_enum)]
        decision: Decision,
    },
    /// Community posts, newest first
    Feed,
    Post { content: String },
    /// Like a post, or take the like back
    Like { post: Uuid },
    Comments { post: Uuid },
    Comment { post: Uuid, content: String },
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    /// Upload a PDF resume
    Resume { path: PathBuf },
    /// Messages on an accepted application
    Chat { application: Uuid },
    Say { application: Uuid, text: String },
}

#[derive(Debug, Subcommand)]
enum ProfileAction {
    Show,
    Edit {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        bio: Option<String>,
        #[arg(long)]
        years: Option<i32>,
        #[arg(long)]
        details: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Logs go to stderr; stdout is the command's output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "agrilink=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {:#}", e);
            eprintln!("       Set it in your .env file and try again.");
            std::process::exit(2);
        }
    };
    let services = Services::new(config.connect()?, config.resume_bucket.clone());

    let scope = ViewScope::new();
    let outcome = tokio::select! {
        r = commands::run(cli.command, &services, &scope) => r,
        _ = tokio::signal::ctrl_c() => {
            scope.close();
            Err(AppError::Cancelled)
        }
    };

    if let Err(e) = outcome {
        error!("{}", e);
        eprintln!("{}", e.notice());
        std::process::exit(1);
    }
    Ok(())
}
