//! Examiner-facing terminal front end for oral exams.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use exam_core::model::{ExamId, ExamineeId};
use exam_core::{ExtraPhaseLimit, PhaseDecisionPolicy};
use services::{Clock, ExamServices, LookupError};

mod examiner;
mod seed;

const DEFAULT_DB_URL: &str = "sqlite://exam.sqlite3";
const DEFAULT_LOG_FILTER: &str = "services=info,app=info";

#[derive(Parser)]
#[command(name = "oral-exam", version, about = "Adaptive scoring for oral exams")]
struct Cli {
    /// SQLite URL or file path
    #[arg(long = "db", env = "EXAM_DB_URL", default_value = DEFAULT_DB_URL, global = true)]
    db_url: String,

    /// Stop the extra phase after this many tie-break questions (rounds down)
    #[arg(long, env = "EXAM_MAX_EXTRA_QUESTIONS", global = true)]
    max_extra_questions: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an oral exam for one student
    Exam {
        #[arg(long)]
        student: ExamineeId,

        #[arg(long)]
        exam: ExamId,
    },

    /// List students, optionally filtered by name
    Students {
        #[arg(long)]
        search: Option<String>,
    },

    /// List exams
    Exams,

    /// Show the latest result of a student on an exam
    Result {
        #[arg(long)]
        student: ExamineeId,

        #[arg(long)]
        exam: ExamId,
    },

    /// Fill the database with a demo directory and question pool
    Seed,
}

fn normalize_sqlite_url(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed == "sqlite::memory:" || trimmed.starts_with("sqlite://") {
        return trimmed.to_string();
    }

    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

/// Creates the database file (and parent directories) so sqlx can open it.
fn prepare_sqlite_file(db_url: &str) -> anyhow::Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid --db value: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid --db value: {db_url}");
    }

    let path = Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
    }
    Ok(())
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let db_url = normalize_sqlite_url(&cli.db_url);
    prepare_sqlite_file(&db_url)?;

    let policy = PhaseDecisionPolicy::new(ExtraPhaseLimit::from_option(cli.max_extra_questions));
    let services = ExamServices::new_sqlite(&db_url, Clock::system(), policy)
        .await
        .with_context(|| format!("opening {db_url}"))?;
    tracing::debug!(db_url = %db_url, extra_limit = ?policy.extra_limit(), "services ready");

    match cli.command {
        Command::Exam { student, exam } => examiner::run(&services, student, exam).await,
        Command::Students { search } => {
            let students = services.directory().examinees(search.as_deref()).await?;
            if students.is_empty() {
                println!("No students found.");
            }
            for s in students {
                println!("{:>6}  {}", s.id, s.full_name);
            }
            Ok(())
        }
        Command::Exams => {
            for e in services.directory().exams().await? {
                let held_on = e
                    .held_on
                    .map_or_else(|| "-".to_string(), |d| d.format("%Y-%m-%d").to_string());
                println!("{:>6}  {:<10}  {}", e.id, held_on, e.name);
            }
            Ok(())
        }
        Command::Result { student, exam } => {
            match services.results().session_result(student, exam).await {
                Ok(record) => {
                    examiner::print_record(&record);
                    Ok(())
                }
                Err(LookupError::NoSession { .. }) => {
                    println!("Student {student} has not sat exam {exam}.");
                    Ok(())
                }
                Err(e) => Err(e.into()),
            }
        }
        Command::Seed => {
            let summary = seed::run(services.storage()).await?;
            println!("{summary} into {db_url}");
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_pass_through() {
        assert_eq!(normalize_sqlite_url("sqlite::memory:"), "sqlite::memory:");
        assert_eq!(
            normalize_sqlite_url(" sqlite:///tmp/exam.db "),
            "sqlite:///tmp/exam.db"
        );
    }

    #[test]
    fn bare_paths_become_absolute_urls() {
        assert_eq!(normalize_sqlite_url("/var/exam.db"), "sqlite:///var/exam.db");
        assert_eq!(normalize_sqlite_url("sqlite:/var/exam.db"), "sqlite:///var/exam.db");
        let relative = normalize_sqlite_url("exam.db");
        assert!(relative.starts_with("sqlite:///"));
        assert!(relative.ends_with("/exam.db"));
    }

    #[test]
    fn cli_reads_ids_and_cap() {
        let cli = Cli::try_parse_from([
            "oral-exam",
            "--max-extra-questions",
            "3",
            "exam",
            "--student",
            "12",
            "--exam",
            "4",
        ])
        .unwrap();
        assert_eq!(cli.max_extra_questions, Some(3));
        assert!(matches!(
            cli.command,
            Command::Exam { student, exam }
                if student == ExamineeId::new(12) && exam == ExamId::new(4)
        ));
    }

    #[test]
    fn cli_rejects_bad_ids() {
        assert!(Cli::try_parse_from(["oral-exam", "result", "--student", "x", "--exam", "1"]).is_err());
    }
}
