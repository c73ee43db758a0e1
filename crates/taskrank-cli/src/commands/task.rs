//! Task management commands for CLI.
//!
//! These run without a server: each invocation loads the task file, applies
//! one operation and, for mutations, saves the file again before exiting.

use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use taskrank_core::{Config, Emotion, PersistenceGateway, QueryContext, Task, TaskService};
use uuid::Uuid;

/// Ranking inputs shared by the ranking commands.
#[derive(Args, Debug, Clone, Default)]
pub struct RankArgs {
    /// Minutes available right now (default: 30)
    #[arg(long)]
    free_min: Option<i64>,
    /// Stress level 1-5 (default: 3)
    #[arg(long)]
    stress: Option<i64>,
    /// Rank as of this RFC 3339 instant instead of now
    #[arg(long)]
    at: Option<DateTime<Utc>>,
}

impl RankArgs {
    fn context(&self) -> QueryContext {
        QueryContext::new(self.at.unwrap_or_else(Utc::now), self.free_min, self.stress)
    }
}

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add or replace a task
    Add {
        /// Task title
        title: String,
        /// Task ID (default: a fresh UUID)
        #[arg(long)]
        id: Option<String>,
        /// Emotional tag: pleasant, neutral or aversive
        #[arg(long, default_value = "neutral")]
        emotion: String,
        /// Estimated minutes
        #[arg(long, default_value = "30")]
        minutes: i64,
        /// Importance 1-5
        #[arg(long, default_value = "3")]
        importance: i64,
        /// Deadline, RFC 3339 (stored as given)
        #[arg(long)]
        due: Option<String>,
    },
    /// Get task details
    Get {
        /// Task ID
        id: String,
    },
    /// List tasks as stored
    List,
    /// List tasks ranked, with scores
    Order {
        #[command(flatten)]
        rank: RankArgs,
    },
    /// Show the single best task
    Next {
        #[command(flatten)]
        rank: RankArgs,
    },
    /// Explain a task's score term by term
    Explain {
        /// Task ID
        id: String,
        #[command(flatten)]
        rank: RankArgs,
    },
    /// Delete a task
    Delete {
        /// Task ID
        id: String,
    },
}

fn parse_emotion(raw: &str) -> Emotion {
    Emotion::from_tag(&raw.trim().to_ascii_uppercase())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn run(action: TaskAction, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let gateway = PersistenceGateway::new(config.data_file());
    let service = TaskService::open(&gateway);

    match action {
        TaskAction::Add {
            title,
            id,
            emotion,
            minutes,
            importance,
            due,
        } => {
            let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
            let mut task = Task::new(id, title)
                .with_emotion(parse_emotion(&emotion))
                .with_minutes(minutes)
                .with_importance(importance);
            if let Some(raw) = due {
                task = task.with_due_raw(raw);
            }
            let ack = service.upsert_task(task.clone())?;
            service.save_to(&gateway)?;
            eprintln!("Task saved: {} ({} total)", task.id, ack.count);
            print_json(&task)?;
        }
        TaskAction::Get { id } => match service.get_task(&id) {
            Some(task) => print_json(&task)?,
            None => return Err(format!("task not found: {id}").into()),
        },
        TaskAction::List => {
            let mut tasks = service.tasks();
            tasks.sort_by(|a, b| a.id.cmp(&b.id));
            print_json(&tasks)?;
        }
        TaskAction::Order { rank } => {
            print_json(&service.ranked(&rank.context()))?;
        }
        TaskAction::Next { rank } => match service.next_task(&rank.context()) {
            Some(task) => print_json(&task)?,
            None => eprintln!("No tasks."),
        },
        TaskAction::Explain { id, rank } => {
            print_json(&service.explain(&id, &rank.context())?)?;
        }
        TaskAction::Delete { id } => {
            let before = service.count();
            let ack = service.delete_task(&id);
            service.save_to(&gateway)?;
            if ack.count < before {
                eprintln!("Task deleted: {id}");
            } else {
                eprintln!("No task with id {id}; nothing deleted");
            }
            print_json(&ack)?;
        }
    }

    Ok(())
}
