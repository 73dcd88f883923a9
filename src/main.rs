use chrono::{Local, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use colored::{ColoredString, Colorize};
use eyre::{Context, Result, bail, eyre};
use std::fs;
use std::path::PathBuf;
use taskkeep::config::{Backend, Config};
use taskkeep::dates::{format_date, parse_due_date, relative_time};
use taskkeep::models::{DEFAULT_CATEGORY_COLOR, is_hex_color};
use taskkeep::{
    CategoryPatch, DueBucket, Filter, ImportPayload, NewCategory, NewTask, Priority, SortKey, Status, StoreError, SubTask,
    Task, TaskPatch, TaskStore, Theme,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(name = "taskkeep")]
#[command(about = "taskkeep - personal task tracker with categories and JSON import/export")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Config file (default: <config dir>/taskkeep/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Override the storage backend
    #[arg(long, global = true, value_enum)]
    backend: Option<Backend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a task
    Add {
        title: String,
        /// Due date, YYYY-MM-DD or RFC 3339
        #[arg(short, long)]
        due: String,
        #[arg(short = 'D', long)]
        description: Option<String>,
        #[arg(short, long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        #[arg(short, long, value_enum, default_value_t = Status::Pending)]
        status: Status,
        /// Category id or name
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short, long)]
        notes: Option<String>,
        /// Checklist item (repeatable)
        #[arg(long = "subtask")]
        subtasks: Vec<String>,
    },

    /// List tasks, optionally filtered and sorted
    List {
        #[arg(long, value_enum)]
        status: Option<Status>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        /// Category id or name
        #[arg(long)]
        category: Option<String>,
        /// Case-insensitive text in title or description
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum)]
        due: Option<DueBucket>,
        /// dueDate, priority, title or createdAt
        #[arg(long)]
        sort: Option<String>,
    },

    /// Show one task in full
    Show { id: String },

    /// Change fields of a task
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        due: Option<String>,
        #[arg(long, value_enum)]
        priority: Option<Priority>,
        #[arg(long, value_enum)]
        status: Option<Status>,
        /// Category id or name
        #[arg(long, conflicts_with = "no_category")]
        category: Option<String>,
        /// Detach the task from its category
        #[arg(long)]
        no_category: bool,
        #[arg(long)]
        notes: Option<String>,
    },

    /// Toggle a task between completed and pending
    Done { id: String },

    /// Delete a task
    Rm { id: String },

    /// Manage a task's checklist
    Subtask {
        #[command(subcommand)]
        command: SubtaskCommand,
    },

    /// Manage categories
    Category {
        #[command(subcommand)]
        command: CategoryCommand,
    },

    /// Show task statistics
    Stats,

    /// Show recently created, updated and completed tasks
    Recent {
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },

    /// Write all tasks and categories to a JSON file
    Export {
        /// Output file or directory (default: current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Replace tasks and/or categories from an exported JSON file
    Import { file: PathBuf },

    /// Delete all stored tasks and categories (theme is kept)
    Clear {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },

    /// Show or change the color theme
    Theme {
        #[arg(value_enum)]
        mode: Option<ThemeArg>,
    },
}

#[derive(Subcommand)]
enum SubtaskCommand {
    Add { task_id: String, text: String },
    Toggle { task_id: String, subtask_id: String },
    Rm { task_id: String, subtask_id: String },
}

#[derive(Subcommand)]
enum CategoryCommand {
    List,
    Add {
        name: String,
        #[arg(short, long, default_value = DEFAULT_CATEGORY_COLOR)]
        color: String,
    },
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    Rm {
        id: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ThemeArg {
    Light,
    Dark,
    Toggle,
}

fn main() -> Result<()> {
    // Tracing is opt-in via RUST_LOG and goes to stderr
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| EnvFilter::try_new(raw.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli)?;
    let mut store = config.open_store()?;

    run(cli.command, &config, &mut store)?;
    store.close()?;
    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match cli.config.clone().or_else(Config::default_path) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    if let Some(backend) = cli.backend {
        config.backend = backend;
    }
    Ok(config)
}

fn run(command: Commands, config: &Config, store: &mut TaskStore) -> Result<()> {
    match command {
        Commands::Add {
            title,
            due,
            description,
            priority,
            status,
            category,
            notes,
            subtasks,
        } => {
            let category_id = category.map(|c| resolve_category(store, &c)).transpose()?;
            let new = NewTask {
                title,
                description,
                due_date: Some(parse_due_date(&due, &Local)?),
                priority,
                status,
                category_id,
                sub_tasks: subtasks.into_iter().map(SubTask::new).collect(),
                notes,
            };
            new.validate()?;

            let task = store.add_task(new)?;
            println!("Created task {}", short_id(&task.id).bold());
        }

        Commands::List {
            status,
            priority,
            category,
            search,
            due,
            sort,
        } => {
            let filter = Filter {
                status,
                priority,
                category_id: category.map(|c| resolve_category(store, &c)).transpose()?,
                search,
                due,
            };
            let key = sort.as_deref().map(SortKey::parse).unwrap_or(config.default_sort);

            let tasks = store.sort_tasks(&store.filter_tasks(&filter), key);
            if tasks.is_empty() {
                println!("No tasks found");
            }
            for task in &tasks {
                print_task_line(store, task);
            }
        }

        Commands::Show { id } => {
            let id = resolve_task(store, &id)?;
            let task = store.get_task(&id).ok_or_else(|| eyre!("Task {} not found", id))?;
            print_task_detail(store, task);
        }

        Commands::Edit {
            id,
            title,
            description,
            due,
            priority,
            status,
            category,
            no_category,
            notes,
        } => {
            let id = resolve_task(store, &id)?;
            if title.as_deref().is_some_and(|t| t.trim().is_empty()) {
                return Err(StoreError::validation("title", "Title is required").into());
            }

            let category_id = if no_category {
                Some(None)
            } else {
                category.map(|c| resolve_category(store, &c).map(Some)).transpose()?
            };
            let patch = TaskPatch {
                title,
                description: description.map(Some),
                due_date: due.map(|d| parse_due_date(&d, &Local).map(Some)).transpose()?,
                priority,
                status,
                category_id,
                sub_tasks: None,
                notes: notes.map(Some),
            };
            if patch.is_empty() {
                bail!("Nothing to change");
            }

            store.update_task(&id, patch)?;
            println!("Updated task {}", short_id(&id).bold());
        }

        Commands::Done { id } => {
            let id = resolve_task(store, &id)?;
            if let Some(task) = store.toggle_complete(&id)? {
                println!("{} is now {}", task.title, status_label(task.status));
            }
        }

        Commands::Rm { id } => {
            let id = resolve_task(store, &id)?;
            if let Some(task) = store.delete_task(&id)? {
                println!("Deleted task '{}'", task.title);
            }
        }

        Commands::Subtask { command } => run_subtask(command, store)?,

        Commands::Category { command } => run_category(command, store)?,

        Commands::Stats => print_stats(store),

        Commands::Recent { limit } => {
            for activity in store.recent_activity(limit) {
                println!(
                    "{:<10} {}  {}",
                    format!("{:?}", activity.kind).as_str().cyan(),
                    activity.task.title,
                    format_date(activity.at, &Local).as_str().dimmed()
                );
            }
        }

        Commands::Export { output } => {
            let data = store.export_data();
            let path = match output {
                Some(p) if p.is_dir() => p.join(data.file_name()),
                Some(p) => p,
                None => PathBuf::from(data.file_name()),
            };
            fs::write(&path, data.to_pretty_json()?).wrap_err_with(|| format!("Failed to write {}", path.display()))?;
            println!(
                "Exported {} tasks and {} categories to {}",
                data.tasks.len(),
                data.categories.len(),
                path.display()
            );
        }

        Commands::Import { file } => {
            let text = fs::read_to_string(&file).wrap_err_with(|| format!("Failed to read {}", file.display()))?;
            let payload = ImportPayload::from_json(&text).wrap_err("Import failed")?;
            store.import_data(payload)?;
            println!(
                "Imported data: {} tasks, {} categories",
                store.tasks().len(),
                store.categories().len()
            );
        }

        Commands::Clear { yes } => {
            if !yes {
                bail!("This deletes all tasks and categories; re-run with --yes to confirm");
            }
            store.clear_persisted()?;
            println!("All data cleared");
        }

        Commands::Theme { mode } => {
            let current = Theme::load(store.kv());
            let next = match mode {
                None => {
                    println!("{}", current);
                    return Ok(());
                }
                Some(ThemeArg::Light) => Theme::Light,
                Some(ThemeArg::Dark) => Theme::Dark,
                Some(ThemeArg::Toggle) => current.toggled(),
            };
            next.save(store.kv_mut())?;
            println!("Theme set to {}", next);
        }
    }

    Ok(())
}

fn run_subtask(command: SubtaskCommand, store: &mut TaskStore) -> Result<()> {
    match command {
        SubtaskCommand::Add { task_id, text } => {
            let task_id = resolve_task(store, &task_id)?;
            if let Some(sub) = store.add_subtask(&task_id, &text)? {
                println!("Added subtask {}", short_id(&sub.id).bold());
            }
        }
        SubtaskCommand::Toggle { task_id, subtask_id } => {
            let task_id = resolve_task(store, &task_id)?;
            let subtask_id = resolve_subtask(store, &task_id, &subtask_id)?;
            if let Some(sub) = store.toggle_subtask(&task_id, &subtask_id)? {
                println!("{} {}", checkbox(sub.completed), sub.text);
            }
        }
        SubtaskCommand::Rm { task_id, subtask_id } => {
            let task_id = resolve_task(store, &task_id)?;
            let subtask_id = resolve_subtask(store, &task_id, &subtask_id)?;
            if let Some(sub) = store.remove_subtask(&task_id, &subtask_id)? {
                println!("Removed subtask '{}'", sub.text);
            }
        }
    }
    Ok(())
}

fn run_category(command: CategoryCommand, store: &mut TaskStore) -> Result<()> {
    match command {
        CategoryCommand::List => {
            let stats = store.statistics();
            for category in store.categories() {
                let count = stats.by_category_id.get(&category.id).copied().unwrap_or(0);
                println!("{:<12} {:<20} {} ({} tasks)", category.id, category.name, category.color, count);
            }
        }
        CategoryCommand::Add { name, color } => {
            let new = NewCategory::new(name, color);
            new.validate()?;
            let category = store.add_category(new)?;
            println!("Created category {} ({})", category.name.bold(), category.id);
        }
        CategoryCommand::Edit { id, name, color } => {
            let id = resolve_category(store, &id)?;
            if name.as_deref().is_some_and(|n| n.trim().is_empty()) {
                return Err(StoreError::validation("name", "Category name is required").into());
            }
            if color.as_deref().is_some_and(|c| !is_hex_color(c)) {
                return Err(StoreError::validation("color", "Color must be a hex value like #3f51b5").into());
            }
            if let Some(category) = store.update_category(&id, CategoryPatch { name, color })? {
                println!("Updated category {}", category.name.bold());
            }
        }
        CategoryCommand::Rm { id } => {
            let id = resolve_category(store, &id)?;
            if let Some(category) = store.delete_category(&id)? {
                println!("Deleted category '{}'", category.name);
            }
        }
    }
    Ok(())
}

// ============================================================================
// Id resolution
// ============================================================================

/// Exact id, or a unique id prefix
fn resolve_task(store: &TaskStore, input: &str) -> Result<String> {
    if store.get_task(input).is_some() {
        return Ok(input.to_string());
    }
    unique_prefix(store.tasks().iter().map(|t| t.id.as_str()), input, "task")
}

fn resolve_subtask(store: &TaskStore, task_id: &str, input: &str) -> Result<String> {
    let task = store.get_task(task_id).ok_or_else(|| eyre!("Task {} not found", task_id))?;
    unique_prefix(task.sub_tasks.iter().map(|s| s.id.as_str()), input, "subtask")
}

/// Category id, unique id prefix, or case-insensitive name
fn resolve_category(store: &TaskStore, input: &str) -> Result<String> {
    if store.get_category(input).is_some() {
        return Ok(input.to_string());
    }
    if let Some(category) = store.categories().iter().find(|c| c.name.eq_ignore_ascii_case(input)) {
        return Ok(category.id.clone());
    }
    unique_prefix(store.categories().iter().map(|c| c.id.as_str()), input, "category")
}

fn unique_prefix<'a>(ids: impl Iterator<Item = &'a str>, input: &str, kind: &str) -> Result<String> {
    let matches: Vec<&str> = ids.filter(|id| id.starts_with(input)).collect();
    match matches.as_slice() {
        [id] => Ok(id.to_string()),
        [] => Err(eyre!("No {} matches '{}'", kind, input)),
        _ => Err(eyre!("'{}' matches {} {}s, use a longer prefix", input, matches.len(), kind)),
    }
}

// ============================================================================
// Rendering
// ============================================================================

fn short_id(id: &str) -> &str {
    id.get(..13).unwrap_or(id)
}

fn checkbox(done: bool) -> ColoredString {
    if done { "[x]".green() } else { "[ ]".normal() }
}

fn status_label(status: Status) -> ColoredString {
    match status {
        Status::Pending => status.as_str().yellow(),
        Status::InProgress => status.as_str().blue(),
        Status::Completed => status.as_str().green(),
    }
}

fn priority_label(priority: Priority) -> ColoredString {
    match priority {
        Priority::High => priority.as_str().red().bold(),
        Priority::Medium => priority.as_str().yellow(),
        Priority::Low => priority.as_str().dimmed(),
    }
}

fn due_label(task: &Task) -> String {
    match task.due_date {
        Some(due) => format!("{} ({})", format_date(due, &Local), relative_time(due, &Utc::now())),
        None => "no due date".to_string(),
    }
}

fn print_task_line(store: &TaskStore, task: &Task) {
    let category = store.category_for(task).map(|c| c.name.as_str()).unwrap_or("-");
    let (done, total) = task.subtask_progress();
    let progress = if total > 0 {
        format!(" {}/{}", done, total)
    } else {
        String::new()
    };

    println!(
        "{} {} {} [{}] {} {}{}",
        short_id(&task.id).dimmed(),
        checkbox(task.is_completed()),
        task.title,
        priority_label(task.priority),
        category.cyan(),
        due_label(task).as_str().dimmed(),
        progress
    );
}

fn print_task_detail(store: &TaskStore, task: &Task) {
    println!("{}", task.title.bold());
    println!("  id:        {}", task.id);
    println!("  status:    {}", status_label(task.status));
    println!("  priority:  {}", priority_label(task.priority));
    println!(
        "  category:  {}",
        store.category_for(task).map(|c| c.name.as_str()).unwrap_or("-")
    );
    println!("  due:       {}", due_label(task));
    println!("  created:   {}", format_date(task.created_at, &Local));
    if let Some(updated) = task.updated_at {
        println!("  updated:   {}", format_date(updated, &Local));
    }
    if let Some(description) = &task.description {
        println!("\n{}", description);
    }
    if !task.sub_tasks.is_empty() {
        println!();
        for sub in &task.sub_tasks {
            println!("  {} {} {}", checkbox(sub.completed), sub.text, short_id(&sub.id).dimmed());
        }
    }
    if let Some(notes) = &task.notes {
        println!("\nNotes: {}", notes);
    }
}

fn print_stats(store: &TaskStore) {
    let stats = store.statistics();

    println!("Total:        {}", stats.total);
    println!("Completed:    {}", stats.completed.to_string().as_str().green());
    println!("Pending:      {}", stats.pending.to_string().as_str().yellow());
    println!("In progress:  {}", stats.in_progress.to_string().as_str().blue());
    println!("Overdue:      {}", stats.overdue.to_string().as_str().red());
    println!("Completion:   {:.0}%", stats.completion_rate);
    println!();
    for category in store.categories() {
        let count = stats.by_category_id.get(&category.id).copied().unwrap_or(0);
        println!("  {:<20} {}", category.name, count);
    }
}
