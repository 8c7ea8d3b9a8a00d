//! Flourish - Task & Care Progression Engine
//!
//! CLI entry point for scheduling tasks, tracking progress and caring for plants.

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::*;
use eyre::{Context, Result, eyre};
use tracing::{debug, info};

use docstore::JsonlStore;
use flourish::care::PlantCare;
use flourish::catalog::TaskCatalog;
use flourish::cli::{Cli, Command, OutputFormat, PlantCommand, get_log_path, parse_when};
use flourish::clock::{Clock, SystemClock};
use flourish::config::Config;
use flourish::domain::{ActiveNutrientEffect, EnrichedTask, PlantInstance, TaskStatus};
use flourish::nutrient::{NutrientService, PlantFocus, format_remaining};
use flourish::progression::{DayBucket, ProgressionEngine};
use flourish::state::StateManager;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

/// Services wired to the on-disk store
struct App {
    config: Config,
    user: String,
    state: StateManager,
    clock: Arc<dyn Clock>,
    catalog: TaskCatalog,
    engine: ProgressionEngine,
    nutrients: NutrientService,
}

impl App {
    fn open(config: Config, user: String) -> Result<Self> {
        debug!(path = %config.storage.path.display(), %user, "App::open: called");
        let store = JsonlStore::open(&config.storage.path)
            .context(format!("Failed to open store at {}", config.storage.path.display()))?;
        let state = StateManager::spawn(store);
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let care = Arc::new(PlantCare::new(state.clone(), clock.clone(), config.care.fertilize_step));
        let engine = ProgressionEngine::new(state.clone(), clock.clone(), care).with_config(config.progression.clone());

        Ok(Self {
            catalog: TaskCatalog::new(state.clone()),
            nutrients: NutrientService::new(state.clone(), config.nutrients.level_step),
            config,
            user,
            state,
            clock,
            engine,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    // Setup logging with priority: CLI > config > INFO default
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let app = App::open(config, cli.user.clone())?;

    // Dispatch command
    debug!(command = ?cli.command, "main: dispatching command");
    let result = match cli.command {
        Command::Seed => cmd_seed(&app).await,
        Command::Templates => cmd_templates(&app).await,
        Command::Today { format } => cmd_today(&app, format).await,
        Command::Upcoming { days, format } => cmd_upcoming(&app, days, format).await,
        Command::Schedule { template, at, plant } => cmd_schedule(&app, &template, at.as_deref(), plant).await,
        Command::Complete { id } => cmd_complete(&app, &id).await,
        Command::Skip { id, reason } => cmd_skip(&app, &id, &reason).await,
        Command::Delete { id } => cmd_delete(&app, &id).await,
        Command::Stats { format } => cmd_stats(&app, format).await,
        Command::Plant { command } => match command {
            PlantCommand::Add { species, id } => cmd_plant_add(&app, &species, id).await,
            PlantCommand::Show { id, format } => cmd_plant_show(&app, &id, format).await,
            PlantCommand::List => cmd_plant_list(&app).await,
        },
        Command::ApplyNutrient { plant, nutrient } => cmd_apply_nutrient(&app, &plant, &nutrient).await,
        Command::Watch { plant, seconds } => cmd_watch(&app, &plant, seconds).await,
    };

    if let Err(e) = app.state.shutdown().await {
        debug!(error = %e, "main: state manager already stopped");
    }
    result
}

async fn cmd_seed(app: &App) -> Result<()> {
    debug!("cmd_seed: called");
    let templates = app.catalog.seed_templates(&app.config.templates()).await?;
    let nutrients = app.catalog.seed_nutrients(&app.config.nutrients()).await?;
    println!(
        "{} Seeded {} templates and {} nutrients",
        "✓".green(),
        templates.to_string().cyan(),
        nutrients.to_string().cyan()
    );
    Ok(())
}

async fn cmd_templates(app: &App) -> Result<()> {
    debug!("cmd_templates: called");
    let templates = app.catalog.list_templates().await?;
    if templates.is_empty() {
        println!("No templates. Run `flourish seed` first.");
        return Ok(());
    }
    for template in templates {
        let recurrence = match template.default_recurrence_days {
            Some(1) => "daily".to_string(),
            Some(days) => format!("every {} days", days),
            None => "once".to_string(),
        };
        println!(
            "{:<28} {:<12} {:>3} pts  {}  {}",
            template.id.yellow(),
            template.category.to_string(),
            template.points,
            recurrence.dimmed(),
            template.title
        );
    }
    Ok(())
}

fn print_task(app: &App, task: &EnrichedTask, now: chrono::DateTime<chrono::Utc>) {
    let marker = match task.task.status {
        TaskStatus::Completed => "✓".green(),
        TaskStatus::Skipped => "-".dimmed(),
        TaskStatus::Pending if task.task.is_overdue(now) => "!".red(),
        TaskStatus::Pending => "·".normal(),
    };
    let at = task.task.scheduled_at;
    let local = at.with_timezone(&app.clock.offset_at(at));
    println!(
        "  {} {} {} ({} pts) {}",
        marker,
        local.format("%H:%M").to_string().dimmed(),
        task.title(),
        task.points(),
        task.task.id.yellow()
    );
}

async fn cmd_today(app: &App, format: OutputFormat) -> Result<()> {
    debug!(%format, "cmd_today: called");
    let tasks = app.engine.get_today_tasks(&app.user).await?;
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&tasks)?);
        return Ok(());
    }

    println!("{} {}", "Today".bold(), app.clock.today());
    if tasks.is_empty() {
        println!("  Nothing scheduled");
    }
    let now = app.clock.now();
    for task in &tasks {
        print_task(app, task, now);
    }
    Ok(())
}

async fn cmd_upcoming(app: &App, days: Option<u32>, format: OutputFormat) -> Result<()> {
    let days = days.unwrap_or(app.config.progression.upcoming_days);
    debug!(days, %format, "cmd_upcoming: called");
    let buckets = app.engine.get_upcoming_summary(&app.user, days).await?;
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&buckets)?);
        return Ok(());
    }

    let now = app.clock.now();
    for bucket in &buckets {
        print_bucket_header(bucket);
        for task in &bucket.tasks {
            print_task(app, task, now);
        }
    }
    Ok(())
}

fn print_bucket_header(bucket: &DayBucket) {
    let mut counts = format!("{} done, {} pending", bucket.completed, bucket.pending);
    if bucket.overdue > 0 {
        counts.push_str(&format!(", {} overdue", bucket.overdue).red().to_string());
    }
    println!("{} {}", bucket.date.format("%a %Y-%m-%d").to_string().bold(), counts.dimmed());
}

async fn cmd_schedule(app: &App, template: &str, at: Option<&str>, plant: Option<String>) -> Result<()> {
    debug!(%template, ?at, ?plant, "cmd_schedule: called");
    let scheduled_at = match at {
        Some(input) => parse_when(input, app.clock.as_ref()).map_err(|e| eyre!(e))?,
        None => app.clock.now(),
    };
    let task = app.engine.schedule_task(&app.user, template, scheduled_at, plant).await?;
    println!("{} Scheduled task {}", "✓".green(), task.id);
    Ok(())
}

async fn cmd_complete(app: &App, id: &str) -> Result<()> {
    debug!(%id, "cmd_complete: called");
    let outcome = app.engine.complete_task(id).await?;
    println!("{} Completed {} (+{} points)", "✓".green(), id.yellow(), outcome.points);
    if let Some(next) = outcome.next_task_id {
        println!("  Next occurrence: {}", next.yellow());
    }
    Ok(())
}

async fn cmd_skip(app: &App, id: &str, reason: &str) -> Result<()> {
    debug!(%id, %reason, "cmd_skip: called");
    app.engine.skip_task(id, reason).await?;
    println!("{} Skipped {}", "✓".green(), id.yellow());
    Ok(())
}

async fn cmd_delete(app: &App, id: &str) -> Result<()> {
    debug!(%id, "cmd_delete: called");
    app.engine.delete_task(id).await?;
    println!("{} Deleted {}", "✓".green(), id.yellow());
    Ok(())
}

async fn cmd_stats(app: &App, format: OutputFormat) -> Result<()> {
    debug!(%format, "cmd_stats: called");
    let stats = app.engine.compute_stats(&app.user).await?;
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{}", "Progress".bold());
    println!("  Tasks:       {}", stats.total_tasks);
    println!("  Completed:   {}", stats.completed_tasks.to_string().green());
    println!("  Pending:     {}", stats.pending_tasks);
    println!("  Overdue:     {}", stats.overdue_tasks.to_string().red());
    println!("  Completion:  {}%", stats.completion_rate);
    println!("  Streak:      {} days", stats.streak.to_string().cyan());
    println!("  Points:      {}", stats.total_points.to_string().cyan());
    Ok(())
}

async fn cmd_plant_add(app: &App, species: &str, id: Option<String>) -> Result<()> {
    debug!(%species, ?id, "cmd_plant_add: called");
    let plant = match id {
        Some(id) => PlantInstance::with_id(id, &app.user, species),
        None => PlantInstance::new(&app.user, species),
    };
    let plant = app.state.create(&plant).await?;
    println!("{} Added plant {}", "✓".green(), plant.id);
    Ok(())
}

fn print_effects(effects: &[ActiveNutrientEffect]) {
    if effects.is_empty() {
        println!("  No active nutrients");
    }
    for effect in effects {
        println!(
            "  {:<20} {}",
            effect.nutrient_name,
            format_remaining(Some(effect.remaining_seconds)).cyan()
        );
    }
}

fn format_stamp(app: &App, at: Option<chrono::DateTime<chrono::Utc>>) -> String {
    at.map(|at| {
        at.with_timezone(&app.clock.offset_at(at))
            .format("%Y-%m-%d %H:%M")
            .to_string()
    })
    .unwrap_or_else(|| "never".to_string())
}

async fn cmd_plant_show(app: &App, id: &str, format: OutputFormat) -> Result<()> {
    debug!(%id, %format, "cmd_plant_show: called");
    let plant: PlantInstance = app.state.get_required(id).await?;
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&plant)?);
        return Ok(());
    }

    println!("{} {}", plant.species_id.bold(), plant.id.yellow());
    println!("  Water:          {}", plant.water_level);
    println!("  Care:           {}", plant.care_level);
    println!("  Last watered:   {}", format_stamp(app, plant.last_watered));
    println!("  Last fertilized: {}", format_stamp(app, plant.last_fertilized));
    println!("  Last repotted:  {}", format_stamp(app, plant.last_repotted));
    print_effects(&plant.active_nutrients);
    Ok(())
}

async fn cmd_plant_list(app: &App) -> Result<()> {
    debug!("cmd_plant_list: called");
    let mut plants = app.state.list_user_plants(&app.user).await?;
    plants.sort_by(|a, b| a.id.cmp(&b.id));
    if plants.is_empty() {
        println!("No plants. Add one with `flourish plant add <species>`.");
    }
    for plant in plants {
        println!(
            "{} {:<12} water {:>3}  care {:>3}  {} active",
            plant.id.yellow(),
            plant.species_id,
            plant.water_level,
            plant.care_level,
            plant.active_nutrients.len()
        );
    }
    Ok(())
}

async fn cmd_apply_nutrient(app: &App, plant_id: &str, nutrient_id: &str) -> Result<()> {
    debug!(%plant_id, %nutrient_id, "cmd_apply_nutrient: called");
    let plant = app.nutrients.apply_nutrient_by_id(plant_id, nutrient_id).await?;
    println!(
        "{} Applied {} to {} (water {}, care {})",
        "✓".green(),
        nutrient_id.cyan(),
        plant.id.yellow(),
        plant.water_level,
        plant.care_level
    );
    print_effects(&plant.active_nutrients);
    Ok(())
}

async fn cmd_watch(app: &App, plant_id: &str, seconds: Option<u64>) -> Result<()> {
    debug!(%plant_id, ?seconds, "cmd_watch: called");
    let mut focus = PlantFocus::new(app.state.clone(), app.config.nutrients.tick_period());
    let mut rx = focus.select(plant_id).await?;

    let initial = rx.borrow_and_update().clone();
    print_effects(&initial);
    if initial.is_empty() {
        focus.clear().await;
        return Ok(());
    }

    let limit = async {
        match seconds {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::pin!(limit);

    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let effects = rx.borrow_and_update().clone();
                let line: Vec<String> = effects
                    .iter()
                    .map(|e| format!("{} {}", e.nutrient_name, format_remaining(Some(e.remaining_seconds))))
                    .collect();
                if effects.is_empty() {
                    println!("{} All nutrients expired", "✓".green());
                    break;
                }
                println!("  {}", line.join("  ").cyan());
            }

            _ = &mut limit => {
                debug!("cmd_watch: time limit reached");
                break;
            }

            _ = tokio::signal::ctrl_c() => {
                debug!("cmd_watch: interrupted");
                break;
            }
        }
    }

    // Stops between ticks so the last countdown write lands
    focus.clear().await;
    info!(%plant_id, "Watch finished");
    Ok(())
}
