//! Biomed Inventory - register biomedical equipment and export inventory sheets.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use biomed_inventory as app;

use app::config::{AppConfig, ConfigLoadResult, LoggingConfig};
use app::db::{CredentialStore, EquipmentStore, Storage};
use app::export;
use app::form::InventoryForm;
use app::models::{Equipment, EquipmentField, LoginRequest, SignUp};

/// Biomedical equipment inventory.
#[derive(Parser)]
#[command(name = "biomed-inventory", version)]
struct Cli {
    /// Use config.toml from current directory (dev mode)
    #[arg(long)]
    dev: bool,

    /// Explicit config file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config file and the default export template
    Init,
    /// Register a user
    Register {
        name: String,
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    /// Check credentials
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Manage equipment records
    Equipment {
        #[command(subcommand)]
        action: EquipmentCommand,
    },
    /// Export a stored record into the template
    Export {
        id: i32,
        /// Template file (defaults to export.template_path)
        #[arg(long)]
        template: Option<PathBuf>,
        /// Output directory (defaults to export.output_dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Write the default template to a file
    Template { path: PathBuf },
}

#[derive(Subcommand)]
enum EquipmentCommand {
    /// Add a record from field=value pairs
    Add {
        /// Field assignment, e.g. --set brand=Mindray (repeatable)
        #[arg(long = "set", value_parser = parse_assignment)]
        fields: Vec<(EquipmentField, String)>,
        /// Photo file (JPEG or PNG)
        #[arg(long)]
        photo: Option<PathBuf>,
    },
    /// List records, newest first
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show one record
    Show { id: i32 },
    /// Delete one record
    Delete { id: i32 },
}

fn parse_assignment(input: &str) -> Result<(EquipmentField, String), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected field=value, got '{input}'"))?;
    Ok((key.parse()?, value.to_string()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Determine config path based on mode
    let config_path = match (&cli.config, cli.dev) {
        (Some(path), _) => path.clone(),
        (None, true) => PathBuf::from("config.toml"),
        (None, false) => AppConfig::default_path(),
    };

    let (config, config_missing) = match AppConfig::try_load(&config_path) {
        ConfigLoadResult::Loaded(config) => (config, false),
        ConfigLoadResult::Missing => (AppConfig::default(), true),
        ConfigLoadResult::Invalid(e) => bail!("Invalid config {}: {}", config_path.display(), e),
    };

    let _log_guard = init_logging(&config.logging);
    tracing::info!("Config path: {:?}", config_path);
    if config_missing {
        tracing::info!("Config missing, using defaults");
    }

    match cli.command {
        Command::Init => init(&config, &config_path),
        Command::Template { path } => {
            export::write_default_template(&path).with_context(|| format!("writing {}", path.display()))?;
            println!("Template written to {}", path.display());
            Ok(())
        }
        command => run_with_storage(command, &config).await,
    }
}

/// Initialize logging: console, plus daily files when a directory is configured.
fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let console = fmt::layer().with_writer(std::io::stderr);

    match &config.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "biomed-inventory.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(console)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(console).init();
            None
        }
    }
}

fn init(config: &AppConfig, config_path: &Path) -> anyhow::Result<()> {
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
    } else {
        config.save(config_path)?;
        println!("Config written to {}", config_path.display());
    }

    let template = &config.export.template_path;
    if template.exists() {
        println!("Template already exists at {}", template.display());
    } else {
        if let Some(parent) = template.parent() {
            std::fs::create_dir_all(parent)?;
        }
        export::write_default_template(template)?;
        println!("Template written to {}", template.display());
    }
    Ok(())
}

async fn run_with_storage(command: Command, config: &AppConfig) -> anyhow::Result<()> {
    let storage = Storage::open(&config.database)
        .await
        .with_context(|| format!("opening database {}", config.database.path.display()))?;

    if let Ok(counts) = storage.table_counts().await {
        tracing::info!("Tables: {} users, {} equipment", counts.users, counts.equipment);
    }

    let result = dispatch(command, config, &storage).await;
    storage.close().await?;
    result
}

async fn dispatch(command: Command, config: &AppConfig, storage: &Storage) -> anyhow::Result<()> {
    match command {
        Command::Register {
            name,
            email,
            password,
            confirm_password,
        } => {
            let user = SignUp {
                name,
                email,
                password,
                confirm_password,
            }
            .validate()?;
            let stored = CredentialStore::new(storage.clone()).register(user).await?;
            println!("Registered {} <{}> (id {})", stored.name, stored.email, stored.id);
        }
        Command::Login { email, password } => {
            let request = LoginRequest { email, password };
            request.validate()?;
            match CredentialStore::new(storage.clone())
                .login(&request.email, &request.password)
                .await?
            {
                Some(user) => println!("Welcome, {}", user.name),
                None => bail!("Invalid credentials"),
            }
        }
        Command::Equipment { action } => {
            let store = EquipmentStore::new(storage.clone()).await?;
            run_equipment(action, &store).await?;
        }
        Command::Export {
            id,
            template,
            output_dir,
        } => {
            let store = EquipmentStore::new(storage.clone()).await?;
            let record = store
                .get_by_id(id)
                .await?
                .ok_or_else(|| app::AppError::not_found(format!("equipment {id}")))?;

            let form = InventoryForm::new(Equipment::from(record));
            let options = config.export.export_options()?;
            let template = template.unwrap_or_else(|| config.export.template_path.clone());
            let output_dir = output_dir.unwrap_or_else(|| config.export.output_dir.clone());

            let result = form.export_to_path(&template, &output_dir, &config.export.file_prefix, &options);
            if let Some(status) = form.export_status() {
                println!("{status}");
            }
            result?;
        }
        Command::Init | Command::Template { .. } => bail!("command does not use the database"),
    }
    Ok(())
}

async fn run_equipment(action: EquipmentCommand, store: &EquipmentStore) -> anyhow::Result<()> {
    match action {
        EquipmentCommand::Add { fields, photo } => {
            let form = InventoryForm::default();
            for (field, value) in &fields {
                form.set_field(*field, value);
            }
            form.set_photo(photo);
            let id = form.save(store).await?;
            println!("Saved equipment {id}");
        }
        EquipmentCommand::List { json } => {
            let records = store.list_all().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for record in &records {
                    println!(
                        "{:>5}  {:<30}  {:<15}  {:<15}  {}",
                        record.id, record.name, record.brand, record.model_name, record.serial
                    );
                }
            }
        }
        EquipmentCommand::Show { id } => match store.get_by_id(id).await? {
            Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
            None => bail!("Equipment {id} not found"),
        },
        EquipmentCommand::Delete { id } => {
            if store.delete_by_id(id).await? {
                println!("Deleted equipment {id}");
            } else {
                bail!("Equipment {id} not found");
            }
        }
    }
    Ok(())
}
