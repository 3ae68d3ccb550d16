//! Operator CLI for the personalization core.
//!
//! # Responsibility
//! - Drive variant-family use cases against a local SQLite item store.
//! - Seed the hero-section sample content used by demos.

use clap::{Parser, Subcommand};
use log::error;
use personalize_core::db::open_db;
use personalize_core::{
    core_version, init_logging, load_config, AudienceCode, AudienceSelection, ElementDefinition,
    ItemId, ItemRepository, PersonalizationConfig, SqliteItemRepository, VariantService,
};
use std::path::PathBuf;
use std::process::ExitCode;

const HERO_CONTENT_TYPE: &str = "hero_section";

#[derive(Parser)]
#[command(name = "personalize")]
#[command(about = "Audience variant management for content items", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Item store database file
    #[arg(long, global = true, default_value = "personalize.sqlite3")]
    db: PathBuf,

    /// JSON configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Absolute directory for rolling log files (stderr when omitted)
    #[arg(long, global = true)]
    log_dir: Option<String>,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Register the hero-section type and create a sample family
    Seed {
        /// Name of the base hero item
        #[arg(long, default_value = "Homepage hero")]
        name: String,
    },

    /// List the variant family of an item
    Family {
        /// Any member of the family
        item: ItemId,
    },

    /// Show which item is rendered for an audience
    Resolve {
        /// Any member of the family
        item: ItemId,

        /// Audience codename, or `none` for base content
        #[arg(long, default_value = "none")]
        audience: String,
    },

    /// List audiences that have no variant yet
    Audiences {
        /// Any member of the family
        item: ItemId,
    },

    /// Create a variant for an audience
    CreateVariant {
        /// Any member of the family
        item: ItemId,

        /// Audience codename
        #[arg(long)]
        audience: String,
    },

    /// Delete a variant and unlink it from its family
    DeleteVariant {
        /// Any member of the family
        item: ItemId,

        /// Variant to delete
        #[arg(long)]
        variant: ItemId,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_command module=cli status=error error={message}");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    let mut config = match &cli.config {
        Some(path) => load_config(path).map_err(|err| err.to_string())?,
        None => PersonalizationConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.log_dir.is_some() {
        config.logging.log_dir = cli.log_dir;
    }
    init_logging(&config.logging)?;

    let conn = open_db(&cli.db).map_err(|err| err.to_string())?;
    let repo = SqliteItemRepository::try_new(conn).map_err(|err| err.to_string())?;
    let service = VariantService::new(repo, config);

    match cli.command {
        Commands::Seed { name } => seed(&service, name.as_str()),
        Commands::Family { item } => print_family(&service, item),
        Commands::Resolve { item, audience } => {
            let selection = AudienceSelection::parse(&audience).map_err(|err| err.to_string())?;
            let record = service
                .resolve_for(item, &selection)
                .map_err(|err| err.to_string())?;
            println!("{}\t{}\t{}", record.id, service.label_for(&record), record.name);
            Ok(())
        }
        Commands::Audiences { item } => {
            let available = service
                .available_audiences(item)
                .map_err(|err| err.to_string())?;
            for audience in available {
                println!("{}\t{}", audience.codename, audience.name);
            }
            Ok(())
        }
        Commands::CreateVariant { item, audience } => {
            let audience = AudienceCode::parse(&audience).map_err(|err| err.to_string())?;
            let created = service
                .create_variant(item, audience)
                .map_err(|err| err.to_string())?;
            println!(
                "created {} `{}` linked_items={}",
                created.record.id,
                created.record.name,
                created.linked_items.len()
            );
            Ok(())
        }
        Commands::DeleteVariant { item, variant } => {
            let deleted = service
                .delete_variant(item, variant)
                .map_err(|err| err.to_string())?;
            println!(
                "deleted {} unlinked_items={}",
                deleted.variant_id,
                deleted.unlinked_items.len()
            );
            Ok(())
        }
    }
}

fn seed(service: &VariantService<SqliteItemRepository>, name: &str) -> Result<(), String> {
    let suffixes = &service.config().element_suffixes;
    let elements = vec![
        ElementDefinition::new("headline", "headline"),
        ElementDefinition::new("subheadline", "subheadline"),
        ElementDefinition::new("cta_text", "cta_text"),
        ElementDefinition::new("cta_url", "cta_url"),
        ElementDefinition::new(
            "variant_type",
            format!("personalization__{}", suffixes.variant_type),
        ),
        ElementDefinition::new(
            "audience",
            format!("personalization__{}", suffixes.audience),
        ),
        ElementDefinition::new(
            "variant_links",
            format!("personalization__{}", suffixes.variant_links),
        ),
    ];

    let repo = service.repo();
    repo.register_content_type(HERO_CONTENT_TYPE, "Hero section", &elements)
        .map_err(|err| err.to_string())?;
    let base = repo
        .create_base_item(name, HERO_CONTENT_TYPE)
        .map_err(|err| err.to_string())?;
    println!("seeded base {} `{}` (core {})", base.id, base.name, core_version());

    let sample_audiences: Vec<AudienceCode> = service
        .catalog()
        .entries()
        .iter()
        .take(2)
        .map(|entry| entry.codename.clone())
        .collect();
    for audience in sample_audiences {
        let created = service
            .create_variant(base.id, audience)
            .map_err(|err| err.to_string())?;
        println!("seeded variant {} `{}`", created.record.id, created.record.name);
    }
    Ok(())
}

fn print_family(service: &VariantService<SqliteItemRepository>, item: ItemId) -> Result<(), String> {
    let family = service.load_family(item).map_err(|err| err.to_string())?;
    for member in family.members() {
        println!("{}\t{}\t{}", member.id, service.label_for(member), member.name);
    }
    Ok(())
}
