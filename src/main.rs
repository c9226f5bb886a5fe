//! Browse and maintain a study-resource catalog stored in a GitHub repository.
use std::path::{Path, PathBuf};

use clap::{Args as ClapArgs, Parser, Subcommand};
use secrecy::{ExposeSecret as _, SecretString};
use tracing::{debug, error, info, warn};

use study_vault::{
    Catalog, CatalogQuery, Category, DeleteOutcome, GithubHost, MetadataInput, MutationError,
    Mutator, Resource, SortOrder, UploadFile, UploadRequest, direct_download_url,
};

mod app_config;
mod term;
mod trc;

use crate::app_config::{Config, ConfigError, RepositoryRef};
use crate::trc::Trc;

#[derive(Parser)]
#[command(
    version,
    about = "A study-resource catalog that lives in a GitHub repository."
)]
struct Args {
    #[arg(
        short,
        long,
        value_parser,
        help = "Optional path to a study-vault config TOML."
    )]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(flatten)]
    Repo(RepoCommand),

    /// Manage the configuration file.
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Commands that talk to the content repository.
#[derive(Subcommand)]
enum RepoCommand {
    /// List resources, newest first.
    List(ListArgs),

    /// Upload files and metadata as one resource. With no files, only the metadata is updated.
    Upload(UploadArgs),

    /// Delete a single file, e.g. `notes/dbms-notes/unit1.pdf`.
    DeleteFile { path: String },

    /// Delete a whole resource folder, e.g. `notes/dbms-notes`.
    DeleteResource { folder: String },
}

#[derive(ClapArgs)]
struct ListArgs {
    /// Only list this category. Lists every category when omitted.
    #[arg(short = 'C', long)]
    category: Option<Category>,

    /// Case-insensitive text search.
    #[arg(short, long)]
    query: Option<String>,

    #[arg(long)]
    subject: Option<String>,

    #[arg(long)]
    semester: Option<String>,

    /// `newest` or `name`.
    #[arg(long, default_value = "newest")]
    sort: SortOrder,

    /// Print JSON instead of a listing.
    #[arg(long)]
    json: bool,
}

#[derive(ClapArgs)]
struct UploadArgs {
    #[arg(long)]
    title: String,

    #[arg(short = 'C', long)]
    category: Category,

    #[arg(long, default_value = "")]
    description: String,

    /// Extra tags; may be repeated.
    #[arg(long = "tag")]
    tags: Vec<String>,

    #[arg(long)]
    subject: Option<String>,

    #[arg(long)]
    semester: Option<String>,

    #[arg(long)]
    year: Option<String>,

    /// Search keywords; may be repeated.
    #[arg(long = "keyword")]
    keywords: Vec<String>,

    /// External link for resources without files. Google Drive share links are made direct.
    #[arg(long)]
    download_url: Option<String>,

    /// Commit message prefix for file writes.
    #[arg(short, long, default_value = "feat: Upload resource file")]
    message: String,

    /// Files to upload; each lands in the resource folder under its file name.
    files: Vec<PathBuf>,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write a new configuration file.
    Init {
        #[arg(long)]
        repository: RepositoryRef,

        /// Access token. Prefer STUDY_VAULT_TOKEN for anything shared.
        #[arg(long, env = "STUDY_VAULT_TOKEN", hide_env_values = true)]
        token: Option<String>,

        #[arg(long)]
        api_url: Option<String>,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Print the active configuration with the token masked.
    Show,
}

/// Main entry point for the application.
fn main() {
    let args = Args::parse();

    let machine_output = matches!(&args.command, Command::Repo(RepoCommand::List(l)) if l.json);
    let trc = if machine_output {
        Trc::default().quiet().plain()
    } else {
        Trc::default()
    };
    if let Err(e) = trc.init() {
        eprintln!(
            "Failed to initialize logging. Without logging, we can't provide any useful error \
             messages, so we have to exit: {e}"
        );
        std::process::exit(1);
    }

    let config_path = args.config_path.as_deref();
    let command = match args.command {
        Command::Config(command) => {
            exit_on_err(run_config(command, config_path));
            return;
        }
        Command::Repo(command) => command,
    };
    let config = match Config::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };
    debug!(config = ?config, "Loaded configuration.");

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start the async runtime: {e}");
            std::process::exit(1);
        }
    };

    let host = connect(&config);
    if !runtime.block_on(run_repo(&host, command)) {
        std::process::exit(1);
    }
}

fn exit_on_err(result: Result<(), ConfigError>) {
    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

fn connect(config: &Config) -> GithubHost<repo_host::ReqwestClient> {
    let token = config
        .token
        .as_ref()
        .map(|t| t.expose_secret().to_owned())
        .unwrap_or_default();
    let client = repo_host::Github::builder(&token)
        .base_url(config.api_url.as_str())
        .timeout(config.request_timeout())
        .build();
    GithubHost::new(client, &config.repository.owner, &config.repository.repo)
        .with_raw_host(config.raw_content_host.as_str())
}

async fn run_repo(host: &GithubHost<repo_host::ReqwestClient>, command: RepoCommand) -> bool {
    match command {
        RepoCommand::List(list) => run_list(host, list).await,
        RepoCommand::Upload(upload) => run_upload(host, upload).await,
        RepoCommand::DeleteFile { path } => {
            report_delete(Mutator::new(host).delete_file(&path).await)
        }
        RepoCommand::DeleteResource { folder } => {
            report_delete(Mutator::new(host).delete_resource(&folder).await)
        }
    }
}

fn run_config(command: ConfigCommand, config_path: Option<&Path>) -> Result<(), ConfigError> {
    match command {
        ConfigCommand::Init {
            repository,
            token,
            api_url,
            force,
        } => {
            let mut config = Config::new(repository);
            config.token = token.filter(|t| !t.is_empty()).map(SecretString::from);
            if let Some(api_url) = api_url {
                config.api_url = api_url;
            }
            let path = Config::creation_path(config_path)?;
            config.init(&path, force)?;
            println!("Wrote {}", path.display());
        }
        ConfigCommand::Show => {
            let config = Config::load(config_path)?;
            print!("{}", config.to_masked_toml()?);
        }
    }
    Ok(())
}

async fn run_list(host: &GithubHost<repo_host::ReqwestClient>, args: ListArgs) -> bool {
    let catalog = Catalog::new(host);
    let listing = match args.category {
        Some(category) => catalog.list(category).await,
        None => catalog.list_all().await,
    };
    let resources = match listing {
        Ok(resources) => resources,
        Err(e) => {
            debug!(error = %e, "Listing failed.");
            error!("Could not load resources. Check the repository and token configuration.");
            error!("{e}");
            return false;
        }
    };

    let query = CatalogQuery {
        text: args.query,
        subject: args.subject,
        semester: args.semester,
        sort: args.sort,
    };
    let resources = query.apply(resources);

    if args.json {
        return match serde_json::to_string_pretty(&resources) {
            Ok(json) => {
                println!("{json}");
                true
            }
            Err(e) => {
                error!("Failed to serialize the listing: {e}");
                false
            }
        };
    }

    if resources.is_empty() {
        match args.category {
            Some(category) => println!("No resources found in {}.", category.label()),
            None => println!("No resources found."),
        }
        return true;
    }
    for resource in &resources {
        print_resource(resource);
    }
    true
}

fn print_resource(resource: &Resource) {
    println!("{}  [{}]", resource.title, resource.tags.join(", "));
    let description = if resource.description.trim().is_empty() {
        "No description available."
    } else {
        resource.description.trim()
    };
    println!("  {description}");

    let details: Vec<String> = [
        ("subject", &resource.subject),
        ("semester", &resource.semester),
        ("year", &resource.year),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.as_ref().map(|v| format!("{label} {v}")))
    .collect();
    if !details.is_empty() {
        println!("  {}", details.join(", "));
    }
    println!(
        "  added {}, folder {}",
        resource.created_at.format("%Y-%m-%d"),
        resource.folders.join(", ")
    );

    if let Some(url) = &resource.download_url {
        println!("  link: {}", direct_download_url(url));
    }
    for file in &resource.files {
        println!("  - {} ({}) {}", file.name, file.size, file.download_url);
    }
    println!();
}

async fn run_upload(host: &GithubHost<repo_host::ReqwestClient>, args: UploadArgs) -> bool {
    let mut files = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            error!(path = %path.display(), "Not a file name.");
            return false;
        };
        match std::fs::read(path) {
            Ok(bytes) => files.push(UploadFile {
                name: name.to_owned(),
                bytes,
            }),
            Err(e) => {
                error!(path = %path.display(), "Failed to read file: {e}");
                return false;
            }
        }
    }

    let mut tags = vec![args.category.as_str().to_owned()];
    tags.extend(args.tags.into_iter().filter(|t| !t.trim().is_empty()));

    let request = UploadRequest {
        metadata: MetadataInput {
            title: args.title,
            description: args.description,
            tags,
            subject: args.subject,
            semester: args.semester,
            year: args.year,
            keywords: args.keywords,
            download_url: args.download_url.map(|u| direct_download_url(&u)),
        },
        files,
        message: args.message,
    };

    match Mutator::new(host).upload(request).await {
        Ok(receipt) => {
            info!(folder = %receipt.folder, "Upload complete.");
            for path in &receipt.written {
                println!("wrote {path}");
            }
            println!("metadata: {}", receipt.metadata_url);
            true
        }
        Err(e) => {
            report_mutation_error(&e);
            false
        }
    }
}

fn report_delete(result: Result<DeleteOutcome, MutationError>) -> bool {
    match result {
        Ok(outcome) => {
            if let DeleteOutcome::Deleted { removed, .. } = &outcome {
                for path in removed {
                    println!("deleted {path}");
                }
            }
            if let Some(note) = outcome.note() {
                warn!("{note}");
            }
            true
        }
        Err(e) => {
            report_mutation_error(&e);
            false
        }
    }
}

fn report_mutation_error(e: &MutationError) {
    if let MutationError::Partial { written, source } = e {
        error!("Stopped part way. Already committed:");
        for path in written {
            error!("  {path}");
        }
        error!("{source}");
    } else {
        error!("{e}");
    }
}
