mod git;
mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dvcup_core::{ErrorKind, LocalFiles, ObjectStore, StoreRegistry, UploadRequest};
use git::GitTree;
use output::{
    AddOutput, EntryInfo, LsOutput, OutputWriter, RemoteInfo, RemoteListOutput,
};
use std::fmt::Write as _;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// dvcup - Add files to DVC-tracked folders
#[derive(Parser)]
#[command(name = "dvcup")]
#[command(about = "Upload files into a DVC-tracked folder without DVC", long_about = None)]
#[command(version)]
struct Cli {
    /// Git checkout or URL of the repository (defaults to DVCUP_REPO env var or .)
    #[arg(long, global = true)]
    repo: Option<String>,

    /// Branch to clone, or to insist on for an existing checkout
    #[arg(long, global = true)]
    branch: Option<String>,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log more (repeatable)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file and add it to a tracked folder
    Add {
        /// File to upload
        file: String,

        /// Pointer file of the tracked folder
        #[arg(long, default_value = "dataset.dvc")]
        folder: String,

        /// Path of the file inside the folder (defaults to its file name)
        #[arg(long)]
        relpath: Option<String>,

        /// Remote to upload to instead of core.remote
        #[arg(short, long)]
        remote: Option<String>,

        /// Commit message
        #[arg(short, long)]
        message: Option<String>,

        /// Push the commit to origin (always done when --repo is cloned)
        #[arg(long)]
        push: bool,
    },

    /// List the files of a tracked folder
    Ls {
        /// Pointer file of the tracked folder
        #[arg(long, default_value = "dataset.dvc")]
        folder: String,

        /// Remote to read from instead of core.remote
        #[arg(short, long)]
        remote: Option<String>,
    },

    /// Inspect configured remotes
    #[command(subcommand)]
    Remote(RemoteCommands),
}

#[derive(Subcommand)]
enum RemoteCommands {
    /// List configured remotes
    List,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "dvcup=info,dvcup_core=info",
        1 => "dvcup=debug,dvcup_core=debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Exit code for a failure, by the kind of the innermost core error.
fn classify(error: &anyhow::Error) -> (Option<ErrorKind>, u8) {
    let kind = error
        .chain()
        .find_map(|cause| cause.downcast_ref::<dvcup_core::Error>())
        .map(dvcup_core::Error::kind);
    let code = match kind {
        Some(ErrorKind::NotFound) => 2,
        Some(ErrorKind::IoFailure) => 3,
        Some(ErrorKind::InvalidLocation) => 4,
        Some(ErrorKind::DecodeFailure) => 5,
        None => 1,
    };
    (kind, code)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = OutputWriter::new(cli.json);

    // Determine repository: CLI arg > DVCUP_REPO env var > current directory
    let repo = cli
        .repo
        .clone()
        .or_else(|| std::env::var("DVCUP_REPO").ok())
        .unwrap_or_else(|| ".".to_string());
    let branch = cli.branch.as_deref();

    let result = match cli.command {
        Commands::Add {
            file,
            folder,
            relpath,
            remote,
            message,
            push,
        } => cmd_add(
            &output,
            &repo,
            branch,
            push,
            &UploadRequest {
                file: &file,
                pointer_path: &folder,
                relpath: relpath.as_deref(),
                remote: remote.as_deref(),
                message: message.as_deref(),
            },
        ),
        Commands::Ls { folder, remote } => {
            cmd_ls(&output, &repo, branch, &folder, remote.as_deref())
        }
        Commands::Remote(RemoteCommands::List) => cmd_remote_list(&output, &repo, branch),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let (kind, code) = classify(&error);
            output.write_error(&error, kind.as_ref().map(ErrorKind::as_str), code);
            ExitCode::from(code)
        }
    }
}

fn cmd_add(
    output: &OutputWriter,
    repo: &str,
    branch: Option<&str>,
    push: bool,
    request: &UploadRequest<'_>,
) -> Result<()> {
    let mut tree = GitTree::open_or_clone(repo, branch, push)?;

    let report = dvcup_core::upload(&mut tree, &LocalFiles, request).with_context(|| {
        format!(
            "Failed to add {} to {}",
            request.file, request.pointer_path
        )
    })?;

    let data = AddOutput {
        success: true,
        result_code: 0,
        file: report.file,
        relpath: report.relpath.clone(),
        size: report.size,
        remote: report.remote.clone(),
        folder: report.pointer.path.clone(),
        manifest: report.pointer.address,
        entries: report.entries,
        commit: report.change_id.clone(),
    };

    output.write(&data, || {
        let manifest = report
            .pointer
            .address
            .map(|a| a.to_string())
            .unwrap_or_default();
        format!(
            "{} {}\nUploaded to {}\n{} -> {} ({} entries)\nCommitted {}\n",
            report.file,
            report.relpath,
            report.remote,
            request.pointer_path,
            manifest,
            report.entries,
            report.change_id
        )
    })
}

fn cmd_ls(
    output: &OutputWriter,
    repo: &str,
    branch: Option<&str>,
    folder: &str,
    remote: Option<&str>,
) -> Result<()> {
    let tree = GitTree::open_or_clone(repo, branch, false)?;

    let (pointer, manifest) = dvcup_core::list(&tree, folder, remote)
        .with_context(|| format!("Failed to list {}", folder))?;

    let entries: Vec<EntryInfo> = manifest
        .entries()
        .iter()
        .map(|entry| EntryInfo {
            md5: entry.md5,
            relpath: entry.relpath.clone(),
        })
        .collect();

    let data = LsOutput {
        success: true,
        result_code: 0,
        folder: pointer.path.clone(),
        manifest: pointer.address,
        entries,
    };

    output.write(&data, || {
        if manifest.is_empty() {
            return format!("{} is empty\n", pointer.path);
        }
        let mut text = String::new();
        for entry in manifest.entries() {
            let _ = writeln!(text, "{} {}", entry.md5, entry.relpath);
        }
        text
    })
}

fn cmd_remote_list(output: &OutputWriter, repo: &str, branch: Option<&str>) -> Result<()> {
    let tree = GitTree::open_or_clone(repo, branch, false)?;

    let config = dvcup_core::load_config(&tree).context("Failed to read DVC config")?;
    let registry = StoreRegistry::resolve(&config).context("Failed to resolve remotes")?;

    let remotes: Vec<RemoteInfo> = registry
        .iter()
        .map(|(name, remote)| RemoteInfo {
            name: name.to_string(),
            kind: remote.kind().to_string(),
            location: remote.location().to_string(),
            default: registry.default_name() == Some(name),
        })
        .collect();

    let data = RemoteListOutput {
        success: true,
        result_code: 0,
        remotes: remotes.clone(),
    };

    output.write(&data, || {
        if remotes.is_empty() {
            return "No remotes configured\n".to_string();
        }
        let mut text = String::new();
        for remote in &remotes {
            let marker = if remote.default { "*" } else { " " };
            let _ = writeln!(
                text,
                "{} {} ({}) {}",
                marker, remote.name, remote.kind, remote.location
            );
        }
        text
    })
}
