//! pubdisk CLI: browse and download folders shared by public key
//!
//! Usage:
//!   pubdisk-cli -k <key> ls [path] [--ext .pdf]        List a folder
//!   pubdisk-cli -k <key> get <folder> <name> [-o out]  Download one file
//!   pubdisk-cli -k <key> batch --folder <path>...      Download folders as ZIP
//!   pubdisk-cli -k <key> batch --file <folder/name>... Download files as ZIP
//!   pubdisk-cli -k <key> browse                        Interactive shell
//!   pubdisk-cli config show|init                       Inspect configuration

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};

use pubdisk_lib::browser::{
    BrowserError, FileEntry, FolderPath, ItemKind, ListingClient, NavigationState, PublicKey, SelectionItem,
};
use pubdisk_lib::config::{self, BrowserConfig, ListingSource};
use pubdisk_lib::transfer::{self, ProgressFn};
use pubdisk_lib::{init_tracing, Action, ActionOutcome, BrowserSession};

type Session = BrowserSession<Box<dyn ListingClient>>;

#[derive(Parser)]
#[command(
    name = "pubdisk-cli",
    about = "pubdisk CLI: browse and download folders shared by public key",
    version,
    long_about = "Lists folders shared through a public link and downloads single files,\nfile batches or whole folders through the download backend."
)]
struct Cli {
    /// Public key (shared folder link); defaults to the configured key
    #[arg(short, long, global = true)]
    key: Option<String>,

    /// Listing source: backend or direct
    #[arg(long, global = true)]
    source: Option<ListingSource>,

    /// Backend base URL
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List a folder
    Ls {
        /// Folder path (default: root)
        #[arg(default_value = "")]
        path: String,
        /// Only show files with this extension
        #[arg(long)]
        ext: Option<String>,
    },
    /// Download a single file
    Get {
        /// Folder containing the file
        folder: String,
        /// File name
        name: String,
        /// Local destination (default: file name)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the download URL instead of downloading
        #[arg(long)]
        print_url: bool,
    },
    /// Download several folders or files as one archive
    Batch {
        /// Folder path; repeatable
        #[arg(long = "folder")]
        folders: Vec<String>,
        /// File as FOLDER/NAME; repeatable
        #[arg(long = "file")]
        files: Vec<String>,
        /// Local destination (default: name sent by the server)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the download URL instead of downloading
        #[arg(long)]
        print_url: bool,
    },
    /// Interactive browsing shell
    Browse,
    /// Show or initialize the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show,
    /// Write the default configuration if none exists
    Init,
}

/// Command-line overrides applied on top of the loaded configuration
struct Overrides {
    key: Option<String>,
    source: Option<ListingSource>,
    backend: Option<String>,
}

/// Effective configuration and a session built from it
fn open_session(overrides: &Overrides) -> anyhow::Result<(BrowserConfig, Session)> {
    let mut config = config::load_config();
    if let Some(source) = overrides.source {
        config.listing_source = source;
    }
    if let Some(ref backend) = overrides.backend {
        config.backend_url = backend.clone();
    }
    if let Some(ref key) = overrides.key {
        config.public_key = Some(key.clone());
    }
    config::validate_config(&config).context("Invalid configuration")?;

    let client = config.listing_client()?;
    let session = BrowserSession::new(client, config.backend_base_url()?)
        .with_public_key(config.default_public_key());
    Ok((config, session))
}

fn file_icon(extension: &str) -> &'static str {
    match extension {
        ".pdf" | ".txt" => "📄",
        ".doc" | ".docx" => "📝",
        ".xls" | ".xlsx" => "📊",
        ".ppt" | ".pptx" => "📑",
        ".jpg" | ".jpeg" | ".png" | ".gif" => "🖼️",
        ".zip" | ".rar" => "📦",
        ".mp3" => "🎵",
        ".mp4" | ".avi" | ".mov" => "🎬",
        _ => "📄",
    }
}

fn print_breadcrumbs(state: &NavigationState) {
    let trail: Vec<String> = state
        .current_path
        .breadcrumbs()
        .into_iter()
        .map(|c| if c.is_current { format!("[{}]", c.label) } else { c.label })
        .collect();
    println!("{}", trail.join(" / "));
}

/// Numbered view: folders first, then files
fn print_listing(session: &Session, ext: Option<&str>) {
    let state = session.state();
    let listing = &state.current_listing;
    print_breadcrumbs(state);
    println!("📂 {}", listing.current_folder_name);

    let selection = session.selection();
    let mark = |selected: bool| if selected { "*" } else { " " };

    for (i, folder) in listing.folders.iter().enumerate() {
        let selected = selection.contains(ItemKind::Folder, &folder.path.remote_path());
        println!("{}{:>3}  📁 {}", mark(selected), i + 1, folder.name);
    }
    let wanted = ext.unwrap_or("");
    for (i, file) in listing.files.iter().enumerate() {
        if !file.matches_extension(wanted) {
            continue;
        }
        let n = listing.folders.len() + i + 1;
        let selected = file
            .download_ref
            .as_deref()
            .is_some_and(|r| selection.contains(ItemKind::File, r));
        let note = if file.is_downloadable() { "" } else { "  (no link)" };
        println!("{}{:>3}  {} {}{}", mark(selected), n, file_icon(&file.extension), file.name, note);
    }
    if listing.is_empty() {
        println!("     (empty folder)");
    }

    let types = listing.available_extensions();
    if !types.is_empty() {
        println!("types: {}", types.join(" "));
    }
}

fn progress_callback(bar: &ProgressBar) -> ProgressFn {
    let bar = bar.clone();
    Box::new(move |done, total| {
        if total > 0 {
            bar.set_length(total);
        }
        bar.set_position(done);
    })
}

async fn fetch_download(url: &str, output: Option<&Path>, fallback_name: &str, timeout_secs: u64) -> anyhow::Result<()> {
    let url = url::Url::parse(url)?;
    // archives can take long to assemble; only the connect phase is bounded
    let client = reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_secs(timeout_secs))
        .build()?;

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template("{spinner} {bytes}/{total_bytes} {bytes_per_sec} {wide_bar}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let result = transfer::download_to_file(&client, url, output, fallback_name, Some(progress_callback(&bar))).await;
    bar.finish_and_clear();
    let (path, bytes) = result?;
    println!("Saved {} ({} bytes)", path.display(), bytes);
    Ok(())
}

async fn finish_download(outcome: ActionOutcome, output: Option<&Path>, print_url: bool, config: &BrowserConfig) -> anyhow::Result<()> {
    let (url, file_name) = match outcome {
        ActionOutcome::Download { url, file_name } => (url, file_name),
        other => bail!("Unexpected outcome {:?}", other),
    };
    if print_url {
        println!("{}", url);
        Ok(())
    } else {
        fetch_download(&url, output, &file_name, config.timeout_secs).await
    }
}

/// Find `name` in `folder`, navigating there first
async fn locate_file(session: &mut Session, folder: &str, name: &str) -> anyhow::Result<FileEntry> {
    session.dispatch(Action::Navigate(FolderPath::normalize(folder))).await?;
    session
        .state()
        .current_listing
        .find_file(name)
        .cloned()
        .ok_or_else(|| anyhow!("No file '{}' in '{}'", name, FolderPath::normalize(folder)))
}

async fn run_batch(session: &mut Session, folders: &[String], files: &[String]) -> anyhow::Result<ActionOutcome> {
    for folder in folders {
        let path = FolderPath::normalize(folder);
        let name = path.name().map(str::to_string).ok_or_else(|| anyhow!("Cannot select the root folder"))?;
        let item = SelectionItem::new(ItemKind::Folder, path.remote_path(), name);
        session.dispatch(Action::ToggleSelection(item)).await?;
    }
    for file in files {
        let path = FolderPath::normalize(file);
        let name = path.name().ok_or_else(|| anyhow!("Invalid file '{}'", file))?.to_string();
        let entry = locate_file(session, &path.parent().to_string(), &name).await?;
        let item = SelectionItem::file(&entry).ok_or_else(|| anyhow!("'{}' cannot be downloaded", file))?;
        session.dispatch(Action::SelectAll(vec![item])).await?;
    }
    Ok(session.dispatch(Action::DownloadSelection).await?)
}

const BROWSE_HELP: &str = "\
commands:
  ls [ext]        list current folder
  cd <n|name|/path|..>  open folder
  up | root       parent folder | shared root
  sel <n>...      toggle selection of numbered items
  all | clear     select everything shown | clear selection
  selected        show selection
  get <n>         download numbered file
  dl              download selection
  key <key>       switch public key
  quit";

/// Item shown under number `n` by `print_listing` (without extension filter)
fn numbered(state: &NavigationState, n: usize) -> Option<Result<SelectionItem, &FileEntry>> {
    let listing = &state.current_listing;
    let index = n.checked_sub(1)?;
    if let Some(folder) = listing.folders.get(index) {
        return Some(Ok(SelectionItem::folder(folder)));
    }
    let file = listing.files.get(index - listing.folders.len())?;
    Some(SelectionItem::file(file).ok_or(file))
}

/// Folder opened by `cd <n>`; `Err` carries the name of a numbered file
fn numbered_folder(state: &NavigationState, n: usize) -> Option<Result<FolderPath, String>> {
    let listing = &state.current_listing;
    let index = n.checked_sub(1)?;
    match listing.folders.get(index) {
        Some(folder) => Some(Ok(folder.path.clone())),
        None => listing
            .files
            .get(index - listing.folders.len())
            .map(|file| Err(file.name.clone())),
    }
}

async fn browse_command(session: &mut Session, line: &str, config: &BrowserConfig) -> anyhow::Result<bool> {
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else { return Ok(true) };
    let rest: Vec<&str> = words.collect();

    let action = match cmd {
        "quit" | "exit" | "q" => return Ok(false),
        "help" | "?" => {
            println!("{}", BROWSE_HELP);
            return Ok(true);
        }
        "ls" => {
            print_listing(session, rest.first().copied());
            return Ok(true);
        }
        "selected" => {
            for item in session.selection().members() {
                println!("  {:<6} {}  ({})", item.kind, item.display_name, item.identifier);
            }
            println!("{} selected", session.selection().len());
            return Ok(true);
        }
        "key" => Action::SetPublicKey(PublicKey::new(rest.join(" "))),
        "up" => Action::GoUp,
        "root" => Action::GoRoot,
        "cd" => {
            let target = rest.join(" ");
            let state = session.state();
            if target == ".." {
                Action::GoUp
            } else if target.starts_with('/') {
                Action::Navigate(FolderPath::normalize(&target))
            } else if let Some(picked) = target.parse::<usize>().ok().and_then(|n| numbered_folder(state, n)) {
                match picked {
                    Ok(path) => Action::Navigate(path),
                    Err(name) => {
                        println!("'{}' is not a folder", name);
                        return Ok(true);
                    }
                }
            } else if let Some(folder) = state.current_listing.find_folder(&target) {
                Action::Navigate(folder.path.clone())
            } else {
                Action::Navigate(state.current_path.child(&target))
            }
        }
        "sel" => {
            for n in &rest {
                let n: usize = n.parse().with_context(|| format!("'{}' is not a number", n))?;
                let picked = numbered(session.state(), n).map(|r| r.map_err(|file| file.name.clone()));
                match picked {
                    Some(Ok(item)) => {
                        session.dispatch(Action::ToggleSelection(item)).await?;
                    }
                    Some(Err(name)) => println!("'{}' has no download link", name),
                    None => println!("No item {}", n),
                }
            }
            println!("{} selected", session.selection().len());
            return Ok(true);
        }
        "all" => Action::SelectAllVisible,
        "clear" => Action::ClearSelection,
        "get" => {
            let n: usize = rest
                .first()
                .and_then(|n| n.parse().ok())
                .context("usage: get <n>")?;
            let listing = &session.state().current_listing;
            let file = n
                .checked_sub(listing.folders.len() + 1)
                .and_then(|i| listing.files.get(i))
                .with_context(|| format!("No file {}", n))?;
            Action::DownloadFile {
                download_ref: file.download_ref.clone(),
                name: file.name.clone(),
            }
        }
        "dl" => Action::DownloadSelection,
        other => {
            println!("Unknown command '{}'; try help", other);
            return Ok(true);
        }
    };

    match session.dispatch(action).await? {
        ActionOutcome::Navigated { .. } => print_listing(session, None),
        ActionOutcome::SelectionChanged { selected } => println!("{} selected", selected),
        ActionOutcome::PublicKeyChanged => println!("Public key set"),
        download @ ActionOutcome::Download { .. } => finish_download(download, None, false, config).await?,
    }
    Ok(true)
}

async fn browse(session: &mut Session, config: &BrowserConfig) -> anyhow::Result<()> {
    if !session.public_key().is_empty() {
        if let Err(e) = session.dispatch(Action::GoRoot).await {
            let e = anyhow::Error::from(e);
            eprintln!("{}: {}", error_prefix(&e), e);
        } else {
            print_listing(session, None);
        }
    }
    println!("Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match browse_command(session, line.trim(), config).await {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => eprintln!("{}: {:#}", error_prefix(&e), e),
        }
    }
    Ok(())
}

/// Remote failures are reported as such; everything else is a local error
fn error_prefix(err: &anyhow::Error) -> &'static str {
    match err.downcast_ref::<BrowserError>() {
        Some(e) if e.is_remote() => "Remote error",
        _ => "Error",
    }
}

fn config_command(command: ConfigCommand) -> anyhow::Result<()> {
    let path = config::get_config_path();
    match command {
        ConfigCommand::Show => {
            println!("# {}", path.display());
            println!("{}", serde_json::to_string_pretty(&config::load_config())?);
        }
        ConfigCommand::Init => {
            if path.exists() {
                println!("{} already exists", path.display());
            } else {
                config::save_config(&BrowserConfig::default()).map_err(|e| anyhow!(e))?;
                println!("Wrote {}", path.display());
            }
        }
    }
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let overrides = Overrides {
        key: cli.key,
        source: cli.source,
        backend: cli.backend,
    };

    match cli.command {
        Commands::Config { command } => config_command(command)?,
        Commands::Ls { path, ext } => {
            let (_, mut session) = open_session(&overrides)?;
            session.dispatch(Action::Navigate(FolderPath::normalize(&path))).await?;
            print_listing(&session, ext.as_deref());
        }
        Commands::Get { folder, name, output, print_url } => {
            let (config, mut session) = open_session(&overrides)?;
            let file = locate_file(&mut session, &folder, &name).await?;
            let outcome = session
                .dispatch(Action::DownloadFile {
                    download_ref: file.download_ref,
                    name: file.name,
                })
                .await?;
            finish_download(outcome, output.as_deref(), print_url, &config).await?;
        }
        Commands::Batch { folders, files, output, print_url } => {
            let (config, mut session) = open_session(&overrides)?;
            let outcome = run_batch(&mut session, &folders, &files).await?;
            finish_download(outcome, output.as_deref(), print_url, &config).await?;
        }
        Commands::Browse => {
            let (config, mut session) = open_session(&overrides)?;
            browse(&mut session, &config).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", error_prefix(&e), e);
            ExitCode::FAILURE
        }
    }
}
