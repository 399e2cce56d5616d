//! Command-line front end for the note engine.
//!
//! # Responsibility
//! - Bind a directory given on the command line and run one workspace query.
//! - Stand in for interactive collaborators (folder picker, name prompt,
//!   download) with non-interactive versions.

use notegraph_core::{
    init_logging, open_db, CoreConfig, DownloadError, DownloadSink, FolderPicker,
    FsDirectoryStore, NamePrompter, NameRejection, NoteWorkspace, SaveOutcome,
    SqliteBindingRepository, SqliteVersionRepository,
};
use log::info;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Hands out one fixed folder.
struct GivenFolder(Option<PathBuf>);

impl FolderPicker for GivenFolder {
    fn pick_folder(&mut self) -> Option<PathBuf> {
        self.0.take()
    }
}

/// Answers the first name prompt with a fixed name and cancels any re-prompt.
struct GivenName(Option<String>);

impl NamePrompter for GivenName {
    fn prompt_name(&mut self, rejection: Option<&NameRejection>) -> Option<String> {
        if let Some(rejection) = rejection {
            eprintln!("{rejection}");
        }
        self.0.take()
    }
}

/// Writes fallback downloads into a local directory.
struct DownloadDir(PathBuf);

impl DownloadSink for DownloadDir {
    fn offer_download(&mut self, file_name: &str, text: &str) -> Result<(), DownloadError> {
        let io_error = |source| DownloadError::Io {
            file_name: file_name.to_string(),
            source,
        };
        std::fs::create_dir_all(&self.0).map_err(io_error)?;
        std::fs::write(self.0.join(file_name), text).map_err(io_error)?;
        println!("downloaded {}", self.0.join(file_name).display());
        Ok(())
    }
}

const COMMANDS: &[&str] = &["graph", "history", "suggest", "save"];

fn usage() -> &'static str {
    "usage:
  notegraph ping
  notegraph graph <dir>
  notegraph history <dir> <name>
  notegraph suggest <dir> <partial>
  notegraph save <dir> <name>      (note text is read from stdin)
"
}

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args.iter().any(|arg| arg == "-h" || arg == "--help") {
        print!("{}", usage());
        return ExitCode::SUCCESS;
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<(), String> {
    let command = args[0].as_str();
    if command == "ping" {
        println!("notegraph_core ping={}", notegraph_core::ping());
        println!("notegraph_core version={}", notegraph_core::core_version());
        return Ok(());
    }

    if !COMMANDS.contains(&command) {
        return Err(format!("unknown command `{command}`\n{}", usage()));
    }

    let config = CoreConfig::from_env();
    if let Err(err) = init_logging(&config.log_level, &config.log_dir) {
        eprintln!("warning: logging disabled: {err}");
    }
    info!("event=cli_command module=cli status=start command={command}");
    std::fs::create_dir_all(&config.data_dir).map_err(|err| {
        format!(
            "cannot create data directory `{}`: {err}",
            config.data_dir.display()
        )
    })?;
    let conn = open_db(config.state_db_path()).map_err(|err| err.to_string())?;
    let versions = SqliteVersionRepository::try_new(&conn).map_err(|err| err.to_string())?;
    let bindings = SqliteBindingRepository::try_new(&conn).map_err(|err| err.to_string())?;
    let mut workspace = NoteWorkspace::new(FsDirectoryStore::new(), versions, bindings);

    let dir = positional(args, 1, "<dir>")?;
    let report = workspace
        .grant_directory(&mut GivenFolder(Some(Path::new(dir).to_path_buf())))
        .map_err(|err| err.to_string())?;
    if report.skipped > 0 {
        eprintln!("skipped {} unreadable note(s)", report.skipped);
    }

    match command {
        "graph" => {
            let payload = workspace.graph_payload();
            println!("{}", payload.to_json().map_err(|err| err.to_string())?);
            for (identity, counts) in workspace.counts() {
                println!("{identity}\tsend={}\treceive={}", counts.send, counts.receive);
            }
        }
        "history" => {
            let name = positional(args, 2, "<name>")?;
            let note_id = workspace
                .find_by_identity(name)
                .map(|note| note.note_id())
                .ok_or_else(|| format!("no note named `{name}`"))?;
            let labels = workspace
                .history_labels(note_id)
                .map_err(|err| err.to_string())?;
            if labels.is_empty() {
                println!("no saved versions");
            }
            for label in labels {
                println!("{label}");
            }
        }
        "suggest" => {
            let partial = positional(args, 2, "<partial>")?;
            for candidate in
                notegraph_core::compute_candidates(partial, &workspace.known_identities())
            {
                println!("{candidate}");
            }
        }
        "save" => {
            let name = positional(args, 2, "<name>")?;
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .map_err(|err| format!("cannot read stdin: {err}"))?;

            let note_id = match workspace.find_by_identity(name).map(|note| note.note_id()) {
                Some(note_id) => {
                    workspace
                        .edit_content(note_id, text)
                        .map_err(|err| err.to_string())?;
                    note_id
                }
                None => workspace.new_note(text),
            };
            let outcome = workspace
                .save_note(
                    note_id,
                    &mut GivenName(Some(name.to_string())),
                    &mut DownloadDir(config.downloads_dir()),
                )
                .map_err(|err| err.to_string())?;
            match outcome {
                SaveOutcome::Saved { file_name, .. } => println!("saved {file_name}"),
                SaveOutcome::Downloaded { file_name, .. } => println!("downloaded {file_name}"),
                SaveOutcome::FellBack {
                    file_name, reason, ..
                } => println!("write failed ({reason}); downloaded {file_name}"),
                SaveOutcome::Cancelled { .. } => return Err("save cancelled".to_string()),
            }
        }
        other => return Err(format!("unknown command `{other}`")),
    }
    info!("event=cli_command module=cli status=ok command={command}");
    Ok(())
}

fn positional<'a>(args: &'a [String], index: usize, label: &str) -> Result<&'a str, String> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| format!("missing {label}\n{}", usage()))
}
