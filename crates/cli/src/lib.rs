use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use organizer_core::{
    DocumentHandle, Mode, PageIndex, PreviewReply, PreviewRequest, PreviewService, TransformEngine,
    Workspace,
};
use pdf_engine::{LopdfEngine, ScriptEngine, ThumbnailSize};
use serde::Serialize;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use storage::{EngineBackend, Settings, Storage};

#[derive(Debug, Parser)]
#[command(name = "forgepdf-cli")]
#[command(about = "ForgePDF page organizer CLI")]
pub struct Cli {
    /// Settings directory. Defaults to the per-user data directory.
    #[arg(long, global = true, env = "FORGEPDF_CONFIG_DIR", value_name = "DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Render page thumbnails and print their paths.
    Preview {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Render only this 1-based page.
        #[arg(long, conflicts_with = "paginated")]
        page: Option<PageIndex>,
        /// Request pages one at a time, in order.
        #[arg(long)]
        paginated: bool,
    },
    /// Reorder pages and drop deleted ones.
    Organize {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// New page order as original page numbers, e.g. 3,1,2.
        #[arg(long, value_delimiter = ',')]
        order: Vec<PageIndex>,
        /// Pages to delete.
        #[arg(long, value_delimiter = ',')]
        delete: Vec<PageIndex>,
        /// Move page SRC in front of page DST. Repeatable.
        #[arg(long = "move", value_name = "SRC:DST")]
        moves: Vec<PageMove>,
        #[command(flatten)]
        save: SaveArgs,
    },
    /// Extract pages into a new document.
    Split {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, value_delimiter = ',', required = true)]
        pages: Vec<PageIndex>,
        #[command(flatten)]
        save: SaveArgs,
    },
    /// Rotate pages by 90, 180 or 270 degrees.
    Rotate {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long = "rotate", value_name = "PAGE:DEG", required = true)]
        rotations: Vec<PageRotation>,
        #[command(flatten)]
        save: SaveArgs,
    },
    /// Show or create the settings file.
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    Show,
    /// Write default settings unless a settings file exists.
    Init {
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
struct SaveArgs {
    /// Output file. Defaults to `<operation>_<name>` beside the input.
    #[arg(long)]
    output: Option<PathBuf>,
    /// Print the request instead of writing a file.
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageMove {
    source: PageIndex,
    destination: PageIndex,
}

impl FromStr for PageMove {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (source, destination) =
            value.split_once(':').ok_or_else(|| format!("expected SRC:DST, got `{value}`"))?;
        let page = |text: &str| text.parse::<PageIndex>().map_err(|err| format!("invalid page `{text}`: {err}"));

        Ok(Self { source: page(source)?, destination: page(destination)? })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageRotation {
    page: PageIndex,
    degrees: i32,
}

impl FromStr for PageRotation {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (page, degrees) =
            value.split_once(':').ok_or_else(|| format!("expected PAGE:DEG, got `{value}`"))?;

        Ok(Self {
            page: page.parse().map_err(|err| format!("invalid page `{page}`: {err}"))?,
            degrees: degrees.trim().parse().map_err(|err| format!("invalid angle `{degrees}`: {err}"))?,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CommitOutput {
    message: String,
    output_path: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct SettingsOutput {
    path: PathBuf,
    settings: Settings,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    let storage = match &cli.config_dir {
        Some(dir) => Storage::with_root(dir),
        None => Storage::from_default_project().context("failed to locate settings directory")?,
    };

    match cli.command {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Settings { action } => run_settings(&storage, action),
        command => {
            let settings = storage.load_settings().context("failed to load settings")?;
            let preview_dir = storage.preview_dir(&settings);
            log::debug!("using {} backend, previews in {}", settings.backend, preview_dir.display());

            match settings.backend {
                EngineBackend::Native => {
                    let thumbnail = ThumbnailSize {
                        width_px: settings.thumbnail_width,
                        height_px: settings.thumbnail_height,
                    };
                    let mut engine = LopdfEngine::new(preview_dir).with_thumbnail_size(thumbnail);
                    run_with(&mut engine, command)
                }
                EngineBackend::Script => {
                    let script_dir = settings
                        .script_dir
                        .clone()
                        .context("the script backend needs `script_dir` in settings")?;
                    let mut engine = ScriptEngine::new(&settings.interpreter, script_dir, preview_dir);
                    run_with(&mut engine, command)
                }
            }
        }
    }
}

fn run_with<E>(engine: &mut E, command: Commands) -> Result<()>
where
    E: PreviewService + TransformEngine,
{
    match command {
        Commands::Preview { file, page, paginated } => run_preview(engine, &file, page, paginated),
        Commands::Organize { file, order, delete, moves, save } => {
            run_edit(engine, &file, Mode::Organize, save, |workspace| {
                if !order.is_empty() {
                    workspace.reorder(&order)?;
                }
                for PageMove { source, destination } in &moves {
                    workspace.click_page(*source)?;
                    workspace.click_page(*destination)?;
                }
                for page in &delete {
                    workspace.toggle_deleted(*page)?;
                }
                Ok(())
            })
        }
        Commands::Split { file, pages, save } => {
            run_edit(engine, &file, Mode::Split, save, |workspace| {
                for page in pages.iter().collect::<BTreeSet<_>>() {
                    workspace.toggle_selected(*page)?;
                }
                Ok(())
            })
        }
        Commands::Rotate { file, rotations, save } => {
            run_edit(engine, &file, Mode::Rotate, save, |workspace| {
                for PageRotation { page, degrees } in &rotations {
                    workspace.apply_rotation(*page, *degrees)?;
                }
                Ok(())
            })
        }
        Commands::Settings { .. } | Commands::Version => Ok(()),
    }
}

fn run_preview<E>(engine: &mut E, file: &Path, page: Option<PageIndex>, paginated: bool) -> Result<()>
where
    E: PreviewService,
{
    ensure_pdf_exists(file)?;
    let document = DocumentHandle::new(file);

    let reply = if paginated {
        let mut workspace = Workspace::new();
        let page_count = workspace.load_paginated(document, engine).context("failed to preview PDF")?;
        PreviewReply {
            success: true,
            file_paths: workspace.thumbnails().into_iter().map(|view| view.image).collect(),
            page_count: page_count as u32,
            ..PreviewReply::default()
        }
    } else {
        let request = page.map_or(PreviewRequest::AllPages, PreviewRequest::Page);
        PreviewReply::from(engine.render(&document, request).context("failed to preview PDF")?)
    };

    println!("{}", serde_json::to_string_pretty(&reply)?);
    Ok(())
}

fn run_edit<E, F>(engine: &mut E, file: &Path, mode: Mode, save: SaveArgs, edit: F) -> Result<()>
where
    E: PreviewService + TransformEngine,
    F: FnOnce(&mut Workspace) -> Result<(), organizer_core::WorkspaceError>,
{
    ensure_pdf_exists(file)?;

    let mut workspace = Workspace::new();
    workspace.load(DocumentHandle::new(file), engine).context("failed to load PDF")?;
    workspace.switch_mode(mode)?;
    edit(&mut workspace)?;

    if save.dry_run {
        let request = workspace.prepare_commit()?;
        println!("{}", serde_json::to_string_pretty(&request)?);
        return Ok(());
    }

    let output = save.output.unwrap_or_else(|| default_output(file, mode));
    let outcome = workspace.commit(engine, &output)?;

    let payload = CommitOutput { message: outcome.message, output_path: outcome.output_path };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn run_settings(storage: &Storage, action: SettingsAction) -> Result<()> {
    let path = storage.settings_path();

    let settings = match action {
        SettingsAction::Show => storage.load_settings().context("failed to load settings")?,
        SettingsAction::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!("settings already exist: {} (use --force to overwrite)", path.display());
            }
            let settings = Settings::default();
            storage.save_settings(&settings).context("failed to write settings")?;
            settings
        }
    };

    println!("{}", serde_json::to_string_pretty(&SettingsOutput { path, settings })?);
    Ok(())
}

fn ensure_pdf_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }

    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }

    Ok(())
}

fn default_output(file: &Path, mode: Mode) -> PathBuf {
    let prefix = match mode {
        Mode::Organize => "organized",
        Mode::Split => "split",
        Mode::Rotate => "rotated",
    };
    let name = file.file_name().and_then(|name| name.to_str()).unwrap_or("document.pdf");

    file.with_file_name(format!("{prefix}_{name}"))
}
