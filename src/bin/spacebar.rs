use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use spacebar::actor::{DebounceOptions, Debounced, OsascriptSwitcher, SpaceNavigator};
use spacebar::common::config::{Config, SpacesSettings};
use spacebar::common::log::init_logging;
use spacebar::model::{BarModel, DisplayId, EmptyState, Exclusions, classify_output};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Parser)]
#[command(version, about = "Render model and space navigation for a yabai status bar")]
struct Cli {
    /// Config file (defaults to ~/.config/spacebar/config.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the render model of one display for a single snapshot.
    Model {
        /// Display id, as reported by `yabai -m query --displays`.
        #[arg(long)]
        display: u32,
        /// Snapshot file, or `-` for stdin.
        #[arg(long, default_value = "-")]
        snapshot: PathBuf,
    },
    /// Read one snapshot per line from stdin and print the render model,
    /// paced by the refresh debounce settings.
    Watch {
        #[arg(long)]
        display: u32,
    },
    /// Move the focused space from CURRENT to DESIRED.
    Goto { current: u32, desired: u32 },
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
enum Output {
    Model(BarModel),
    Empty {
        state: EmptyState,
        message: &'static str,
    },
}

impl From<EmptyState> for Output {
    fn from(state: EmptyState) -> Self { Output::Empty { state, message: state.message() } }
}

struct Renderer {
    display: DisplayId,
    settings: SpacesSettings,
    exclusions: Exclusions,
}

impl Renderer {
    fn render(&self, raw: &str) -> Output {
        let snapshot = match classify_output(raw) {
            Ok(snapshot) => snapshot,
            Err(state) => return state.into(),
        };
        match BarModel::build(&snapshot, self.display, &self.settings, &self.exclusions) {
            Ok(model) => Output::Model(model),
            Err(err) => {
                warn!(error = %err, "Failed to build render model");
                EmptyState::Error.into()
            }
        }
    }

    fn print(&self, raw: &str) {
        match serde_json::to_string(&self.render(raw)) {
            Ok(json) => println!("{json}"),
            Err(err) => warn!(error = %err, "Failed to serialize output"),
        }
    }
}

fn read_snapshot(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).context("reading snapshot from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

async fn watch(renderer: Renderer, options: DebounceOptions) -> anyhow::Result<()> {
    let debounced = Debounced::new(move |raw: String| renderer.print(&raw), options);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        debounced.call(line);
    }
    debounced.flush();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    let issues = config.validate();
    if !issues.is_empty() {
        for issue in &issues {
            warn!(%issue, "Config issue");
        }
        let fixes = config.auto_fix_values();
        info!(fixes, "Applied config fixes");
    }
    let exclusions = Exclusions::from_settings(&config.spaces).context("compiling exclusions")?;

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    runtime.block_on(async move {
        match cli.command {
            Command::Model { display, snapshot } => {
                let raw = read_snapshot(&snapshot)?;
                let renderer = Renderer {
                    display: DisplayId(display),
                    settings: config.spaces,
                    exclusions,
                };
                renderer.print(&raw);
            }
            Command::Watch { display } => {
                let mut options = DebounceOptions::new(config.pacing.refresh_debounce).leading(true);
                options.max_wait = config.pacing.refresh_max_wait;
                let renderer = Renderer {
                    display: DisplayId(display),
                    settings: config.spaces,
                    exclusions,
                };
                watch(renderer, options).await?;
            }
            Command::Goto { current, desired } => {
                let navigator = SpaceNavigator::new(OsascriptSwitcher::new(&config.navigation));
                let steps = navigator.navigate(current, desired).await?;
                info!(steps, "Space switch complete");
            }
        }
        Ok(())
    })
}
