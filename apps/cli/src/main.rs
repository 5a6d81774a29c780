#![deny(warnings)]

//! Headless driver: autoplay, inspection and save management.

use anyhow::{bail, Context, Result};
use mine_core::{Catalog, HelperId, PlanetId, SystemClock, ToolId};
use mine_runtime::{EngineConfig, LoadReport, Session};
use persistence::{FileStore, LoadOutcome, PersistenceController};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

type Store = PersistenceController<FileStore>;

#[derive(Debug)]
enum Command {
    Play { seconds: u32, clicks_per_sec: u32 },
    Status,
    Export(PathBuf),
    Import { file: PathBuf, yes: bool },
    Repair,
    Reset,
}

#[derive(Debug)]
struct Args {
    config: Option<PathBuf>,
    save_dir: PathBuf,
    command: Command,
}

const USAGE: &str = "usage: mine-cli [--config FILE] [--save-dir DIR] \
<play --seconds N [--clicks-per-sec K] | status | export FILE | import FILE --yes | repair | reset>";

fn parse_args() -> Result<Args> {
    let mut config = None;
    let mut save_dir = PathBuf::from("./saves");
    let mut command: Option<String> = None;
    let mut positional: Option<String> = None;
    let mut seconds = 60;
    let mut clicks_per_sec = 5;
    let mut yes = false;
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => config = it.next().map(PathBuf::from),
            "--save-dir" => save_dir = it.next().map(PathBuf::from).context(USAGE)?,
            "--seconds" => {
                seconds = it.next().and_then(|s| s.parse().ok()).context("--seconds N")?
            }
            "--clicks-per-sec" => {
                clicks_per_sec = it
                    .next()
                    .and_then(|s| s.parse().ok())
                    .context("--clicks-per-sec K")?
            }
            "--yes" => yes = true,
            "-h" | "--help" => bail!(USAGE),
            other if other.starts_with("--") => bail!("unknown flag {other}\n{USAGE}"),
            other if command.is_none() => command = Some(other.to_string()),
            other => positional = Some(other.to_string()),
        }
    }
    let command = match command.as_deref() {
        Some("play") => Command::Play {
            seconds,
            clicks_per_sec,
        },
        Some("status") | None => Command::Status,
        Some("export") => Command::Export(positional.map(PathBuf::from).context(USAGE)?),
        Some("import") => Command::Import {
            file: positional.map(PathBuf::from).context(USAGE)?,
            yes,
        },
        Some("repair") => Command::Repair,
        Some("reset") => Command::Reset,
        Some(other) => bail!("unknown command {other}\n{USAGE}"),
    };
    Ok(Args {
        config,
        save_dir,
        command,
    })
}

fn describe(session: &Session) {
    let s = session.state();
    println!(
        "Planet: {} | currency: {:.0} | rate: {:.1}/s | earned: {:.0} | clicks: {}",
        s.active_planet, s.currency, s.total_production_rate, s.total_earned, s.total_clicks
    );
    for (planet, progress) in &s.planets {
        if progress.owned_helpers.is_empty() {
            continue;
        }
        let producing = progress.placed_helpers.iter().filter(|h| h.is_producing).count();
        println!(
            "  {planet}: {} helpers ({} producing)",
            progress.owned_helpers.len(),
            producing
        );
    }
    let unlocked: Vec<&str> = session.unlocked_planets().iter().map(|p| p.as_str()).collect();
    println!(
        "Unlocked: {} | tool: {} | achievements: {} | play time: {:.0}s",
        unlocked.join(", "),
        s.equipped_tool,
        s.statistics.achievements.len(),
        s.cumulative_play_time_seconds
    );
}

/// Cheapest helper of the active planet the player can pay for now.
fn cheapest_affordable(session: &Session) -> Option<HelperId> {
    let state = session.state();
    session
        .catalog()
        .helpers_on(state.active_planet)
        .iter()
        .filter_map(|def| {
            let cost = session.next_helper_cost(def.id).ok()?;
            (cost <= state.currency).then_some((def.id, cost))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(id, _)| id)
}

fn next_planet(current: PlanetId) -> Option<PlanetId> {
    let idx = PlanetId::ALL.iter().position(|p| *p == current)?;
    PlanetId::ALL.get(idx + 1).copied()
}

fn next_tool(session: &Session) -> Option<ToolId> {
    let state = session.state();
    session
        .catalog()
        .tools()
        .filter(|t| !state.owned_tools.contains(&t.id))
        .min_by_key(|t| t.cost)
        .filter(|t| t.cost as f64 <= state.currency)
        .map(|t| t.id)
}

async fn play(session: &mut Session, store: &Store, seconds: u32, clicks_per_sec: u32) -> Result<()> {
    for _ in 0..seconds {
        for _ in 0..clicks_per_sec {
            session.click();
        }
        if let Some(tool) = next_tool(session) {
            let _ = session.buy_tool(tool);
        }
        while let Some(kind) = cheapest_affordable(session) {
            if session.buy_helper(kind).is_err() {
                break;
            }
        }
        session.auto_place_pending();
        if let Some(next) = next_planet(session.state().active_planet) {
            if session.unlocked_planets().contains(&next) && session.switch_planet(next).is_ok() {
                session.finish_transition();
            }
        }
        let report = session.advance(1.0);
        if report.autosave_due {
            if let Err(err) = session.save(store).await {
                warn!(%err, "autosave failed");
            }
        }
    }
    session.save(store).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logging setup
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = parse_args()?;
    info!(command = ?args.command, save_dir = %args.save_dir.display(), "starting CLI");

    let config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    let catalog = Arc::new(Catalog::standard());
    catalog.validate()?;
    let clock = Arc::new(SystemClock);
    let store: Store = PersistenceController::local_only(
        FileStore::new(&args.save_dir),
        clock.clone(),
        catalog.clone(),
        config.placement.clone(),
    )
    .with_keys(config.slots.clone());
    let mut session = Session::new(catalog, config, clock);

    match args.command {
        Command::Play {
            seconds,
            clicks_per_sec,
        } => {
            session.load(&store).await?;
            play(&mut session, &store, seconds, clicks_per_sec).await?;
            describe(&session);
        }
        Command::Status => {
            match session.load(&store).await? {
                LoadReport::Loaded { source, timestamp } => {
                    let when = chrono::DateTime::from_timestamp_millis(timestamp)
                        .map_or_else(|| timestamp.to_string(), |t| t.to_rfc3339());
                    println!("Save: {} slot, written {}", source.as_str(), when);
                }
                LoadReport::FreshStart => println!("Save: none, fresh game"),
                LoadReport::Skipped => {}
            }
            describe(&session);
        }
        Command::Export(path) => {
            session.load(&store).await?;
            let text = store.export(session.state())?;
            tokio::fs::write(&path, text)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Exported to {}", path.display());
        }
        Command::Import { file, yes } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let pending = session.prepare_import(&store, &text)?;
            let preview = pending.preview();
            println!(
                "Import: planet {}, currency {:.0}, {} helpers",
                preview.active_planet,
                preview.currency,
                preview.helpers_owned_total()
            );
            if !yes {
                println!("Current save left untouched; re-run with --yes to overwrite it.");
                return Ok(());
            }
            session.apply_import(pending);
            session.save(&store).await?;
            println!("Imported.");
        }
        Command::Repair => match store.recover().await? {
            LoadOutcome::Loaded { state, source, .. } => {
                session.install(state);
                session.save(&store).await?;
                println!("Recovered from {} slot.", source.as_str());
                describe(&session);
            }
            _ => println!("Nothing to repair."),
        },
        Command::Reset => {
            session.reset(&store).await?;
            println!("Saves deleted.");
        }
    }
    Ok(())
}
