/// Entry point and game loop.

mod config;
mod domain;
mod error;
mod sim;
mod ui;

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use config::GameConfig;
use sim::assets::Assets;
use sim::event::GameEvent;
use sim::step;
use sim::world::{Session, SessionParams};
use ui::input::InputState;
use ui::overlay::OverlayView;
use ui::renderer::{Renderer, ViewContext};
use ui::sound::SoundEngine;
use ui::source::{self, InputSource};

const FRAME_SLEEP: Duration = Duration::from_millis(5);
const WELCOME_TICKS: u32 = 120;

fn main() -> Result<()> {
    if let Err(e) = setup_logging() {
        eprintln!("logging disabled: {e:#}");
    }

    let config = GameConfig::load();

    let loaded = sim::map::load_map(&config.assets)
        .with_context(|| format!("failed to load map {}", config.assets.map.display()))?;
    let assets = sim::assets::load_assets(&loaded.map, &config.assets.sprite_sheet)
        .context("failed to decode image assets")?;

    let mut input_source = source::select_source(&config);
    let params = SessionParams::from_config(
        &config,
        input_source.shows_prompt(),
        input_source.overlay_blocks_steering(),
    );
    let mut session = Session::new(loaded, params);
    session.set_message("Walk up to a ◆ to learn about it.", WELCOME_TICKS);

    let mut renderer = Renderer::new();
    let enhanced = renderer.init().context("terminal init failed")?;

    let sound = SoundEngine::new();

    let result = game_loop(
        &mut session,
        &mut renderer,
        input_source.as_mut(),
        sound.as_ref(),
        &assets,
        &config,
        enhanced,
    );

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }

    let visited = result?;
    tracing::info!(visited, total = session.pois.len(), "session ended");
    println!();
    println!("Thanks for strolling! You read about {visited} of {} places.", session.pois.len());
    Ok(())
}

/// Run until quit. Returns how many distinct POIs were opened.
fn game_loop(
    session: &mut Session,
    renderer: &mut Renderer,
    input_source: &mut dyn InputSource,
    sound: Option<&SoundEngine>,
    assets: &Assets,
    config: &GameConfig,
    enhanced: bool,
) -> Result<usize> {
    let mut kb = InputState::new();
    kb.honor_release = enhanced;

    let tick_rate = Duration::from_millis(config.tick_rate_ms);
    let dt = tick_rate.as_secs_f32();
    let mut last_tick = Instant::now();

    let mut overlay: Option<OverlayView> = None;
    let mut visited: HashSet<usize> = HashSet::new();

    loop {
        kb.drain_events();
        input_source.pump(&kb);

        if input_source.quit_requested() {
            break;
        }

        if last_tick.elapsed() >= tick_rate {
            let frame_input = input_source.take_frame_input();
            let events = step::step(session, frame_input, dt);
            for ev in &events {
                apply_event(session, ev, &mut overlay, &mut visited, config);
            }
            if let Some(sfx) = sound {
                sfx.play_events(&events);
            }
            last_tick = Instant::now();
        }

        let ctx = ViewContext {
            assets,
            overlay: overlay.as_ref(),
            device: input_source.device(),
        };
        renderer.render(session, &ctx).context("render failed")?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(visited.len())
}

/// Keep the overlay view in sync with the interaction state.
fn apply_event(
    session: &Session,
    ev: &GameEvent,
    overlay: &mut Option<OverlayView>,
    visited: &mut HashSet<usize>,
    config: &GameConfig,
) {
    match *ev {
        GameEvent::OverlayOpened { poi } => {
            if let Some(p) = session.pois.get(poi) {
                tracing::info!(poi, title = %p.title, "overlay opened");
                *overlay = Some(OverlayView::from_poi(poi, p, &config.assets.asset_root, &config.assets.base_dir));
                visited.insert(poi);
            }
        }
        GameEvent::OverlayClosed => {
            tracing::debug!("overlay closed");
            *overlay = None;
        }
        GameEvent::EnteredRange { poi } => {
            tracing::debug!(poi, "in range");
        }
        GameEvent::LeftRange | GameEvent::DustStarted | GameEvent::DustStopped => {}
    }
}

/// File-only logging: the terminal belongs to the renderer.
/// Filter comes from `STROLL_LOG` (EnvFilter syntax), default `info`.
fn setup_logging() -> Result<()> {
    let log_dir = log_directory();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("cannot create log dir {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(&log_dir, "stroll.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_env("STROLL_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .context("tracing subscriber already set")?;

    // Writer must outlive every log call.
    std::mem::forget(guard);

    tracing::info!(dir = %log_dir.display(), "logging initialized");
    Ok(())
}

fn log_directory() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join("Library/Logs/stroll");
        }
    }

    #[cfg(target_os = "linux")]
    {
        if let Some(state) = std::env::var_os("XDG_STATE_HOME") {
            return PathBuf::from(state).join("stroll/logs");
        }
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(".local/state/stroll/logs");
        }
    }

    #[cfg(target_os = "windows")]
    {
        if let Some(local_appdata) = std::env::var_os("LOCALAPPDATA") {
            return PathBuf::from(local_appdata).join("stroll").join("logs");
        }
    }

    std::env::temp_dir().join("stroll").join("logs")
}
