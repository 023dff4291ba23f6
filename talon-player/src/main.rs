//! # Talon Player
//!
//! Interactive control shell: reads command lines from stdin, dispatches
//! them against the player context and renders the resulting OSD state to
//! the terminal. The decode/render pipelines live behind the context and
//! are not driven from here.
//!
//! ## Usage
//! ```bash
//! # Open files and control them interactively
//! talon movie.mkv episode2.mkv
//!
//! # With debug logging
//! RUST_LOG=debug talon movie.mkv
//! ```

mod parse;

use anyhow::Result;
use std::io::{self, BufRead, Write};
use talon_core::command::run_command;
use talon_core::context::{PlayerContext, StopReason};
use talon_core::media::Media;
use talon_core::options::Options;
use talon_core::osd::{OsdBar, SeekInfoFlags};
use talon_core::playlist::PlaylistEntry;
use talon_core::properties::{get_property, print_property};
use talon_core::property::{format_time, Value};
use tracing::{info, warn};

struct AppOptions {
    files: Vec<String>,
    save_config_on_quit: bool,
}

impl AppOptions {
    fn from_args(args: &[String]) -> Self {
        let files = args
            .iter()
            .skip(1)
            .filter(|a| !a.starts_with("--"))
            .cloned()
            .collect();
        let save_config_on_quit = args.iter().any(|a| a == "--save-config");
        Self {
            files,
            save_config_on_quit,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "talon=info".into()),
        )
        .with_writer(io::stderr)
        .init();

    info!("Talon Player v{}", talon_core::VERSION);

    let args: Vec<String> = std::env::args().collect();
    let app_options = AppOptions::from_args(&args);

    let mut ctx = PlayerContext::new(Options::load());
    for file in &app_options.files {
        ctx.playlist.add(PlaylistEntry::new(file));
    }
    if !ctx.playlist.is_empty() {
        ctx.playlist.current = Some(0);
        open_current_entry(&mut ctx);
    }

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                warn!("Failed to read stdin: {}", e);
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let invocation = match parse::parse_line(&line) {
            Ok(inv) => inv,
            Err(e) => {
                warn!("{}", e);
                continue;
            }
        };

        run_command(&mut ctx, &invocation);
        render_feedback(&mut ctx, &mut stdout)?;

        if let Some(code) = process_stop(&mut ctx) {
            if app_options.save_config_on_quit {
                if let Err(e) = ctx.opts.save() {
                    warn!("{}", e);
                }
            }
            std::process::exit(code);
        }
    }

    Ok(())
}

/// React to the stop reason a command recorded. Returns an exit code when
/// the player should terminate.
fn process_stop(ctx: &mut PlayerContext) -> Option<i32> {
    match ctx.stop_play.take()? {
        StopReason::Quit(code) => return Some(code),
        StopReason::Stop => {
            ctx.close_media();
            info!("Playback stopped.");
        }
        StopReason::CurrentEntry | StopReason::Restart => {
            open_current_entry(ctx);
        }
        StopReason::NextEntry => {
            match ctx.playlist.next_index(1) {
                Some(index) => {
                    ctx.playlist.current = Some(index);
                    ctx.playlist.current_was_replaced = false;
                    open_current_entry(ctx);
                }
                None => {
                    ctx.close_media();
                    info!("End of playlist.");
                }
            }
        }
    }
    None
}

/// Open whatever the playlist's current entry points at.
fn open_current_entry(ctx: &mut PlayerContext) {
    let Some(entry) = ctx.playlist.current_entry() else {
        ctx.close_media();
        return;
    };
    let path = entry.path.clone();
    let mut media = Media::from_path(&path);
    media.title = entry.title.clone();
    if ctx.opts.edition_id >= 0 {
        media.edition = ctx.opts.edition_id.min(media.editions.saturating_sub(1).max(0));
    }
    info!("Playing: {}", path);
    ctx.load_media(media);
}

// ============================================================================
// Terminal Presentation
// ============================================================================

/// Print everything the last command produced: terminal answers, OSD
/// messages, bars and the coalesced seek feedback.
fn render_feedback(ctx: &mut PlayerContext, out: &mut impl Write) -> Result<()> {
    for line in ctx.take_term_output() {
        writeln!(out, "{}", line)?;
    }

    let (seek_info, _direction) = ctx.osd.take_seek_info();
    if seek_info.contains(SeekInfoFlags::TEXT) {
        let duration = ctx.duration().map(format_time).unwrap_or_else(|| "?".into());
        writeln!(out, "Time: {} / {}", format_time(ctx.position()), duration)?;
    }
    if seek_info.contains(SeekInfoFlags::BAR) {
        if let Ok(Value::Int(percent)) = get_property(ctx, "percent-pos") {
            writeln!(out, "Position: {}", draw_bar(0.0, 100.0, percent as f64))?;
        }
    }
    if seek_info.contains(SeekInfoFlags::CHAPTER_TEXT) {
        if let Ok(chapter) = print_property(ctx, "chapter") {
            writeln!(out, "Chapter: {}", chapter)?;
        }
    }
    if seek_info.contains(SeekInfoFlags::EDITION) {
        if let Ok(edition) = print_property(ctx, "edition") {
            writeln!(out, "Edition: {}", edition)?;
        }
    }

    if let Some(bar) = ctx.osd.take_bar() {
        writeln!(out, "{}: {}", bar.label, draw_osd_bar(&bar))?;
    }
    for msg in ctx.osd.drain_messages() {
        writeln!(out, "{}", msg.text)?;
    }
    out.flush()?;
    Ok(())
}

fn draw_osd_bar(bar: &OsdBar) -> String {
    draw_bar(bar.min, bar.max, bar.value)
}

/// Fixed-width ASCII meter, `[=====>----] value`.
fn draw_bar(min: f64, max: f64, value: f64) -> String {
    const WIDTH: usize = 20;
    let span = (max - min).max(f64::MIN_POSITIVE);
    let fraction = ((value - min) / span).clamp(0.0, 1.0);
    let filled = (fraction * WIDTH as f64).round() as usize;
    let mut meter = String::with_capacity(WIDTH + 2);
    meter.push('[');
    for i in 0..WIDTH {
        meter.push(if i < filled { '=' } else { '-' });
    }
    meter.push(']');
    format!("{} {:.0}", meter, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_bar_extent() {
        assert_eq!(draw_bar(0.0, 100.0, 0.0), "[--------------------] 0");
        assert_eq!(draw_bar(0.0, 100.0, 100.0), "[====================] 100");
        assert!(draw_bar(0.0, 100.0, 50.0).starts_with("[==========----------]"));
    }

    #[test]
    fn test_app_options_split_files_and_flags() {
        let args: Vec<String> = ["talon", "a.mkv", "--save-config", "b.mkv"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let opts = AppOptions::from_args(&args);
        assert_eq!(opts.files, vec!["a.mkv", "b.mkv"]);
        assert!(opts.save_config_on_quit);
    }
}
