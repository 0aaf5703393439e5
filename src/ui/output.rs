//! Line-oriented output
//!
//! Every helper renders through cliclack when the terminal is interactive
//! and falls back to a tagged plain line (`[OK] message`) otherwise, so CI
//! logs stay greppable.

use super::context::UiContext;
use console::{style, StyledObject};

/// Outcome a line reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Tone {
    Ok,
    Warn,
    Info,
    Fail,
}

impl Tone {
    /// Bracketed tag used in plain output
    pub(super) fn tag(self) -> StyledObject<&'static str> {
        match self {
            Tone::Ok => style("[OK]").green(),
            Tone::Warn => style("[WARN]").yellow(),
            Tone::Info => style("[INFO]").cyan(),
            Tone::Fail => style("[FAIL]").red(),
        }
    }

    fn emphasize(self, text: &str) -> StyledObject<&str> {
        match self {
            Tone::Ok => style(text).green().bold(),
            Tone::Warn => style(text).yellow().bold(),
            Tone::Info => style(text).cyan().bold(),
            Tone::Fail => style(text).red().bold(),
        }
    }
}

fn step(ctx: &UiContext, tone: Tone, message: &str) {
    if !ctx.use_fancy_output() {
        println!("  {} {}", tone.tag(), message);
        return;
    }

    // Rendering errors only mean the terminal went away
    let _ = match tone {
        Tone::Ok => cliclack::log::success(message),
        Tone::Warn => cliclack::log::warning(message),
        Tone::Info => cliclack::log::info(message),
        Tone::Fail => cliclack::log::error(message),
    };
}

fn outro(ctx: &UiContext, tone: Tone, message: &str) {
    if ctx.use_fancy_output() {
        let _ = cliclack::outro(tone.emphasize(message));
    } else {
        println!("\n{} {}", tone.tag(), message);
    }
}

/// Command banner
pub fn intro(ctx: &UiContext, title: &str) {
    let title = Tone::Info.emphasize(title);
    if ctx.use_fancy_output() {
        let _ = cliclack::intro(title);
    } else {
        println!("{}\n", title);
    }
}

pub fn outro_success(ctx: &UiContext, message: &str) {
    outro(ctx, Tone::Ok, message);
}

pub fn outro_warn(ctx: &UiContext, message: &str) {
    outro(ctx, Tone::Warn, message);
}

pub fn step_ok(ctx: &UiContext, message: &str) {
    step(ctx, Tone::Ok, message);
}

/// `message (detail)`, with the detail dimmed on a terminal
pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    step(ctx, Tone::Ok, &format!("{} ({})", message, style(detail).dim()));
}

pub fn step_warn(ctx: &UiContext, message: &str) {
    step(ctx, Tone::Warn, message);
}

/// Warning followed by what the user can do about it
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    step(ctx, Tone::Warn, &format!("{} - {}", message, style(hint).dim()));
}

pub fn step_info(ctx: &UiContext, message: &str) {
    step(ctx, Tone::Info, message);
}

/// Untagged, dimmed aside
pub fn remark(ctx: &UiContext, message: &str) {
    if ctx.use_fancy_output() {
        let _ = cliclack::log::remark(message);
    } else {
        println!("  {}", style(message).dim());
    }
}
