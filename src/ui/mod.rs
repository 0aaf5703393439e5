//! Terminal output for the dobro CLI
//!
//! Uses `cliclack` for interactive output with automatic fallback to plain
//! lines in CI/non-interactive environments. `InstallProgress` turns
//! pipeline events into a progress bar.
//!
//! # Example
//!
//! ```rust,ignore
//! use dobro::ui::{self, UiContext};
//!
//! let ctx = UiContext::detect().with_auto_yes(yes);
//!
//! ui::intro(&ctx, "dobro cache clear");
//! if ui::confirm(&ctx, "Remove 3 entries?", false).await? {
//!     ui::step_ok(&ctx, "Removed 3 entries");
//! }
//! ui::outro_success(&ctx, "Done");
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, outro_success, outro_warn, remark, step_info, step_ok, step_ok_detail, step_warn,
    step_warn_hint,
};
pub use progress::InstallProgress;
pub use prompts::confirm;
pub use theme::{init_theme, DobroTheme};
