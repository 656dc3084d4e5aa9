//! The presence terminal session.

use std::io::{Stdout, Write, stdout};

use color_eyre::eyre::Result;
use crossterm::{
    cursor,
    event::{DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen, SetTitle},
};
use ratatui::{Frame, Terminal, backend::CrosstermBackend};

const WINDOW_TITLE: &str = "presence";

/// Raw-mode alternate screen owning the ratatui terminal. Dropping it
/// hands the shell back.
pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    active: bool,
}

impl Tui {
    /// Take over the terminal. Bracketed paste is on so pasted MACs and
    /// template ids arrive as one event.
    pub fn start() -> Result<Self> {
        terminal::enable_raw_mode()?;
        let mut out = stdout();
        execute!(
            out,
            EnterAlternateScreen,
            EnableMouseCapture,
            EnableBracketedPaste,
            SetTitle(WINDOW_TITLE),
            cursor::Hide,
        )?;
        let mut terminal = Terminal::new(CrosstermBackend::new(out))?;
        terminal.clear()?;
        Ok(Self {
            terminal,
            active: true,
        })
    }

    pub fn draw(&mut self, render: impl FnOnce(&mut Frame)) -> Result<()> {
        self.terminal.draw(render)?;
        Ok(())
    }

    /// (cols, rows) of the current viewport.
    pub fn size(&self) -> Result<(u16, u16)> {
        let area = self.terminal.size()?;
        Ok((area.width, area.height))
    }

    /// Hand the shell back. Safe to call more than once.
    pub fn stop(&mut self) {
        if std::mem::take(&mut self.active) {
            let _ = self.terminal.show_cursor();
            restore();
        }
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Undo everything [`Tui::start`] did, ignoring individual failures.
fn restore() {
    let mut out = stdout();
    let _ = execute!(
        out,
        DisableBracketedPaste,
        DisableMouseCapture,
        LeaveAlternateScreen,
        cursor::Show,
    );
    let _ = terminal::disable_raw_mode();
    let _ = out.flush();
}

/// color-eyre report and panic hooks. A panic leaves the alternate
/// screen before the report prints. Install before [`Tui::start`].
pub fn install_hooks() -> Result<()> {
    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default()
        .display_env_section(false)
        .panic_section("Rerun with -vv and attach presence-tui.log when reporting this.")
        .into_hooks();
    eyre_hook.install()?;

    let panic_hook = panic_hook.into_panic_hook();
    std::panic::set_hook(Box::new(move |info| {
        restore();
        panic_hook(info);
    }));
    Ok(())
}
