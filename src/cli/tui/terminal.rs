use std::io::{self, Stdout, Write};
use std::panic;

use base64::Engine;
use crossterm::{
    cursor::{Hide, Show},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, prelude::Size, Frame, Terminal};

use crate::error::AppError;

type PanicHook = Box<dyn Fn(&panic::PanicHookInfo<'_>) + Sync + Send + 'static>;

fn terminal_error(context: &str, source: io::Error) -> AppError {
    AppError::IoContext {
        context: format!("terminal: {context}"),
        source,
    }
}

fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, Show);
}

/// Raw mode + alternate screen for the lifetime of the value.
pub struct TuiTerminal {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TuiTerminal {
    pub fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| terminal_error("enable raw mode", e))?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen, Hide) {
            let _ = disable_raw_mode();
            return Err(terminal_error("enter alternate screen", e));
        }
        let terminal = Terminal::new(CrosstermBackend::new(stdout)).map_err(|e| {
            restore_terminal();
            terminal_error("create backend", e)
        })?;
        Ok(Self { terminal })
    }

    pub fn size(&self) -> Result<Size, AppError> {
        self.terminal
            .size()
            .map_err(|e| terminal_error("query size", e))
    }

    pub fn draw<F>(&mut self, render: F) -> Result<(), AppError>
    where
        F: FnOnce(&mut Frame<'_>),
    {
        self.terminal
            .draw(render)
            .map(|_| ())
            .map_err(|e| terminal_error("draw", e))
    }
}

/// Where copy actions put their text.
pub trait Clipboard {
    fn copy_to_clipboard(&self, text: &str) -> Result<(), AppError>;
}

impl Clipboard for TuiTerminal {
    /// Puts `text` on the system clipboard through an OSC 52 sequence.
    fn copy_to_clipboard(&self, text: &str) -> Result<(), AppError> {
        let mut out = io::stdout();
        out.write_all(osc52_sequence(text).as_bytes())
            .and_then(|_| out.flush())
            .map_err(|e| terminal_error("write clipboard sequence", e))
    }
}

impl Drop for TuiTerminal {
    fn drop(&mut self) {
        restore_terminal();
    }
}

pub fn osc52_sequence(text: &str) -> String {
    let payload = base64::engine::general_purpose::STANDARD.encode(text.as_bytes());
    format!("\x1b]52;c;{payload}\x07")
}

/// Restores the terminal before the previous panic hook prints, so the
/// message is not lost on the alternate screen.
pub struct PanicRestoreHookGuard {
    previous: Option<std::sync::Arc<PanicHook>>,
}

impl PanicRestoreHookGuard {
    pub fn install() -> Self {
        let previous: std::sync::Arc<PanicHook> = std::sync::Arc::new(panic::take_hook());
        let chained = previous.clone();
        panic::set_hook(Box::new(move |info| {
            restore_terminal();
            chained(info);
        }));
        Self {
            previous: Some(previous),
        }
    }
}

impl Drop for PanicRestoreHookGuard {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        let _ = panic::take_hook();
        if let Some(previous) = self.previous.take() {
            panic::set_hook(Box::new(move |info| previous(info)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn osc52_wraps_base64_payload() {
        assert_eq!(osc52_sequence("{}"), "\x1b]52;c;e30=\x07");
    }
}
