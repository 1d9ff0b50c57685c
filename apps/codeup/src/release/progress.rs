//! Terminal progress bar for downloads.
//!
//! The bar is redrawn on a fixed timer rather than on every chunk, so a fast
//! stream is never slowed down by terminal writes. The timer task only reads
//! the shared byte counter; the download loop is the only writer.
//!
//! ```text
//! Downloading vscode-stable-linux-x64.tar.gz... [⣿⣿⣿⣿⣿⣿⣿⣿⣿⣿⡏---------] 50% (500/1000)
//! ```
//!
//! The last drawn cell animates through eight Braille glyphs of increasing
//! density as bytes accumulate inside it.

use std::io::{IsTerminal, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{self, Clear, ClearType};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Sub-cell fill glyphs, sparsest first.
pub const GLYPHS: [char; 8] = ['⡀', '⡄', '⡆', '⡇', '⡏', '⡟', '⡿', '⣿'];

/// Glyph used for completely filled cells.
const FULL: char = GLYPHS[GLYPHS.len() - 1];

/// Glyph used for cells not reached yet.
const EMPTY: char = '-';

/// Redraws per second.
pub const UPDATES_PER_SECOND: u64 = 333;

/// Narrowest bar worth drawing; below this only the percentage is shown.
pub const MIN_BAR_WIDTH: usize = 10;

/// Column count assumed when the terminal size cannot be queried.
const FALLBACK_COLUMNS: u16 = 80;

/// Returns the `Downloading {name}... ` prefix shared by every line.
fn prefix(name: &str) -> String {
    format!("Downloading {name}... ")
}

/// Computes the bar width for a terminal `columns` wide.
///
/// Room is reserved for the prefix, the brackets and the `100% (total/total)`
/// suffix. Returns `None` when fewer than [`MIN_BAR_WIDTH`] cells remain.
#[must_use]
pub fn bar_width(columns: u16, name: &str, total: u64) -> Option<usize> {
    let prefix_len = prefix(name).chars().count();
    let total_len = format!("{total} ").len();
    let reserved = prefix_len + 3 + total_len * 2 + " 100%".len();

    let width = usize::from(columns).checked_sub(reserved)?;
    (width >= MIN_BAR_WIDTH).then_some(width)
}

/// Rounded completion percentage; 0 when the total is unknown.
#[must_use]
pub fn percent(written: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    let written = written.min(total);
    (written * 200 + total) / (total * 2)
}

/// Bytes represented by one cell, `total / width`.
fn chunk_size(total: u64, width: usize) -> u64 {
    total / u64::try_from(width.max(1)).unwrap_or(u64::MAX)
}

/// Number of cells that are completely filled.
///
/// Counted in whole chunks so that the cursor glyph always describes the
/// cell right after the filled ones. A completed transfer fills every cell.
#[must_use]
pub fn filled_cells(written: u64, total: u64, width: usize) -> usize {
    if total == 0 {
        return 0;
    }
    let written = written.min(total);
    if written == total {
        return width;
    }
    let chunk = chunk_size(total, width);
    let cells = if chunk == 0 {
        u128::from(written) * width as u128 / u128::from(total)
    } else {
        u128::from(written / chunk)
    };
    usize::try_from(cells).unwrap_or(width).min(width)
}

/// Glyph for the partially filled cell following the filled ones.
///
/// `chunk = total / width` bytes make up one cell; the glyph index is the
/// fraction of the current chunk already written, scaled to eight steps.
#[must_use]
pub fn cursor_glyph(written: u64, total: u64, width: usize) -> char {
    let chunk = chunk_size(total, width);
    if chunk == 0 {
        return FULL;
    }
    let step = (written % chunk) * GLYPHS.len() as u64 / chunk;
    GLYPHS[usize::try_from(step).unwrap_or(0).min(GLYPHS.len() - 1)]
}

/// Renders the `[...]` bar body, always exactly `width` cells.
#[must_use]
pub fn render_bar(written: u64, total: u64, width: usize) -> String {
    let filled = filled_cells(written, total, width);
    let mut bar = String::with_capacity(width * 3);
    bar.extend(std::iter::repeat_n(FULL, filled));
    if filled < width {
        bar.push(cursor_glyph(written, total, width));
        bar.extend(std::iter::repeat_n(EMPTY, width - filled - 1));
    }
    bar
}

/// Renders one full progress line.
///
/// With `width == None` the bar is omitted and only the percentage and byte
/// counts follow the prefix.
#[must_use]
pub fn render_line(name: &str, written: u64, total: u64, width: Option<usize>) -> String {
    let counts = format!("{}% ({written}/{total})", percent(written, total));
    match width {
        Some(width) => format!(
            "{}[{}] {counts}",
            prefix(name),
            render_bar(written, total, width)
        ),
        None => format!("{}{counts}", prefix(name)),
    }
}

/// Live progress display for one transfer.
///
/// Create it with [`ProgressReporter::start`], report bytes with
/// [`ProgressReporter::advance`], and end it with [`ProgressReporter::finish`].
pub struct ProgressReporter {
    name: String,
    total: u64,
    written: Arc<AtomicU64>,
    ticker: Option<JoinHandle<()>>,
}

impl ProgressReporter {
    /// Prints the start line and, when stdout is a terminal, spawns the
    /// redraw task.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn start(name: impl Into<String>, total: u64) -> Self {
        let name = name.into();
        let written = Arc::new(AtomicU64::new(0));

        println!("Downloading {name} ({total} bytes)");

        let ticker = std::io::stdout().is_terminal().then(|| {
            tokio::spawn(redraw(name.clone(), total, Arc::clone(&written)))
        });

        Self {
            name,
            total,
            written,
            ticker,
        }
    }

    /// Records `bytes` more bytes written to disk.
    pub fn advance(&self, bytes: u64) {
        self.written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Bytes recorded so far.
    #[must_use]
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Stops the redraw task, clears the line and prints the summary.
    pub fn finish(mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
            clear_line();
        }
        let total = if self.total == 0 {
            self.written()
        } else {
            self.total
        };
        println!("Downloaded {} ({total} bytes)", self.name);
        println!();
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
            clear_line();
            println!();
        }
    }
}

/// Redraw loop run by the ticker task.
///
/// The bar width is recomputed whenever the terminal column count changes.
async fn redraw(name: String, total: u64, written: Arc<AtomicU64>) {
    let mut interval = tokio::time::interval(Duration::from_micros(
        1_000_000 / UPDATES_PER_SECOND,
    ));
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut columns = None;
    let mut width = None;

    loop {
        interval.tick().await;

        let current = terminal::size().map_or(FALLBACK_COLUMNS, |(cols, _)| cols);
        if columns != Some(current) {
            columns = Some(current);
            width = bar_width(current, &name, total);
        }

        let line = render_line(&name, written.load(Ordering::Relaxed), total, width);
        let mut stdout = std::io::stdout().lock();
        let _ = queue!(
            stdout,
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(line)
        );
        let _ = stdout.flush();
    }
}

fn clear_line() {
    let mut stdout = std::io::stdout().lock();
    let _ = queue!(stdout, MoveToColumn(0), Clear(ClearType::CurrentLine));
    let _ = stdout.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(bar: &str, glyph: char) -> usize {
        bar.chars().filter(|&c| c == glyph).count()
    }

    #[test]
    fn half_way_fills_half_the_bar() {
        assert_eq!(filled_cells(500, 1000, 20), 10);

        let bar = render_bar(500, 1000, 20);
        assert_eq!(bar.chars().count(), 20);
        assert_eq!(count(&bar, FULL), 10);
        assert_eq!(count(&bar, EMPTY), 9);
    }

    #[test]
    fn complete_transfer_fills_every_cell() {
        assert_eq!(filled_cells(1000, 1000, 20), 20);
        assert_eq!(percent(1000, 1000), 100);

        let bar = render_bar(1000, 1000, 20);
        assert_eq!(bar, FULL.to_string().repeat(20));
    }

    #[test]
    fn empty_transfer_shows_sparsest_glyph() {
        let bar = render_bar(0, 1000, 20);
        assert_eq!(bar.chars().count(), 20);
        assert_eq!(bar.chars().next(), Some(GLYPHS[0]));
        assert_eq!(count(&bar, EMPTY), 19);
    }

    #[test]
    fn cursor_glyph_tracks_position_inside_chunk() {
        // chunk = 1000 / 20 = 50 bytes per cell
        assert_eq!(cursor_glyph(500, 1000, 20), GLYPHS[0]);
        assert_eq!(cursor_glyph(525, 1000, 20), GLYPHS[4]);
        assert_eq!(cursor_glyph(549, 1000, 20), GLYPHS[7]);
        assert_eq!(cursor_glyph(556, 1000, 20), GLYPHS[0]);
    }

    #[test]
    fn cursor_stays_in_phase_with_filled_cells() {
        // 1099 bytes over 10 cells: one cell per 109 bytes.
        assert_eq!(filled_cells(217, 1099, 10), 1);
        assert_eq!(cursor_glyph(217, 1099, 10), GLYPHS[7]);
        assert_eq!(filled_cells(218, 1099, 10), 2);
        assert_eq!(cursor_glyph(218, 1099, 10), GLYPHS[0]);

        let bar = render_bar(218, 1099, 10);
        assert_eq!(bar.chars().nth(2), Some(GLYPHS[0]));
        assert_eq!(filled_cells(1099, 1099, 10), 10);
    }

    #[test]
    fn cursor_glyph_handles_tiny_totals() {
        assert_eq!(cursor_glyph(3, 5, 20), FULL);
        assert_eq!(render_bar(3, 5, 20).chars().count(), 20);
    }

    #[test]
    fn percent_rounds_to_nearest() {
        assert_eq!(percent(0, 1000), 0);
        assert_eq!(percent(4, 1000), 0);
        assert_eq!(percent(5, 1000), 1);
        assert_eq!(percent(333, 1000), 33);
        assert_eq!(percent(999, 1000), 100);
        assert_eq!(percent(10, 0), 0);
    }

    #[test]
    fn bar_width_reserves_prefix_and_counts() {
        // prefix "Downloading a... " = 17, brackets+space 3, "1000 " twice = 10, " 100%" = 5
        assert_eq!(bar_width(80, "a", 1000), Some(80 - 35));
        assert_eq!(bar_width(45, "a", 1000), Some(10));
        assert_eq!(bar_width(44, "a", 1000), None);
        assert_eq!(bar_width(10, "a", 1000), None);
    }

    #[test]
    fn narrow_terminal_drops_the_bar() {
        let line = render_line("code.tar.gz", 500, 1000, None);
        assert_eq!(line, "Downloading code.tar.gz... 50% (500/1000)");
    }

    #[test]
    fn wide_terminal_renders_bar_and_counts() {
        let line = render_line("code.tar.gz", 1000, 1000, Some(10));
        assert_eq!(
            line,
            format!(
                "Downloading code.tar.gz... [{}] 100% (1000/1000)",
                FULL.to_string().repeat(10)
            )
        );
    }

    #[tokio::test]
    async fn reporter_counts_advanced_bytes() {
        let reporter = ProgressReporter::start("test.bin", 100);
        reporter.advance(40);
        reporter.advance(60);
        assert_eq!(reporter.written(), 100);
        reporter.finish();
    }
}
