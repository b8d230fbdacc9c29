//! Dashboard rendering.
//!
//! `render_dashboard` builds one frame as a string; `redraw` writes it over
//! the previous frame using cursor-up / clear-line escapes.

use std::collections::BTreeMap;
use std::io::{self, Write};

use chrono::{NaiveDate, NaiveDateTime};
use colored::{ColoredString, Colorize};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::config::MonitorConfig;
use crate::ledger::DifficultyLedger;
use crate::state::WalletState;
use crate::types::PriceQuote;
use crate::window::RollingWindow;

/// Width of the frame rules.
const FRAME_WIDTH: usize = 82;
const LABEL_WIDTH: usize = 10;
const COLUMN_WIDTH: usize = 9;
const INFO_LABEL_WIDTH: usize = 14;
const INFO_VALUE_WIDTH: usize = FRAME_WIDTH - INFO_LABEL_WIDTH - 5;

/// Everything one frame shows.
pub struct DashboardView<'a> {
    pub config: &'a MonitorConfig,
    pub primary: &'a WalletState,
    pub secondary: Option<&'a WalletState>,
    pub difficulty: Option<&'a DifficultyLedger>,
    pub power: Option<&'a BTreeMap<NaiveDate, f64>>,
    pub quote: PriceQuote,
    pub now: NaiveDateTime,
    /// Reward-less poll count when the absence alert fired this tick.
    pub absence_alert: Option<u32>,
}

fn rule() -> String {
    "-".repeat(FRAME_WIDTH)
}

fn titled_rule(title: &str) -> String {
    format!("{:-^width$}", format!(" {title} "), width = FRAME_WIDTH)
}

/// Colour a sum by how complete its source is: cyan for a single tick,
/// green for a full window, yellow while the window is still filling.
fn colour_sum(text: String, len: usize, capacity: usize) -> ColoredString {
    if capacity == 1 {
        text.cyan()
    } else if len >= capacity {
        text.green()
    } else {
        text.yellow()
    }
}

fn format_amount(value: Decimal) -> String {
    format!("{:.4}", value.round_dp(4))
}

/// One window's sum, coloured by fill level.
pub fn format_window_sum(window: &RollingWindow) -> ColoredString {
    colour_sum(format_amount(window.sum()), window.len(), window.capacity())
}

fn earnings_header() -> String {
    let mut line = format!("|{:<width$}", "earnings", width = LABEL_WIDTH);
    for label in ["tick", "15m", "1h", "6h", "12h", "24h", "7d"] {
        line.push_str(&format!(":{:^width$}", label, width = COLUMN_WIDTH));
    }
    line.push('|');
    line
}

fn earnings_row(label: &str, state: &WalletState) -> String {
    let mut line = format!("|{:<width$}", label, width = LABEL_WIDTH);
    let tick = colour_sum(format_amount(state.last_diff), 1, 1);
    line.push_str(&format!(":{:>width$}", tick, width = COLUMN_WIDTH));
    for (_, window) in state.windows.labelled() {
        line.push_str(&format!(":{:>width$}", format_window_sum(window), width = COLUMN_WIDTH));
    }
    line.push('|');
    line
}

fn info_row(label: &str, value: impl std::fmt::Display) -> String {
    format!(
        "| {:<lw$}:{:>vw$} |",
        label,
        value.to_string(),
        lw = INFO_LABEL_WIDTH,
        vw = INFO_VALUE_WIDTH
    )
}

/// Bar graph of per-day values, one line per day.
///
/// When the largest day is worth at most `graph_width` mini-blocks, each `■`
/// is one mini-block; otherwise bars are scaled so the largest day spans
/// `graph_width` cells of `▆`.
pub fn plot_graph(
    values: &BTreeMap<NaiveDate, f64>,
    unit: &str,
    miniblock_worth: f64,
    graph_width: usize,
) -> String {
    let max_value = values.values().copied().fold(0.0_f64, f64::max);
    let max_miniblocks = if miniblock_worth > 0.0 {
        max_value / miniblock_worth
    } else {
        0.0
    };
    let bar_width = graph_width + 3;

    let mut lines = String::new();
    for (day, value) in values {
        let bar = if max_miniblocks > graph_width as f64 {
            let cells = (value / max_value * graph_width as f64).max(0.0) as usize;
            "▆".repeat(cells)
        } else if miniblock_worth > 0.0 {
            let miniblocks = (value / miniblock_worth).max(0.0) as usize;
            "■".repeat(miniblocks)
        } else {
            String::new()
        };
        lines.push_str(&format!(
            "| {:10}:{:<bw$}{:>9.4} {:<4} |\n",
            day.format("%Y-%m-%d").to_string(),
            bar,
            value,
            unit,
            bw = bar_width
        ));
    }
    lines
}

/// Daily reward totals as plottable floats.
pub fn ledger_series(totals: &BTreeMap<NaiveDate, Decimal>) -> BTreeMap<NaiveDate, f64> {
    totals
        .iter()
        .map(|(day, total)| (*day, total.to_f64().unwrap_or(0.0)))
        .collect()
}

/// Render one dashboard frame.
pub fn render_dashboard(view: &DashboardView<'_>) -> String {
    let cfg = view.config;
    let mut lines: Vec<String> = Vec::new();

    lines.push(rule());
    lines.push(earnings_header());
    lines.push(earnings_row("wallet", view.primary));
    if let Some(secondary) = view.secondary {
        lines.push(earnings_row("node gain", secondary));
    }
    lines.push(format!("|{}|", " ".repeat(FRAME_WIDTH - 2)));

    lines.push(info_row("Current height", view.primary.last_known_height));
    lines.push(info_row("Wallet amount", format_amount(view.primary.balance)));
    if let Some(secondary) = view.secondary {
        lines.push(info_row("Node amount", format_amount(secondary.balance)));
    }
    if view.quote.price != 0.0 {
        let fiat = view.quote.price * view.primary.balance.to_f64().unwrap_or(0.0);
        lines.push(info_row("U$ Fiat amount", format!("{fiat:.3}")));
    }
    lines.push(info_row(
        "U$ Dero",
        format!("{} ({}% 24h)", view.quote.price, view.quote.change_24h),
    ));
    lines.push(info_row("Date", view.now.format("%Y-%m-%d %H:%M:%S")));

    lines.push(titled_rule(&format!(
        "daily sum, last {} days",
        view.primary.ledger.days()
    )));
    let mut body = lines.join("\n");
    body.push('\n');
    body.push_str(&plot_graph(
        &ledger_series(view.primary.ledger.totals()),
        "DERO",
        cfg.miniblock_worth,
        cfg.graph_width,
    ));

    if let Some(difficulty) = view.difficulty {
        body.push_str(&titled_rule("avg difficulty"));
        body.push('\n');
        body.push_str(&plot_graph(
            difficulty.averages(),
            "GH/s",
            cfg.miniblock_worth,
            cfg.graph_width,
        ));
    }
    if let Some(power) = view.power {
        body.push_str(&titled_rule("estimated power"));
        body.push('\n');
        body.push_str(&plot_graph(power, "MH/s", cfg.miniblock_worth, cfg.graph_width));
    }
    body.push_str(&rule());
    body.push('\n');

    if let Some(polls) = view.absence_alert {
        body.push_str(&format!("{}\n", format!("No rewards for the last {polls} polls!").red()));
    }
    body
}

/// Clear the previous frame (if any) and write `frame` followed by the
/// refresh countdown. Returns the number of lines to clear next time.
///
/// `clear_screen` must be set when anything else was written to the terminal
/// since the last frame: the cursor no longer sits on the countdown line, so
/// the whole screen is reset instead of moving up `previous_lines` rows.
pub fn redraw<W: Write>(
    out: &mut W,
    frame: &str,
    previous_lines: usize,
    refresh_secs: u64,
    clear_screen: bool,
) -> io::Result<usize> {
    if clear_screen {
        write!(out, "\x1b[2J\x1b[H")?;
    } else {
        write!(out, "\r\x1b[2K")?;
        for _ in 0..previous_lines {
            write!(out, "\x1b[1A\x1b[2K")?;
        }
    }
    out.write_all(frame.as_bytes())?;
    write!(out, "refresh in {refresh_secs}s...")?;
    out.flush()?;
    Ok(frame.matches('\n').count())
}
