use crate::core::analytics::{AnalyticsEvent, TIMESTAMP};
use crate::feed::RateOrigin;
use chrono::{DateTime, Utc};
use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Label,
    Value,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Label => style(text).bold(),
        StyleType::Value => style(text).green().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

pub fn format_usd(value: Decimal) -> String {
    format!("${value:.2}")
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn amount_cell(value: Decimal) -> Cell {
    Cell::new(format_usd(value))
        .add_attribute(Attribute::Bold)
        .set_alignment(CellAlignment::Right)
}

/// Green for fresh rates, yellow for cache fallbacks.
pub fn origin_cell(origin: RateOrigin) -> Cell {
    let color = match origin {
        RateOrigin::Internet => Color::Green,
        RateOrigin::Cached => Color::Yellow,
    };
    Cell::new(origin).fg(color)
}

/// Event parameters as sorted `key=value` pairs, without the timestamp.
fn describe_parameters(event: &AnalyticsEvent) -> String {
    let mut pairs: Vec<_> = event
        .parameters
        .iter()
        .filter(|(key, _)| key.as_str() != TIMESTAMP)
        .map(|(key, value)| format!("{key}={value}"))
        .collect();
    pairs.sort();
    pairs.join(", ")
}

/// Renders events in the order given.
pub fn events_table(events: &[AnalyticsEvent]) -> Table {
    let mut table = new_styled_table();
    table.set_header(vec![
        header_cell("Time"),
        header_cell("Event"),
        header_cell("Parameters"),
    ]);
    for event in events {
        table.add_row(vec![
            Cell::new(format_timestamp(event.occurred_at)),
            Cell::new(&event.name),
            Cell::new(describe_parameters(event)).fg(Color::DarkGrey),
        ]);
    }
    table
}

/// Creates a spinner for a single pending operation.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
