use super::ui;
use crate::cache::PersistentCache;
use crate::core::models::PaginationInfo;
use anyhow::Result;
use comfy_table::Cell;

pub const HISTORY_PAGE_SIZE: usize = 20;

/// Prints the latest cached rate, or one page of the rate history.
pub fn run(cache: &PersistentCache, history: bool, page: usize) -> Result<()> {
    if !history {
        match cache.latest_rate() {
            Some(rate) => println!(
                "{} {} {}",
                ui::style_text("BTC/USD:", ui::StyleType::Label),
                ui::style_text(&ui::format_usd(rate.value()), ui::StyleType::Value),
                ui::style_text(
                    &format!("(as of {})", ui::format_timestamp(rate.observed_at())),
                    ui::StyleType::Subtle
                ),
            ),
            None => println!("No cached rate available. Run `ratewatch fetch` first."),
        }
        return Ok(());
    }

    let rates = cache.rates();
    if rates.is_empty() {
        println!("No rates recorded yet.");
        return Ok(());
    }

    // pages are 1-based on the command line
    let index = page.saturating_sub(1);
    let start = index.saturating_mul(HISTORY_PAGE_SIZE);
    let rows: Vec<_> = rates.iter().skip(start).take(HISTORY_PAGE_SIZE).collect();
    let pagination = PaginationInfo::for_page(
        index,
        HISTORY_PAGE_SIZE,
        rates.len(),
        start.saturating_add(rows.len()),
    );

    println!(
        "\n{}",
        ui::style_text("Rate history", ui::StyleType::Title)
    );
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Observed at"),
        ui::header_cell("BTC/USD"),
        ui::header_cell("ID"),
    ]);
    for rate in &rows {
        table.add_row(vec![
            Cell::new(ui::format_timestamp(rate.observed_at())),
            ui::amount_cell(rate.value()),
            Cell::new(rate.id()),
        ]);
    }
    println!("{table}");
    println!("{}", ui::style_text(&footer(&pagination), ui::StyleType::Subtle));
    Ok(())
}

fn footer(pagination: &PaginationInfo) -> String {
    let mut text = format!(
        "Page {} of {} ({} rates)",
        pagination.current_page.saturating_add(1),
        pagination.total_pages().max(1),
        pagination.total_items
    );
    if !pagination.is_last_page() {
        text.push_str(&format!(
            ", next: --page {}",
            pagination.current_page.saturating_add(2)
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::Rate;
    use crate::store::memory::MemoryStore;
    use crate::telemetry::EventLog;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn cache_with_rates(count: usize) -> PersistentCache {
        let cache = PersistentCache::new(Arc::new(MemoryStore::new()), EventLog::default());
        for i in 1..=count {
            cache.put_rate(&Rate::new(dec!(60000) + rust_decimal::Decimal::from(i)).unwrap());
        }
        cache
    }

    #[test]
    fn test_history_page_beyond_range() {
        let cache = cache_with_rates(1);
        assert!(run(&cache, true, usize::MAX).is_ok());
        assert!(run(&cache, true, 0).is_ok());
        assert!(run(&cache, true, 2).is_ok());
    }

    #[test]
    fn test_latest_and_first_page() {
        let cache = cache_with_rates(25);
        assert!(run(&cache, false, 1).is_ok());
        assert!(run(&cache, true, 1).is_ok());
    }

    #[test]
    fn test_footer_on_huge_page() {
        let pagination = PaginationInfo::for_page(usize::MAX, HISTORY_PAGE_SIZE, 1, usize::MAX);
        assert_eq!(
            footer(&pagination),
            format!("Page {} of 1 (1 rates)", usize::MAX)
        );
    }

    #[test]
    fn test_footer_points_to_next_page() {
        let pagination = PaginationInfo::for_page(0, HISTORY_PAGE_SIZE, 45, 20);
        assert_eq!(footer(&pagination), "Page 1 of 3 (45 rates), next: --page 2");
    }

    #[test]
    fn test_footer_on_last_page() {
        let pagination = PaginationInfo::for_page(2, HISTORY_PAGE_SIZE, 45, 45);
        assert_eq!(footer(&pagination), "Page 3 of 3 (45 rates)");
    }

    #[test]
    fn test_footer_past_the_end() {
        let pagination = PaginationInfo::for_page(9, HISTORY_PAGE_SIZE, 5, 180);
        assert_eq!(footer(&pagination), "Page 10 of 1 (5 rates)");
    }
}
