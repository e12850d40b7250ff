use super::ui;
use crate::feed::RateUpdate;
use crate::repository::RateRepository;
use anyhow::Result;
use comfy_table::Cell;
use tokio::sync::broadcast::error::TryRecvError;
use tracing::debug;

/// One forced refresh, then the outcome and the events it produced.
pub async fn run(repository: &RateRepository) -> Result<()> {
    let mut updates = repository.subscribe();

    let pb = ui::new_spinner("Fetching BTC/USD rate");
    repository.force_update().await;
    pb.finish_and_clear();

    match updates.try_recv() {
        Ok(update) => print_update(&update),
        Err(TryRecvError::Empty) => println!(
            "{}",
            ui::style_text(
                "No rate available: the ticker could not be reached and nothing is cached.",
                ui::StyleType::Error
            )
        ),
        Err(e) => debug!(error = %e, "Rate listener closed"),
    }

    let mut events = repository.events().events();
    events.reverse();
    println!("\n{}", ui::style_text("Events", ui::StyleType::Title));
    println!("{}", ui::events_table(&events));
    Ok(())
}

fn print_update(update: &RateUpdate) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("BTC/USD"),
        ui::header_cell("Source"),
        ui::header_cell("Observed at"),
    ]);
    table.add_row(vec![
        ui::amount_cell(update.value),
        ui::origin_cell(update.origin),
        Cell::new(ui::format_timestamp(update.observed_at)),
    ]);
    println!("{table}");
}
