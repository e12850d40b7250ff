use super::ui;
use crate::feed::{RateOrigin, RateUpdate};
use crate::repository::RateRepository;
use anyhow::{Context, Result};
use futures::StreamExt;
use tracing::info;

/// Polls until Ctrl-C, printing every rate update as it arrives.
pub async fn run(repository: &RateRepository, show_events: bool) -> Result<()> {
    // subscribe before starting so the initial refresh is not missed
    let mut updates = Box::pin(repository.updates());

    repository.start().await;
    println!(
        "{}",
        ui::style_text("Watching BTC/USD, press Ctrl-C to stop", ui::StyleType::Subtle)
    );

    loop {
        tokio::select! {
            update = updates.next() => match update {
                Some(update) => println!("{}", format_update(&update)),
                None => break,
            },
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                info!("Interrupted, stopping rate updates");
                break;
            }
        }
    }
    repository.stop();

    if show_events {
        let mut events = repository.events().events();
        events.reverse();
        println!("\n{}", ui::style_text("Events", ui::StyleType::Title));
        println!("{}", ui::events_table(&events));
    }
    Ok(())
}

fn format_update(update: &RateUpdate) -> String {
    let origin = match update.origin {
        RateOrigin::Internet => ui::style_text("live", ui::StyleType::Value),
        RateOrigin::Cached => ui::style_text("cached", ui::StyleType::Error),
    };
    format!(
        "{} {} {}",
        ui::style_text(&ui::format_timestamp(update.observed_at), ui::StyleType::Subtle),
        ui::style_text(&ui::format_usd(update.value), ui::StyleType::Label),
        origin
    )
}
