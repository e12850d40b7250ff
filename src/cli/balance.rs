use super::ui;
use crate::cache::PersistentCache;
use anyhow::Result;
use comfy_table::{Cell, CellAlignment};
use rust_decimal::Decimal;

/// Prints the balance, applying `adjust` first when given.
pub fn run(cache: &PersistentCache, adjust: Option<Decimal>) -> Result<()> {
    let balance = match adjust {
        Some(delta) => match cache.adjust_balance(delta) {
            Some(balance) => Some(balance),
            None => anyhow::bail!("Failed to adjust balance by {delta}"),
        },
        None => cache.balance(),
    };

    let Some(balance) = balance else {
        println!("No balance recorded yet. Use `ratewatch balance --adjust <amount>`.");
        return Ok(());
    };

    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Balance"), ui::header_cell("Last updated")]);
    table.add_row(vec![
        Cell::new(format!("{} BTC", balance.balance.normalize()))
            .set_alignment(CellAlignment::Right),
        Cell::new(ui::format_timestamp(balance.last_updated)),
    ]);
    println!("{table}");
    Ok(())
}
