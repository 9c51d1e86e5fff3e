use super::ui;
use crate::core::{BankQuote, Currency};
use crate::exchange::ExchangeService;
use anyhow::Result;
use comfy_table::{Cell, Color};
use futures::future::join_all;

pub async fn run(service: &ExchangeService, currencies: &[Currency]) -> Result<()> {
    let pb = ui::new_spinner("Collecting bank quotes");
    let results = join_all(currencies.iter().map(|&currency| async move {
        (currency, service.bank_quotes(currency).await)
    }))
    .await;
    pb.finish_and_clear();

    let count = results.len();
    for (i, (currency, quotes)) in results.iter().enumerate() {
        display_quotes(*currency, quotes);
        if i + 1 < count {
            ui::print_separator();
        }
    }
    Ok(())
}

pub fn display_quotes(currency: Currency, quotes: &[BankQuote]) {
    println!(
        "\n{}",
        ui::style_text(&format!("Bank rates for {currency}/RUB"), ui::StyleType::Title)
    );

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Bank"),
        ui::header_cell("Buy"),
        ui::header_cell("Sell"),
        ui::header_cell("Updated"),
    ]);

    for quote in quotes {
        if quote.is_sentinel() {
            table.add_row(vec![
                Cell::new(&quote.bank).fg(Color::DarkGrey),
                ui::na_cell(),
                ui::na_cell(),
                Cell::new("-"),
            ]);
            continue;
        }
        let updated = quote
            .observed_at
            .map_or_else(|| "-".to_string(), |t| t.format("%H:%M").to_string());
        let bank = if quote.is_inverted() {
            Cell::new(format!("{} (buy > sell)", quote.bank)).fg(Color::Yellow)
        } else {
            Cell::new(&quote.bank)
        };
        table.add_row(vec![
            bank,
            ui::number_cell(format!("{:.2}", quote.buy)),
            ui::number_cell(format!("{:.2}", quote.sell)),
            Cell::new(updated),
        ]);
    }
    println!("{table}");
}
