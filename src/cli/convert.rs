use super::{banks, history, ui};
use crate::exchange::{ExchangeRequest, ExchangeService, ExchangeView};
use anyhow::Result;

pub async fn run(service: &ExchangeService, request: ExchangeRequest) -> Result<()> {
    let pb = ui::new_spinner("Fetching exchange rates");
    let view = service.handle(request).await;
    pb.finish_and_clear();

    display(&view?);
    Ok(())
}

fn display(view: &ExchangeView) {
    let ExchangeRequest { from, to, amount } = view.request;

    println!(
        "\n{}",
        ui::style_text(&format!("{from} → {to}"), ui::StyleType::Title)
    );
    println!(
        "{} {amount:.2} {from} = {} {to}",
        ui::style_text("Amount:", ui::StyleType::TotalLabel),
        ui::style_text(&format!("{:.2}", view.converted), ui::StyleType::TotalValue),
    );
    println!(
        "{} 1 {from} = {} {to}",
        ui::style_text("Rate:", ui::StyleType::TotalLabel),
        view.chart.format_rate(view.rate),
    );
    println!(
        "{}",
        ui::style_text(
            &format!("Updated {}", view.updated_at.format("%d.%m.%Y %H:%M UTC")),
            ui::StyleType::Subtle
        )
    );

    ui::print_separator();
    history::display_chart(&view.chart);

    ui::print_separator();
    banks::display_quotes(view.bank_currency, &view.quotes);
}
