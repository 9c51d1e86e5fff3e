use super::ui;
use crate::chart::TrendChart;
use crate::core::CurrencyPair;
use crate::exchange::ExchangeService;
use anyhow::Result;
use comfy_table::Cell;

pub async fn run(service: &ExchangeService, pair: CurrencyPair, days: usize) -> Result<()> {
    if days == 0 {
        anyhow::bail!("The chart needs at least one day");
    }
    let pb = ui::new_spinner(&format!("Resolving {pair} history"));
    let chart = service.chart(pair, days).await;
    pb.finish_and_clear();

    display_chart(&chart);
    display_points(&chart);
    Ok(())
}

pub fn display_chart(chart: &TrendChart) {
    let title_style = if chart.simulated {
        ui::StyleType::Warning
    } else {
        ui::StyleType::Title
    };
    println!("\n{}", ui::style_text(&chart.title, title_style));

    let (Some(first), Some(last)) = (chart.points.first(), chart.points.last()) else {
        println!("{}", ui::style_text("No data points", ui::StyleType::Subtle));
        return;
    };
    println!(
        "{} {}  {}",
        first.date.format("%d.%m"),
        chart.sparkline(),
        last.date.format("%d.%m"),
    );

    let change = chart
        .change_percent
        .map_or_else(|| "n/a".to_string(), |c| format!("{c:+.2}%"));
    let direction = match chart.trend {
        Some(t) if t.slope > 0.0 => "rising",
        Some(t) if t.slope < 0.0 => "falling",
        Some(_) => "flat",
        None => "n/a",
    };
    println!(
        "{} {} → {} ({change}), trend {direction}",
        ui::style_text("Change:", ui::StyleType::TotalLabel),
        chart.format_rate(first.rate),
        chart.format_rate(last.rate),
    );
}

fn display_points(chart: &TrendChart) {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Rate"),
        ui::header_cell("Trend"),
        ui::header_cell("Change"),
    ]);

    let first = chart.points.first().map(|p| p.rate);
    for (i, point) in chart.points.iter().enumerate() {
        let trend = chart
            .trend
            .map_or_else(ui::na_cell, |t| ui::number_cell(chart.format_rate(t.at(i))));
        let change = match first {
            Some(f) if f != 0.0 => ui::change_cell((point.rate - f) / f * 100.0),
            _ => ui::na_cell(),
        };
        table.add_row(vec![
            Cell::new(point.date.format("%Y-%m-%d")),
            ui::number_cell(chart.format_rate(point.rate)),
            trend,
            change,
        ]);
    }
    println!("{table}");
}
