//! Console rendering of merchant reports

use merchant_reporting::money::{checked_total, round_for_display};
use merchant_reporting::{DateRange, GrowthPoint, MerchantId, RevenueAnalysis, SummaryStats};
use rust_decimal::Decimal;

const RULE_WIDTH: usize = 60;

/// Money with two decimals, half away from zero
fn money(value: Decimal) -> String {
    let rounded = round_for_display(value);
    // Avoid displaying -0.00
    let rounded = if rounded.is_zero() { Decimal::ZERO } else { rounded };
    format!("{:.2}", rounded)
}

fn describe_range(range: &DateRange) -> String {
    match (range.start, range.end) {
        (None, None) => "all time".to_string(),
        (Some(start), None) => format!("from {}", start.date()),
        (None, Some(end)) => format!("through {}", end.date()),
        (Some(start), Some(end)) => format!("{} to {}", start.date(), end.date()),
    }
}

fn growth_row(point: &GrowthPoint) -> String {
    format!(
        "  {:<10} {:>14} {:>10}%",
        format!("{} {}", point.month, point.year),
        money(point.revenue),
        money(point.growth)
    )
}

/// Print the summary cards
pub fn print_summary(merchant: MerchantId, range: &DateRange, stats: &SummaryStats) {
    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!("              MERCHANT {} SUMMARY ({})", merchant, describe_range(range));
    println!("{}\n", "=".repeat(RULE_WIDTH));

    println!("  Total Revenue:      ${:>14}", money(stats.total_revenue));
    println!("  Total Expenses:     ${:>14}", money(stats.total_expenses));
    println!("  {}", "-".repeat(36));
    println!("  Net Profit:         ${:>14}", money(stats.net_profit));
    println!("  Profit Margin:       {:>14}%", money(stats.profit_margin()));
    println!("  Total Customers:     {:>14}", stats.total_customers);

    println!("{}", "=".repeat(RULE_WIDTH));
}

/// Print the monthly revenue table with month-over-month growth
pub fn print_monthly(merchant: MerchantId, analysis: &RevenueAnalysis) {
    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!(
        "        MERCHANT {} MONTHLY REVENUE ({})",
        merchant,
        analysis.window_label()
    );
    println!("{}\n", "=".repeat(RULE_WIDTH));

    let points = analysis.points();
    if points.is_empty() {
        println!("  No months in the selected range.");
    } else {
        println!("  {:<10} {:>14} {:>11}", "Month", "Revenue", "Growth");
        println!("  {}", "-".repeat(37));
        for point in &points {
            println!("{}", growth_row(point));
        }
        let total = checked_total(points.iter().map(|p| p.revenue))
            .map(money)
            .unwrap_or_else(|| "overflow".to_string());
        println!("  {}", "-".repeat(37));
        println!("  {:<10} {:>14}", "Total", total);
    }

    if let Some(trend) = analysis.trend() {
        println!("\n  {}", trend);
    }

    println!("{}", "=".repeat(RULE_WIDTH));
}
