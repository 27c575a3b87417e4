//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::controller::{Notification, Severity, TableSnapshot};
use crate::keys::{limit_label, usage_label, ApiKeyRecord, PlanUsage, SortColumn};

/// Width of the plan usage bar, in cells.
const PLAN_BAR_WIDTH: usize = 30;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a controller notification as a toast line.
pub fn notification(n: &Notification) {
    match n.severity {
        Severity::Info => success(&format!("{} — {}", style(&n.title).bold(), n.message)),
        Severity::Error => error(&n.message),
    }
}

/// Print the key table (ID, Name, API Key, Limit, Usage, Status).
///
/// `mask` turns a record into the text shown in the key column.
pub fn print_key_table(snapshot: &TableSnapshot, mask: impl Fn(&ApiKeyRecord) -> String) {
    if snapshot.view.is_empty() {
        info("No API keys yet.");
        tip("Run `keydash create` to add your first key.");
        return;
    }

    let sort = snapshot.sort();
    let mut header = vec!["ID".to_string()];
    header.extend(
        SortColumn::ALL
            .iter()
            .map(|&c| format!("{}{}", c.label(), sort.indicator(c))),
    );
    header.push("Status".to_string());

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(header);

    for record in snapshot.rows() {
        let status = snapshot
            .marker(&record.id)
            .map(|m| style(m.label()).green().bold().to_string())
            .unwrap_or_default();

        table.add_row(vec![
            record.id.clone(),
            record.name.clone(),
            mask(record),
            limit_label(record.monthly_limit),
            usage_label(record.usage_count),
            status,
        ]);
    }

    println!("{table}");
}

/// Print the "current plan" card with a usage bar.
pub fn print_plan_card(plan: &PlanUsage) {
    println!("{}", style("CURRENT PLAN").dim());
    println!("{}", style(&plan.plan_name).bold());
    let bar = plan.bar(PLAN_BAR_WIDTH);
    let bar = if plan.exhausted() {
        style(bar).red()
    } else {
        style(bar).blue()
    };
    println!("API Limit {bar} {}", plan.label());
    println!();
}

/// Print the full key value, as in the "Here's your API key" dialog.
pub fn print_secret(record: &ApiKeyRecord) {
    println!("{}", style(format!("Here's your API key ({})", record.name)).bold());
    println!();
    println!("    {}", style(&record.secret).cyan());
    println!();
}
