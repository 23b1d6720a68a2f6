//! Report command implementations

use anyhow::{bail, Result};
use spendie_core::{Command, DateRange, ReportKind, ReportRequest};

use super::App;

pub fn cmd_report(
    app: &App,
    kind: ReportKind,
    period: &str,
    category: Option<&str>,
) -> Result<()> {
    let range = DateRange::parse(period, app.today)?;
    run_report(app, range, kind, category)
}

pub fn cmd_report_daily(app: &App, days: i64, category: Option<&str>) -> Result<()> {
    if days < 1 {
        bail!("--days must be at least 1");
    }
    let range = DateRange::last_days(days, app.today);
    run_report(app, range, ReportKind::Daily, category)
}

pub fn cmd_report_compare(
    app: &App,
    current: &str,
    previous: &str,
    category: Option<&str>,
) -> Result<()> {
    let range = DateRange::parse(current, app.today)?;
    let previous = DateRange::parse(previous, app.today)?;
    run_report(app, range, ReportKind::Compare { previous }, category)
}

fn run_report(
    app: &App,
    range: DateRange,
    kind: ReportKind,
    category: Option<&str>,
) -> Result<()> {
    let request = ReportRequest {
        range,
        category: category.map(str::to_string),
        kind,
    };
    app.run(Command::GetReport(request))?;
    Ok(())
}
