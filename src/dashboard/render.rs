use std::fmt::Write;

use ansi_term::{Colour, Style};
use anyhow::Result;

use super::{
    format::{format_number, format_time},
    DashboardView,
};

pub const WAGE_NOT_SET: &str = "시급 설정 필요";
pub const DISTRACTION_WARNING: &str = "⚠️ 산만함 경고!";
pub const NO_DATA: &str = "아직 기록된 사이트가 없습니다.";

fn won(amount: u64) -> String {
    format!("{}원", format_number(amount))
}

/// Terminal rendering. Rows are tab separated like the rest of the CLI output; the favicon is
/// left out since a terminal cannot show it.
pub fn render_text(view: &DashboardView, colored: bool) -> String {
    let paint = |style: Style, text: &str| {
        if colored {
            style.paint(text).to_string()
        } else {
            text.to_string()
        }
    };

    let mut out = String::new();
    let total_cost = view.total_cost.map(won);
    let _ = writeln!(out, "{}", paint(Style::new().bold(), "사이트별 사용 시간"));
    let _ = writeln!(out, "총 사용 시간\t{}", format_time(view.total_seconds));
    let _ = writeln!(
        out,
        "총 비용\t{}",
        total_cost.as_deref().unwrap_or(WAGE_NOT_SET)
    );
    let _ = writeln!(out, "탭 전환\t{}회", format_number(view.switch_count));
    if view.hourly_wage > 0 {
        let _ = writeln!(out, "시급\t{}", won(view.hourly_wage));
    }
    if view.distracted {
        let _ = writeln!(out, "{}", paint(Colour::Red.bold(), DISTRACTION_WARNING));
    }
    out.push('\n');

    if view.rows.is_empty() {
        let _ = writeln!(out, "{}", paint(Style::new().dimmed(), NO_DATA));
        return out;
    }

    for row in &view.rows {
        let cost = row.cost.map(won);
        let _ = writeln!(
            out,
            "{}\t{}\t{}",
            row.domain,
            format_time(row.seconds),
            cost.as_deref().unwrap_or("-")
        );
    }
    out
}

/// Machine readable rendering, favicon URLs included.
pub fn render_json(view: &DashboardView) -> Result<String> {
    Ok(serde_json::to_string_pretty(view)?)
}
