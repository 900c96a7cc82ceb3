use std::fmt::Write as _;

use pi_api_types::DashboardResponse;
use pi_core::data_mode::DataMode;

use super::{friendly_error, print_json, CommandContext};

/// Run the `dashboard` subcommand: fetch the aggregated briefs and print them.
pub async fn run(ctx: &CommandContext) -> anyhow::Result<()> {
    let dashboard = ctx
        .hooks
        .dashboard(ctx.mode())
        .await
        .map_err(|e| friendly_error(e, &ctx.api_url))?;

    if ctx.json {
        return print_json(&dashboard);
    }
    print!("{}", render(&dashboard, ctx.mode()));
    Ok(())
}

/// `h:mm:ss` for an hour or more, `m:ss` otherwise.
fn format_duration(secs: u64) -> String {
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

fn render(dashboard: &DashboardResponse, mode: DataMode) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "podintel dashboard  ({mode}, {} episodes, generated {})",
        dashboard.total_episodes,
        dashboard.generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(out, "{}", "-".repeat(60));

    if dashboard.episodes.is_empty() {
        let _ = writeln!(out, "No episodes available.");
        return out;
    }

    for (i, ep) in dashboard.episodes.iter().enumerate() {
        let _ = writeln!(out, "{:>2}. {}", i + 1, ep.title);
        let _ = writeln!(
            out,
            "    {} | {} | relevance {:.2} | {} signal(s)",
            ep.podcast_name,
            format_duration(ep.duration_seconds),
            ep.relevance_score,
            ep.signals.len()
        );
        if !ep.summary.is_empty() {
            let _ = writeln!(out, "    {}", ep.summary);
        }
    }
    out
}
