use std::collections::BTreeMap;
use std::fmt::Write as _;

use pi_api_types::{AnalyticsQuery, SentimentPoint, TopicVelocityResponse};

use super::{friendly_error, print_json, CommandContext};

fn query(weeks: u32, topics: Vec<String>) -> AnalyticsQuery {
    AnalyticsQuery {
        weeks,
        topics: topics
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
    }
}

/// Run the `velocity` subcommand.
pub async fn velocity(
    ctx: &CommandContext,
    weeks: u32,
    topics: Vec<String>,
) -> anyhow::Result<()> {
    let resp = ctx
        .hooks
        .topic_velocity(ctx.mode(), &query(weeks, topics))
        .await
        .map_err(|e| friendly_error(e, &ctx.upstream_url))?;

    if ctx.json {
        return print_json(&resp);
    }
    print!("{}", render_velocity(&resp));
    Ok(())
}

/// Run the `sentiment` subcommand.
pub async fn sentiment(
    ctx: &CommandContext,
    weeks: u32,
    topics: Vec<String>,
) -> anyhow::Result<()> {
    let points = ctx
        .hooks
        .sentiment(ctx.mode(), &query(weeks, topics))
        .await
        .map_err(|e| friendly_error(e, &ctx.upstream_url))?;

    if ctx.json {
        return print_json(&points);
    }
    print!("{}", render_sentiment(&points));
    Ok(())
}

fn trend(first: u64, last: u64) -> &'static str {
    match last.cmp(&first) {
        std::cmp::Ordering::Greater => "up",
        std::cmp::Ordering::Less => "down",
        std::cmp::Ordering::Equal => "flat",
    }
}

fn render_velocity(resp: &TopicVelocityResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Topic velocity  ({}, {} episodes)",
        resp.metadata.date_range, resp.metadata.total_episodes
    );
    let _ = writeln!(out, "{}", "-".repeat(60));
    let _ = writeln!(out, "{:<28} {:>8} {:>8}  trend", "topic", "total", "latest");

    for (topic, series) in &resp.data {
        let total: u64 = series.iter().map(|w| w.mentions).sum();
        let first = series.first().map(|w| w.mentions).unwrap_or(0);
        let last = series.last().map(|w| w.mentions).unwrap_or(0);
        let _ = writeln!(
            out,
            "{topic:<28} {total:>8} {last:>8}  {}",
            trend(first, last)
        );
    }
    out
}

fn render_sentiment(points: &[SentimentPoint]) -> String {
    // topic -> (sum, count, latest week, latest value)
    let mut by_topic: BTreeMap<&str, (f64, usize, &str, f64)> = BTreeMap::new();
    for p in points {
        let entry = by_topic
            .entry(p.topic.as_str())
            .or_insert((0.0, 0, p.week.as_str(), p.sentiment));
        entry.0 += p.sentiment;
        entry.1 += 1;
        if p.week.as_str() >= entry.2 {
            entry.2 = p.week.as_str();
            entry.3 = p.sentiment;
        }
    }

    let mut out = String::new();
    let _ = writeln!(out, "{:<28} {:>8} {:>8}  weeks", "topic", "average", "latest");
    let _ = writeln!(out, "{}", "-".repeat(60));
    for (topic, (sum, count, _, latest)) in by_topic {
        let _ = writeln!(
            out,
            "{topic:<28} {:>8.2} {latest:>8.2}  {count}",
            sum / count as f64
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use pi_core::data_mode::DataMode;

    use super::*;

    fn point(topic: &str, week: &str, sentiment: f64) -> SentimentPoint {
        SentimentPoint {
            topic: topic.into(),
            week: week.into(),
            sentiment,
            episode_count: 1,
        }
    }

    #[test]
    fn topics_are_trimmed() {
        let q = query(4, vec![" AI Agents ".into(), "".into(), "DePIN".into()]);
        assert_eq!(q.weeks, 4);
        assert_eq!(q.topics, vec!["AI Agents", "DePIN"]);
    }

    #[test]
    fn sentiment_summary_uses_latest_week() {
        let points = vec![
            point("DePIN", "2025-W10", 0.2),
            point("DePIN", "2025-W11", 0.6),
            point("AI Agents", "2025-W11", -0.1),
        ];
        let text = render_sentiment(&points);
        let depin = text.lines().find(|l| l.starts_with("DePIN")).unwrap();
        assert!(depin.contains("0.40"));
        assert!(depin.contains("0.60"));
        assert!(depin.trim_end().ends_with('2'));
    }

    #[test]
    fn velocity_trend() {
        assert_eq!(trend(3, 9), "up");
        assert_eq!(trend(9, 3), "down");
        assert_eq!(trend(4, 4), "flat");
    }

    #[tokio::test]
    async fn demo_analytics_run_offline() {
        let unroutable = "http://127.0.0.1:9";
        let ctx = CommandContext::new(unroutable, unroutable, DataMode::Demo, false);
        assert!(velocity(&ctx, 4, vec![]).await.is_ok());
        assert!(sentiment(&ctx, 4, vec!["DePIN".into()]).await.is_ok());
    }
}
