use std::fmt::Write as _;

use pi_api_types::{SignalType, SignalsQuery};
use serde_json::Value;

use super::{friendly_error, print_json, CommandContext};

/// Run the `signals` subcommand (live only).
pub async fn run(
    ctx: &CommandContext,
    signal_type: Option<SignalType>,
    limit: Option<u32>,
) -> anyhow::Result<()> {
    ctx.require_live("signals")?;
    let body = ctx
        .hooks
        .signals(&SignalsQuery { signal_type, limit })
        .await
        .map_err(|e| friendly_error(e, &ctx.upstream_url))?;

    if ctx.json {
        return print_json(&body);
    }
    print!("{}", render(&body));
    Ok(())
}

fn render(body: &Value) -> String {
    let signals = body
        .get("signals")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    if signals.is_empty() {
        return "No signals.\n".to_string();
    }

    let mut out = String::new();
    for s in signals {
        let kind = s.get("type").and_then(Value::as_str).unwrap_or("?");
        let content = s.get("content").and_then(Value::as_str).unwrap_or("");
        let _ = write!(out, "[{kind}] {content}");
        if let Some(c) = s.get("confidence").and_then(Value::as_f64) {
            let _ = write!(out, "  ({:.0}%)", c * 100.0);
        }
        let _ = writeln!(out);
    }
    out
}
