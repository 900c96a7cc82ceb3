use pi_api_types::{SharePlatform, ShareRequest};

use super::{friendly_error, print_json, CommandContext};

/// Run the `share` subcommand (live only).
pub async fn run(ctx: &CommandContext, request: ShareRequest) -> anyhow::Result<()> {
    ctx.require_live("sharing")?;
    if request.platform == SharePlatform::Email && request.recipient.is_none() {
        anyhow::bail!("--recipient is required when sharing by email");
    }

    let body = ctx
        .hooks
        .share_episode(&request)
        .await
        .map_err(|e| friendly_error(e, &ctx.upstream_url))?;

    if ctx.json {
        return print_json(&body);
    }
    let via = match request.platform {
        SharePlatform::Email => "email",
        SharePlatform::Slack => "Slack",
    };
    match &request.recipient {
        Some(to) => println!("Shared {} via {via} with {to}", request.episode_id),
        None => println!("Shared {} via {via}", request.episode_id),
    }
    Ok(())
}
