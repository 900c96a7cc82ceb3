//! Synthesized demo data.
//!
//! Every generator is deterministic for a given input (topics, week count,
//! anchor date) and returns exactly the type the live endpoint would, so
//! consumers never branch on the data mode.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};

use pi_api_types::{
    AnalyticsQuery, DashboardResponse, EpisodeBrief, SentimentPoint, Signal, SignalType,
    TopicVelocityMetadata, TopicVelocityResponse, WeeklyMentions,
};

pub const DEFAULT_TOPICS: [&str; 5] = [
    "AI Agents",
    "Capital Efficiency",
    "DePIN",
    "B2B SaaS",
    "Crypto/Web3",
];

/// Stable per-topic seed (FNV-1a), independent of the std hasher.
fn topic_seed(topic: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in topic.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    hash
}

fn topics_for(query: &AnalyticsQuery) -> Vec<String> {
    if query.topics.is_empty() {
        DEFAULT_TOPICS.iter().map(|t| t.to_string()).collect()
    } else {
        query.topics.clone()
    }
}

/// Monday of each of the last `weeks` weeks ending with the week of `today`,
/// oldest first.
fn week_starts(weeks: u32, today: NaiveDate) -> Vec<NaiveDate> {
    let this_monday = today - Days::new(u64::from(today.weekday().num_days_from_monday()));
    (0..weeks)
        .rev()
        .filter_map(|back| this_monday.checked_sub_days(Days::new(u64::from(back) * 7)))
        .collect()
}

fn week_label(start: NaiveDate) -> String {
    let iso = start.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}

pub fn topic_velocity(query: &AnalyticsQuery, today: NaiveDate) -> TopicVelocityResponse {
    let starts = week_starts(query.span_weeks(), today);
    let mut response = TopicVelocityResponse::default();

    for topic in topics_for(query) {
        let seed = topic_seed(&topic);
        let base = 5 + seed % 20;
        let slope = (seed >> 8) % 5;
        let series = starts
            .iter()
            .enumerate()
            .map(|(i, start)| {
                let i = i as u64;
                let wiggle = ((seed >> 16) + i * 7) % 6;
                WeeklyMentions {
                    week: week_label(*start),
                    mentions: base + slope * i + wiggle,
                    date: start.format("%Y-%m-%d").to_string(),
                }
            })
            .collect();
        response.data.insert(topic, series);
    }

    let first = starts.first().copied().unwrap_or(today);
    let last = starts.last().copied().unwrap_or(today);
    response.metadata = TopicVelocityMetadata {
        total_episodes: starts.len() as u64 * 24,
        date_range: format!("{} to {}", first.format("%Y-%m-%d"), last.format("%Y-%m-%d")),
        data_completeness: "demo".to_string(),
    };
    response
}

pub fn sentiment(query: &AnalyticsQuery, today: NaiveDate) -> Vec<SentimentPoint> {
    let starts = week_starts(query.span_weeks(), today);
    let mut points = Vec::with_capacity(starts.len() * query.topics.len().max(1));

    for topic in topics_for(query) {
        let seed = topic_seed(&topic);
        let phase = (seed % 628) as f64 / 100.0;
        for (i, start) in starts.iter().enumerate() {
            let raw = 0.6 * (phase + i as f64 * 0.5).sin();
            let sentiment = ((raw * 100.0).round() / 100.0).clamp(-1.0, 1.0);
            points.push(SentimentPoint {
                topic: topic.clone(),
                week: week_label(*start),
                sentiment,
                episode_count: 3 + (seed.wrapping_add(i as u64)) % 9,
            });
        }
    }
    points
}

struct DemoEpisode {
    title: &'static str,
    podcast: &'static str,
    duration_seconds: u64,
    relevance: f64,
    summary: &'static str,
    insights: &'static [&'static str],
    signals: &'static [(SignalType, &'static str, f64)],
}

const DEMO_EPISODES: &[DemoEpisode] = &[
    DemoEpisode {
        title: "Agents Are Eating Workflow Software",
        podcast: "The Twenty Minute VC",
        duration_seconds: 3_120,
        relevance: 0.92,
        summary: "Founders describe replacing seat-based SaaS with outcome-priced agent products.",
        insights: &[
            "Outcome-based pricing is displacing per-seat contracts",
            "Agent reliability is now the main buying criterion",
        ],
        signals: &[
            (SignalType::Investable, "Vertical agent startups raising seed rounds at 2x last year's multiples", 0.86),
            (SignalType::Competitive, "Incumbent CRM vendors bundling agents for free", 0.74),
            (SignalType::SoundBite, "\"Nobody wants software, they want the work done.\"", 0.9),
        ],
    },
    DemoEpisode {
        title: "Capital Efficiency After the Zero-Rate Era",
        podcast: "Invest Like the Best",
        duration_seconds: 4_020,
        relevance: 0.81,
        summary: "Growth investors on burn multiples, bridge rounds and default-alive planning.",
        insights: &["Burn multiple under 1.5 is the new bar for Series B"],
        signals: &[
            (SignalType::Portfolio, "Review runway assumptions for companies raising in the next 12 months", 0.7),
            (SignalType::Investable, "Profitable vertical SaaS trading at discounts in secondaries", 0.65),
        ],
    },
    DemoEpisode {
        title: "DePIN and the Physical Internet",
        podcast: "Bankless",
        duration_seconds: 3_600,
        relevance: 0.67,
        summary: "Token incentives for wireless and sensor networks, and where they break down.",
        insights: &[
            "Hardware subsidies front-load network growth",
            "Demand-side revenue is still thin",
        ],
        signals: &[(SignalType::Competitive, "Telecom carriers piloting DePIN offload agreements", 0.58)],
    },
    DemoEpisode {
        title: "The State of B2B SaaS Multiples",
        podcast: "All-In",
        duration_seconds: 5_400,
        relevance: 0.74,
        summary: "Public SaaS comps, net revenue retention and the AI re-rating.",
        insights: &["NRR has stabilised around 110% for the median public SaaS company"],
        signals: &[
            (SignalType::Investable, "AI-native SaaS priced at a premium to legacy peers", 0.77),
            (SignalType::SoundBite, "\"Retention is the only metric that compounds.\"", 0.83),
        ],
    },
    DemoEpisode {
        title: "Building Developer Platforms That Last",
        podcast: "Acquired",
        duration_seconds: 7_200,
        relevance: 0.59,
        summary: "How developer ecosystems form moats, from APIs to marketplaces.",
        insights: &["Ecosystem lock-in beats feature parity"],
        signals: &[(SignalType::Portfolio, "Portfolio devtools companies should invest in marketplaces", 0.61)],
    },
    DemoEpisode {
        title: "Stablecoins Go Mainstream",
        podcast: "This Week in Startups",
        duration_seconds: 2_880,
        relevance: 0.55,
        summary: "Payments founders on stablecoin settlement and merchant adoption.",
        insights: &[
            "Cross-border B2B payments are the first real wedge",
            "Regulatory clarity is unlocking bank partnerships",
        ],
        signals: &[(SignalType::Investable, "Stablecoin payment rails for SMB cross-border invoicing", 0.69)],
    },
];

pub fn dashboard(now: DateTime<Utc>) -> DashboardResponse {
    let episodes = DEMO_EPISODES
        .iter()
        .enumerate()
        .map(|(i, ep)| {
            let published = now - Days::new(i as u64 + 1);
            EpisodeBrief {
                episode_id: format!("demo-episode-{}", i + 1),
                title: ep.title.to_string(),
                podcast_name: ep.podcast.to_string(),
                published_at: published.to_rfc3339(),
                duration_seconds: ep.duration_seconds,
                relevance_score: ep.relevance,
                signals: ep
                    .signals
                    .iter()
                    .map(|(signal_type, content, confidence)| Signal {
                        signal_type: *signal_type,
                        content: content.to_string(),
                        confidence: *confidence,
                        timestamp: None,
                    })
                    .collect(),
                summary: ep.summary.to_string(),
                key_insights: ep.insights.iter().map(|s| s.to_string()).collect(),
                audio_url: String::new(),
            }
        })
        .collect();
    DashboardResponse::from_episodes(episodes, now)
}
