//! Specialist agents reading the news, social, and polling feeds External
//! Data Fetch attaches to a market. The lexical sentiment scorer (keyword
//! lists, negation windows, recency decay, tanh normalization) is the
//! teacher's sentiment engine retargeted at prediction-market news instead
//! of equity headlines; [`velocity`] keeps its sentiment-dynamics module
//! nearly verbatim, since rate-of-change-of-sentiment is domain agnostic.

pub mod velocity;
pub use velocity::{
    NarrativeShift, SentimentDataPoint, SentimentDynamics, SentimentVelocityCalculator,
    VelocitySignal,
};

use async_trait::async_trait;
use chrono::Utc;
use market_intel_core::{
    AgentError, AgentErrorKind, AgentKind, AgentSignal, Direction, ExternalDataBundle,
    ExternalDataPayload, MarketBriefingDocument, NewsArticle, SpecialistAgent, NEUTRAL_EPSILON,
};
use std::collections::HashSet;
use std::time::Instant;

const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "don't", "doesn't", "didn't", "isn't", "aren't",
    "wasn't", "weren't", "won't", "wouldn't", "couldn't", "shouldn't", "hardly",
    "barely", "neither", "nor", "without",
];
const NEGATION_WINDOW: usize = 3;

const POSITIVE_WORDS: &[&str] = &[
    "confirmed", "surge", "gain", "win", "lead", "favored", "momentum", "strong",
    "positive", "rise", "increase", "breakthrough", "success", "exceed", "endorsement",
    "rally", "support", "advance", "record", "secured", "ahead",
];
const NEGATIVE_WORDS: &[&str] = &[
    "denied", "decline", "loss", "trail", "scandal", "weak", "negative", "drop",
    "decrease", "concern", "risk", "fail", "disappoint", "withdraw", "collapse",
    "retreat", "fear", "trouble", "indicted", "resign",
];

fn analyze_text(text: &str) -> f64 {
    let text_lower = text.to_lowercase();
    let words: Vec<&str> = text_lower
        .split(|c: char| c.is_whitespace() || c == ',' || c == ';' || c == '.' || c == '!' || c == '?')
        .filter(|w| !w.is_empty())
        .collect();

    let positive_set: HashSet<&str> = POSITIVE_WORDS.iter().copied().collect();
    let negative_set: HashSet<&str> = NEGATIVE_WORDS.iter().copied().collect();
    let negation_set: HashSet<&str> = NEGATION_WORDS.iter().copied().collect();

    let negation_positions: Vec<usize> = words
        .iter()
        .enumerate()
        .filter(|(_, w)| negation_set.contains(*w))
        .map(|(i, _)| i)
        .collect();

    let mut score: i32 = 0;
    for (i, word) in words.iter().enumerate() {
        let is_positive = positive_set.contains(*word);
        let is_negative = negative_set.contains(*word);
        if !is_positive && !is_negative {
            continue;
        }
        let negated = negation_positions
            .iter()
            .any(|&neg_pos| neg_pos < i && (i - neg_pos) <= NEGATION_WINDOW);

        if is_positive {
            score += if negated { -1 } else { 1 };
        } else {
            score += if negated { 1 } else { -1 };
        }
    }
    score as f64
}

fn analyze_article(article: &NewsArticle) -> f64 {
    analyze_text(&article.title) * 2.0 + analyze_text(&article.summary)
}

fn recency_weight(published_at: chrono::DateTime<Utc>) -> f64 {
    let age_hours = (Utc::now() - published_at).num_hours();
    if age_hours < 6 {
        1.0
    } else if age_hours < 24 {
        0.8
    } else if age_hours < 72 {
        0.5
    } else if age_hours < 168 {
        0.25
    } else {
        0.1
    }
}

/// Weighted average normalized sentiment (-100..100) over a set of articles,
/// plus a confidence estimate and the headlines that drove the score.
fn score_articles(articles: &[NewsArticle]) -> Option<(f64, f64, Vec<String>)> {
    if articles.is_empty() {
        return None;
    }
    let mut total_score = 0.0;
    let mut total_weight = 0.0;
    let mut drivers = Vec::new();

    for article in articles {
        let weight = recency_weight(article.published_at);
        total_score += analyze_article(article) * weight;
        total_weight += weight;
        if drivers.len() < 3 {
            drivers.push(article.title.clone());
        }
    }

    if total_weight <= 0.0 {
        return None;
    }
    let avg = total_score / total_weight;
    let normalized = 100.0 * (avg / 3.0).tanh();
    let confidence = (articles.len() as f64 / 10.0).min(1.0);
    Some((normalized, confidence, drivers))
}

fn news_articles(bundle: &ExternalDataBundle) -> Option<&[NewsArticle]> {
    let response = bundle.news.as_ref()?;
    match &response.payload {
        ExternalDataPayload::Articles(articles) => Some(articles.as_slice()),
        _ => None,
    }
}

fn social_mentions(bundle: &ExternalDataBundle) -> Option<&[market_intel_core::SocialMention]> {
    let response = bundle.social.as_ref()?;
    match &response.payload {
        ExternalDataPayload::Mentions(mentions) => Some(mentions.as_slice()),
        _ => None,
    }
}

fn poll_snapshots(bundle: &ExternalDataBundle) -> Option<&[market_intel_core::PollSnapshot]> {
    let response = bundle.polling.as_ref()?;
    match &response.payload {
        ExternalDataPayload::Polls(polls) => Some(polls.as_slice()),
        _ => None,
    }
}

fn no_data_error(kind: AgentKind, feed: &str) -> AgentError {
    AgentError {
        agent_name: kind.name().to_string(),
        kind: AgentErrorKind::Validation,
        message: format!("no {feed} feed available for this market"),
    }
}

fn finish(
    kind: AgentKind,
    mbd: &MarketBriefingDocument,
    tilt: f64,
    confidence: f64,
    drivers: Vec<String>,
    stale: bool,
    started: Instant,
) -> AgentSignal {
    let fair_probability = (mbd.current_probability + tilt).clamp(0.01, 0.99);
    let direction = Direction::from_probability(fair_probability, NEUTRAL_EPSILON);
    let mut risk_factors = mbd.metadata.ambiguity_flags.clone();
    if stale {
        risk_factors.push("feed data is stale".to_string());
    }

    AgentSignal {
        agent_name: kind.name().to_string(),
        timestamp: Utc::now(),
        confidence: confidence.clamp(0.05, 0.95),
        direction,
        fair_probability,
        key_drivers: if drivers.is_empty() { vec!["no distinguishing driver".to_string()] } else { drivers },
        risk_factors,
        metadata: serde_json::json!({ "tilt": tilt }),
        processing_time_ms: started.elapsed().as_millis() as u64,
    }
}

/// Scores the attached news feed with a lexicon-and-negation sentiment
/// model, recency-weighted, and maps the normalized score onto a small
/// probability tilt.
pub struct MediaSentimentAgent;

#[async_trait]
impl SpecialistAgent for MediaSentimentAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::MediaSentiment
    }

    async fn analyze(
        &self,
        mbd: &MarketBriefingDocument,
        external: &ExternalDataBundle,
    ) -> Result<AgentSignal, AgentError> {
        let started = Instant::now();
        let articles = news_articles(external).ok_or_else(|| no_data_error(self.kind(), "news"))?;
        let (normalized, confidence, drivers) =
            score_articles(articles).ok_or_else(|| no_data_error(self.kind(), "news"))?;

        let tilt = (normalized / 100.0) * 0.08;
        let stale = external.news.as_ref().map(|r| r.stale).unwrap_or(false);
        Ok(finish(self.kind(), mbd, tilt, confidence, drivers, stale, started))
    }
}

/// Averages sentiment directly reported on social mentions, weighted by
/// recency, without re-running lexical scoring (the feed already carries a
/// sentiment score per mention).
pub struct SocialSentimentAgent;

#[async_trait]
impl SpecialistAgent for SocialSentimentAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::SocialSentiment
    }

    async fn analyze(
        &self,
        mbd: &MarketBriefingDocument,
        external: &ExternalDataBundle,
    ) -> Result<AgentSignal, AgentError> {
        let started = Instant::now();
        let mentions = social_mentions(external).ok_or_else(|| no_data_error(self.kind(), "social"))?;
        if mentions.is_empty() {
            return Err(no_data_error(self.kind(), "social"));
        }

        let mut total = 0.0;
        let mut weight_sum = 0.0;
        for mention in mentions {
            let weight = recency_weight(mention.posted_at);
            total += mention.sentiment.clamp(-1.0, 1.0) * weight;
            weight_sum += weight;
        }
        let avg_sentiment = if weight_sum > 0.0 { total / weight_sum } else { 0.0 };

        let tilt = avg_sentiment * 0.05;
        let confidence = (mentions.len() as f64 / 50.0).min(1.0).max(0.1);
        let platforms: Vec<String> = mentions
            .iter()
            .map(|m| m.platform.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let stale = external.social.as_ref().map(|r| r.stale).unwrap_or(false);
        Ok(finish(self.kind(), mbd, tilt, confidence, platforms, stale, started))
    }
}

/// Turns the news feed into a short sentiment time series and runs it
/// through the rate-of-change calculator to catch momentum the raw average
/// sentiment score can't see.
pub struct NarrativeVelocityAgent;

#[async_trait]
impl SpecialistAgent for NarrativeVelocityAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::NarrativeVelocity
    }

    async fn analyze(
        &self,
        mbd: &MarketBriefingDocument,
        external: &ExternalDataBundle,
    ) -> Result<AgentSignal, AgentError> {
        let started = Instant::now();
        let articles = news_articles(external).ok_or_else(|| no_data_error(self.kind(), "news"))?;
        if articles.len() < 3 {
            return Err(AgentError {
                agent_name: self.kind().name().to_string(),
                kind: AgentErrorKind::Validation,
                message: "not enough articles to compute sentiment velocity".to_string(),
            });
        }

        let mut history: Vec<SentimentDataPoint> = articles
            .iter()
            .map(|a| SentimentDataPoint {
                timestamp: a.published_at,
                sentiment_score: 100.0 * (analyze_article(a) / 3.0).tanh(),
                article_count: 1,
                market_id: mbd.market_id.clone(),
            })
            .collect();
        history.sort_by_key(|p| p.timestamp);

        let dynamics = SentimentVelocityCalculator::default().calculate(&history);
        let tilt = (dynamics.velocity / 100.0).clamp(-1.0, 1.0) * 0.06;
        let stale = external.news.as_ref().map(|r| r.stale).unwrap_or(false);

        Ok(finish(
            self.kind(),
            mbd,
            tilt,
            dynamics.confidence,
            vec![dynamics.signal.as_str().to_string()],
            stale,
            started,
        ))
    }
}

/// Looks only at the freshest articles, ignoring the rest of the feed:
/// a single strongly worded story in the last few hours outweighs a week
/// of stale background coverage.
pub struct BreakingNewsAgent;

#[async_trait]
impl SpecialistAgent for BreakingNewsAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::BreakingNews
    }

    async fn analyze(
        &self,
        mbd: &MarketBriefingDocument,
        external: &ExternalDataBundle,
    ) -> Result<AgentSignal, AgentError> {
        let started = Instant::now();
        let articles = news_articles(external).ok_or_else(|| no_data_error(self.kind(), "news"))?;

        let fresh: Vec<&NewsArticle> = articles
            .iter()
            .filter(|a| (Utc::now() - a.published_at).num_hours() < 6)
            .collect();

        if fresh.is_empty() {
            return Err(AgentError {
                agent_name: self.kind().name().to_string(),
                kind: AgentErrorKind::Validation,
                message: "no breaking coverage in the last 6 hours".to_string(),
            });
        }

        let scores: Vec<f64> = fresh.iter().map(|a| analyze_article(a)).collect();
        let avg_score: f64 = scores.iter().sum::<f64>() / scores.len() as f64;
        let normalized = 100.0 * (avg_score / 3.0).tanh();
        let tilt = (normalized / 100.0) * 0.1;
        let confidence = 0.5 + 0.1 * fresh.len().min(4) as f64;
        let drivers: Vec<String> = fresh.iter().take(2).map(|a| a.title.clone()).collect();

        Ok(finish(self.kind(), mbd, tilt, confidence, drivers, false, started))
    }
}

/// Weighs how much of the article and catalyst record is actually relevant
/// to the market's own resolution window, rather than how it reads in
/// isolation.
pub struct EventImpactAgent;

#[async_trait]
impl SpecialistAgent for EventImpactAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::EventImpact
    }

    async fn analyze(
        &self,
        mbd: &MarketBriefingDocument,
        external: &ExternalDataBundle,
    ) -> Result<AgentSignal, AgentError> {
        let started = Instant::now();
        let articles = news_articles(external).ok_or_else(|| no_data_error(self.kind(), "news"))?;
        let (normalized, confidence, drivers) =
            score_articles(articles).ok_or_else(|| no_data_error(self.kind(), "news"))?;

        let catalyst_count = mbd.metadata.key_catalysts.len() as f64;
        let impact_scale = (1.0 + catalyst_count * 0.2).min(2.0);
        let tilt = (normalized / 100.0) * 0.05 * impact_scale;
        let stale = external.news.as_ref().map(|r| r.stale).unwrap_or(false);

        Ok(finish(self.kind(), mbd, tilt, confidence, drivers, stale, started))
    }
}

/// Compares the market price against a sample-size-weighted average of
/// attached poll snapshots, the most direct outside read on the same
/// question the market is pricing.
pub struct PollingIntelligenceAgent;

#[async_trait]
impl SpecialistAgent for PollingIntelligenceAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::PollingIntelligence
    }

    async fn analyze(
        &self,
        mbd: &MarketBriefingDocument,
        external: &ExternalDataBundle,
    ) -> Result<AgentSignal, AgentError> {
        let started = Instant::now();
        let polls = poll_snapshots(external).ok_or_else(|| no_data_error(self.kind(), "polling"))?;
        if polls.is_empty() {
            return Err(no_data_error(self.kind(), "polling"));
        }

        let total_sample: f64 = polls.iter().map(|p| p.sample_size as f64).sum();
        if total_sample <= 0.0 {
            return Err(no_data_error(self.kind(), "polling"));
        }
        let weighted_share: f64 = polls
            .iter()
            .map(|p| p.yes_share * p.sample_size as f64)
            .sum::<f64>()
            / total_sample;

        let tilt = (weighted_share - mbd.current_probability) * 0.4;
        let confidence = (total_sample / 5_000.0).min(1.0).max(0.15);
        let drivers: Vec<String> = polls.iter().map(|p| p.pollster.clone()).collect();
        let stale = external.polling.as_ref().map(|r| r.stale).unwrap_or(false);

        Ok(finish(self.kind(), mbd, tilt, confidence, drivers, stale, started))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_intel_core::{
        EventType, ExternalDataResponse, MarketMetadata, PollSnapshot, SocialMention,
        VolatilityRegime,
    };

    fn sample_mbd() -> MarketBriefingDocument {
        MarketBriefingDocument {
            market_id: "m1".into(),
            condition_id: "c1".into(),
            event_type: EventType::Election,
            question: "Will X happen?".into(),
            resolution_criteria: "Resolves YES if X".into(),
            expiry_timestamp: Utc::now() + chrono::Duration::days(10),
            current_probability: 0.5,
            liquidity_score: 5.0,
            bid_ask_spread: 0.02,
            volatility_regime: VolatilityRegime::Medium,
            volume_24h: 10_000.0,
            metadata: MarketMetadata::default(),
        }
    }

    #[tokio::test]
    async fn media_sentiment_requires_news_feed() {
        let mbd = sample_mbd();
        let external = ExternalDataBundle::default();
        let err = MediaSentimentAgent.analyze(&mbd, &external).await.unwrap_err();
        assert_eq!(err.kind, AgentErrorKind::Validation);
    }

    #[tokio::test]
    async fn polling_intelligence_pulls_toward_poll_share() {
        let mbd = sample_mbd();
        let mut external = ExternalDataBundle::default();
        external.polling = Some(ExternalDataResponse {
            payload: ExternalDataPayload::Polls(vec![PollSnapshot {
                pollster: "Acme Polls".into(),
                sample_size: 2_000,
                yes_share: 0.7,
                taken_at: Utc::now(),
            }]),
            freshness_seconds: 60,
            stale: false,
        });

        let signal = PollingIntelligenceAgent.analyze(&mbd, &external).await.unwrap();
        assert!(signal.fair_probability > mbd.current_probability);
    }

    #[tokio::test]
    async fn social_sentiment_averages_recent_mentions() {
        let mbd = sample_mbd();
        let mut external = ExternalDataBundle::default();
        external.social = Some(ExternalDataResponse {
            payload: ExternalDataPayload::Mentions(vec![SocialMention {
                platform: "x".into(),
                text: "looking good".into(),
                sentiment: 0.8,
                posted_at: Utc::now(),
            }]),
            freshness_seconds: 30,
            stale: false,
        });

        let signal = SocialSentimentAgent.analyze(&mbd, &external).await.unwrap();
        assert!(signal.fair_probability > mbd.current_probability);
        signal.validate().unwrap();
    }
}
