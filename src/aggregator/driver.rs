use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tokio::time::MissedTickBehavior;

use super::pipeline::{IngestError, Ingester};
use super::FeedStore;
use crate::config::ConfigError;

/// One unit of periodic work.
#[allow(async_fn_in_trait)]
pub trait Tick {
    async fn tick(&mut self);
}

impl<S: FeedStore> Tick for Ingester<S> {
    async fn tick(&mut self) {
        match self.run_once().await {
            Ok(result) if result.feeds_processed == 0 => {
                tracing::info!("No feeds to fetch");
            }
            Ok(result) => {
                tracing::info!(
                    seen = result.items_seen,
                    inserted = result.items_inserted,
                    skipped = result.items_skipped,
                    "Tick complete"
                );
            }
            Err(IngestError::Fetch {
                feed_id,
                url,
                source,
            }) => {
                tracing::warn!(
                    feed_id,
                    url = %url,
                    kind = source.kind(),
                    error = %source,
                    "Feed fetch failed, will retry on its next turn"
                );
            }
            Err(e) => tracing::warn!(error = %e, "Tick aborted"),
        }
    }
}

/// A strictly positive period between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval(Duration);

impl Interval {
    pub fn new(period: Duration) -> Result<Self, ConfigError> {
        if period.is_zero() {
            return Err(ConfigError::InvalidInterval(format!("{:?}", period)));
        }
        Ok(Self(period))
    }

    /// Parse a duration such as `30s`, `1m`, `1h30m`, `1.5s` or `500ms`.
    ///
    /// Units are `ns`, `us` (or `µs`), `ms`, `s`, `m` and `h`; every number
    /// needs one. Signs are not accepted.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidInterval(raw.to_string());
        let period = parse_duration(raw.trim()).ok_or_else(invalid)?;
        Self::new(period).map_err(|_| invalid())
    }

    pub fn period(&self) -> Duration {
        self.0
    }
}

impl FromStr for Interval {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

fn parse_duration(s: &str) -> Option<Duration> {
    if s.is_empty() {
        return None;
    }

    let is_number = |c: char| c.is_ascii_digit() || c == '.';
    let mut rest = s;
    let mut nanos = 0f64;

    while !rest.is_empty() {
        let split = rest.find(|c: char| !is_number(c)).unwrap_or(rest.len());
        let (number, tail) = rest.split_at(split);
        let split = tail.find(is_number).unwrap_or(tail.len());
        let (unit, tail) = tail.split_at(split);

        let scale = match unit {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return None,
        };
        let value: f64 = number.parse().ok()?;
        nanos += value * scale;
        rest = tail;
    }

    let nanos = nanos.round();
    if !nanos.is_finite() || nanos >= u64::MAX as f64 {
        return None;
    }
    Some(Duration::from_nanos(nanos as u64))
}

/// Call `ticker` immediately and then once per `interval`, forever.
///
/// Ticks never overlap: the next one is only awaited after the previous one
/// finishes. A tick that overruns the period is followed by at most one
/// immediate catch-up tick, and the schedule then continues from there.
pub async fn run<T: Tick>(interval: Interval, ticker: &mut T) -> Infallible {
    let mut timer = tokio::time::interval(interval.period());
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        timer.tick().await;
        ticker.tick().await;
    }
}

/// Entry point for `gator agg`: validate `interval`, then ingest forever.
///
/// Only an invalid interval returns; it does so before any fetch happens.
pub async fn start_aggregation<S: FeedStore>(
    mut ingester: Ingester<S>,
    interval: &str,
) -> Result<Infallible, ConfigError> {
    let interval = Interval::parse(interval)?;
    tracing::info!(interval = %interval, "Collecting feeds every {}", interval);
    Ok(run(interval, &mut ingester).await)
}
