//! Weekly LinkedIn follower and Social Selling Index tracking.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::week::WeekKey;

pub const SSI_COMPONENT_MAX: f64 = 25.0;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SsiScores {
    #[serde(default)]
    pub establish_brand: f64,
    #[serde(default)]
    pub find_people: f64,
    #[serde(default)]
    pub engage_insights: f64,
    #[serde(default)]
    pub build_relationships: f64,
    #[serde(default)]
    pub total: f64,
}

impl SsiScores {
    /// Builds scores with `total` as the component sum rounded to one decimal.
    pub fn new(
        establish_brand: f64,
        find_people: f64,
        engage_insights: f64,
        build_relationships: f64,
    ) -> Self {
        let sum = establish_brand + find_people + engage_insights + build_relationships;
        Self {
            establish_brand,
            find_people,
            engage_insights,
            build_relationships,
            total: round_one_decimal(sum),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedInWeekMetric {
    #[serde(default)]
    pub follower_count: u64,
    #[serde(default)]
    pub ssi: SsiScores,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Persisted shape: `"YYYY-W"` -> metric.
pub type LinkedInMetrics = BTreeMap<String, LinkedInWeekMetric>;

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Raw text of the weekly form, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkedInForm {
    pub follower_count: String,
    pub establish_brand: String,
    pub find_people: String,
    pub engage_insights: String,
    pub build_relationships: String,
}

/// Field name -> message. Saving is blocked while any entry exists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(BTreeMap<&'static str, String>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&&'static str, &String)> {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|(field, msg)| format!("{field}: {msg}"))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

pub const FOLLOWER_COUNT_FIELD: &str = "followerCount";
const SSI_FIELDS: [&str; 4] = [
    "establishBrand",
    "findPeople",
    "engageInsights",
    "buildRelationships",
];

fn parse_component(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    (value.is_finite() && (0.0..=SSI_COMPONENT_MAX).contains(&value)).then_some(value)
}

impl LinkedInForm {
    pub fn from_metric(metric: &LinkedInWeekMetric) -> Self {
        Self {
            follower_count: metric.follower_count.to_string(),
            establish_brand: metric.ssi.establish_brand.to_string(),
            find_people: metric.ssi.find_people.to_string(),
            engage_insights: metric.ssi.engage_insights.to_string(),
            build_relationships: metric.ssi.build_relationships.to_string(),
        }
    }

    /// Validates every field; returns a metric without a timestamp, or all
    /// field errors at once.
    pub fn validate(&self) -> Result<LinkedInWeekMetric, ValidationErrors> {
        let mut errors = BTreeMap::new();

        let follower_count = self.follower_count.trim().parse::<u64>().ok();
        if follower_count.is_none() {
            errors.insert(
                FOLLOWER_COUNT_FIELD,
                "Please enter a valid follower count (0 or higher)".to_string(),
            );
        }

        let raw = [
            &self.establish_brand,
            &self.find_people,
            &self.engage_insights,
            &self.build_relationships,
        ];
        let mut components = [0.0_f64; 4];
        for (idx, value) in raw.iter().enumerate() {
            match parse_component(value) {
                Some(parsed) => components[idx] = parsed,
                None => {
                    errors.insert(SSI_FIELDS[idx], "Must be between 0 and 25".to_string());
                }
            }
        }

        if !errors.is_empty() {
            debug!(fields = errors.len(), "linkedin form rejected");
            return Err(ValidationErrors(errors));
        }

        Ok(LinkedInWeekMetric {
            follower_count: follower_count.unwrap_or_default(),
            ssi: SsiScores::new(components[0], components[1], components[2], components[3]),
            updated_at: None,
        })
    }
}

/// Returns `metrics` with `metric` stored under `key`, stamped with `now`.
pub fn save_week(
    metrics: &LinkedInMetrics,
    key: WeekKey,
    metric: LinkedInWeekMetric,
    now: DateTime<Utc>,
) -> LinkedInMetrics {
    let mut next = metrics.clone();
    next.insert(
        key.to_string(),
        LinkedInWeekMetric {
            updated_at: Some(now),
            ..metric
        },
    );
    next
}

pub fn clear_week(metrics: &LinkedInMetrics, key: WeekKey) -> LinkedInMetrics {
    let mut next = metrics.clone();
    next.remove(&key.to_string());
    next
}

pub fn metric_for(metrics: &LinkedInMetrics, key: WeekKey) -> Option<&LinkedInWeekMetric> {
    metrics.get(&key.to_string())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetricChange {
    pub title: &'static str,
    pub value: f64,
    pub previous: Option<f64>,
    pub change: f64,
    pub change_percent: f64,
    pub max: Option<f64>,
}

impl MetricChange {
    /// A missing or zero previous value yields no change.
    fn new(title: &'static str, value: f64, previous: Option<f64>, max: Option<f64>) -> Self {
        let (change, change_percent) = match previous {
            Some(prev) if prev != 0.0 => {
                let change = value - prev;
                (change, change / prev * 100.0)
            }
            _ => (0.0, 0.0),
        };
        Self {
            title,
            value,
            previous,
            change,
            change_percent,
            max,
        }
    }

    pub fn trend(&self) -> Trend {
        if self.change > 0.0 {
            Trend::Up
        } else if self.change < 0.0 {
            Trend::Down
        } else {
            Trend::Flat
        }
    }
}

/// Week-over-week comparison; empty when the current week has no data.
pub fn dashboard(
    current: Option<&LinkedInWeekMetric>,
    previous: Option<&LinkedInWeekMetric>,
) -> Vec<MetricChange> {
    let Some(current) = current else {
        return vec![];
    };
    let component = Some(SSI_COMPONENT_MAX);

    vec![
        MetricChange::new(
            "Followers",
            current.follower_count as f64,
            previous.map(|p| p.follower_count as f64),
            None,
        ),
        MetricChange::new(
            "Total SSI",
            current.ssi.total,
            previous.map(|p| p.ssi.total),
            Some(SSI_COMPONENT_MAX * 4.0),
        ),
        MetricChange::new(
            "Professional Brand",
            current.ssi.establish_brand,
            previous.map(|p| p.ssi.establish_brand),
            component,
        ),
        MetricChange::new(
            "Find People",
            current.ssi.find_people,
            previous.map(|p| p.ssi.find_people),
            component,
        ),
        MetricChange::new(
            "Engage Insights",
            current.ssi.engage_insights,
            previous.map(|p| p.ssi.engage_insights),
            component,
        ),
        MetricChange::new(
            "Build Relationships",
            current.ssi.build_relationships,
            previous.map(|p| p.ssi.build_relationships),
            component,
        ),
    ]
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub key: WeekKey,
    pub followers: u64,
    pub ssi: SsiScores,
}

/// Every stored week ordered by (year, week). Keys that do not parse are skipped.
pub fn trend_series(metrics: &LinkedInMetrics) -> Vec<TrendPoint> {
    let mut points: Vec<TrendPoint> = metrics
        .iter()
        .filter_map(|(raw, metric)| match raw.parse::<WeekKey>() {
            Ok(key) => Some(TrendPoint {
                key,
                followers: metric.follower_count,
                ssi: metric.ssi,
            }),
            Err(err) => {
                warn!(key = %raw, error = %err, "skipping malformed linkedin week key");
                None
            }
        })
        .collect();
    points.sort_by_key(|point| point.key);
    points
}
