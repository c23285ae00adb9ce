//! Report image cache.
//!
//! Byte cache for rendered report charts, keyed by report kind, user, year
//! and optional month. Keys live under their own `report_image` namespace so
//! they never collide with memoized views.

use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};

use super::invalidation::{delete_patterns, InvalidationPattern, InvalidationReport};
use super::{CacheClient, CacheResult};

/// Namespace of every report image key.
pub const IMAGE_NAMESPACE: &str = "report_image";

/// Default lifetime of a cached chart.
pub const DEFAULT_IMAGE_TTL: Duration = Duration::from_secs(900);

/// Kinds of rendered reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Daily,
    Monthly,
    Yearly,
}

impl ReportKind {
    pub const ALL: [ReportKind; 3] = [ReportKind::Daily, ReportKind::Monthly, ReportKind::Yearly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one cached report image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageKey {
    pub kind: ReportKind,
    pub user_id: i64,
    pub year: i32,
    pub month: Option<u32>,
}

impl ImageKey {
    pub fn new(kind: ReportKind, user_id: i64, year: i32, month: Option<u32>) -> Self {
        Self {
            kind,
            user_id,
            year,
            month,
        }
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", IMAGE_NAMESPACE, self.kind, self.user_id, self.year)?;
        if let Some(month) = self.month {
            write!(f, ":{}", month)?;
        }
        Ok(())
    }
}

/// Byte cache for rendered reports.
#[derive(Debug, Clone)]
pub struct ReportImageCache {
    client: CacheClient,
    ttl: Duration,
}

impl ReportImageCache {
    pub fn new(client: CacheClient, ttl: Duration) -> Self {
        Self { client, ttl }
    }

    /// Default TTL for [`put`](Self::put).
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a cached image. Store failures read as a miss.
    pub async fn get(&self, key: &ImageKey) -> Option<Vec<u8>> {
        let key = key.to_string();
        match self.client.get(&key).await {
            Ok(bytes) => {
                debug!(key = %key, hit = bytes.is_some(), "Report image lookup");
                bytes
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Report image lookup failed");
                None
            }
        }
    }

    /// Store an image for `ttl`.
    pub async fn put(&self, key: &ImageKey, bytes: &[u8], ttl: Duration) -> CacheResult<()> {
        self.client.set(&key.to_string(), bytes, ttl).await
    }

    /// Patterns covering every image a mutation at this scope can make stale.
    ///
    /// - user only: every image of the user
    /// - user + year: every image of that year
    /// - user + year + month: that month's images plus the year-keyed ones,
    ///   which aggregate the month
    pub fn patterns(user_id: i64, year: Option<i32>, month: Option<u32>) -> Vec<InvalidationPattern> {
        let mut patterns = Vec::new();
        for kind in ReportKind::ALL {
            let stem = format!("{}:{}:{}", IMAGE_NAMESPACE, kind, user_id);
            match (year, month) {
                (None, _) => patterns.push(InvalidationPattern::glob(format!("{stem}:*"))),
                (Some(year), None) => {
                    patterns.push(InvalidationPattern::exact(format!("{stem}:{year}")));
                    patterns.push(InvalidationPattern::glob(format!("{stem}:{year}:*")));
                }
                (Some(year), Some(month)) => {
                    patterns.push(InvalidationPattern::exact(format!("{stem}:{year}")));
                    patterns.push(InvalidationPattern::exact(format!("{stem}:{year}:{month}")));
                }
            }
        }
        patterns
    }

    /// Drop the images a mutation at this scope can make stale.
    ///
    /// A failing pattern is counted in the report and the rest still run.
    pub async fn invalidate(&self, user_id: i64, year: Option<i32>, month: Option<u32>) -> InvalidationReport {
        delete_patterns(&self.client, &Self::patterns(user_id, year, month)).await
    }
}
