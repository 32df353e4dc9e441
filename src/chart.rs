//! Chart projection: the model-distribution series derived from a snapshot.
//!
//! [`project`] is pure. It always yields the same three segments in the same
//! order, with missing source counts projected to zero, so the renderer never
//! has to special-case an absent provider. Whether to draw the chart at all
//! is a rendering decision keyed on [`StatsSnapshot::has_traffic`].

use serde::Serialize;

use crate::store::StatsSnapshot;

/// One of the three fixed distribution segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SegmentKind {
    Groq,
    Local,
    Cached,
}

impl SegmentKind {
    /// Fixed projection order.
    pub const ALL: [SegmentKind; 3] = [Self::Groq, Self::Local, Self::Cached];

    /// Legend text.
    pub fn legend(self) -> &'static str {
        match self {
            Self::Groq => "Groq (Fast)",
            Self::Local => "Local (Free)",
            Self::Cached => "Cached",
        }
    }
}

impl std::fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Groq => write!(f, "Groq"),
            Self::Local => write!(f, "Local"),
            Self::Cached => write!(f, "Cached"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Segment {
    pub kind: SegmentKind,
    pub value: u64,
}

/// The distribution series: exactly three segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartSeries {
    pub segments: [Segment; 3],
}

impl ChartSeries {
    /// Sum of all segment values.
    pub fn total(&self) -> u64 {
        self.segments.iter().map(|s| s.value).sum()
    }

    pub fn value(&self, kind: SegmentKind) -> u64 {
        self.segments
            .iter()
            .find(|s| s.kind == kind)
            .map(|s| s.value)
            .unwrap_or(0)
    }

    /// Share of the series total for a segment, 0.0 if the total is zero.
    pub fn pct(&self, kind: SegmentKind) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (self.value(kind) as f64 / total as f64) * 100.0
        }
    }
}

/// Project a snapshot onto the distribution series.
pub fn project(snapshot: &StatsSnapshot) -> ChartSeries {
    let value_of = |kind: SegmentKind| match kind {
        SegmentKind::Groq => snapshot.provider_groq,
        SegmentKind::Local => snapshot.provider_local,
        SegmentKind::Cached => snapshot.cache_hits,
    };
    ChartSeries {
        segments: SegmentKind::ALL.map(|kind| Segment {
            kind,
            value: value_of(kind),
        }),
    }
}
