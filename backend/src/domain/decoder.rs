//! Pure decoders for raw upstream telemetry codes.
//!
//! Every function is total: unrecognised or missing input decodes to a
//! neutral value instead of failing.

use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

const SEGMENT_NONE: i64 = 0;
const SEGMENT_YELLOW: i64 = 2048;
const SEGMENT_BEST: i64 = 2049;
const SEGMENT_PERSONAL_BEST: i64 = 2051;
const SEGMENT_PIT: i64 = 2064;

const SECTOR_FIELDS: [&str; 3] = [
    "segments_sector_1",
    "segments_sector_2",
    "segments_sector_3",
];

/// Decoded state of the overtaking aid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct DrsState {
    /// Flap open.
    pub enabled: bool,
    /// Car within the detection window; flap may be opened.
    pub available: bool,
}

/// Decode a raw DRS code.
///
/// | code            | enabled | available |
/// |-----------------|---------|-----------|
/// | 8               | false   | true      |
/// | 10, 12, 14      | true    | true      |
/// | anything else   | false   | false     |
///
/// # Examples
/// ```
/// use paddock::domain::decoder::{DrsState, decode_drs};
///
/// assert_eq!(decode_drs(Some(12)), DrsState { enabled: true, available: true });
/// assert_eq!(decode_drs(None), DrsState::default());
/// ```
#[must_use]
pub const fn decode_drs(code: Option<i64>) -> DrsState {
    match code {
        Some(8) => DrsState {
            enabled: false,
            available: true,
        },
        Some(10 | 12 | 14) => DrsState {
            enabled: true,
            available: true,
        },
        _ => DrsState {
            enabled: false,
            available: false,
        },
    }
}

/// Mini-sector performance label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStatus {
    /// No data for the segment.
    None,
    /// Slower than the driver's best (shown yellow).
    Yellow,
    /// Overall fastest (shown green).
    Best,
    /// Driver's personal best (shown purple).
    PersonalBest,
    /// Segment driven through the pit lane.
    Pit,
    /// Unrecognised code.
    Unknown,
}

impl SegmentStatus {
    /// Rank used when reducing a sector to one label; higher wins.
    const fn priority(self) -> u8 {
        match self {
            Self::PersonalBest => 5,
            Self::Best => 4,
            Self::Pit => 3,
            Self::Yellow => 2,
            Self::None => 1,
            Self::Unknown => 0,
        }
    }
}

/// Decode one segment code.
#[must_use]
pub const fn decode_segment(code: i64) -> SegmentStatus {
    match code {
        SEGMENT_NONE => SegmentStatus::None,
        SEGMENT_YELLOW => SegmentStatus::Yellow,
        SEGMENT_BEST => SegmentStatus::Best,
        SEGMENT_PERSONAL_BEST => SegmentStatus::PersonalBest,
        SEGMENT_PIT => SegmentStatus::Pit,
        _ => SegmentStatus::Unknown,
    }
}

/// Reduce a sector's segment codes to its highest-priority label.
///
/// Priority: personal best, best, pit, yellow, none, unknown. An empty
/// sector is [`SegmentStatus::None`].
///
/// # Examples
/// ```
/// use paddock::domain::decoder::{SegmentStatus, reduce_segments};
///
/// assert_eq!(reduce_segments(&[2048, 2051, 2049]), SegmentStatus::PersonalBest);
/// assert_eq!(reduce_segments(&[]), SegmentStatus::None);
/// ```
#[must_use]
pub fn reduce_segments(codes: &[i64]) -> SegmentStatus {
    codes
        .iter()
        .map(|code| decode_segment(*code))
        .max_by_key(|status| status.priority())
        .unwrap_or(SegmentStatus::None)
}

/// Whether the sector was driven through the pit lane.
#[must_use]
pub fn is_pit_lane(codes: &[i64]) -> bool {
    codes.contains(&SEGMENT_PIT)
}

/// Whether a lap with the given duration did not finish.
#[must_use]
pub const fn is_dnf(lap_duration: Option<f64>) -> bool {
    lap_duration.is_none()
}

/// Whether a raw lap record has no usable `lap_duration`.
///
/// Absent, `null` and non-numeric durations all count as not finished.
#[must_use]
pub fn lap_did_not_finish(record: &Value) -> bool {
    is_dnf(record.get("lap_duration").and_then(Value::as_f64))
}

/// Decoded summary of one sector of a lap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SectorSummary {
    /// Sector number, 1 to 3.
    pub sector: u8,
    /// Reduced segment label.
    pub status: SegmentStatus,
    /// Whether any segment was driven in the pit lane.
    pub pit_lane: bool,
}

/// Decode the three `segments_sector_N` arrays of a raw lap record.
///
/// Missing arrays decode as empty sectors; non-integer entries decode as
/// unknown segments.
#[must_use]
pub fn decode_lap_sectors(record: &Value) -> [SectorSummary; 3] {
    let mut sectors = [1_u8, 2, 3].map(|sector| SectorSummary {
        sector,
        status: SegmentStatus::None,
        pit_lane: false,
    });
    for (summary, field) in sectors.iter_mut().zip(SECTOR_FIELDS) {
        let codes = segment_codes(record.get(field));
        summary.status = reduce_segments(&codes);
        summary.pit_lane = is_pit_lane(&codes);
    }
    sectors
}

fn segment_codes(raw: Option<&Value>) -> Vec<i64> {
    raw.and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .map(|entry| entry.as_i64().unwrap_or(i64::MIN))
                .collect()
        })
        .unwrap_or_default()
}
