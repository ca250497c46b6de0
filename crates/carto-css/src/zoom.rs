//! Zoom masks
//!
//! A zoom mask is a 23-bit set where bit `i` means "visible at zoom level i".
//! Selectors build masks from `[zoom op N]` filters; the materializer decodes
//! them back into contiguous spans and scale denominators.

use std::fmt;
use std::ops::{BitAnd, BitAndAssign};

use crate::error::{CartoError, Result, SourceLocation};
use crate::filter::FilterOp;

/// Highest zoom level a mask can address.
pub const MAX_ZOOM: u8 = 22;

/// Scale denominators for zoom levels 0..=23.
const SCALE_DENOMINATORS: [f64; 24] = [
    1_000_000_000.0,
    500_000_000.0,
    200_000_000.0,
    100_000_000.0,
    50_000_000.0,
    25_000_000.0,
    12_500_000.0,
    6_500_000.0,
    3_000_000.0,
    1_500_000.0,
    750_000.0,
    400_000.0,
    200_000.0,
    100_000.0,
    50_000.0,
    25_000.0,
    12_500.0,
    5_000.0,
    2_500.0,
    1_500.0,
    750.0,
    500.0,
    250.0,
    100.0,
];

/// Scale denominator at which `zoom` starts.
pub fn scale_denominator(zoom: u8) -> f64 {
    SCALE_DENOMINATORS[usize::from(zoom).min(SCALE_DENOMINATORS.len() - 1)]
}

/// Set of zoom levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Zoom(u32);

impl Zoom {
    pub const ALL: Zoom = Zoom(0x7F_FFFF);
    pub const NONE: Zoom = Zoom(0);

    pub fn from_bits(bits: u32) -> Self {
        Zoom(bits & Self::ALL.0)
    }

    /// Levels `start..=end`, empty when `start > end`.
    pub fn range(start: u8, end: u8) -> Self {
        if start > end || start > MAX_ZOOM {
            return Self::NONE;
        }
        let end = end.min(MAX_ZOOM);
        let mut bits = 0;
        for level in start..=end {
            bits |= 1 << level;
        }
        Zoom(bits)
    }

    /// Mask for a `[zoom op level]` filter.
    pub fn from_comparison(op: FilterOp, level: i64, location: &SourceLocation) -> Result<Self> {
        if !(0..=i64::from(MAX_ZOOM)).contains(&level) {
            return Err(CartoError::InvalidZoom {
                level,
                location: location.clone(),
            });
        }
        // in range, checked above
        let level = level as u8;
        let zoom = match op {
            FilterOp::Eq => Zoom(1 << level),
            FilterOp::Gt => match level.checked_add(1) {
                Some(start) => Self::range(start, MAX_ZOOM),
                None => Self::NONE,
            },
            FilterOp::Ge => Self::range(level, MAX_ZOOM),
            FilterOp::Lt => match level.checked_sub(1) {
                Some(end) => Self::range(0, end),
                None => Self::NONE,
            },
            FilterOp::Le => Self::range(0, level),
            other => {
                return Err(CartoError::parse(
                    format!("operator '{other}' cannot be used with zoom"),
                    location.clone(),
                ));
            }
        };
        Ok(zoom)
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn is_all(self) -> bool {
        self == Self::ALL
    }

    pub fn contains(self, level: u8) -> bool {
        level <= MAX_ZOOM && self.0 & (1 << level) != 0
    }

    pub fn intersects(self, other: Zoom) -> bool {
        self.0 & other.0 != 0
    }

    /// Levels in `self` that are not in `other`.
    pub fn difference(self, other: Zoom) -> Zoom {
        Zoom(self.0 & !other.0 & Self::ALL.0)
    }

    /// Lowest visible level.
    pub fn first(self) -> Option<u8> {
        (0..=MAX_ZOOM).find(|level| self.contains(*level))
    }

    /// Highest visible level.
    pub fn last(self) -> Option<u8> {
        (0..=MAX_ZOOM).rev().find(|level| self.contains(*level))
    }

    /// Maximal contiguous runs of visible levels, lowest first.
    pub fn spans(self) -> Vec<ZoomSpan> {
        let mut spans = Vec::new();
        let mut start = None;
        for level in 0..=MAX_ZOOM {
            match (self.contains(level), start) {
                (true, None) => start = Some(level),
                (false, Some(first)) => {
                    spans.push(ZoomSpan::new(first, level - 1));
                    start = None;
                }
                _ => {}
            }
        }
        if let Some(first) = start {
            spans.push(ZoomSpan::new(first, MAX_ZOOM));
        }
        spans
    }
}

impl Default for Zoom {
    fn default() -> Self {
        Self::ALL
    }
}

impl BitAnd for Zoom {
    type Output = Zoom;

    fn bitand(self, rhs: Zoom) -> Zoom {
        Zoom(self.0 & rhs.0)
    }
}

impl BitAndAssign for Zoom {
    fn bitand_assign(&mut self, rhs: Zoom) {
        self.0 &= rhs.0;
    }
}

impl fmt::Display for Zoom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Contiguous zoom range `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomSpan {
    pub start: u8,
    pub end: u8,
}

impl ZoomSpan {
    pub fn new(start: u8, end: u8) -> Self {
        Self { start, end }
    }

    /// Inclusive upper scale bound, absent when the span starts at zoom 0.
    pub fn max_scale(&self) -> Option<f64> {
        (self.start > 0).then(|| scale_denominator(self.start))
    }

    /// Exclusive lower scale bound, absent when the span reaches the last level.
    pub fn min_scale(&self) -> Option<f64> {
        (self.end < MAX_ZOOM).then(|| scale_denominator(self.end + 1))
    }
}
