//! Route search configuration.

use crate::domain::BoundingBox;

/// Extra cost factor applied to an edge as a function of its rainfall hazard.
///
/// Zero at or below `dry_threshold_mm`, then rising by `slope_per_mm` for each
/// millimetre above it, capped at `max_penalty`. The edge cost is
/// `length * (1 + penalty)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HazardPenalty {
    /// Rainfall at or below this is treated as dry.
    pub dry_threshold_mm: u32,

    /// Penalty added per millimetre above the dry threshold.
    pub slope_per_mm: f64,

    /// Upper bound on the penalty.
    pub max_penalty: f64,
}

impl HazardPenalty {
    pub fn new(dry_threshold_mm: u32, slope_per_mm: f64, max_penalty: f64) -> Self {
        Self {
            dry_threshold_mm,
            slope_per_mm,
            max_penalty,
        }
    }

    /// Penalty for a hazard reading in millimetres.
    pub fn penalty(&self, hazard_mm: u32) -> f64 {
        if hazard_mm <= self.dry_threshold_mm {
            return 0.0;
        }
        let excess = f64::from(hazard_mm - self.dry_threshold_mm);
        (excess * self.slope_per_mm).clamp(0.0, self.max_penalty.max(0.0))
    }
}

impl Default for HazardPenalty {
    fn default() -> Self {
        Self {
            dry_threshold_mm: 0,
            slope_per_mm: 0.5,
            max_penalty: 50.0,
        }
    }
}

/// Configuration parameters for route computation.
#[derive(Debug, Clone)]
pub struct RouteConfig {
    /// Cost modulation for rain-aware routing.
    pub penalty: HazardPenalty,

    /// Edges whose hazard exceeds this many millimetres are not traversed in
    /// rain-aware routing. `None` keeps every edge passable.
    pub impassable_above_mm: Option<u32>,

    /// Restrict rain-aware searches to a box around a distance-only
    /// reference path.
    pub crop_rain_search: bool,

    /// Minimum margin, in degrees, added around the reference path extent.
    ///
    /// Each axis already grows by the path's span, or by the other axis's
    /// span when the path is straight along it. This only matters for very
    /// short reference paths.
    pub crop_margin_deg: f64,

    /// Outer limit for crops. `None` uses the base graph's own bounds.
    pub boundary: Option<BoundingBox>,
}

impl RouteConfig {
    pub fn with_penalty(mut self, penalty: HazardPenalty) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn with_impassable_above(mut self, mm: u32) -> Self {
        self.impassable_above_mm = Some(mm);
        self
    }

    pub fn with_crop(mut self, enabled: bool) -> Self {
        self.crop_rain_search = enabled;
        self
    }

    pub fn with_crop_margin(mut self, degrees: f64) -> Self {
        self.crop_margin_deg = degrees;
        self
    }

    pub fn with_boundary(mut self, boundary: BoundingBox) -> Self {
        self.boundary = Some(boundary);
        self
    }

    /// Whether an edge with this hazard may be traversed.
    pub fn is_passable(&self, hazard_mm: u32) -> bool {
        self.impassable_above_mm
            .is_none_or(|limit| hazard_mm <= limit)
    }
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            penalty: HazardPenalty::default(),
            impassable_above_mm: None,
            crop_rain_search: true,
            crop_margin_deg: 0.0,
            boundary: None,
        }
    }
}
