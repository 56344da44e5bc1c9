//! Crop profiles and growth-stage classification.
//!
//! A [`CropProfile`] is an ordered set of named ratio bands that
//! partition `[0, 1)` for one crop type: each growth stage owns a
//! half-open interval `[low, high)` of plant coverage ratios. The
//! classifier scans the bands in order and returns the first match.
//!
//! The table is process-wide read-only configuration: profiles are
//! `'static` data, never mutated, and safe to read from any number of
//! concurrent pipeline invocations.
//!
//! # Top boundary
//!
//! Bands are half-open, so a coverage ratio of exactly 1.0 would fall
//! outside every band. The upper bound of the *final* band is therefore
//! treated as inclusive, uniformly for every crop: a ratio at or above
//! the final band's upper edge classifies as that final stage using its
//! nominal band. This rule lives in one place ([`CropProfile::classify`])
//! rather than as a literal special case per crop.

use serde::{Deserialize, Serialize};

/// A plant growth stage.
///
/// `Unknown` is never part of a profile's band table; it is the
/// classifier's answer when the crop is not in the table or no band
/// matches the ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Seedling,
    Vegetative,
    Flowering,
    Fruiting,
    Maturity,
    Unknown,
}

impl Stage {
    /// The stage label as used in serialized results.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Seedling => "Seedling",
            Self::Vegetative => "Vegetative",
            Self::Flowering => "Flowering",
            Self::Fruiting => "Fruiting",
            Self::Maturity => "Maturity",
            Self::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A half-open coverage-ratio interval `[low, high)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    /// Inclusive lower bound.
    pub low: f64,
    /// Exclusive upper bound (inclusive for the final band of a profile,
    /// see the module docs).
    pub high: f64,
}

impl Band {
    /// Degenerate zero-width band, reported for unknown crops.
    pub const EMPTY: Self = Self::new(0.0, 0.0);

    /// Create a new band.
    #[must_use]
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Half-open containment test: `low <= ratio < high`.
    #[must_use]
    pub fn contains(self, ratio: f64) -> bool {
        self.low <= ratio && ratio < self.high
    }

    /// Center of the band.
    #[must_use]
    pub fn midpoint(self) -> f64 {
        (self.low + self.high) / 2.0
    }

    /// Half the band's width; zero for degenerate bands.
    #[must_use]
    pub fn half_width(self) -> f64 {
        (self.high - self.low) / 2.0
    }
}

/// Ordered stage bands for one crop type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropProfile {
    /// Crop name as declared by the caller (exact match, case-sensitive).
    pub crop: &'static str,
    /// Stage bands in ascending ratio order, partitioning `[0, 1)`.
    pub stages: &'static [(Stage, Band)],
}

/// Built-in crop threshold table.
///
/// Coverage bands per crop, tuned against field photos at the canonical
/// 512x512 resolution. This is the single source of truth for stage
/// boundaries; it is not request-supplied.
pub static BUILTIN_PROFILES: &[CropProfile] = &[
    CropProfile {
        crop: "Tomato",
        stages: &[
            (Stage::Seedling, Band::new(0.00, 0.18)),
            (Stage::Vegetative, Band::new(0.18, 0.45)),
            (Stage::Flowering, Band::new(0.45, 0.60)),
            (Stage::Fruiting, Band::new(0.60, 0.75)),
            (Stage::Maturity, Band::new(0.75, 1.00)),
        ],
    },
    CropProfile {
        crop: "Wheat",
        stages: &[
            (Stage::Seedling, Band::new(0.00, 0.12)),
            (Stage::Vegetative, Band::new(0.12, 0.35)),
            (Stage::Flowering, Band::new(0.35, 0.50)),
            (Stage::Fruiting, Band::new(0.50, 0.65)),
            (Stage::Maturity, Band::new(0.65, 1.00)),
        ],
    },
    CropProfile {
        crop: "Rice",
        stages: &[
            (Stage::Seedling, Band::new(0.00, 0.20)),
            (Stage::Vegetative, Band::new(0.20, 0.55)),
            (Stage::Flowering, Band::new(0.55, 0.70)),
            (Stage::Fruiting, Band::new(0.70, 0.85)),
            (Stage::Maturity, Band::new(0.85, 1.00)),
        ],
    },
];

/// Look up the built-in profile for a crop name.
#[must_use]
pub fn find_profile(crop: &str) -> Option<&'static CropProfile> {
    BUILTIN_PROFILES.iter().find(|p| p.crop == crop)
}

/// Outcome of stage classification: the stage label plus the band it
/// was matched against (degenerate for the Unknown cases).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageMatch {
    /// Matched growth stage, or [`Stage::Unknown`].
    pub stage: Stage,
    /// Band the ratio was matched against. `[0, 0)` for an unknown
    /// crop, `[0, 1)` for an unmatched ratio.
    pub band: Band,
}

/// Classify a coverage ratio for a named crop.
///
/// An unknown crop name yields [`Stage::Unknown`] with the degenerate
/// band `[0, 0)`; it is not an error, and the caller's coverage ratio
/// remains valid.
#[must_use]
pub fn classify(ratio: f64, crop: &str) -> StageMatch {
    find_profile(crop).map_or(
        StageMatch {
            stage: Stage::Unknown,
            band: Band::EMPTY,
        },
        |profile| profile.classify(ratio),
    )
}

impl CropProfile {
    /// Classify a coverage ratio against this profile's bands.
    ///
    /// Scans the ordered bands and returns the first half-open match.
    /// A ratio at or above the final band's upper edge (i.e. exactly
    /// 1.0 for a well-formed profile) classifies as the final stage
    /// with its nominal band. Anything else — only reachable with a
    /// malformed profile or a ratio outside `[0, 1]` — is `Unknown`
    /// with band `[0, 1)`.
    #[must_use]
    pub fn classify(&self, ratio: f64) -> StageMatch {
        for &(stage, band) in self.stages {
            if band.contains(ratio) {
                return StageMatch { stage, band };
            }
        }

        // Closed upper bound on the final band.
        if let Some(&(stage, band)) = self.stages.last() {
            if ratio >= band.high {
                return StageMatch { stage, band };
            }
        }

        StageMatch {
            stage: Stage::Unknown,
            band: Band::new(0.0, 1.0),
        }
    }

    /// Check that the bands form an ascending, gapless, non-overlapping
    /// partition of `[0, 1)` and name only real growth stages.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let Some(&(_, first)) = self.stages.first() else {
            return false;
        };
        let Some(&(_, last)) = self.stages.last() else {
            return false;
        };
        if first.low != 0.0 || last.high != 1.0 {
            return false;
        }

        let mut expected_low = 0.0;
        for &(stage, band) in self.stages {
            if stage == Stage::Unknown {
                return false;
            }
            if band.low != expected_low || band.low >= band.high {
                return false;
            }
            expected_low = band.high;
        }
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn builtin_profiles_are_well_formed() {
        for profile in BUILTIN_PROFILES {
            assert!(
                profile.is_well_formed(),
                "profile for {} is not a partition of [0, 1)",
                profile.crop,
            );
        }
    }

    #[test]
    fn every_ratio_matches_exactly_one_band() {
        // Sweep [0, 1) on a fine grid; exactly one band must contain
        // each ratio for every built-in profile.
        for profile in BUILTIN_PROFILES {
            for i in 0..1000 {
                let ratio = f64::from(i) / 1000.0;
                let matches = profile
                    .stages
                    .iter()
                    .filter(|(_, band)| band.contains(ratio))
                    .count();
                assert_eq!(
                    matches, 1,
                    "{}: ratio {ratio} matched {matches} bands",
                    profile.crop,
                );
            }
        }
    }

    #[test]
    fn tomato_midband_ratio_is_flowering() {
        let matched = classify(0.50, "Tomato");
        assert_eq!(matched.stage, Stage::Flowering);
        assert_eq!(matched.band, Band::new(0.45, 0.60));
    }

    #[test]
    fn zero_ratio_is_seedling_for_all_builtin_crops() {
        for profile in BUILTIN_PROFILES {
            let matched = profile.classify(0.0);
            assert_eq!(
                matched.stage,
                Stage::Seedling,
                "{}: expected Seedling at ratio 0.0",
                profile.crop,
            );
        }
    }

    #[test]
    fn full_coverage_is_maturity_not_unknown() {
        // 1.0 lies outside every half-open band; the closed-top rule
        // must fold it into the final stage.
        for profile in BUILTIN_PROFILES {
            let matched = profile.classify(1.0);
            assert_eq!(
                matched.stage,
                Stage::Maturity,
                "{}: expected Maturity at ratio 1.0",
                profile.crop,
            );
            assert_eq!(matched.band.high, 1.0);
        }
    }

    #[test]
    fn band_lower_edge_belongs_to_upper_stage() {
        // Half-open bands: 0.85 is the low edge of Rice Maturity, not
        // the top of Fruiting.
        let matched = classify(0.85, "Rice");
        assert_eq!(matched.stage, Stage::Maturity);
    }

    #[test]
    fn unknown_crop_yields_empty_band() {
        let matched = classify(0.5, "Onion");
        assert_eq!(matched.stage, Stage::Unknown);
        assert_eq!(matched.band, Band::EMPTY);
    }

    #[test]
    fn crop_lookup_is_case_sensitive() {
        assert!(find_profile("Tomato").is_some());
        assert!(find_profile("tomato").is_none());
    }

    #[test]
    fn band_midpoint_and_half_width() {
        let band = Band::new(0.45, 0.60);
        assert!((band.midpoint() - 0.525).abs() < 1e-12);
        assert!((band.half_width() - 0.075).abs() < 1e-12);
    }

    #[test]
    fn band_contains_is_half_open() {
        let band = Band::new(0.2, 0.4);
        assert!(band.contains(0.2));
        assert!(band.contains(0.399_999));
        assert!(!band.contains(0.4));
        assert!(!band.contains(0.199_999));
    }

    #[test]
    fn malformed_profiles_are_rejected() {
        const GAP_STAGES: &[(Stage, Band)] = &[
            (Stage::Seedling, Band::new(0.0, 0.4)),
            (Stage::Maturity, Band::new(0.5, 1.0)),
        ];
        let gap = CropProfile {
            crop: "Gap",
            stages: GAP_STAGES,
        };
        assert!(!gap.is_well_formed());

        const OVERLAP_STAGES: &[(Stage, Band)] = &[
            (Stage::Seedling, Band::new(0.0, 0.6)),
            (Stage::Maturity, Band::new(0.5, 1.0)),
        ];
        let overlap = CropProfile {
            crop: "Overlap",
            stages: OVERLAP_STAGES,
        };
        assert!(!overlap.is_well_formed());

        const SHORT_STAGES: &[(Stage, Band)] = &[(Stage::Seedling, Band::new(0.0, 0.9))];
        let short = CropProfile {
            crop: "Short",
            stages: SHORT_STAGES,
        };
        assert!(!short.is_well_formed());

        let empty = CropProfile {
            crop: "Empty",
            stages: &[],
        };
        assert!(!empty.is_well_formed());
    }

    #[test]
    fn stage_labels_round_trip_display() {
        assert_eq!(Stage::Seedling.to_string(), "Seedling");
        assert_eq!(Stage::Unknown.to_string(), "Unknown");
    }

    #[test]
    fn stage_serializes_as_plain_string() {
        let json = serde_json::to_string(&Stage::Flowering).unwrap();
        assert_eq!(json, "\"Flowering\"");
    }
}
