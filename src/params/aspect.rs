use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest distance between a pixel ratio and a named ratio that still counts as a match.
pub const RATIO_TOLERANCE: f64 = 0.1;

/// Named aspect ratios understood by the upstream queue API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[serde(rename = "21:9")]
    Ultrawide,
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "4:3")]
    Standard,
    #[serde(rename = "3:2")]
    Photo,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "2:3")]
    PhotoPortrait,
    #[serde(rename = "3:4")]
    StandardPortrait,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "9:21")]
    UltrawidePortrait,
}

/// Ratios considered when the dimensions match no preset.
const CANDIDATES: [AspectRatio; 8] = [
    AspectRatio::Ultrawide,
    AspectRatio::Landscape,
    AspectRatio::Standard,
    AspectRatio::Photo,
    AspectRatio::PhotoPortrait,
    AspectRatio::StandardPortrait,
    AspectRatio::Portrait,
    AspectRatio::UltrawidePortrait,
];

impl AspectRatio {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ultrawide => "21:9",
            Self::Landscape => "16:9",
            Self::Standard => "4:3",
            Self::Photo => "3:2",
            Self::Square => "1:1",
            Self::PhotoPortrait => "2:3",
            Self::StandardPortrait => "3:4",
            Self::Portrait => "9:16",
            Self::UltrawidePortrait => "9:21",
        }
    }

    pub fn value(self) -> f64 {
        match self {
            Self::Ultrawide => 21.0 / 9.0,
            Self::Landscape => 16.0 / 9.0,
            Self::Standard => 4.0 / 3.0,
            Self::Photo => 3.0 / 2.0,
            Self::Square => 1.0,
            Self::PhotoPortrait => 2.0 / 3.0,
            Self::StandardPortrait => 3.0 / 4.0,
            Self::Portrait => 9.0 / 16.0,
            Self::UltrawidePortrait => 9.0 / 21.0,
        }
    }

    /// Maps pixel dimensions to a named ratio: presets first, then the nearest
    /// candidate within [`RATIO_TOLERANCE`], otherwise square.
    pub fn from_dimensions(width: u32, height: u32) -> Self {
        match (width, height) {
            (w, h) if w == h => return Self::Square,
            (1344, 768) => return Self::Landscape,
            (768, 1344) => return Self::Portrait,
            (0, _) | (_, 0) => return Self::Square,
            _ => {}
        }

        let ratio = f64::from(width) / f64::from(height);
        CANDIDATES
            .iter()
            .map(|candidate| (*candidate, (ratio - candidate.value()).abs()))
            .filter(|(_, distance)| *distance < RATIO_TOLERANCE)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(candidate, _)| candidate)
            .unwrap_or(Self::Square)
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1024, 1024, "1:1")]
    #[case(1344, 768, "16:9")]
    #[case(768, 1344, "9:16")]
    #[case(500, 500, "1:1")]
    #[case(2000, 857, "21:9")]
    #[case(1920, 1080, "16:9")]
    #[case(1024, 768, "4:3")]
    #[case(1200, 800, "3:2")]
    #[case(800, 1200, "2:3")]
    #[case(768, 1024, "3:4")]
    #[case(857, 2000, "9:21")]
    #[case(1000, 700, "3:2")]
    #[case(4000, 1000, "1:1")]
    #[case(0, 768, "1:1")]
    fn test_from_dimensions(#[case] width: u32, #[case] height: u32, #[case] expected: &str) {
        assert_eq!(AspectRatio::from_dimensions(width, height).as_str(), expected);
    }

    #[test]
    fn test_nearest_candidate_wins_when_two_are_in_range() {
        // 1.42 is 0.087 from 4:3 and 0.08 from 3:2.
        assert_eq!(AspectRatio::from_dimensions(1420, 1000), AspectRatio::Photo);
    }

    #[test]
    fn test_serializes_as_upstream_label() {
        let json = serde_json::to_string(&AspectRatio::UltrawidePortrait).unwrap();
        assert_eq!(json, "\"9:21\"");
    }
}
