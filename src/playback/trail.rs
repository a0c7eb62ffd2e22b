//! Trail geometry
//!
//! Audible steps append points to a growing path drawn on a fixed 12-spoke
//! layout. Each spoke is one semitone above the tonic, so every degree and
//! chromatic color lands on the same spoke every time. Octave-up degrees sit on
//! the outer ring.

use std::f64::consts::{FRAC_PI_2, TAU};

use serde::{Deserialize, Serialize};

use crate::harmony::Key;
use crate::lexer::Token;

pub const SPOKES: u8 = 12;
pub const INNER_RADIUS: f64 = 0.72;
pub const OUTER_RADIUS: f64 = 1.0;

/// Visual effect a toy draws while playing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailStyle {
    /// Point-by-point path on the spoke layout
    #[default]
    Path,
    /// Spiral driven by the progress fraction only
    Spiral,
    /// Dissolve driven by the progress fraction only
    Dissolve,
}

impl TrailStyle {
    pub fn draws_points(self) -> bool {
        self == TrailStyle::Path
    }
}

/// One vertex of the trail, on the unit circle layout (y grows downwards)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailPoint {
    pub step: usize,
    pub spoke: u8,
    pub outer: bool,
    pub x: f64,
    pub y: f64,
}

/// Spoke index of an audible token
pub fn spoke_for(token: &Token, key: Key) -> Option<u8> {
    match token {
        Token::Degree { value, .. } => Some(key.degree_offset(*value)),
        Token::Chroma { color, .. } => Some(key.chroma_offset(*color)),
        _ => None,
    }
}

/// Angle of a spoke in radians; spoke 0 points straight up
pub fn spoke_angle(spoke: u8) -> f64 {
    -FRAC_PI_2 + TAU * (spoke % SPOKES) as f64 / SPOKES as f64
}

/// Trail vertex for a step, or `None` for silent tokens
pub fn trail_point(step: usize, token: &Token, key: Key) -> Option<TrailPoint> {
    let spoke = spoke_for(token, key)?;
    let outer = matches!(token, Token::Degree { octave_up: true, .. });
    let radius = if outer { OUTER_RADIUS } else { INNER_RADIUS };
    let angle = spoke_angle(spoke);
    Some(TrailPoint {
        step,
        spoke,
        outer,
        x: radius * angle.cos(),
        y: radius * angle.sin(),
    })
}
