//! Pixel thresholds used by hit-testing, tab placement and neighbor gluing.
//!
//! The adjacency tolerance and the title-strip metrics are empirical; they
//! are carried as data so hosts with different chrome can retune them.

use floatpane_core::geometry::MinSize;
use serde::{Deserialize, Serialize};

/// Default height of the container title band.
pub const DEFAULT_TITLE_HEIGHT: f64 = 32.0;

/// Default width of the grab handle at the end of the tab strip.
pub const DEFAULT_TAB_HANDLE_WIDTH: f64 = 24.0;

/// Default horizontal padding inside the title strip.
pub const DEFAULT_TITLE_PADDING: f64 = 4.0;

/// Default distance within which two edges count as touching.
pub const DEFAULT_NEIGHBOR_TOLERANCE: f64 = 5.0;

/// Layout thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutTuning {
    pub title_height: f64,
    pub tab_handle_width: f64,
    pub title_padding: f64,
    pub neighbor_tolerance: f64,
    pub min_size: MinSize,
}

impl Default for LayoutTuning {
    fn default() -> Self {
        Self {
            title_height: DEFAULT_TITLE_HEIGHT,
            tab_handle_width: DEFAULT_TAB_HANDLE_WIDTH,
            title_padding: DEFAULT_TITLE_PADDING,
            neighbor_tolerance: DEFAULT_NEIGHBOR_TOLERANCE,
            min_size: MinSize::default(),
        }
    }
}

impl LayoutTuning {
    /// List every out-of-range value. Empty means valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let checks = [
            ("title_height", self.title_height),
            ("tab_handle_width", self.tab_handle_width),
            ("title_padding", self.title_padding),
            ("neighbor_tolerance", self.neighbor_tolerance),
            ("min_size.width", self.min_size.width),
            ("min_size.height", self.min_size.height),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                errors.push(format!("{name} must be a finite non-negative number, got {value}"));
            }
        }
        if self.title_height == 0.0 {
            errors.push("title_height must be greater than zero".to_string());
        }
        errors
    }
}
