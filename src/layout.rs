//! Pane layout modes.
//!
//! Layout is presentation only: it decides which panes are on screen, not which
//! panes receive updates. Hidden panes keep being pushed visibility changes so they
//! are already correct when a layout change reveals them.

use crate::error::PlotError;
use crate::pane::PaneIndex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SINGLE: [PaneIndex; 1] = [PaneIndex::ALL[0]];
const PAIR: [PaneIndex; 2] = [PaneIndex::ALL[0], PaneIndex::ALL[1]];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LayoutMode {
    /// One full-size pane.
    #[default]
    Single,
    /// Two panes next to each other (`1x2`).
    SideBySide,
    /// Two panes on top of each other (`2x1`).
    Stacked,
    /// All four panes (`2x2`).
    Grid,
}

impl LayoutMode {
    pub fn visible_panes(self) -> &'static [PaneIndex] {
        match self {
            LayoutMode::Single => &SINGLE,
            LayoutMode::SideBySide | LayoutMode::Stacked => &PAIR,
            LayoutMode::Grid => &PaneIndex::ALL,
        }
    }

    pub fn is_visible(self, pane: PaneIndex) -> bool {
        self.visible_panes().contains(&pane)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LayoutMode::Single => "1x1",
            LayoutMode::SideBySide => "1x2",
            LayoutMode::Stacked => "2x1",
            LayoutMode::Grid => "2x2",
        }
    }
}

impl fmt::Display for LayoutMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LayoutMode {
    type Err = PlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1x1" => Ok(LayoutMode::Single),
            "1x2" => Ok(LayoutMode::SideBySide),
            "2x1" => Ok(LayoutMode::Stacked),
            "2x2" => Ok(LayoutMode::Grid),
            other => Err(PlotError::InvalidLayout(other.to_string())),
        }
    }
}

impl TryFrom<String> for LayoutMode {
    type Error = PlotError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<LayoutMode> for String {
    fn from(value: LayoutMode) -> Self {
        value.as_str().to_string()
    }
}
