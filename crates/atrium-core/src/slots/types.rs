use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::slots::error::SlotError;

/// The extension points of the dashboard.
///
/// This set is closed: adding a slot requires a host release, addons cannot
/// define their own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SlotType {
    EntityTree,
    ContextPanel,
    BottomPanel,
    MapLayer,
    LayerToggle,
}

impl SlotType {
    pub const ALL: [SlotType; 5] = [
        SlotType::EntityTree,
        SlotType::ContextPanel,
        SlotType::BottomPanel,
        SlotType::MapLayer,
        SlotType::LayerToggle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotType::EntityTree => "entity-tree",
            SlotType::ContextPanel => "context-panel",
            SlotType::BottomPanel => "bottom-panel",
            SlotType::MapLayer => "map-layer",
            SlotType::LayerToggle => "layer-toggle",
        }
    }
}

impl fmt::Display for SlotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotType {
    type Err = SlotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SlotType::ALL
            .iter()
            .copied()
            .find(|slot| slot.as_str() == s)
            .ok_or_else(|| SlotError::UnknownSlot {
                name: s.to_string(),
                known: SlotType::ALL
                    .iter()
                    .map(SlotType::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}
