//! Picture modes the CLI can select.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of picture modes.
///
/// The surface value (what the user types and what the device API expects)
/// differs from the internal name shown in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum PictureMode {
    /// `FILMMAKER_MODE`
    #[serde(rename = "filmMaker")]
    #[value(name = "filmMaker")]
    FilmMaker,
    /// `GAME_OPTIMIZER`
    #[serde(rename = "game")]
    #[value(name = "game")]
    GameOptimizer,
}

impl PictureMode {
    /// Value passed to the device.
    pub fn surface_value(&self) -> &'static str {
        match self {
            PictureMode::FilmMaker => "filmMaker",
            PictureMode::GameOptimizer => "game",
        }
    }

    /// Internal name of the mode.
    pub fn name(&self) -> &'static str {
        match self {
            PictureMode::FilmMaker => "FILMMAKER_MODE",
            PictureMode::GameOptimizer => "GAME_OPTIMIZER",
        }
    }
}

impl fmt::Display for PictureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.surface_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::ValueEnum;

    #[test]
    fn test_surface_values_and_names() {
        assert_eq!(PictureMode::FilmMaker.surface_value(), "filmMaker");
        assert_eq!(PictureMode::FilmMaker.name(), "FILMMAKER_MODE");
        assert_eq!(PictureMode::GameOptimizer.surface_value(), "game");
        assert_eq!(PictureMode::GameOptimizer.name(), "GAME_OPTIMIZER");
    }

    #[test]
    fn test_clap_accepts_surface_values() {
        assert_eq!(
            <PictureMode as ValueEnum>::from_str("filmMaker", false),
            Ok(PictureMode::FilmMaker)
        );
        assert_eq!(
            <PictureMode as ValueEnum>::from_str("game", false),
            Ok(PictureMode::GameOptimizer)
        );
        assert!(<PictureMode as ValueEnum>::from_str("cinema", false).is_err());
        assert!(<PictureMode as ValueEnum>::from_str("filmmaker", false).is_err());
        assert!(<PictureMode as ValueEnum>::from_str("GAME_OPTIMIZER", false).is_err());
    }

    #[test]
    fn test_serde_uses_surface_values() {
        let json = serde_json::to_string(&PictureMode::GameOptimizer).unwrap();
        assert_eq!(json, "\"game\"");
        let parsed: PictureMode = serde_json::from_str("\"filmMaker\"").unwrap();
        assert_eq!(parsed, PictureMode::FilmMaker);
    }
}
