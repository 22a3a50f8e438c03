use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lowest score classified as HOT.
pub const HOT_MIN: f64 = 76.0;
/// Lowest score classified as WARM.
pub const WARM_MIN: f64 = 51.0;
/// Lowest score classified as COLD.
pub const COLD_MIN: f64 = 26.0;

/// Lead temperature band.
///
/// | Band | Range    |
/// |------|----------|
/// | HOT  | 76 - 100 |
/// | WARM | 51 - 75  |
/// | COLD | 26 - 50  |
/// | ICE  | 0 - 25   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Band {
    Hot,
    Warm,
    Cold,
    Ice,
}

impl Band {
    /// All bands, hottest first.
    pub const ALL: [Band; 4] = [Band::Hot, Band::Warm, Band::Cold, Band::Ice];

    /// Inclusive score range of the band.
    pub fn range(self) -> (u8, u8) {
        match self {
            Band::Hot => (76, 100),
            Band::Warm => (51, 75),
            Band::Cold => (26, 50),
            Band::Ice => (0, 25),
        }
    }

    /// Display label.
    pub fn label(self) -> &'static str {
        match self {
            Band::Hot => "Quente",
            Band::Warm => "Morno",
            Band::Cold => "Frio",
            Band::Ice => "Gelado",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Band::Hot => "🔥",
            Band::Warm => "☀️",
            Band::Cold => "❄️",
            Band::Ice => "🧊",
        }
    }

    /// Badge style tokens for the presentation layer.
    pub fn badge_style(self) -> &'static str {
        match self {
            Band::Hot => "bg-red-500/20 text-red-400 border-red-500/30",
            Band::Warm => "bg-orange-500/20 text-orange-400 border-orange-500/30",
            Band::Cold => "bg-blue-500/20 text-blue-400 border-blue-500/30",
            Band::Ice => "bg-slate-500/20 text-slate-400 border-slate-500/30",
        }
    }

    /// Hex color used for charts.
    pub fn color(self) -> &'static str {
        match self {
            Band::Hot => "#ef4444",
            Band::Warm => "#f97316",
            Band::Cold => "#3b82f6",
            Band::Ice => "#64748b",
        }
    }

    /// Row highlight, only HOT has one.
    pub fn row_highlight(self) -> Option<&'static str> {
        match self {
            Band::Hot => Some("bg-red-500/5"),
            _ => None,
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Band::Hot => "HOT",
            Band::Warm => "WARM",
            Band::Cold => "COLD",
            Band::Ice => "ICE",
        };
        f.write_str(name)
    }
}

impl FromStr for Band {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hot" | "quente" => Ok(Band::Hot),
            "warm" | "morno" => Ok(Band::Warm),
            "cold" | "frio" => Ok(Band::Cold),
            "ice" | "gelado" => Ok(Band::Ice),
            other => Err(format!("unknown band '{}'", other)),
        }
    }
}

/// Band plus display metadata for one score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub band: Band,
    pub label: &'static str,
    pub icon: &'static str,
    pub badge_style: &'static str,
    pub row_highlight: Option<&'static str>,
}

/// Clamps a score into `[0, 100]`. NaN becomes 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

/// Band of a score after clamping.
pub fn band_for(score: f64) -> Band {
    let score = clamp_score(score);
    if score >= HOT_MIN {
        Band::Hot
    } else if score >= WARM_MIN {
        Band::Warm
    } else if score >= COLD_MIN {
        Band::Cold
    } else {
        Band::Ice
    }
}

/// Classifies a score into its band with display metadata.
pub fn classify(score: f64) -> Classification {
    let band = band_for(score);
    Classification {
        band,
        label: band.label(),
        icon: band.icon(),
        badge_style: band.badge_style(),
        row_highlight: band.row_highlight(),
    }
}
