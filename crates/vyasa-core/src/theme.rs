/// Colour presets offered by the theme picker. Selection lives in memory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Surya,
    Chandra,
    Vana,
    Akasha,
}

impl Theme {
    pub fn id(&self) -> &'static str {
        match self {
            Theme::Surya => "surya",
            Theme::Chandra => "chandra",
            Theme::Vana => "vana",
            Theme::Akasha => "akasha",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "surya" => Some(Theme::Surya),
            "chandra" => Some(Theme::Chandra),
            "vana" => Some(Theme::Vana),
            "akasha" => Some(Theme::Akasha),
            _ => None,
        }
    }

    pub fn all() -> Vec<Theme> {
        vec![Theme::Surya, Theme::Chandra, Theme::Vana, Theme::Akasha]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Theme::Surya => "Surya (Sunrise)",
            Theme::Chandra => "Chandra (Moonlight)",
            Theme::Vana => "Vana (Forest)",
            Theme::Akasha => "Akasha (Ether)",
        }
    }

    /// Background and accent swatch, as RGB
    pub fn colors(&self) -> [(u8, u8, u8); 2] {
        match self {
            Theme::Surya => [(0xFF, 0xF8, 0xE1), (0xF5, 0x9E, 0x0B)],
            Theme::Chandra => [(0x0F, 0x17, 0x2A), (0x60, 0xA5, 0xFA)],
            Theme::Vana => [(0xF0, 0xFD, 0xF4), (0x22, 0xC5, 0x5E)],
            Theme::Akasha => [(0x1E, 0x1B, 0x4B), (0x8B, 0x5C, 0xF6)],
        }
    }
}
