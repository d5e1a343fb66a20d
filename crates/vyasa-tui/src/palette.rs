use ratatui::style::Color;
use vyasa_core::Theme;

/// Terminal colours derived from a theme preset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub bg: Color,
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
    pub header_bg: Color,
    pub header_text: Color,
    pub user_label: Color,
    pub model_label: Color,
    pub sacred_fg: Color,
    pub sacred_bg: Color,
    pub suggestion: Color,
    pub error: Color,
    pub border: Color,
    pub highlight_fg: Color,
}

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
    Color::Rgb(r, g, b)
}

impl Palette {
    pub fn for_theme(theme: Theme) -> Self {
        let [bg, accent] = theme.colors();
        let (bg, accent) = (rgb(bg), rgb(accent));

        match theme {
            Theme::Surya => Self {
                bg,
                text: Color::Rgb(0x45, 0x2A, 0x0B),
                muted: Color::Rgb(0x9A, 0x7B, 0x4F),
                accent,
                header_bg: Color::Rgb(0xFD, 0xE6, 0x8A),
                header_text: Color::Rgb(0x78, 0x35, 0x0F),
                user_label: Color::Rgb(0xB4, 0x53, 0x09),
                model_label: Color::Rgb(0x92, 0x40, 0x0E),
                sacred_fg: Color::Rgb(0x7C, 0x2D, 0x12),
                sacred_bg: Color::Rgb(0xFE, 0xF3, 0xC7),
                suggestion: Color::Rgb(0xC2, 0x41, 0x0C),
                error: Color::Rgb(0xB9, 0x1C, 0x1C),
                border: Color::Rgb(0xFC, 0xD3, 0x4D),
                highlight_fg: Color::Rgb(0xFF, 0xFF, 0xFF),
            },
            Theme::Chandra => Self {
                bg,
                text: Color::Rgb(0xE2, 0xE8, 0xF0),
                muted: Color::Rgb(0x64, 0x74, 0x8B),
                accent,
                header_bg: Color::Rgb(0x1E, 0x29, 0x3B),
                header_text: Color::Rgb(0xF1, 0xF5, 0xF9),
                user_label: Color::Rgb(0x93, 0xC5, 0xFD),
                model_label: Color::Rgb(0xBF, 0xDB, 0xFE),
                sacred_fg: Color::Rgb(0xDB, 0xEA, 0xFE),
                sacred_bg: Color::Rgb(0x1E, 0x3A, 0x8A),
                suggestion: Color::Rgb(0x7D, 0xD3, 0xFC),
                error: Color::Rgb(0xF8, 0x71, 0x71),
                border: Color::Rgb(0x33, 0x41, 0x55),
                highlight_fg: Color::Rgb(0x0F, 0x17, 0x2A),
            },
            Theme::Vana => Self {
                bg,
                text: Color::Rgb(0x14, 0x53, 0x2D),
                muted: Color::Rgb(0x6B, 0x8F, 0x71),
                accent,
                header_bg: Color::Rgb(0xDC, 0xFC, 0xE7),
                header_text: Color::Rgb(0x16, 0x65, 0x34),
                user_label: Color::Rgb(0x15, 0x80, 0x3D),
                model_label: Color::Rgb(0x16, 0x65, 0x34),
                sacred_fg: Color::Rgb(0x05, 0x2E, 0x16),
                sacred_bg: Color::Rgb(0xBB, 0xF7, 0xD0),
                suggestion: Color::Rgb(0x0F, 0x76, 0x6E),
                error: Color::Rgb(0xB9, 0x1C, 0x1C),
                border: Color::Rgb(0x86, 0xEF, 0xAC),
                highlight_fg: Color::Rgb(0xFF, 0xFF, 0xFF),
            },
            Theme::Akasha => Self {
                bg,
                text: Color::Rgb(0xE0, 0xE7, 0xFF),
                muted: Color::Rgb(0x81, 0x8C, 0xF8),
                accent,
                header_bg: Color::Rgb(0x31, 0x2E, 0x81),
                header_text: Color::Rgb(0xED, 0xE9, 0xFE),
                user_label: Color::Rgb(0xC4, 0xB5, 0xFD),
                model_label: Color::Rgb(0xDD, 0xD6, 0xFE),
                sacred_fg: Color::Rgb(0xF5, 0xF3, 0xFF),
                sacred_bg: Color::Rgb(0x4C, 0x1D, 0x95),
                suggestion: Color::Rgb(0xA5, 0xB4, 0xFC),
                error: Color::Rgb(0xFC, 0xA5, 0xA5),
                border: Color::Rgb(0x43, 0x38, 0xCA),
                highlight_fg: Color::Rgb(0xFF, 0xFF, 0xFF),
            },
        }
    }
}
