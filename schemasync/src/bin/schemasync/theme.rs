use colored::Color;
use once_cell::sync::Lazy;
use schemasync::ChangeType;

/// Terminal palette for messages and change previews
pub struct ColorTheme {
    pub success: Color,
    pub error: Color,
    pub warning: Color,
    pub info: Color,
    pub highlight: Color,
    pub muted: Color,
    pub heading: Color,
    pub accent: Color,
    pub key: Color,
    pub value: Color,
    pub added: Color,
    pub removed: Color,
    pub modified: Color,
}

impl ColorTheme {
    /// Color of a record or property change line
    pub fn change(&self, kind: ChangeType) -> Color {
        match kind {
            ChangeType::Added => self.added,
            ChangeType::Removed => self.removed,
            ChangeType::Modified => self.modified,
        }
    }
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self {
            success: Color::Green,
            error: Color::Red,
            warning: Color::Yellow,
            info: Color::Blue,
            highlight: Color::Cyan,
            muted: Color::BrightBlack,
            heading: Color::BrightBlue,
            accent: Color::Magenta,
            key: Color::BrightCyan,
            value: Color::White,
            added: Color::Green,
            removed: Color::Red,
            modified: Color::Yellow,
        }
    }
}

pub static THEME: Lazy<ColorTheme> = Lazy::new(ColorTheme::default);

/// Message prefixes. Change lines use the `ChangeType` symbols instead.
pub struct Icons {
    pub success: &'static str,
    pub error: &'static str,
    pub warning: &'static str,
    pub info: &'static str,
    pub arrow: &'static str,
    pub loading: &'static str,
    pub file: &'static str,
}

pub const ICONS: Icons = Icons {
    success: "✓",
    error: "✗",
    warning: "⚠",
    info: "ℹ",
    arrow: "→",
    loading: "⟳",
    file: "📄",
};
