use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::render::document::CodeTags;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub thread_view: ThreadViewConfig,
    pub theme: ThemeConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThreadViewConfig {
    /// Seconds a message must stay focused before it is marked read (0 = immediately)
    pub mark_unread_delay: f64,
    /// Open non-preferred inline parts with the external program instead of showing them
    pub open_html_part_external: bool,
    /// Program used for http, https and ftp links
    pub open_external_link: String,
    /// Indent replies by their depth in the thread
    pub indent_messages: bool,
    /// Expand flagged messages when the thread is opened
    pub expand_flagged: bool,
    /// Where saved attachments and messages go
    pub save_dir: String,
    pub code_prettify: CodePrettifyConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CodePrettifyConfig {
    pub enable: bool,
    /// Delimiter that opens and closes a code block in plain text
    pub code_tag: String,
    pub start_tag: String,
    pub stop_tag: String,
}

/// Semantic theme configuration using Capstan Cloud colors as defaults
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    // Base colors
    pub bg: String,
    pub bg_panel: String,
    pub fg: String,
    pub fg_muted: String,
    pub fg_subtle: String,

    // Border colors
    pub border: String,
    pub border_active: String,

    // Accent colors
    pub primary: String,
    pub secondary: String,

    // Semantic colors
    pub success: String,
    pub warning: String,
    pub error: String,

    // UI-specific mappings
    pub selected_bg: String,
    pub unread: String,
    pub marked: String,
    pub search_match: String,
    pub attachment: String,
}

impl Default for ThreadViewConfig {
    fn default() -> Self {
        Self {
            mark_unread_delay: 0.5,
            open_html_part_external: false,
            open_external_link: "xdg-open".to_string(),
            indent_messages: true,
            expand_flagged: true,
            save_dir: "~/Downloads".to_string(),
            code_prettify: CodePrettifyConfig::default(),
        }
    }
}

impl Default for CodePrettifyConfig {
    fn default() -> Self {
        Self {
            enable: true,
            code_tag: "```".to_string(),
            start_tag: "<pre class=\"code\">".to_string(),
            stop_tag: "</pre>".to_string(),
        }
    }
}

/// Capstan Cloud theme - warm earth tones with gold accents
impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            // Base colors
            bg: "#1a1917".to_string(),
            bg_panel: "#262422".to_string(),
            fg: "#f7f7f5".to_string(),
            fg_muted: "#8c8985".to_string(),
            fg_subtle: "#b8b5b0".to_string(),

            // Border colors
            border: "#524f4c".to_string(),
            border_active: "#d4a366".to_string(), // primary

            // Accent colors
            primary: "#d4a366".to_string(),
            secondary: "#8fa5ae".to_string(), // blue

            // Semantic colors
            success: "#52c41a".to_string(),
            warning: "#faad14".to_string(),
            error: "#ff4d4f".to_string(),

            // UI-specific mappings
            selected_bg: "#393634".to_string(),
            unread: "#d4a366".to_string(),       // primary (gold)
            marked: "#faad14".to_string(),       // warning
            search_match: "#f8ce9b".to_string(), // primary light
            attachment: "#b48ead".to_string(),   // magenta
        }
    }
}

impl Config {
    pub fn path() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("threadview/config.toml"))
            .unwrap_or_else(|| PathBuf::from("~/.config/threadview/config.toml"))
    }

    /// Load the user config, falling back to defaults when absent or unreadable.
    pub fn load() -> Self {
        let config_path = Self::path();

        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => log::warn!("config: {:#}", e),
            }
        }

        Self::default()
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Settings that make the view unusable are rejected here.
    pub fn validate(&self) -> Result<()> {
        self.thread_view.code_tags()?;
        let delay = self.thread_view.mark_unread_delay;
        if !delay.is_finite() || delay < 0.0 {
            anyhow::bail!(
                "thread_view.mark_unread_delay must be a finite, non-negative number of seconds (got {})",
                self.thread_view.mark_unread_delay
            );
        }
        Ok(())
    }
}

impl ThreadViewConfig {
    pub fn save_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.save_dir).into_owned())
    }

    /// `None` when code prettifying is off.
    pub fn code_tags(&self) -> Result<Option<CodeTags>> {
        let cp = &self.code_prettify;
        if !cp.enable {
            return Ok(None);
        }
        CodeTags::new(&cp.code_tag, &cp.start_tag, &cp.stop_tag)
            .map(Some)
            .context("thread_view.code_prettify")
    }
}

impl ThemeConfig {
    pub fn bg(&self) -> ratatui::style::Color {
        parse_color(&self.bg)
    }
    pub fn bg_panel(&self) -> ratatui::style::Color {
        parse_color(&self.bg_panel)
    }
    pub fn fg(&self) -> ratatui::style::Color {
        parse_color(&self.fg)
    }
    pub fn fg_muted(&self) -> ratatui::style::Color {
        parse_color(&self.fg_muted)
    }
    pub fn fg_subtle(&self) -> ratatui::style::Color {
        parse_color(&self.fg_subtle)
    }
    pub fn border(&self) -> ratatui::style::Color {
        parse_color(&self.border)
    }
    pub fn border_active(&self) -> ratatui::style::Color {
        parse_color(&self.border_active)
    }
    pub fn primary(&self) -> ratatui::style::Color {
        parse_color(&self.primary)
    }
    pub fn secondary(&self) -> ratatui::style::Color {
        parse_color(&self.secondary)
    }
    pub fn success(&self) -> ratatui::style::Color {
        parse_color(&self.success)
    }
    pub fn warning(&self) -> ratatui::style::Color {
        parse_color(&self.warning)
    }
    pub fn error(&self) -> ratatui::style::Color {
        parse_color(&self.error)
    }
    pub fn selected_bg(&self) -> ratatui::style::Color {
        parse_color(&self.selected_bg)
    }
    pub fn unread(&self) -> ratatui::style::Color {
        parse_color(&self.unread)
    }
    pub fn marked(&self) -> ratatui::style::Color {
        parse_color(&self.marked)
    }
    pub fn search_match(&self) -> ratatui::style::Color {
        parse_color(&self.search_match)
    }
    pub fn attachment(&self) -> ratatui::style::Color {
        parse_color(&self.attachment)
    }
}

/// Parse color string to ratatui Color
pub fn parse_color(s: &str) -> ratatui::style::Color {
    use ratatui::style::Color;

    // Try hex first (#RRGGBB)
    if s.starts_with('#') && s.len() == 7 {
        if let (Ok(r), Ok(g), Ok(b)) = (
            u8::from_str_radix(&s[1..3], 16),
            u8::from_str_radix(&s[3..5], 16),
            u8::from_str_radix(&s[5..7], 16),
        ) {
            return Color::Rgb(r, g, b);
        }
    }

    // Named colors
    match s.to_lowercase().as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "gray" | "grey" => Color::Gray,
        "darkgray" | "darkgrey" => Color::DarkGray,
        "white" => Color::White,
        _ => Color::White,
    }
}
