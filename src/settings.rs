use image::Rgba;
use std::path::{Path, PathBuf};

const SETTINGS_FILE: &str = "pixelforge_settings.cfg";

/// Engine settings that persist across sessions
#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    /// Size of a new untitled document
    pub default_width: u32,
    pub default_height: u32,
    /// Maximum number of undo steps
    pub max_undo_steps: usize,
    /// History memory cap in megabytes (0 = unlimited)
    pub max_history_memory_mb: usize,
    /// Drawing colour of a new document
    pub default_color: Rgba<u8>,
    /// `tracing` filter directive for the session log (e.g. "info", "pixelforge=debug")
    pub log_level: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_width: 256,
            default_height: 256,
            max_undo_steps: 50,
            max_history_memory_mb: 256,
            default_color: Rgba([255, 255, 255, 255]),
            log_level: "info".to_string(),
        }
    }
}

impl EngineSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/pixelforge/pixelforge_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\PixelForge\pixelforge_settings.cfg
    /// On macOS:   ~/Library/Application Support/PixelForge/pixelforge_settings.cfg
    /// Fallback:   same directory as the executable.
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("pixelforge");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join(SETTINGS_FILE));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .unwrap_or_default();
            let config_dir = PathBuf::from(appdata).join("PixelForge");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join(SETTINGS_FILE));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            let config_dir = PathBuf::from(home)
                .join("Library")
                .join("Application Support")
                .join("PixelForge");
            let _ = std::fs::create_dir_all(&config_dir);
            return Some(config_dir.join(SETTINGS_FILE));
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join(SETTINGS_FILE)))
        }
    }

    /// History memory cap in bytes, `None` when unlimited.
    pub fn history_memory_limit(&self) -> Option<usize> {
        (self.max_history_memory_mb > 0).then(|| self.max_history_memory_mb * 1024 * 1024)
    }

    /// Serialize an Rgba as "r,g,b,a"
    fn color_to_str(c: Rgba<u8>) -> String {
        let [r, g, b, a] = c.0;
        format!("{},{},{},{}", r, g, b, a)
    }

    /// Parse an Rgba from "r,g,b,a"
    fn str_to_color(s: &str) -> Option<Rgba<u8>> {
        let parts: Vec<&str> = s.split(',').collect();
        if parts.len() == 4 {
            let r = parts[0].trim().parse::<u8>().ok()?;
            let g = parts[1].trim().parse::<u8>().ok()?;
            let b = parts[2].trim().parse::<u8>().ok()?;
            let a = parts[3].trim().parse::<u8>().ok()?;
            Some(Rgba([r, g, b, a]))
        } else {
            None
        }
    }

    pub fn to_config_string(&self) -> String {
        format!(
            "default_width={}\n\
             default_height={}\n\
             max_undo_steps={}\n\
             max_history_memory_mb={}\n\
             default_color={}\n\
             log_level={}\n",
            self.default_width,
            self.default_height,
            self.max_undo_steps,
            self.max_history_memory_mb,
            Self::color_to_str(self.default_color),
            self.log_level,
        )
    }

    /// Parse `key=value` lines.  Unknown keys are skipped and malformed
    /// values keep their defaults.
    pub fn parse(content: &str) -> Self {
        let defaults = Self::default();
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "default_width" => {
                    s.default_width = val.parse().ok().filter(|&w| w > 0).unwrap_or(defaults.default_width);
                }
                "default_height" => {
                    s.default_height = val.parse().ok().filter(|&h| h > 0).unwrap_or(defaults.default_height);
                }
                "max_undo_steps" => {
                    s.max_undo_steps = val.parse().ok().filter(|&n| n > 0).unwrap_or(defaults.max_undo_steps);
                }
                "max_history_memory_mb" => {
                    s.max_history_memory_mb = val.parse().unwrap_or(defaults.max_history_memory_mb);
                }
                "default_color" => {
                    if let Some(c) = Self::str_to_color(val) {
                        s.default_color = c;
                    }
                }
                "log_level" => {
                    if !val.is_empty() {
                        s.log_level = val.to_string();
                    }
                }
                _ => {
                    tracing::debug!("Ignoring unknown setting '{}'", key);
                }
            }
        }
        s
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.to_config_string())
    }

    /// Load settings from disk (returns default if file missing or corrupt)
    pub fn load() -> Self {
        let Some(path) = Self::settings_path() else { return Self::default() };
        Self::load_from(&path)
    }

    /// Save settings to disk
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Err(e) = self.save_to(&path) {
            tracing::warn!("Could not write settings to {}: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = EngineSettings::default();
        assert_eq!((s.default_width, s.default_height), (256, 256));
        assert_eq!(s.max_undo_steps, 50);
        assert_eq!(s.history_memory_limit(), Some(256 * 1024 * 1024));
        assert_eq!(s.default_color, Rgba([255, 255, 255, 255]));
        assert_eq!(s.log_level, "info");
    }

    #[test]
    fn test_config_string_roundtrip() {
        let s = EngineSettings {
            default_width: 64,
            default_height: 32,
            max_undo_steps: 12,
            max_history_memory_mb: 0,
            default_color: Rgba([10, 20, 30, 40]),
            log_level: "pixelforge=debug".to_string(),
        };
        let parsed = EngineSettings::parse(&s.to_config_string());
        assert_eq!(parsed, s);
        assert_eq!(parsed.history_memory_limit(), None);
    }

    #[test]
    fn test_malformed_values_fall_back() {
        let parsed = EngineSettings::parse(
            "default_width=abc\n\
             default_height=0\n\
             max_undo_steps=-3\n\
             default_color=1,2,3\n\
             theme=dark\n\
             no equals sign here\n\
             # default_width=999\n\
             log_level=warn\n",
        );
        let defaults = EngineSettings::default();
        assert_eq!(parsed.default_width, defaults.default_width);
        assert_eq!(parsed.default_height, defaults.default_height);
        assert_eq!(parsed.max_undo_steps, defaults.max_undo_steps);
        assert_eq!(parsed.default_color, defaults.default_color);
        assert_eq!(parsed.log_level, "warn");
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        assert_eq!(EngineSettings::load_from(&path), EngineSettings::default());

        let s = EngineSettings {
            default_width: 100,
            ..EngineSettings::default()
        };
        s.save_to(&path).unwrap();
        assert_eq!(EngineSettings::load_from(&path), s);
    }
}
