use std::path::Path;

use crate::error::{MontageError, MontageResult};

/// Fully resolved timeline configuration. Produced once by [`resolve_config`]
/// and shared read-only by every later computation.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TimelineConfig {
    /// Explicit output resolution; `None` lets the canvas be derived.
    pub resolution: Option<(u32, u32)>,
    pub fps: u32,
    /// Target total duration in seconds.
    pub duration: f64,
    pub photo_seconds: f64,
    pub photo_max_seconds: f64,
    pub video_max_seconds: f64,
    /// Crossfade length between adjacent segments, seconds. 0 disables.
    pub transition: f64,
    /// Cap on a crossfade as a fraction of clip length; 1.0 means no cap.
    pub fade_max_ratio: f64,
    /// Background blur radius; 0 skips the background layer entirely.
    pub bg_blur: f64,
    /// Keep video native durations and let them drive canvas sizing.
    pub preserve_videos: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            resolution: None,
            fps: 30,
            duration: 8.0,
            photo_seconds: 2.5,
            photo_max_seconds: 6.0,
            video_max_seconds: 5.0,
            transition: 0.3,
            fade_max_ratio: 1.0,
            bg_blur: 6.0,
            preserve_videos: false,
        }
    }
}

impl TimelineConfig {
    pub fn validate(&self) -> MontageResult<()> {
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(MontageError::config("duration must be > 0 seconds"));
        }
        if self.photo_seconds <= 0.0 {
            return Err(MontageError::config("photo_seconds must be > 0"));
        }
        if self.photo_max_seconds < self.photo_seconds {
            return Err(MontageError::config(
                "photo_max_seconds must be >= photo_seconds",
            ));
        }
        if self.video_max_seconds < 0.0 {
            return Err(MontageError::config("video_max_seconds must be >= 0"));
        }
        if self.transition < 0.0 {
            return Err(MontageError::config("transition must be >= 0"));
        }
        if !(self.fade_max_ratio > 0.0 && self.fade_max_ratio <= 1.0) {
            return Err(MontageError::config("fade_max_ratio must be in (0, 1]"));
        }
        if self.bg_blur < 0.0 {
            return Err(MontageError::config("bg_blur must be >= 0"));
        }
        if self.fps == 0 {
            return Err(MontageError::config("fps must be > 0"));
        }
        if let Some((w, h)) = self.resolution {
            if w == 0 || h == 0 {
                return Err(MontageError::config("resolution dimensions must be > 0"));
            }
            if w % 2 != 0 || h % 2 != 0 {
                // yuv420p output requires even frame dimensions.
                return Err(MontageError::config(
                    "resolution dimensions must be even (required for yuv420p mp4 output)",
                ));
            }
        }
        Ok(())
    }
}

/// Partial configuration: a preset, a config file, or CLI flags. Unset fields
/// leave the previous layer untouched.
#[derive(Clone, Debug, Default, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigOverlay {
    pub resolution: Option<String>,
    pub fps: Option<u32>,
    pub duration: Option<f64>,
    pub photo_seconds: Option<f64>,
    pub photo_max_seconds: Option<f64>,
    pub video_max_seconds: Option<f64>,
    pub transition: Option<f64>,
    pub fade_max_ratio: Option<f64>,
    pub bg_blur: Option<f64>,
    pub preserve_videos: Option<bool>,
}

impl ConfigOverlay {
    fn apply(&self, cfg: &mut TimelineConfig) -> MontageResult<()> {
        if let Some(res) = &self.resolution {
            cfg.resolution = Some(parse_resolution(res)?);
        }
        if let Some(v) = self.fps {
            cfg.fps = v;
        }
        if let Some(v) = self.duration {
            cfg.duration = v;
        }
        if let Some(v) = self.photo_seconds {
            cfg.photo_seconds = v;
        }
        if let Some(v) = self.photo_max_seconds {
            cfg.photo_max_seconds = v;
        }
        if let Some(v) = self.video_max_seconds {
            cfg.video_max_seconds = v;
        }
        if let Some(v) = self.transition {
            cfg.transition = v;
        }
        if let Some(v) = self.fade_max_ratio {
            cfg.fade_max_ratio = v;
        }
        if let Some(v) = self.bg_blur {
            cfg.bg_blur = v;
        }
        if let Some(v) = self.preserve_videos {
            cfg.preserve_videos = v;
        }
        Ok(())
    }
}

pub const PRESET_NAMES: &[&str] = &["youtube", "mobile", "preview"];

fn preset_overlay(name: &str) -> MontageResult<ConfigOverlay> {
    let overlay = match name {
        "youtube" => ConfigOverlay {
            resolution: Some("1920x1080".to_string()),
            duration: Some(60.0),
            transition: Some(0.3),
            bg_blur: Some(6.0),
            ..ConfigOverlay::default()
        },
        "mobile" => ConfigOverlay {
            resolution: Some("1080x1920".to_string()),
            duration: Some(60.0),
            transition: Some(0.25),
            bg_blur: Some(8.0),
            ..ConfigOverlay::default()
        },
        "preview" => ConfigOverlay {
            resolution: Some("1280x720".to_string()),
            duration: Some(8.0),
            transition: Some(0.2),
            bg_blur: Some(4.0),
            ..ConfigOverlay::default()
        },
        other => {
            return Err(MontageError::config(format!(
                "unknown preset '{other}' (expected one of: {})",
                PRESET_NAMES.join(", ")
            )));
        }
    };
    Ok(overlay)
}

pub fn load_config_file(path: &Path) -> MontageResult<ConfigOverlay> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        MontageError::config(format!("cannot read config file '{}': {e}", path.display()))
    })?;
    toml::from_str(&text).map_err(|e| {
        MontageError::config(format!("invalid config file '{}': {e}", path.display()))
    })
}

/// Reduce defaults, an optional preset, an optional config file, and CLI
/// flags into one validated config. Later layers win.
pub fn resolve_config(
    preset: Option<&str>,
    file: Option<&ConfigOverlay>,
    cli: &ConfigOverlay,
) -> MontageResult<TimelineConfig> {
    let mut cfg = TimelineConfig::default();
    if let Some(name) = preset {
        preset_overlay(name)?.apply(&mut cfg)?;
    }
    if let Some(overlay) = file {
        overlay.apply(&mut cfg)?;
    }
    cli.apply(&mut cfg)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Parse a `WIDTHxHEIGHT` resolution string, e.g. `1920x1080`.
pub fn parse_resolution(s: &str) -> MontageResult<(u32, u32)> {
    let bad = || {
        MontageError::config(format!(
            "resolution must be WIDTHxHEIGHT (e.g. 1920x1080), got '{s}'"
        ))
    };
    let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(bad)?;
    let w: u32 = w.parse().map_err(|_| bad())?;
    let h: u32 = h.parse().map_err(|_| bad())?;
    if w == 0 || h == 0 {
        return Err(bad());
    }
    Ok((w, h))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        TimelineConfig::default().validate().unwrap();
    }

    #[test]
    fn preset_applies_then_cli_wins() {
        let cli = ConfigOverlay {
            duration: Some(30.0),
            ..ConfigOverlay::default()
        };
        let cfg = resolve_config(Some("youtube"), None, &cli).unwrap();
        assert_eq!(cfg.resolution, Some((1920, 1080)));
        assert_eq!(cfg.transition, 0.3);
        assert_eq!(cfg.duration, 30.0);
    }

    #[test]
    fn file_layer_sits_between_preset_and_cli() {
        let file: ConfigOverlay = toml::from_str(
            r#"
            duration = 20.0
            bg_blur = 0.0
            "#,
        )
        .unwrap();
        let cli = ConfigOverlay {
            bg_blur: Some(3.0),
            ..ConfigOverlay::default()
        };
        let cfg = resolve_config(Some("preview"), Some(&file), &cli).unwrap();
        assert_eq!(cfg.duration, 20.0); // file over preset
        assert_eq!(cfg.bg_blur, 3.0); // cli over file
        assert_eq!(cfg.resolution, Some((1280, 720))); // preset survives
    }

    #[test]
    fn unknown_preset_is_rejected() {
        let err = resolve_config(Some("cinema"), None, &ConfigOverlay::default()).unwrap_err();
        assert!(err.to_string().contains("unknown preset"));
    }

    #[test]
    fn unknown_config_key_is_rejected() {
        let res: Result<ConfigOverlay, _> = toml::from_str("bgm_volume = 10.0");
        assert!(res.is_err());
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let mut cfg = TimelineConfig {
            duration: 0.0,
            ..TimelineConfig::default()
        };
        assert!(cfg.validate().is_err());

        cfg = TimelineConfig {
            fade_max_ratio: 0.0,
            ..TimelineConfig::default()
        };
        assert!(cfg.validate().is_err());

        cfg = TimelineConfig {
            fade_max_ratio: 1.5,
            ..TimelineConfig::default()
        };
        assert!(cfg.validate().is_err());

        cfg = TimelineConfig {
            transition: -0.1,
            ..TimelineConfig::default()
        };
        assert!(cfg.validate().is_err());

        cfg = TimelineConfig {
            resolution: Some((1281, 720)),
            ..TimelineConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn resolution_parses_and_rejects() {
        assert_eq!(parse_resolution("1920x1080").unwrap(), (1920, 1080));
        assert_eq!(parse_resolution("640X480").unwrap(), (640, 480));
        assert!(parse_resolution("1920").is_err());
        assert!(parse_resolution("0x720").is_err());
        assert!(parse_resolution("axb").is_err());
    }
}
