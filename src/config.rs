//! User settings and on-disk locations.
//!
//! Settings live in `~/.config/carefinder/settings.conf`, a line-oriented
//! `key = value` file with `#`/`//` comments; unknown keys are ignored and
//! anything missing or invalid falls back to the defaults below. Durable
//! slots go under the XDG cache directory (facility snapshot) and state
//! directory (selection, triage input); logs under the config directory.

use std::env;
use std::fs;
use std::path::PathBuf;

use crate::state::{CategoryFilter, DEFAULT_CUSTOM_RADIUS_M, RadiusChoice};

/// Tunables loaded at startup.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Base URL of the facility-search backend.
    pub api_base: String,
    /// Result-set cap forwarded to the backend.
    pub max_results: u32,
    /// Initial radius choice.
    pub radius: RadiusChoice,
    /// Initial custom radius in meters.
    pub custom_radius_m: u32,
    /// Initial category filter.
    pub category: CategoryFilter,
    /// Quiet window of the search debounce, in milliseconds.
    pub debounce_ms: u64,
    /// Per-dispatch network deadline, in seconds.
    pub request_timeout_secs: u64,
    /// Overall location-acquisition window, in seconds.
    pub location_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base: "http://127.0.0.1:8000".to_string(),
            max_results: 12,
            radius: RadiusChoice::Preset(10_000),
            custom_radius_m: DEFAULT_CUSTOM_RADIUS_M,
            category: CategoryFilter::All,
            debounce_ms: 1_500,
            request_timeout_secs: 10,
            location_timeout_secs: 10,
        }
    }
}

/// Load settings from `settings.conf`, falling back to defaults for
/// missing files, unknown keys, and unparsable values.
#[must_use]
pub fn settings() -> Settings {
    let mut out = Settings::default();
    let path = config_dir().join("settings.conf");
    let Ok(content) = fs::read_to_string(&path) else {
        return out;
    };
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//") {
            continue;
        }
        let Some((raw_key, raw_val)) = trimmed.split_once('=') else {
            continue;
        };
        let key = raw_key.trim().to_lowercase().replace(['.', '-', ' '], "_");
        let val = strip_inline_comment(raw_val.trim());
        match key.as_str() {
            "api_base" => {
                if !val.is_empty() {
                    out.api_base = val.to_string();
                }
            }
            "max_results" => {
                if let Ok(v) = val.parse::<u32>() {
                    out.max_results = v;
                }
            }
            "radius_m" => {
                if let Ok(v) = val.parse::<u32>() {
                    out.radius = radius_choice_for(v, &mut out.custom_radius_m);
                }
            }
            "custom_radius_m" => {
                if let Ok(v) = val.parse::<u32>() {
                    out.custom_radius_m = v;
                }
            }
            "category" => {
                if let Some(cat) = CategoryFilter::from_config_key(val) {
                    out.category = cat;
                }
            }
            "debounce_ms" => {
                if let Ok(v) = val.parse::<u64>() {
                    out.debounce_ms = v;
                }
            }
            "request_timeout_secs" => {
                if let Ok(v) = val.parse::<u64>() {
                    out.request_timeout_secs = v;
                }
            }
            "location_timeout_secs" => {
                if let Ok(v) = val.parse::<u64>() {
                    out.location_timeout_secs = v;
                }
            }
            _ => {}
        }
    }
    out
}

/// Map a configured radius in meters onto the preset ladder, spilling into
/// the custom choice (and updating the custom value) when it is not a
/// preset.
#[must_use]
pub fn radius_choice_for(meters: u32, custom_radius_m: &mut u32) -> RadiusChoice {
    if crate::state::RADIUS_LADDER.contains(&meters) {
        RadiusChoice::Preset(meters)
    } else {
        *custom_radius_m = meters;
        RadiusChoice::Custom
    }
}

/// Drop an inline `#` or `//` comment from a value.
#[must_use]
pub fn strip_inline_comment(val: &str) -> &str {
    let cut = val
        .find(" #")
        .into_iter()
        .chain(val.find(" //"))
        .min()
        .unwrap_or(val.len());
    val[..cut].trim()
}

/// Resolve an XDG base directory from the environment, defaulting to
/// `$HOME` joined with `home_default` segments.
fn xdg_base_dir(var: &str, home_default: &[&str]) -> PathBuf {
    if let Ok(p) = env::var(var)
        && !p.trim().is_empty()
    {
        return PathBuf::from(p);
    }
    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let mut base = PathBuf::from(home);
    for seg in home_default {
        base = base.join(seg);
    }
    base
}

fn ensured(dir: PathBuf) -> PathBuf {
    let _ = fs::create_dir_all(&dir);
    dir
}

/// Config directory (`$XDG_CONFIG_HOME/carefinder`), ensured to exist.
#[must_use]
pub fn config_dir() -> PathBuf {
    ensured(xdg_base_dir("XDG_CONFIG_HOME", &[".config"]).join("carefinder"))
}

/// Cache directory (`$XDG_CACHE_HOME/carefinder`), ensured to exist.
/// Holds the facility snapshot slot.
#[must_use]
pub fn cache_dir() -> PathBuf {
    ensured(xdg_base_dir("XDG_CACHE_HOME", &[".cache"]).join("carefinder"))
}

/// State directory (`$XDG_STATE_HOME/carefinder`), ensured to exist.
/// Holds the selection slot and the triage input slot.
#[must_use]
pub fn state_dir() -> PathBuf {
    ensured(xdg_base_dir("XDG_STATE_HOME", &[".local", "state"]).join("carefinder"))
}

/// Logs directory under config, ensured to exist.
#[must_use]
pub fn logs_dir() -> PathBuf {
    ensured(config_dir().join("logs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_inline_comment_handles_both_styles() {
        assert_eq!(strip_inline_comment("5000 # meters"), "5000");
        assert_eq!(strip_inline_comment("5000 // meters"), "5000");
        assert_eq!(strip_inline_comment("http://x//y"), "http://x//y");
        assert_eq!(strip_inline_comment("plain"), "plain");
    }

    #[test]
    fn radius_choice_spills_into_custom() {
        let mut custom = DEFAULT_CUSTOM_RADIUS_M;
        assert_eq!(radius_choice_for(10_000, &mut custom), RadiusChoice::Preset(10_000));
        assert_eq!(custom, DEFAULT_CUSTOM_RADIUS_M);
        assert_eq!(radius_choice_for(7_500, &mut custom), RadiusChoice::Custom);
        assert_eq!(custom, 7_500);
    }

    #[test]
    fn defaults_match_the_documented_contract() {
        let s = Settings::default();
        assert_eq!(s.debounce_ms, 1_500);
        assert_eq!(s.request_timeout_secs, 10);
        assert_eq!(s.location_timeout_secs, 10);
        assert_eq!(s.max_results, 12);
        assert_eq!(s.radius, RadiusChoice::Preset(10_000));
    }
}
