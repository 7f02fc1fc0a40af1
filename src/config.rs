//! Per-call options and process-wide settings.

use serde::Deserialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::element::ElementType;
use crate::error::{Error, Result};

/// Options accepted by a single call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpConfig {
    /// Skip overflow and finiteness checks.
    pub matherrors: bool,
    /// Cap on the number of elements processed. Non-positive or over-long
    /// values are ignored.
    pub maxlen: i64,
    /// Keep to the scalar loop even when a vector kernel is eligible.
    pub nosimd: bool,
}

impl OpConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn matherrors(mut self, value: bool) -> Self {
        self.matherrors = value;
        self
    }

    pub fn maxlen(mut self, value: i64) -> Self {
        self.maxlen = value;
        self
    }

    pub fn nosimd(mut self, value: bool) -> Self {
        self.nosimd = value;
        self
    }

    pub fn mode(&self) -> Mode {
        if self.matherrors {
            Mode::Unchecked
        } else {
            Mode::Checked
        }
    }
}

/// Math-error policy of a kernel run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Checked,
    Unchecked,
}

impl Mode {
    pub fn is_checked(self) -> bool {
        matches!(self, Mode::Checked)
    }
}

/// The subset of [`OpConfig`] options an operation understands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OptionSet {
    pub matherrors: bool,
    pub maxlen: bool,
    pub nosimd: bool,
}

impl OptionSet {
    pub const ALL: OptionSet = OptionSet {
        matherrors: true,
        maxlen: true,
        nosimd: true,
    };
    pub const CHECKED: OptionSet = OptionSet {
        matherrors: true,
        maxlen: true,
        nosimd: false,
    };
    pub const MAXLEN: OptionSet = OptionSet {
        matherrors: false,
        maxlen: true,
        nosimd: false,
    };
    /// Reductions that never raise math errors.
    pub const SCAN: OptionSet = OptionSet {
        matherrors: false,
        maxlen: true,
        nosimd: true,
    };

    pub fn accepts(&self, name: &str) -> bool {
        match name {
            "matherrors" => self.matherrors,
            "maxlen" => self.maxlen,
            "nosimd" => self.nosimd,
            _ => false,
        }
    }

    /// Rejects options the operation does not expose.
    pub fn validate(&self, config: &OpConfig) -> Result<()> {
        if config.matherrors && !self.matherrors {
            return Err(Error::ValueError("matherrors is not supported here"));
        }
        if config.maxlen != 0 && !self.maxlen {
            return Err(Error::ValueError("maxlen is not supported here"));
        }
        if config.nosimd && !self.nosimd {
            return Err(Error::ValueError("nosimd is not supported here"));
        }
        Ok(())
    }
}

pub const VECTOR_MIN_LEN_F32: usize = 32;
pub const VECTOR_MIN_LEN_F64: usize = 16;

#[derive(Debug, Clone, Deserialize)]
pub struct VectorThreshold {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub min_len: Option<usize>,
}

impl VectorThreshold {
    fn default_for(element_type: ElementType) -> Self {
        let min_len = match element_type {
            ElementType::Float32 => VECTOR_MIN_LEN_F32,
            _ => VECTOR_MIN_LEN_F64,
        };
        Self {
            enabled: true,
            min_len: Some(min_len),
        }
    }

    pub fn admits(&self, len: usize) -> bool {
        if !self.enabled {
            return false;
        }
        match self.min_len {
            Some(min) => len >= min,
            None => true,
        }
    }
}

/// Settings read once from the JSON file named by `ARRAYFUNC_CONFIG`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    simd: HashMap<String, VectorThreshold>,
}

impl Settings {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    pub fn vector_threshold(&self, element_type: ElementType) -> VectorThreshold {
        self.simd
            .get(element_type.name())
            .cloned()
            .unwrap_or_else(|| VectorThreshold::default_for(element_type))
    }
}

static SETTINGS: OnceLock<Settings> = OnceLock::new();

pub fn settings() -> &'static Settings {
    SETTINGS.get_or_init(load_settings)
}

fn load_settings() -> Settings {
    let Ok(path) = env::var("ARRAYFUNC_CONFIG") else {
        return Settings::default();
    };
    match fs::read_to_string(Path::new(&path)) {
        Ok(text) => match Settings::from_json(&text) {
            Ok(parsed) => {
                tracing::debug!(path = %path, "loaded arrayfunc settings");
                parsed
            }
            Err(err) => {
                tracing::warn!(path = %path, error = %err, "ignoring malformed settings file");
                Settings::default()
            }
        },
        Err(err) => {
            tracing::warn!(path = %path, error = %err, "cannot read settings file");
            Settings::default()
        }
    }
}

const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_sets_reject_unexposed_options() {
        let config = OpConfig::new().nosimd(true);
        assert!(OptionSet::ALL.validate(&config).is_ok());
        assert!(OptionSet::CHECKED.validate(&config).is_err());
        assert!(OptionSet::MAXLEN.validate(&OpConfig::new().maxlen(3)).is_ok());
        assert!(OptionSet::MAXLEN
            .validate(&OpConfig::new().matherrors(true))
            .is_err());
        assert!(!OptionSet::MAXLEN.accepts("nosimd"));
        assert!(!OptionSet::ALL.accepts("unknown"));
    }

    #[test]
    fn thresholds_fall_back_to_defaults() {
        let settings = Settings::from_json(r#"{"simd": {"float64": {"min_len": 4}}}"#).unwrap();
        let f64_threshold = settings.vector_threshold(ElementType::Float64);
        assert!(f64_threshold.admits(4));
        assert!(!f64_threshold.admits(3));
        let f32_threshold = settings.vector_threshold(ElementType::Float32);
        assert!(!f32_threshold.admits(VECTOR_MIN_LEN_F32 - 1));
        assert!(f32_threshold.admits(VECTOR_MIN_LEN_F32));

        let disabled =
            Settings::from_json(r#"{"simd": {"float32": {"enabled": false}}}"#).unwrap();
        assert!(!disabled.vector_threshold(ElementType::Float32).admits(1_000));
    }

    #[test]
    fn mode_follows_matherrors() {
        assert_eq!(OpConfig::default().mode(), Mode::Checked);
        assert_eq!(OpConfig::new().matherrors(true).mode(), Mode::Unchecked);
    }
}
