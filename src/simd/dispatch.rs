//! Per-kernel selection between the vector implementations and the scalar
//! fallback.
//!
//! A [`VectorTable`] lists one implementation per [`SimdLevel`], best first.
//! The first level the CPU supports is chosen on first use and kept for the
//! rest of the process, under `ARRAYFUNC_SIMD` (see [`SimdMode`]).

use std::collections::BTreeMap;
use std::env;
use std::sync::{Mutex, OnceLock};

use super::SimdCapabilities;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimdMode {
    Auto,
    /// Vector kernels must be used; platforms without one report an error.
    Force,
    Disable,
}

impl SimdMode {
    pub fn parse(value: &str) -> SimdMode {
        match value.trim().to_ascii_lowercase().as_str() {
            "0" | "false" | "off" | "disable" => SimdMode::Disable,
            "1" | "true" | "on" | "force" => SimdMode::Force,
            _ => SimdMode::Auto,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimdLevel {
    Scalar,
    Neon,
    Sse41,
    Avx2,
}

impl SimdLevel {
    pub const fn label(self) -> &'static str {
        match self {
            SimdLevel::Scalar => "scalar",
            SimdLevel::Neon => "neon",
            SimdLevel::Sse41 => "sse4.1",
            SimdLevel::Avx2 => "avx2",
        }
    }

    pub fn runs_on(self, caps: &SimdCapabilities) -> bool {
        match self {
            SimdLevel::Scalar => true,
            SimdLevel::Neon => caps.neon,
            SimdLevel::Sse41 => caps.sse41,
            SimdLevel::Avx2 => caps.avx2,
        }
    }

    pub fn is_vector(self) -> bool {
        !matches!(self, SimdLevel::Scalar)
    }
}

/// One implementation of a kernel and the level it needs.
#[derive(Clone, Copy, Debug)]
pub struct LevelKernel<F> {
    pub level: SimdLevel,
    pub func: F,
}

impl<F> LevelKernel<F> {
    pub const fn new(level: SimdLevel, func: F) -> Self {
        Self { level, func }
    }
}

pub struct VectorTable<F: Copy + 'static> {
    name: &'static str,
    scalar: F,
    levels: &'static [LevelKernel<F>],
    chosen: OnceLock<LevelKernel<F>>,
}

impl<F: Copy + Send + Sync + 'static> VectorTable<F> {
    pub const fn new(name: &'static str, scalar: F, levels: &'static [LevelKernel<F>]) -> Self {
        Self {
            name,
            scalar,
            levels,
            chosen: OnceLock::new(),
        }
    }

    /// Best implementation for `caps`, the scalar one when `mode` disables
    /// vectors or nothing listed runs.
    pub fn pick(&self, mode: SimdMode, caps: &SimdCapabilities) -> LevelKernel<F> {
        let vector = match mode {
            SimdMode::Disable => None,
            SimdMode::Auto | SimdMode::Force => {
                self.levels.iter().copied().find(|kernel| kernel.level.runs_on(caps))
            }
        };
        vector.unwrap_or(LevelKernel::new(SimdLevel::Scalar, self.scalar))
    }

    /// The implementation picked on first use, which later calls reuse.
    pub fn selected(&self, mode: SimdMode, caps: &SimdCapabilities) -> LevelKernel<F> {
        *self.chosen.get_or_init(|| {
            let kernel = self.pick(mode, caps);
            tracing::debug!(
                kernel = self.name,
                level = kernel.level.label(),
                "selected vector kernel"
            );
            if let Ok(mut registry) = registry().lock() {
                registry.insert(self.name, kernel.level);
            }
            kernel
        })
    }
}

static MODE: OnceLock<SimdMode> = OnceLock::new();
static REGISTRY: OnceLock<Mutex<BTreeMap<&'static str, SimdLevel>>> = OnceLock::new();

fn registry() -> &'static Mutex<BTreeMap<&'static str, SimdLevel>> {
    REGISTRY.get_or_init(|| Mutex::new(BTreeMap::new()))
}

pub fn global_mode() -> SimdMode {
    *MODE.get_or_init(|| {
        env::var("ARRAYFUNC_SIMD")
            .map(|value| SimdMode::parse(&value))
            .unwrap_or(SimdMode::Auto)
    })
}

/// Kernels selected so far, by name.
pub fn selections() -> Vec<(&'static str, SimdLevel)> {
    registry()
        .lock()
        .map(|registry| registry.iter().map(|(&name, &level)| (name, level)).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar_impl() -> &'static str {
        "scalar"
    }

    fn sse_impl() -> &'static str {
        "sse"
    }

    fn avx2_impl() -> &'static str {
        "avx2"
    }

    const LEVELS: &[LevelKernel<fn() -> &'static str>] = &[
        LevelKernel::new(SimdLevel::Avx2, avx2_impl),
        LevelKernel::new(SimdLevel::Sse41, sse_impl),
    ];

    #[test]
    fn pick_prefers_the_first_level_the_cpu_runs() {
        let table = VectorTable::new("pick_test", scalar_impl as fn() -> &'static str, LEVELS);
        let caps = SimdCapabilities {
            sse41: true,
            ..SimdCapabilities::SCALAR
        };
        let chosen = table.pick(SimdMode::Auto, &caps);
        assert_eq!(chosen.level, SimdLevel::Sse41);
        assert_eq!((chosen.func)(), "sse");

        assert_eq!((table.pick(SimdMode::Auto, &SimdCapabilities::SCALAR).func)(), "scalar");
        assert_eq!(table.pick(SimdMode::Disable, &caps).level, SimdLevel::Scalar);
    }

    #[test]
    fn the_first_selection_is_kept_and_registered() {
        let table = VectorTable::new("selected_test", scalar_impl as fn() -> &'static str, LEVELS);
        let caps = SimdCapabilities {
            avx2: true,
            sse41: true,
            ..SimdCapabilities::SCALAR
        };
        assert_eq!(table.selected(SimdMode::Auto, &caps).level, SimdLevel::Avx2);
        assert_eq!(table.selected(SimdMode::Disable, &caps).level, SimdLevel::Avx2);
        assert!(selections().contains(&("selected_test", SimdLevel::Avx2)));
    }

    #[test]
    fn mode_strings_parse() {
        assert_eq!(SimdMode::parse("OFF"), SimdMode::Disable);
        assert_eq!(SimdMode::parse(" force "), SimdMode::Force);
        assert_eq!(SimdMode::parse("whatever"), SimdMode::Auto);
    }
}
