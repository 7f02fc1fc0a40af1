use std::fmt;
use std::sync::OnceLock;

/// Vector instruction sets the kernels can use on this machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimdCapabilities {
    pub arch: &'static str,
    pub avx2: bool,
    pub avx: bool,
    pub fma: bool,
    pub sse41: bool,
    pub neon: bool,
    pub lane_width_bits: usize,
}

impl SimdCapabilities {
    pub const SCALAR: SimdCapabilities = SimdCapabilities {
        arch: "generic",
        avx2: false,
        avx: false,
        fma: false,
        sse41: false,
        neon: false,
        lane_width_bits: 64,
    };

    pub fn feature_level(&self) -> &'static str {
        if self.avx2 {
            "avx2"
        } else if self.avx {
            "avx"
        } else if self.neon {
            "neon"
        } else if self.sse41 {
            "sse4.1"
        } else {
            "scalar"
        }
    }

    pub fn has_vector_unit(&self) -> bool {
        self.avx2 || self.avx || self.sse41 || self.neon
    }

    /// Clears every capability above `cap`, as named by `ARRAYFUNC_SIMD_MAX`.
    pub fn capped(mut self, cap: &str) -> Self {
        match cap.trim().to_ascii_lowercase().as_str() {
            "scalar" | "none" => {
                self.avx2 = false;
                self.avx = false;
                self.fma = false;
                self.sse41 = false;
                self.neon = false;
            }
            "avx" => {
                self.avx2 = false;
            }
            "sse4.1" | "sse41" => {
                self.avx2 = false;
                self.avx = false;
            }
            "neon" => {
                self.avx2 = false;
                self.avx = false;
                self.sse41 = false;
            }
            _ => {}
        }
        self.lane_width_bits = if self.avx2 || self.avx {
            256
        } else if self.neon || self.sse41 {
            128
        } else {
            64
        };
        self
    }
}

impl fmt::Display for SimdCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} (lane={}b, fma={})",
            self.arch,
            self.feature_level(),
            self.lane_width_bits,
            self.fma
        )
    }
}

static CAPABILITIES: OnceLock<SimdCapabilities> = OnceLock::new();

pub fn capabilities() -> &'static SimdCapabilities {
    CAPABILITIES.get_or_init(|| {
        let detected = detect();
        let caps = match std::env::var("ARRAYFUNC_SIMD_MAX") {
            Ok(cap) => detected.capped(&cap),
            Err(_) => detected,
        };
        tracing::debug!(capabilities = %caps, "detected vector capabilities");
        caps
    })
}

#[cfg(target_arch = "x86_64")]
fn detect() -> SimdCapabilities {
    let avx2 = std::arch::is_x86_feature_detected!("avx2");
    let avx = std::arch::is_x86_feature_detected!("avx");
    SimdCapabilities {
        arch: "x86_64",
        avx2,
        avx,
        fma: std::arch::is_x86_feature_detected!("fma"),
        sse41: std::arch::is_x86_feature_detected!("sse4.1"),
        neon: false,
        lane_width_bits: 0,
    }
    .capped("")
}

#[cfg(target_arch = "aarch64")]
fn detect() -> SimdCapabilities {
    SimdCapabilities {
        arch: "aarch64",
        avx2: false,
        avx: false,
        fma: true,
        sse41: false,
        neon: true,
        lane_width_bits: 0,
    }
    .capped("")
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
fn detect() -> SimdCapabilities {
    SimdCapabilities::SCALAR
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_x86() -> SimdCapabilities {
        SimdCapabilities {
            arch: "x86_64",
            avx2: true,
            avx: true,
            fma: true,
            sse41: true,
            neon: false,
            lane_width_bits: 256,
        }
    }

    #[test]
    fn caps_remove_higher_levels() {
        let caps = full_x86().capped("sse4.1");
        assert_eq!(caps.feature_level(), "sse4.1");
        assert_eq!(caps.lane_width_bits, 128);

        let caps = full_x86().capped("scalar");
        assert!(!caps.has_vector_unit());
        assert_eq!(caps.lane_width_bits, 64);

        let caps = full_x86().capped("bogus");
        assert_eq!(caps.feature_level(), "avx2");
    }

    #[test]
    fn display_names_the_level() {
        assert_eq!(
            SimdCapabilities::SCALAR.to_string(),
            "generic:scalar (lane=64b, fma=false)"
        );
    }
}
