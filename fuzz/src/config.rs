//! Fuzzing configuration.
//!
//! Every setting has an environment variable and a default; the CLI layers
//! its flags on top of [`FuzzConfig::from_env`].

use std::str::FromStr;

use bon::bon;

use crate::error::{InvalidEnvSnafu, Result};

/// How children are selected from a variant's legal actions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExploreMode {
    /// One uniformly random action per variant per depth.
    #[default]
    Sampling,
    /// Every legal action per variant per depth.
    Exhaustive,
}

impl ExploreMode {
    /// Depth used when none is configured.
    pub const fn default_depth(&self) -> usize {
        match self {
            Self::Sampling => 10,
            Self::Exhaustive => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct FuzzConfig {
    /// Seed re-applied at the start of every AST.
    pub seed: u64,
    pub mode: ExploreMode,
    /// Maximum exploration depth; `None` picks the mode's default.
    pub depth: Option<usize>,
    /// Skip ASTs whose work size exceeds this. `0` disables the gate.
    pub max_size: usize,
    /// Only consider the first `limit` corpus entries.
    pub limit: Option<usize>,
    /// Only test the AST at this corpus index.
    pub nth: Option<usize>,
    pub rtol: f64,
    pub atol: f64,
    /// Guard elements appended to the output buffer on compiled devices.
    pub red_zone: usize,
    /// Fail variants that write into the guard region.
    pub check_red_zone: bool,
}

#[bon]
impl FuzzConfig {
    #[builder]
    pub fn new(
        #[builder(default = 42)] seed: u64,
        #[builder(default)] mode: ExploreMode,
        depth: Option<usize>,
        #[builder(default = 0)] max_size: usize,
        limit: Option<usize>,
        nth: Option<usize>,
        #[builder(default = 1e-2)] rtol: f64,
        #[builder(default = 1e-2)] atol: f64,
        #[builder(default = 1024)] red_zone: usize,
        #[builder(default = true)] check_red_zone: bool,
    ) -> Self {
        Self { seed, mode, depth, max_size, limit, nth, rtol, atol, red_zone, check_red_zone }
    }
}

impl Default for FuzzConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl FuzzConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// * `SEED` - RNG seed (default: 42)
    /// * `FUZZ_BEAM` - Non-zero selects exhaustive mode (default: 0)
    /// * `DEPTH` - Maximum depth (default: 10 sampling, 1 exhaustive)
    /// * `FUZZ_MAX_SIZE` - Work size gate, 0 for none (default: 0)
    /// * `FUZZ_N` - Number of corpus entries to consider (default: all)
    /// * `FUZZ_NTH` - Single corpus index to test, -1 for all (default: -1)
    /// * `FUZZ_RTOL` / `FUZZ_ATOL` - Comparison tolerances (default: 1e-2)
    /// * `FUZZ_RED_ZONE` - Output guard elements (default: 1024)
    /// * `FUZZ_CHECK_RED_ZONE` - 0 disables the guard check (default: 1)
    ///
    /// Unparsable values are an error rather than silently defaulted.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let mode = match env::<u64>("FUZZ_BEAM")? {
            Some(beam) if beam > 0 => ExploreMode::Exhaustive,
            _ => ExploreMode::Sampling,
        };

        Ok(Self {
            seed: env("SEED")?.unwrap_or(defaults.seed),
            mode,
            depth: env("DEPTH")?,
            max_size: env("FUZZ_MAX_SIZE")?.unwrap_or(defaults.max_size),
            limit: env("FUZZ_N")?,
            nth: env::<i64>("FUZZ_NTH")?.and_then(|nth| usize::try_from(nth).ok()),
            rtol: env("FUZZ_RTOL")?.unwrap_or(defaults.rtol),
            atol: env("FUZZ_ATOL")?.unwrap_or(defaults.atol),
            red_zone: env("FUZZ_RED_ZONE")?.unwrap_or(defaults.red_zone),
            check_red_zone: env::<u8>("FUZZ_CHECK_RED_ZONE")?.is_none_or(|check| check != 0),
        })
    }

    pub fn max_depth(&self) -> usize {
        self.depth.unwrap_or_else(|| self.mode.default_depth())
    }
}

fn env<T: FromStr>(name: &'static str) -> Result<Option<T>> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(None);
    };
    match raw.trim().parse() {
        Ok(value) => Ok(Some(value)),
        Err(_) => InvalidEnvSnafu { name, value: raw }.fail(),
    }
}
