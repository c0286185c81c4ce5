//! Immutable run configuration, resolved once at startup and passed by
//! reference into every rule evaluation; never ambient global state.

use serde::{Deserialize, Serialize};

use verilith_core::geometry::{um, Coord};

/// Execution strategy for the rule scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    /// Every top-cell-instantiated shape, no hierarchy. Simplest, highest
    /// memory.
    Flat,
    /// Per-cell geometry merged once and reused across repeated
    /// instances.
    Deep,
    /// Spatial tiles with a border halo, evaluated in parallel.
    Tiled { tile_size: Coord, border: Coord },
}

impl RunMode {
    /// The deck's usual tiling: 500 µm tiles with a 10 µm halo.
    pub fn tiled_default() -> Self {
        RunMode::Tiled {
            tile_size: um(500.0),
            border: um(10.0),
        }
    }
}

/// Depth of the metal stack the design targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetalLevel {
    TwoMetal,
    ThreeMetal,
    FourMetal,
    FiveMetal,
    SixMetal,
}

impl MetalLevel {
    pub fn levels(&self) -> u8 {
        match self {
            MetalLevel::TwoMetal => 2,
            MetalLevel::ThreeMetal => 3,
            MetalLevel::FourMetal => 4,
            MetalLevel::FiveMetal => 5,
            MetalLevel::SixMetal => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MetalLevel::TwoMetal => "2LM",
            MetalLevel::ThreeMetal => "3LM",
            MetalLevel::FourMetal => "4LM",
            MetalLevel::FiveMetal => "5LM",
            MetalLevel::SixMetal => "6LM",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "2LM" => Some(MetalLevel::TwoMetal),
            "3LM" => Some(MetalLevel::ThreeMetal),
            "4LM" => Some(MetalLevel::FourMetal),
            "5LM" => Some(MetalLevel::FiveMetal),
            "6LM" => Some(MetalLevel::SixMetal),
            _ => None,
        }
    }
}

/// Top-metal thickness class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetalTop {
    K6,
    K9,
    K11,
    K30,
}

impl MetalTop {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetalTop::K6 => "6K",
            MetalTop::K9 => "9K",
            MetalTop::K11 => "11K",
            MetalTop::K30 => "30K",
        }
    }
}

/// MIM capacitor option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MimOption {
    A,
    B,
}

/// All switches a run resolves at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Front-end-of-line rule group enabled.
    pub feol: bool,
    /// Back-end-of-line rule group enabled.
    pub beol: bool,
    /// Connectivity-aware (same/different potential) rules enabled.
    pub connectivity: bool,
    /// Off-grid and acute-angle vertex checks enabled.
    pub offgrid: bool,
    pub metal_level: MetalLevel,
    pub metal_top: MetalTop,
    pub mim_option: MimOption,
    pub run_mode: RunMode,
    /// Worker threads for tiled evaluation.
    pub threads: usize,
    pub verbose: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            feol: true,
            beol: true,
            connectivity: false,
            offgrid: false,
            metal_level: MetalLevel::FiveMetal,
            metal_top: MetalTop::K9,
            mim_option: MimOption::B,
            run_mode: RunMode::Flat,
            threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            verbose: false,
        }
    }
}

impl RunConfig {
    pub fn with_run_mode(mut self, mode: RunMode) -> Self {
        self.run_mode = mode;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_connectivity(mut self, enabled: bool) -> Self {
        self.connectivity = enabled;
        self
    }

    pub fn with_metal_level(mut self, level: MetalLevel) -> Self {
        self.metal_level = level;
        self
    }

    /// Log the resolved switches the way a run preamble reports them.
    pub fn log_summary(&self) {
        log::info!("FEOL is {}.", enabled_str(self.feol));
        log::info!("BEOL is {}.", enabled_str(self.beol));
        log::info!("connectivity rules are {}.", enabled_str(self.connectivity));
        log::info!("offgrid checks are {}.", enabled_str(self.offgrid));
        log::info!("metal stack selected is {}", self.metal_level.as_str());
        log::info!("top metal selected is {}", self.metal_top.as_str());
        match self.run_mode {
            RunMode::Flat => log::info!("flat mode is enabled."),
            RunMode::Deep => log::info!("deep mode is enabled."),
            RunMode::Tiled { tile_size, border } => log::info!(
                "tiling mode is enabled ({} dbu tiles, {} dbu borders).",
                tile_size,
                border
            ),
        }
        log::info!("number of threads to use {}", self.threads);
    }
}

fn enabled_str(on: bool) -> &'static str {
    if on {
        "enabled"
    } else {
        "disabled"
    }
}
