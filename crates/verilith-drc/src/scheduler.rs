//! Rule evaluation scheduling: flat, deep (hierarchy-reusing geometry
//! assembly) and tiled parallel execution, with per-rule failure
//! containment.
//!
//! A rule failure is caught at the rule boundary, logged, counted, and
//! replaced by a placeholder SKIPPED bucket covering the chip extent, so
//! one rule's edge-case crash never blocks the report for the hundreds of
//! others. The process exit code equals the count of such internal
//! failures, distinct from the number of design violations found.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;

use verilith_core::geometry::BBox;
use verilith_core::{FlattenMode, LayerKey, LayoutDatabase, Point, Polygon, Region};

use crate::config::{RunConfig, RunMode};
use crate::connectivity::{Connectivity, LayerMap};
use crate::error::DrcError;
use crate::report::{ResultDatabase, RuleResult, RunSummary};
use crate::rules::{Rule, RuleContext, RuleSet};
use crate::telemetry;

/// Warn when available memory drops below 2 GB during a run.
const LOW_MEMORY_KB: u64 = 2 * 1024 * 1024;

/// Cooperative abort flag: cancelling stops dispatch of pending rules;
/// rules already running complete normally.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// A fully loaded evaluation input: named layer geometry, extent, and the
/// optionally built connectivity graph.
pub struct RunInput {
    pub design_name: String,
    pub top_cell: String,
    pub layers: LayerMap,
    pub extent: BBox,
    pub polygon_count: usize,
    pub connectivity: Option<Connectivity>,
}

impl RunInput {
    pub fn new(design_name: &str, top_cell: &str, layers: LayerMap, extent: BBox) -> Self {
        let polygon_count = layers.values().map(|r| r.count()).sum();
        Self {
            design_name: design_name.to_string(),
            top_cell: top_cell.to_string(),
            layers,
            extent,
            polygon_count,
            connectivity: None,
        }
    }

    /// Load the named layers from a layout database, honoring the run
    /// mode's geometry-assembly strategy (deep mode merges each distinct
    /// cell once and reuses it across instances). Failures here are
    /// load-time failures: fatal, reported before any rule runs.
    pub fn from_database(
        db: &LayoutDatabase,
        selections: &[(&str, LayerKey)],
        config: &RunConfig,
    ) -> Result<Self, DrcError> {
        let mode = match config.run_mode {
            RunMode::Deep => FlattenMode::Deep,
            _ => FlattenMode::Flat,
        };
        let mut layers = LayerMap::new();
        for (name, key) in selections {
            log::info!("reading polygons for layer {name} ({key})");
            let region = db.layer_region(*key, mode)?;
            layers.insert((*name).to_string(), region);
        }
        let extent = db
            .extent()?
            .unwrap_or_else(|| BBox::new(Point::zero(), Point::zero()));
        let top_cell = db.top_cell_name().unwrap_or("").to_string();
        log::info!("loading database to memory is complete.");
        Ok(Self::new(&db.name, &top_cell, layers, extent))
    }

    /// Build the given connectivity declarations against the loaded
    /// layers. Build happens after all layer derivations, making the
    /// extraction idempotent for the rest of the run.
    pub fn attach_connectivity(&mut self, mut conn: Connectivity) -> Result<(), DrcError> {
        conn.build(&self.layers, 0)?;
        self.connectivity = Some(conn);
        Ok(())
    }
}

/// Outcome of a run: the result database plus the exit protocol.
pub struct RunOutcome {
    pub database: ResultDatabase,
}

impl RunOutcome {
    /// Process exit code: the count of internal rule-evaluation failures.
    /// Zero means the engine ran clean, regardless of how many design
    /// violations were found.
    pub fn exit_code(&self) -> i32 {
        self.database.summary.internal_errors as i32
    }
}

/// Executes a rule set against a loaded input.
pub struct DrcRunner<'a> {
    config: &'a RunConfig,
}

impl<'a> DrcRunner<'a> {
    pub fn new(config: &'a RunConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, input: &RunInput, rules: &RuleSet) -> RunOutcome {
        self.run_with_cancel(input, rules, &CancelToken::new())
    }

    pub fn run_with_cancel(
        &self,
        input: &RunInput,
        rules: &RuleSet,
        cancel: &CancelToken,
    ) -> RunOutcome {
        let started = Instant::now();
        self.config.log_summary();

        let chip = Region::rect(
            input.extent.min.x,
            input.extent.min.y,
            input.extent.max.x,
            input.extent.max.y,
        );
        log::info!("total area of the design is {} um^2.", chip.area_um2());
        log::info!(
            "total no. of polygons in the design is {}",
            input.polygon_count
        );

        let mut database = ResultDatabase::new(&input.design_name, &input.top_cell);
        let mut internal_errors = 0usize;

        match self.config.run_mode {
            RunMode::Flat | RunMode::Deep => {
                self.run_sequential(input, rules, cancel, &chip, &mut database, &mut internal_errors);
            }
            RunMode::Tiled { tile_size, border } => {
                self.run_tiled(
                    input,
                    rules,
                    cancel,
                    &chip,
                    tile_size,
                    border,
                    &mut database,
                    &mut internal_errors,
                );
            }
        }

        let elapsed = started.elapsed().as_secs_f64();
        database.summary = RunSummary {
            polygon_count: input.polygon_count,
            chip_area_um2: chip.area_um2(),
            elapsed_seconds: elapsed,
            internal_errors,
        };
        log::info!("DRC total run time {elapsed:.3} seconds");
        log::info!("DRC total program errors: {internal_errors}");
        RunOutcome { database }
    }

    fn run_sequential(
        &self,
        input: &RunInput,
        rules: &RuleSet,
        cancel: &CancelToken,
        chip: &Region,
        database: &mut ResultDatabase,
        internal_errors: &mut usize,
    ) {
        let ctx = RuleContext::new(
            &input.layers,
            self.config,
            input.connectivity.as_ref(),
            chip,
        );
        for rule in rules.iter() {
            if cancel.is_cancelled() {
                log::warn!("run aborted; pending rules were not dispatched");
                break;
            }
            telemetry::warn_if_low_memory(LOW_MEMORY_KB);
            log::info!("Executing rule {}{}", rule.id(), telemetry::mem_log_suffix());
            let outcome = rule.evaluate(&ctx);
            record(rule, outcome, chip, database, internal_errors);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn run_tiled(
        &self,
        input: &RunInput,
        rules: &RuleSet,
        cancel: &CancelToken,
        chip: &Region,
        tile_size: verilith_core::Coord,
        border: verilith_core::Coord,
        database: &mut ResultDatabase,
        internal_errors: &mut usize,
    ) {
        if cancel.is_cancelled() {
            log::warn!("run aborted before tile dispatch");
            return;
        }
        let tiles = make_tiles(&input.extent, tile_size.max(1));
        log::info!("evaluating {} tiles with {} threads", tiles.len(), self.config.threads);

        let eval_all = || {
            tiles
                .par_iter()
                .map(|tile| self.eval_tile(input, rules, chip, tile, border))
                .collect::<Vec<_>>()
        };
        let per_tile: Vec<Vec<Result<Region, DrcError>>> =
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.threads)
                .build()
            {
                Ok(pool) => pool.install(eval_all),
                Err(e) => {
                    log::warn!("thread pool setup failed ({e}); using default pool");
                    eval_all()
                }
            };

        // Tile results concatenate in tile-index order; the merge is a
        // set union, so the outcome is independent of thread scheduling.
        for (ri, rule) in rules.iter().enumerate() {
            let mut pieces: Vec<Polygon> = Vec::new();
            let mut failure: Option<String> = None;
            for tile_results in &per_tile {
                match &tile_results[ri] {
                    Ok(region) => pieces.extend(region.polygons().iter().cloned()),
                    Err(e) => {
                        failure.get_or_insert_with(|| e.to_string());
                    }
                }
            }
            let outcome = match failure {
                Some(msg) => Err(DrcError::config(msg).in_rule(rule.id())),
                None => Region::from_polygons(pieces).map_err(|e| DrcError::from(e).in_rule(rule.id())),
            };
            record(rule, outcome, chip, database, internal_errors);
        }
    }

    fn eval_tile(
        &self,
        input: &RunInput,
        rules: &RuleSet,
        chip: &Region,
        tile: &BBox,
        border: verilith_core::Coord,
    ) -> Vec<Result<Region, DrcError>> {
        let halo = tile.expanded(border);
        // Each worker owns its tile's slice; no Layer handle is shared
        // mutably between tiles.
        let tile_layers: Result<LayerMap, DrcError> = input
            .layers
            .iter()
            .map(|(name, region)| {
                Ok((name.clone(), region.clipped(&halo)?))
            })
            .collect();
        let tile_layers = match tile_layers {
            Ok(l) => l,
            Err(e) => {
                let msg = e.to_string();
                return rules.iter().map(|_| Err(DrcError::config(msg.clone()))).collect();
            }
        };
        let ctx = RuleContext::new(
            &tile_layers,
            self.config,
            input.connectivity.as_ref(),
            chip,
        );
        rules
            .iter()
            .map(|rule| {
                let found = rule.evaluate(&ctx)?;
                // Clip to the tile interior: the halo exists to observe
                // cross-tile interactions, not to report them twice.
                Ok(found.clipped(tile)?)
            })
            .collect()
    }
}

fn record(
    rule: &Rule,
    outcome: Result<Region, DrcError>,
    chip: &Region,
    database: &mut ResultDatabase,
    internal_errors: &mut usize,
) {
    let result = match outcome {
        Ok(geometry) => RuleResult {
            rule_id: rule.id().to_string(),
            description: rule.description().to_string(),
            severity: rule.severity(),
            skipped: false,
            geometry,
        },
        Err(e) => {
            log::error!("EXCEPTION in rule {}: {e}", rule.id());
            *internal_errors += 1;
            RuleResult {
                rule_id: rule.id().to_string(),
                description: format!(
                    "{} : SKIPPED. Internal error, failed to check. Try flat mode.",
                    rule.id()
                ),
                severity: rule.severity(),
                skipped: true,
                geometry: chip.clone(),
            }
        }
    };
    if let Err(e) = database.add(result) {
        log::error!("could not record result for rule {}: {e}", rule.id());
        *internal_errors += 1;
    }
}

/// Row-major tile partition of the extent. Tiles cover the extent
/// exactly; the last row/column absorbs the remainder.
fn make_tiles(extent: &BBox, tile_size: verilith_core::Coord) -> Vec<BBox> {
    let width = extent.width().max(1);
    let height = extent.height().max(1);
    let nx = ((width + tile_size - 1) / tile_size).max(1);
    let ny = ((height + tile_size - 1) / tile_size).max(1);
    let mut tiles = Vec::with_capacity((nx * ny) as usize);
    for iy in 0..ny {
        for ix in 0..nx {
            let x1 = extent.min.x + ix * tile_size;
            let y1 = extent.min.y + iy * tile_size;
            let x2 = if ix == nx - 1 {
                extent.max.x
            } else {
                x1 + tile_size
            };
            let y2 = if iy == ny - 1 {
                extent.max.y
            } else {
                y1 + tile_size
            };
            tiles.push(BBox::new(Point::new(x1, y1), Point::new(x2, y2)));
        }
    }
    tiles
}
