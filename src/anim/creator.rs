//! Animation drivers over one archive cursor.
//!
//! Three ways to drive the read loop:
//! - batch load of a whole window into a presentation sink,
//! - incremental reading of whatever the solver wrote since the last call,
//! - export of the window through an [`ExportWriter`].
//!
//! All of them are single-threaded. Cancellation is polled once per time
//! step and never retracts frames already delivered.

use std::collections::BTreeMap;

use tracing::{debug, info, info_span, instrument, warn};

use crate::anim::{
    AnimationConfig, DeformationTable, FringeTable, LegendMapping, PositionTable, ProgressHost, ProgressTracker,
    ResultStepper, TimeWindow, ValueRange,
};
use crate::core::{EntityKey, ResultArchive};
use crate::eval::Resolver;
use crate::export::{ExportOptions, ExportProperties, ExportWriter, LinkGeometry};
use crate::model::{FePart, Model, VertexId};
use crate::sink::{FrameIndex, PresentationSink};
use crate::util::{is_valid_time, Chrono, Error, Result};

/// Notice issued once per run when an entity runs out of memory.
pub const OUT_OF_MEMORY: &str = "Not enough memory!\nSome of the animation data could not be read.";

/// Notice issued when fringes were requested but no part can show them.
pub const NO_COLORED_PARTS: &str = "There was no visible geometry to display contours on.";

/// Outcome of a batch load.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LoadReport {
    /// Most time steps read for a single entity.
    pub steps: usize,
    pub cancelled: bool,
    /// Entities skipped after an allocation failure, in read order.
    pub out_of_memory: Vec<EntityKey>,
    /// Min/max of the fringe values read, specials excluded.
    pub fringe_range: Option<(f64, f64)>,
    /// Whether any part got a fringe evaluator.
    pub colored_parts: bool,
}

/// Outcome of an export.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExportReport {
    /// Time steps written.
    pub steps: usize,
    pub cancelled: bool,
}

// ============================================================================
// Per-part tables
// ============================================================================

/// Fringe and deformation tables of one FE part for one read cycle.
#[derive(Default)]
struct PartTables {
    fringe: Option<FringeTable>,
    deform: Option<DeformationTable>,
    /// Fringe arity for export (0 nodal, 1 element, 2 element-nodal).
    arity: usize,
}

impl PartTables {
    fn init(
        rdb: &dyn ResultArchive,
        key: EntityKey,
        part: &FePart,
        config: &AnimationConfig,
        filter: Option<&[VertexId]>,
        host: &mut dyn ProgressHost,
    ) -> Self {
        let mut tables = Self::default();
        let fringe = match filter {
            Some(_) => config.load_face_fringe,
            None => config.load_fringe(),
        };
        if fringe {
            let (table, result) = FringeTable::init(rdb, key, part, config, filter, host);
            if filter.is_some() {
                tables.arity = result;
            }
            tables.fringe = Some(table);
        }
        if config.load_deformation {
            tables.deform = Some(DeformationTable::init(rdb, key, part, filter, host));
        }
        tables
    }

    fn has_colors(&self) -> bool {
        self.fringe.as_ref().is_some_and(FringeTable::has_colors)
    }

    fn read_frame(
        &self,
        rdb: &dyn ResultArchive,
        frame: FrameIndex,
        sink: &mut dyn PresentationSink,
        legend: &LegendMapping,
        range: &mut ValueRange,
    ) -> Result<()> {
        if let Some(table) = &self.fringe {
            table.invalidate();
            table.read_frame(rdb, frame, sink, legend, range)?;
        }
        if let Some(table) = &self.deform {
            table.invalidate();
            table.read_frame(rdb, frame, sink)?;
        }
        Ok(())
    }

    fn finish(&mut self) {
        if let Some(table) = &mut self.fringe {
            table.finish();
        }
        if let Some(table) = &mut self.deform {
            table.finish();
        }
        self.fringe = None;
        self.deform = None;
    }
}

/// State of one batch load.
struct BatchRun<'c> {
    config: &'c AnimationConfig,
    stepper: ResultStepper,
    tracker: ProgressTracker,
    report: LoadReport,
}

/// State kept between incremental reads.
#[derive(Clone, Debug)]
struct IncrementalRun {
    config: AnimationConfig,
    window: TimeWindow,
}

// ============================================================================
// AnimationCreator
// ============================================================================

/// Drives frame extraction from an archive it owns exclusively.
pub struct AnimationCreator<A: ResultArchive> {
    rdb: A,
    positions: PositionTable,
    incremental: Option<IncrementalRun>,
    last_read_time: Chrono,
    legend: LegendMapping,
    range: ValueRange,
}

impl<A: ResultArchive> AnimationCreator<A> {
    pub fn new(rdb: A) -> Self {
        Self {
            rdb,
            positions: PositionTable::new(),
            incremental: None,
            last_read_time: f64::NEG_INFINITY,
            legend: LegendMapping::default(),
            range: ValueRange::default(),
        }
    }

    #[inline]
    pub fn archive(&self) -> &A {
        &self.rdb
    }

    /// Mutable archive access, e.g. to let a solver append results between
    /// incremental reads.
    #[inline]
    pub fn archive_mut(&mut self) -> &mut A {
        &mut self.rdb
    }

    pub fn into_archive(self) -> A {
        self.rdb
    }

    /// Time of the last step read completely.
    #[inline]
    pub fn last_read_time(&self) -> Chrono {
        self.last_read_time
    }

    /// Legend of the last run.
    #[inline]
    pub fn legend(&self) -> &LegendMapping {
        &self.legend
    }

    /// Whether incremental reading is set up.
    #[inline]
    pub fn is_reading_incrementally(&self) -> bool {
        self.incremental.is_some()
    }

    /// Reset the cursor and set up the time axis for `config`.
    fn init_reading(&mut self, model: &Model, config: &AnimationConfig) -> Result<ResultStepper> {
        if config.modes_animation {
            return Err(Error::UnsupportedAnimation("modes animations are not read as frames".into()));
        }
        self.rdb.reset_positioning();
        self.legend = LegendMapping::from_config(&config.legend, None);
        self.range = ValueRange::default();

        let window = TimeWindow::resolve(config, &model.analysis);
        debug!(start = window.start, stop = window.stop, "time window");
        Ok(ResultStepper::new(&self.rdb, config, window))
    }

    /// Position at the first readable time, or fail the run.
    fn start(&mut self, stepper: &mut ResultStepper) -> Result<Chrono> {
        let t = stepper.start(&mut self.rdb);
        if stepper.in_range(t) {
            return Ok(t);
        }
        self.rdb.disable_precache();
        let w = stepper.window();
        warn!(start = w.start, stop = w.stop, "no results in time window");
        Err(Error::NoData { start: w.start, stop: w.stop })
    }

    // ========================================================================
    // Batch mode
    // ========================================================================

    /// Load every frame of the window into `sink`.
    ///
    /// FE parts are read first, then other links, then free triads; each
    /// entity walks the whole window once. An allocation failure skips the
    /// rest of that entity only. Fails with [`Error::NoData`] when nothing
    /// is readable in the window.
    #[instrument(skip_all)]
    pub fn load_animation(
        &mut self,
        model: &Model,
        config: &AnimationConfig,
        sink: &mut dyn PresentationSink,
        host: &mut dyn ProgressHost,
    ) -> Result<LoadReport> {
        let mut stepper = self.init_reading(model, config)?;
        let start = self.start(&mut stepper)?;
        let window = *stepper.window();
        sink.set_progress_interval(window.start, window.stop);
        host.set_progress(0.0);

        let links = model.links_with_results(config.skip_blades());
        let triads = model.triads_with_results();
        info!(links = links.len(), triads = triads.len(), start, stop = window.stop, "loading animation");

        let tracker =
            ProgressTracker::new(links.len(), start, window.stop, config.load_fringe(), config.load_deformation);
        let mut run = BatchRun { config, stepper, tracker, report: LoadReport::default() };

        let entities = links
            .iter()
            .map(|l| (l.key(), l.loaded_part(), true))
            .chain(triads.iter().map(|t| (t.key(), None, false)));

        let mut outcome = Ok(());
        for (key, part, tracked) in entities {
            if run.report.cancelled {
                break;
            }
            let own_position = self.incremental.is_none();
            if own_position {
                self.positions.init_entity(&self.rdb, key);
            }

            let result = self.read_entity(&mut run, key, part, tracked, sink, host);

            if own_position {
                self.positions.finish_entity(key);
            }
            self.rdb.clear_precached_step();

            match result {
                Ok(()) => {}
                Err(e) if e.is_out_of_memory() => {
                    warn!(entity = %key, error = %e, "allocation failure, continuing with the next entity");
                    if run.report.out_of_memory.is_empty() {
                        host.notice(OUT_OF_MEMORY);
                    }
                    run.report.out_of_memory.push(key);
                }
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
            if tracked {
                run.tracker.finish_entity(part.is_some());
            }
        }

        self.rdb.disable_precache();
        outcome?;
        host.set_progress(100.0);

        let mut report = run.report;
        report.fringe_range = self.range.as_option();
        if config.load_fringe() && !report.colored_parts {
            info!("no colored parts");
            host.notice(NO_COLORED_PARTS);
        }
        self.legend = LegendMapping::from_config(&config.legend, report.fringe_range);
        sink.set_legend(self.legend.clone());

        info!(steps = report.steps, cancelled = report.cancelled, "animation loaded");
        Ok(report)
    }

    /// Read positions, fringes and deformations of one entity over the window.
    fn read_entity(
        &mut self,
        run: &mut BatchRun<'_>,
        key: EntityKey,
        part: Option<&FePart>,
        tracked: bool,
        sink: &mut dyn PresentationSink,
        host: &mut dyn ProgressHost,
    ) -> Result<()> {
        let _span = info_span!("read_entity", entity = %key).entered();
        let mut t = run.stepper.rewind(&mut self.rdb);

        let mut tables = match part {
            Some(part) if run.config.load_fringe() || run.config.load_deformation => {
                PartTables::init(&self.rdb, key, part, run.config, None, host)
            }
            _ => PartTables::default(),
        };
        if tables.has_colors() {
            run.report.colored_parts = true;
        }

        let mut steps = 0;
        while run.stepper.in_range(t) {
            if host.is_cancelled() {
                info!(time = t, "cancelled");
                run.report.cancelled = true;
                break;
            }
            let frame = sink.add_frame(t);
            self.positions.read(&self.rdb, key, frame, sink)?;
            tables.read_frame(&self.rdb, frame, sink, &self.legend, &mut self.range)?;

            self.last_read_time = t;
            steps += 1;
            if tracked {
                host.set_progress(run.tracker.at(t, part.is_some()));
            }
            t = run.stepper.increment(&mut self.rdb);
        }

        tables.finish();
        run.report.steps = run.report.steps.max(steps);
        debug!(steps, "entity read");
        Ok(())
    }

    // ========================================================================
    // Incremental mode
    // ========================================================================

    /// Resolve the position matrices of all links and free triads for
    /// repeated [`read_all_new_pos_mx`](Self::read_all_new_pos_mx) calls.
    /// Does nothing when already set up.
    #[instrument(skip_all)]
    pub fn init_all_pos_mx_reading(
        &mut self,
        model: &Model,
        config: &AnimationConfig,
        sink: &mut dyn PresentationSink,
    ) -> Result<()> {
        if self.incremental.is_some() {
            return Ok(());
        }
        let stepper = self.init_reading(model, config)?;
        let window = *stepper.window();
        sink.set_progress_interval(window.start, window.stop);

        for link in model.links_with_results(config.skip_blades()) {
            self.positions.init_entity(&self.rdb, link.key());
        }
        for triad in model.triads_with_results() {
            self.positions.init_entity(&self.rdb, triad.key());
        }

        self.last_read_time = window.start;
        self.incremental = Some(IncrementalRun { config: config.clone(), window });
        debug!(entities = self.positions.len(), "incremental reading initialized");
        Ok(())
    }

    /// Read the steps written since the previous call.
    ///
    /// Stops at the first step where some entity has no data yet, so the
    /// next call resumes there. When progress was made, FE parts are then
    /// read over the same range for fringes and deformations. Returns the
    /// number of steps read.
    #[instrument(skip_all)]
    pub fn read_all_new_pos_mx(
        &mut self,
        model: &Model,
        sink: &mut dyn PresentationSink,
        host: &mut dyn ProgressHost,
    ) -> Result<usize> {
        let Some(run) = self.incremental.clone() else {
            return Ok(0);
        };
        let window = run.window;
        let prev = self.last_read_time;
        let want = prev.max(window.start);

        let Some(mut t) = self.seek_after(want, prev != window.start) else {
            debug!("end of time");
            return Ok(0);
        };

        let stop = match self.rdb.last_written_time() {
            Some(w) if w == f64::NEG_INFINITY => {
                debug!("no new results");
                return Ok(0);
            }
            Some(w) if w.is_finite() => w.min(window.stop),
            _ => window.stop,
        };
        let end = stop + window.min_delta;
        debug!(last_read = prev, time = t, stop, "new results");

        let links = model.links_with_results(run.config.skip_blades());
        let keys: Vec<EntityKey> = links
            .iter()
            .map(|l| l.key())
            .chain(model.triads_with_results().iter().map(|t| t.key()))
            .collect();

        let mut read = 0;
        while is_valid_time(t) && t < end {
            let frame = sink.add_frame(t);
            let mut got_all = true;
            for &key in &keys {
                let ok = self.positions.read(&self.rdb, key, frame, sink)?;
                got_all &= ok;
            }
            if !got_all {
                debug!(time = t, "incomplete step");
                break;
            }
            self.last_read_time = t;
            read += 1;
            t = self.rdb.advance();
        }

        let last = self.last_read_time;
        let config = &run.config;
        if (config.load_fringe() || config.load_deformation) && last > prev {
            for link in &links {
                let Some(part) = link.loaded_part() else { continue };
                let Some(mut t) = self.seek_after(want, prev != window.start) else { break };

                let key = link.key();
                let _span = info_span!("read_fe_data", part = %key).entered();
                let mut tables = PartTables::init(&self.rdb, key, part, config, None, host);
                while is_valid_time(t) && t <= last {
                    let frame = sink.add_frame(t);
                    tables.read_frame(&self.rdb, frame, sink, &self.legend, &mut self.range)?;
                    t = self.rdb.advance();
                }
                tables.finish();
            }
        }

        sink.move_to_time(self.last_read_time);
        Ok(read)
    }

    /// Position at `want`, then step once more when `skip` is set.
    fn seek_after(&mut self, want: Chrono, skip: bool) -> Option<Chrono> {
        let t = self.rdb.position_at(want);
        if is_valid_time(t) && skip {
            let next = self.rdb.advance();
            return is_valid_time(next).then_some(next);
        }
        Some(t)
    }

    /// Release everything set up by
    /// [`init_all_pos_mx_reading`](Self::init_all_pos_mx_reading).
    pub fn finish_all_pos_mx_reading(&mut self) {
        if self.incremental.take().is_some() {
            self.positions.finish_all();
            self.rdb.disable_precache();
            debug!("incremental reading finished");
        }
    }

    // ========================================================================
    // Export
    // ========================================================================

    /// Write geometry and the results of every step in the window.
    ///
    /// Steps closer than `options.time_increment` to the previous written
    /// one are skipped. On cancellation the steps written so far are kept
    /// and the writer is still closed.
    #[instrument(skip_all)]
    pub fn export_animation(
        &mut self,
        model: &Model,
        config: &AnimationConfig,
        writer: &mut dyn ExportWriter,
        options: ExportOptions,
        host: &mut dyn ProgressHost,
    ) -> Result<ExportReport> {
        let mut stepper = self.init_reading(model, config)?;
        self.start(&mut stepper)?;
        let result = self.write_export(model, config, &mut stepper, writer, options, host);
        self.rdb.disable_precache();
        result
    }

    fn write_export(
        &mut self,
        model: &Model,
        config: &AnimationConfig,
        stepper: &mut ResultStepper,
        writer: &mut dyn ExportWriter,
        options: ExportOptions,
        host: &mut dyn ProgressHost,
    ) -> Result<ExportReport> {
        let window = *stepper.window();
        let duration = window.duration();
        // Geometry output counts as a tenth of the step loop.
        let total = duration * 1.1;
        let percent = |done: f64| if total > 0.0 { (100.0 * done / total).clamp(0.0, 100.0) } else { 0.0 };

        let links = model.links_with_results(config.skip_blades());
        let geometry: Vec<LinkGeometry<'_>> = links
            .iter()
            .map(|&link| {
                let vertices = match link.loaded_part() {
                    Some(p) if options.first_order => p.mesh.first_order_vertices(),
                    Some(p) => (0..p.mesh.vertex_count()).collect(),
                    None => Vec::new(),
                };
                LinkGeometry { link, vertices, first_order: options.first_order }
            })
            .collect();

        let props = ExportProperties {
            deformation: config.load_deformation,
            fringe: config.load_face_fringe,
            range: config.legend.range,
            quantity: config.fringe.variable.clone(),
        };
        {
            let _span = info_span!("write_geometry", links = geometry.len()).entered();
            writer.write_geometry(&geometry)?;
            writer.write_properties(&props)?;
        }

        let mut report = ExportReport::default();
        if host.is_cancelled() {
            report.cancelled = true;
            return Ok(report);
        }
        host.set_progress(percent(total - duration) / 2.0);

        let step_number = Resolver::new(&self.rdb).step_number();
        let mut positions = PositionTable::new();
        for link in &links {
            positions.init_entity(&self.rdb, link.key());
        }

        let mut parts = Vec::new();
        for (link, geo) in links.iter().zip(&geometry) {
            if let Some(part) = link.loaded_part() {
                let tables = PartTables::init(&self.rdb, link.key(), part, config, Some(&geo.vertices), host);
                parts.push((link.id, tables));
            }
        }

        let increment = options.time_increment.filter(|&d| d > 0.0);
        let mut previous: Option<Chrono> = None;
        let mut t = stepper.start_time();
        while stepper.in_range(t) {
            if host.is_cancelled() {
                info!(time = t, "export cancelled");
                report.cancelled = true;
                break;
            }
            host.set_progress(percent(total + t - window.stop));

            if let (Some(inc), Some(prev)) = (increment, previous) {
                if t + window.min_delta < prev + inc {
                    t = stepper.increment(&mut self.rdb);
                    continue;
                }
            }
            previous = Some(t);

            let step = match &step_number {
                Some(op) => {
                    op.invalidate();
                    op.evaluate(&self.rdb)?.map_or(0, |v| v.round() as i64)
                }
                None => 0,
            };
            writer.write_step(step, t)?;

            let mut transforms = BTreeMap::new();
            for link in &links {
                if let Some(m) = positions.value(&self.rdb, link.key())? {
                    transforms.insert(link.id, m);
                }
            }
            writer.write_transformations(&transforms)?;

            for (id, tables) in &parts {
                if let Some(table) = tables.deform.as_ref().filter(|t| !t.is_empty()) {
                    table.invalidate();
                    writer.write_deformations(*id, &table.read_values(&self.rdb)?)?;
                }
            }
            for (id, tables) in &parts {
                if let Some(table) = &tables.fringe {
                    table.invalidate();
                    let values = table.read_values(&self.rdb, &mut self.range)?;
                    writer.write_fringes(*id, &values, tables.arity == 1)?;
                }
            }

            report.steps += 1;
            t = stepper.increment(&mut self.rdb);
        }

        host.set_progress(100.0);
        writer.close()?;
        for (_, tables) in &mut parts {
            tables.finish();
        }
        positions.finish_all();

        info!(steps = report.steps, cancelled = report.cancelled, "export finished");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::NullProgress;
    use crate::archive::MemArchive;
    use crate::core::{EntityKind, ResultItem, Value};
    use crate::model::{Link, LinkKind, Triad};
    use crate::sink::FrameStore;
    use crate::util::{DAffine3, DVec3};

    fn pos(x: f64) -> Value {
        Value::Transform(DAffine3::from_translation(DVec3::new(x, 0.0, 0.0)))
    }

    fn model() -> Model {
        Model {
            links: vec![Link::new(1, LinkKind::Generic)],
            triads: vec![Triad { id: 2, owner_link: None }],
            ..Default::default()
        }
    }

    fn archive(times: &[f64]) -> MemArchive {
        let link = ResultItem::Entity(EntityKey::new(EntityKind::Link, 1));
        let triad = ResultItem::Entity(EntityKey::new(EntityKind::Triad, 2));
        let mut b = MemArchive::builder();
        for &t in times {
            b.set(t, link, "Position matrix", pos(t));
            b.set(t, triad, "Position matrix", pos(-t));
        }
        b.build()
    }

    #[test]
    fn test_modes_animation_unsupported() {
        let mut creator = AnimationCreator::new(archive(&[0.0]));
        let cfg = AnimationConfig { modes_animation: true, ..Default::default() };
        let err = creator.load_animation(&model(), &cfg, &mut FrameStore::new(), &mut NullProgress).unwrap_err();
        assert!(matches!(err, Error::UnsupportedAnimation(_)));
    }

    #[test]
    fn test_no_data_in_window() {
        let mut creator = AnimationCreator::new(archive(&[0.0, 0.1]));
        let cfg = AnimationConfig { time_range: Some((5.0, 6.0)), ..Default::default() };
        let mut sink = FrameStore::new();
        let err = creator.load_animation(&model(), &cfg, &mut sink, &mut NullProgress).unwrap_err();
        assert!(matches!(err, Error::NoData { .. }));
        assert!(sink.is_empty());
        assert_eq!(creator.archive().precache_category(), None);
    }

    #[test]
    fn test_links_and_triads_share_frames() {
        let mut creator = AnimationCreator::new(archive(&[0.0, 0.5, 1.0]));
        let cfg = AnimationConfig { load_deformation: false, most_frequent_framing: true, ..Default::default() };
        let mut sink = FrameStore::new();
        let report = creator.load_animation(&model(), &cfg, &mut sink, &mut NullProgress).unwrap();
        assert_eq!(report.steps, 3);
        assert_eq!(sink.times(), vec![0.0, 0.5, 1.0]);
        assert_eq!(sink.transform_calls, 6);
        let last = sink.frame(2).unwrap();
        assert_eq!(last.transforms[&EntityKey::new(EntityKind::Triad, 2)].translation.x, -1.0);
        assert_eq!(creator.last_read_time(), 1.0);
    }

    #[test]
    fn test_incremental_resumes() {
        let mut rdb = archive(&[0.0, 0.5, 1.0, 1.5]);
        rdb.set_written(2);
        let mut creator = AnimationCreator::new(rdb);
        let cfg = AnimationConfig { time_range: Some((0.0, 10.0)), ..Default::default() };
        let mut sink = FrameStore::new();
        let model = model();

        creator.init_all_pos_mx_reading(&model, &cfg, &mut sink).unwrap();
        assert!(creator.is_reading_incrementally());
        assert_eq!(creator.read_all_new_pos_mx(&model, &mut sink, &mut NullProgress).unwrap(), 2);
        assert_eq!(creator.last_read_time(), 0.5);
        assert_eq!(sink.current_time(), Some(0.5));

        creator.archive_mut().set_written(4);
        assert_eq!(creator.read_all_new_pos_mx(&model, &mut sink, &mut NullProgress).unwrap(), 2);
        assert_eq!(sink.times(), vec![0.0, 0.5, 1.0, 1.5]);
        assert_eq!(creator.read_all_new_pos_mx(&model, &mut sink, &mut NullProgress).unwrap(), 0);

        creator.finish_all_pos_mx_reading();
        assert!(!creator.is_reading_incrementally());
        assert_eq!(creator.read_all_new_pos_mx(&model, &mut sink, &mut NullProgress).unwrap(), 0);
    }
}
