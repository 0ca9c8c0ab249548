use std::error::Error;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use depthcal_capture::{FrameSource, SimulatedDevice};
use depthcal_data::{CalibratedFrame, CameraModel};
use depthcal_pipeline::{LoggingConfig, PipelineConfig, PipelineController};
use tracing::{debug, info, warn};

use crate::{Args, SourceArg};

/// How long to wait for a frame before giving up on it.
const FETCH_TIMEOUT: Duration = Duration::from_secs(2);

pub fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = match args.config.as_ref() {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    init_logging(&config.logging);

    if args.width == 0 || args.height == 0 {
        return Err("raster dimensions must be non-zero".into());
    }
    let model = CameraModel::new(
        525.0,
        525.0,
        (args.width as f32 - 1.0) / 2.0,
        (args.height as f32 - 1.0) / 2.0,
        args.width,
        args.height,
    );
    info!(
        width = args.width,
        height = args.height,
        depth_mm = args.depth_mm,
        source = ?args.source,
        "Starting depthcal"
    );

    let started = Instant::now();
    let last = match args.source {
        SourceArg::Injected => run_injected(&args, config, model)?,
        SourceArg::Device => run_device(&args, config, model)?,
    };

    if let Some(frame) = last {
        report_frame(&frame);
    } else {
        warn!("No frame was produced");
    }
    info!(elapsed = ?started.elapsed(), "Done");
    Ok(())
}

fn run_injected(
    args: &Args,
    config: PipelineConfig,
    model: CameraModel,
) -> Result<Option<CalibratedFrame>, Box<dyn Error>> {
    let controller = PipelineController::new(config);
    let model = Arc::new(model);
    controller.set_camera_models(Arc::clone(&model), model)?;
    controller.set_calibration_enabled(!args.pass_through);
    log_pipeline(&controller);

    let pixels = args.width as usize * args.height as usize;
    let halfway = args.frames / 2;
    let mut last = None;

    for index in 1..=args.frames {
        controller.submit_frame(vec![args.depth_mm; pixels], vec![128; pixels * 3], index)?;
        if let Some(frame) = wait_for_frame(&controller) {
            debug!(index = frame.index, valid = frame.valid_count(), "Fetched frame");
            last = Some(frame);
        }

        if index == halfway {
            if let Some(ms) = args.paused_for {
                controller.set_pause(true)?;
                // discarded while paused
                controller.submit_frame(vec![args.depth_mm; pixels], vec![128; pixels * 3], index)?;
                thread::sleep(Duration::from_millis(ms));
                controller.set_pause(false)?;
            }
        }
    }

    log_stats(&controller);
    controller.disconnect_device();
    Ok(last)
}

fn run_device(
    args: &Args,
    config: PipelineConfig,
    model: CameraModel,
) -> Result<Option<CalibratedFrame>, Box<dyn Error>> {
    let depth_mm = args.depth_mm;
    let frames = args.frames;
    let controller = PipelineController::new(config).with_device_factory(
        move || -> Box<dyn FrameSource> {
            Box::new(SimulatedDevice::uniform(model, depth_mm).with_frame_limit(frames))
        },
    );
    controller.connect_device(0)?;
    controller.set_calibration_enabled(!args.pass_through);
    log_pipeline(&controller);
    info!(dimensions = ?controller.dimensions()?, "Device connected");

    if let Some(ms) = args.paused_for {
        info!(ms, "Holding the device paused");
        thread::sleep(Duration::from_millis(ms));
    }
    controller.set_pause(false)?;

    let mut last: Option<CalibratedFrame> = None;
    while let Some(frame) = wait_for_frame(&controller) {
        debug!(index = frame.index, valid = frame.valid_count(), "Fetched frame");
        let done = frame.index >= frames;
        last = Some(frame);
        if done {
            break;
        }
    }

    log_stats(&controller);
    controller.disconnect_device();
    Ok(last)
}

fn wait_for_frame(controller: &PipelineController) -> Option<CalibratedFrame> {
    let deadline = Instant::now() + FETCH_TIMEOUT;
    while Instant::now() < deadline {
        if let Some(frame) = controller.try_fetch_frame() {
            return Some(frame);
        }
        thread::sleep(Duration::from_millis(1));
    }
    None
}

fn report_frame(frame: &CalibratedFrame) {
    let (cu, cv) = (frame.width / 2, frame.height / 2);
    info!(
        index = frame.index,
        points = frame.len(),
        valid = frame.valid_count(),
        normals = frame.normals_computed,
        processing_time = ?frame.processing_time,
        "Last frame"
    );
    if let Some(corner) = frame.point_at(0, 0) {
        info!(position = %corner.position, "Corner point");
    }
    if let Some(center) = frame.point_at(cu, cv) {
        info!(position = %center.position, normal = %center.normal, "Center point");
    }
}

fn log_pipeline(controller: &PipelineController) {
    let corrector = &controller.config().corrector;
    info!(
        calibration = controller.calibration_enabled(),
        normals = corrector.compute_normals,
        neighborhood = corrector.normal_neighborhood,
        "Pipeline ready"
    );
}

fn log_stats(controller: &PipelineController) {
    let stats = controller.stats();
    info!(
        received = stats.received,
        calibrated = stats.calibrated,
        passed_through = stats.passed_through,
        dropped = stats.dropped,
        skipped_paused = stats.skipped_paused,
        input_overwritten = stats.input_overwritten,
        output_overwritten = stats.output_overwritten,
        fetched = stats.fetched,
        "Pipeline statistics"
    );
}

fn init_logging(logging: &LoggingConfig) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level)),
        )
        .with_target(logging.with_target)
        .init();
}
