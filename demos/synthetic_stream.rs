//! Example streaming synthetic frames through a pipeline on two threads.
//!
//! This example:
//! 1. Attaches a 320x240 camera model
//! 2. Spawns a producer submitting a slowly receding tilted wall
//! 3. Fetches calibrated clouds on the main thread and prints their centers
//!
//! Run with: `cargo run --example synthetic_stream`

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use depthcal::{CameraModel, PipelineConfig, PipelineController};
use tracing::info;

const WIDTH: u32 = 320;
const HEIGHT: u32 = 240;
const FRAMES: u64 = 60;

fn wall(index: u64) -> Vec<u16> {
    let base = 800 + index as u32 * 5;
    (0..HEIGHT)
        .flat_map(|_| (0..WIDTH).map(move |u| (base + u) as u16))
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let model = Arc::new(CameraModel::new(262.5, 262.5, 159.5, 119.5, WIDTH, HEIGHT));
    let controller = Arc::new(PipelineController::new(PipelineConfig::default()));
    controller.set_camera_models(Arc::clone(&model), model)?;

    let producer = {
        let controller = Arc::clone(&controller);
        thread::spawn(move || -> Result<(), depthcal::PipelineError> {
            let color = vec![90u8; (WIDTH * HEIGHT * 3) as usize];
            for index in 1..=FRAMES {
                controller.submit_frame(wall(index), color.clone(), index)?;
                thread::sleep(Duration::from_millis(10));
            }
            Ok(())
        })
    };

    let deadline = Instant::now() + Duration::from_secs(10);
    let mut last_index = 0;
    while last_index < FRAMES && Instant::now() < deadline {
        let Some(frame) = controller.try_fetch_frame() else {
            thread::sleep(Duration::from_millis(1));
            continue;
        };
        last_index = frame.index;
        if let Some(center) = frame.point_at(WIDTH / 2, HEIGHT / 2) {
            info!(
                index = frame.index,
                position = %center.position,
                normal = %center.normal,
                took = ?frame.processing_time,
                "Frame"
            );
        }
    }

    producer
        .join()
        .map_err(|_| "producer thread panicked")??;

    let stats = controller.stats();
    info!(
        received = stats.received,
        produced = stats.produced(),
        fetched = stats.fetched,
        input_overwritten = stats.input_overwritten,
        output_overwritten = stats.output_overwritten,
        "Finished"
    );
    Ok(())
}
