// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Running the live pipeline against the synthetic camera
//! - Processing a single still image
//! - Printing the effective configuration

use openedge::capture::{SyntheticCamera, TestPattern};
use openedge::config::Config;
use openedge::display::{
    GpuBackend, RecordingBackend, RenderThread, ShaderVariant, TextureId, TextureTransform,
    WgpuBackend,
};
use openedge::errors::{AppResult, DisplayError};
use openedge::filter::EdgeVariant;
use openedge::frame::{FrameFormat, RgbaBuffer};
use openedge::pipeline::{DisplayPacket, DisplayTarget, FramePipeline, PipelineMode, PipelineSettings};
use openedge::viewer;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Overrides for `openedge live`; `None` keeps the configured value
#[derive(Debug, Default)]
pub struct LiveOptions {
    pub mode: Option<PipelineMode>,
    pub frames: Option<u64>,
    pub pattern: Option<TestPattern>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub variant: Option<EdgeVariant>,
    pub format: Option<FrameFormat>,
    pub rotation: Option<u32>,
    pub cycle_modes: bool,
}

/// Run the synthetic camera through the full pipeline until Ctrl+C or `frames`
pub fn run_live(options: LiveOptions) -> AppResult<()> {
    let mut config = Config::load()?;
    if let Some(mode) = options.mode {
        config.mode = mode;
    }
    if let Some(pattern) = options.pattern {
        config.synthetic.pattern = pattern;
    }
    if let Some(width) = options.width {
        config.preview_width = width;
    }
    if let Some(height) = options.height {
        config.preview_height = height;
    }
    if let Some(variant) = options.variant {
        config.live_variant = variant;
    }
    if let Some(format) = options.format {
        config.synthetic.format = format;
    }
    if let Some(rotation) = options.rotation {
        config.synthetic.rotation = rotation;
    }
    config.validate()?;

    let (width, height) = (config.preview_width, config.preview_height);
    let settings = PipelineSettings::from_config(&config);
    let mut render = spawn_renderer(width, height, settings.setup_timeout)?;

    let camera = SyntheticCamera::with_pool_size(config.synthetic.clone(), config.capture_pool_size);
    let display: Arc<dyn DisplayTarget> = Arc::new(render.handle());
    let mut pipeline = FramePipeline::new(Box::new(camera), display, settings);

    pipeline.on_fps(|fps| info!(fps = format!("{:.1}", fps), "Preview frame rate"));
    let frames_shown = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&frames_shown);
    pipeline.on_frame(move |_| {
        counter.fetch_add(1, Ordering::Relaxed);
    });

    // Set up Ctrl+C handler
    let stop_flag = Arc::new(AtomicBool::new(false));
    let stop_flag_clone = Arc::clone(&stop_flag);
    ctrlc::set_handler(move || {
        stop_flag_clone.store(true, Ordering::SeqCst);
    })?;

    println!(
        "Live preview {}x{} ({}, {} pattern, {} edges). Press Ctrl+C to stop.",
        width, height, config.mode, config.synthetic.format, config.live_variant
    );
    pipeline.start(width, height)?;

    let started = Instant::now();
    let mut last_report = Instant::now();
    let mut last_cycle = Instant::now();
    while !stop_flag.load(Ordering::SeqCst) {
        if options
            .frames
            .is_some_and(|limit| frames_shown.load(Ordering::Relaxed) >= limit)
        {
            break;
        }
        if options.cycle_modes && last_cycle.elapsed() >= Duration::from_secs(2) {
            pipeline.set_mode(pipeline.mode().next());
            last_cycle = Instant::now();
        }
        if last_report.elapsed() >= Duration::from_secs(1) {
            print!(
                "\r{:>6} frames  {:>5.1} fps  mode {:<9}",
                frames_shown.load(Ordering::Relaxed),
                pipeline.current_fps(),
                pipeline.mode().name()
            );
            let _ = std::io::stdout().flush();
            last_report = Instant::now();
        }
        thread::sleep(Duration::from_millis(20));
    }
    println!();

    pipeline.stop();
    let stats = pipeline.stats();
    let render_stats = render.stats();
    render.shutdown();

    println!("Ran for {:.1}s", started.elapsed().as_secs_f32());
    println!(
        "Frames: {} received, {} processed, {} superseded, {} errors",
        stats.received, stats.processed, stats.superseded, stats.dropped_errors
    );
    println!(
        "Display: {} presented, {} superseded, {} live updates",
        render_stats.presented, render_stats.superseded, render_stats.live_updates
    );
    Ok(())
}

/// Process one still image, present it once and optionally save the result
pub fn view_image(path: &Path, mode: PipelineMode, output: Option<PathBuf>) -> AppResult<()> {
    let config = Config::load()?;
    let rendered = viewer::process_image(path, mode, &config)?;
    let (width, height) = (rendered.width, rendered.height);

    let mut render = spawn_renderer(
        width,
        height,
        Duration::from_millis(config.render_setup_timeout_ms),
    )?;
    let handle = render.handle();
    let packet = DisplayPacket::Pixels {
        buffer: rendered.clone(),
        mode,
        frame_id: 0,
    };
    handle.submit(packet);

    let deadline = Instant::now() + Duration::from_millis(config.render_setup_timeout_ms);
    while handle.stats().presented == 0 && handle.is_alive() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
    if handle.stats().presented == 0 {
        warn!("Still image was not presented");
    }
    render.shutdown();

    println!("{} ({}x{}) shown as {}", path.display(), width, height, mode);

    if let Some(output) = output {
        let image = image::RgbaImage::from_raw(width, height, rendered.data)
            .ok_or("processed image has an unexpected size")?;
        image.save(&output)?;
        println!("Saved to: {}", output.display());
    }
    Ok(())
}

pub fn print_config() -> AppResult<()> {
    let config = Config::load()?;
    match Config::path() {
        Some(path) => eprintln!("# {}", path.display()),
        None => eprintln!("# no config directory, showing defaults"),
    }
    println!("{}", config.to_json()?);
    Ok(())
}

/// Real GPU when one is present, otherwise the recording backend
enum PreviewBackend {
    Gpu(Box<WgpuBackend>),
    Headless(RecordingBackend),
}

impl GpuBackend for PreviewBackend {
    fn create_texture(&mut self, width: u32, height: u32) -> Result<TextureId, DisplayError> {
        match self {
            Self::Gpu(backend) => backend.create_texture(width, height),
            Self::Headless(backend) => backend.create_texture(width, height),
        }
    }

    fn destroy_texture(&mut self, texture: TextureId) {
        match self {
            Self::Gpu(backend) => backend.destroy_texture(texture),
            Self::Headless(backend) => backend.destroy_texture(texture),
        }
    }

    fn upload(&mut self, texture: TextureId, image: &RgbaBuffer) -> Result<(), DisplayError> {
        match self {
            Self::Gpu(backend) => backend.upload(texture, image),
            Self::Headless(backend) => backend.upload(texture, image),
        }
    }

    fn draw(
        &mut self,
        variant: ShaderVariant,
        texture: TextureId,
        transform: &TextureTransform,
    ) -> Result<(), DisplayError> {
        match self {
            Self::Gpu(backend) => backend.draw(variant, texture, transform),
            Self::Headless(backend) => backend.draw(variant, texture, transform),
        }
    }

    fn present(&mut self) -> Result<(), DisplayError> {
        match self {
            Self::Gpu(backend) => backend.present(),
            Self::Headless(backend) => backend.present(),
        }
    }
}

fn spawn_renderer(
    width: u32,
    height: u32,
    timeout: Duration,
) -> Result<RenderThread, DisplayError> {
    RenderThread::spawn(
        move || match WgpuBackend::new(width, height) {
            Ok(backend) => {
                let device = backend.device_info();
                info!(adapter = %device.adapter_name, backend = ?device.backend, "Rendering on GPU");
                Ok(PreviewBackend::Gpu(Box::new(backend)))
            }
            Err(DisplayError::AdapterUnavailable(reason)) => {
                warn!(%reason, "No GPU adapter, rendering headless");
                Ok(PreviewBackend::Headless(RecordingBackend::new()))
            }
            Err(e) => Err(e),
        },
        timeout,
    )
}
