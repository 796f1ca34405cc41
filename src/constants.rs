// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

use std::time::Duration;

/// Canny low hysteresis threshold (0-255 magnitude scale)
pub const CANNY_LOW_THRESHOLD: f32 = 50.0;

/// Canny high hysteresis threshold (0-255 magnitude scale)
pub const CANNY_HIGH_THRESHOLD: f32 = 150.0;

/// Gaussian pre-blur kernel size for the Canny path (taps per axis)
pub const CANNY_BLUR_SIZE: usize = 5;

/// Gaussian pre-blur sigma for the Canny path
pub const CANNY_BLUR_SIGMA: f32 = 1.5;

/// Smallest frame edge the 3x3 stencils can run on
pub const MIN_FILTER_DIMENSION: u32 = 3;

/// Number of arrival timestamps kept for FPS smoothing
pub const FPS_WINDOW: usize = 30;

/// How often registered FPS callbacks are invoked
pub const FPS_REPORT_INTERVAL: Duration = Duration::from_millis(500);

/// No displayed frame for this long and the reported rate drops to 0
pub const FPS_STALE_AFTER: Duration = Duration::from_secs(1);

/// How long the coordinator waits for the render thread to hand back a texture
pub const RENDER_SETUP_TIMEOUT: Duration = Duration::from_secs(2);

/// Default number of capture buffers in flight (mirrors a typical camera HAL queue)
pub const CAPTURE_POOL_SIZE: usize = 3;

/// Default preview size requested from the capture source
pub const DEFAULT_PREVIEW_WIDTH: u32 = 640;
pub const DEFAULT_PREVIEW_HEIGHT: u32 = 480;

/// Synthetic camera frame interval (~30fps)
pub const SYNTHETIC_FRAME_INTERVAL: Duration = Duration::from_millis(33);

/// Depth of the render thread's control queue
pub const RENDER_COMMAND_QUEUE_DEPTH: usize = 8;

/// Config file name inside the application config directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Application directory name under the user config dir
pub const APP_DIR_NAME: &str = "openedge";

/// Version string stamped by build.rs
pub fn app_version() -> &'static str {
    env!("GIT_VERSION")
}
