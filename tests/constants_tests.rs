// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use openedge::constants::*;
use std::time::Duration;

#[test]
fn test_canny_thresholds_ordered() {
    assert!(CANNY_LOW_THRESHOLD < CANNY_HIGH_THRESHOLD);
    assert!(CANNY_HIGH_THRESHOLD <= 255.0);
}

#[test]
fn test_blur_kernel_is_odd() {
    assert_eq!(CANNY_BLUR_SIZE % 2, 1);
    assert!(CANNY_BLUR_SIGMA > 0.0);
}

#[test]
fn test_fps_window_can_measure() {
    // Two timestamps are the minimum for one interval
    assert!(FPS_WINDOW >= 2);
    assert!(FPS_REPORT_INTERVAL > Duration::ZERO);
}

#[test]
fn test_stencil_minimum() {
    assert_eq!(MIN_FILTER_DIMENSION, 3);
}

#[test]
fn test_app_version_set() {
    assert!(!app_version().is_empty());
}
