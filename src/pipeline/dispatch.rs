// SPDX-License-Identifier: GPL-3.0-only

//! Per-frame branch on the mode snapshot
//!
//! [`Dispatcher::run`] is a pure function of the frame and the mode it is given.
//! The caller reads the shared mode exactly once per frame and passes it in, so a
//! mode switch can only ever land between two frames.

use super::{DisplayPacket, PipelineMode, PipelineState};
use crate::convert;
use crate::display::{TextureId, TextureTransform};
use crate::errors::FrameError;
use crate::filter::{self, CannyParams, EdgeVariant};
use crate::frame::RawFrame;
use serde::{Deserialize, Serialize};

/// How RAW mode reaches the screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawPath {
    /// Display the capture-fed live texture, no CPU work
    #[default]
    ZeroCopy,
    /// Convert YUV to RGBA on the processing thread
    Cpu,
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    edge_variant: EdgeVariant,
    canny: CannyParams,
    raw_path: RawPath,
    live_texture: Option<(TextureId, TextureTransform)>,
}

impl Dispatcher {
    pub fn new(edge_variant: EdgeVariant, canny: CannyParams, raw_path: RawPath) -> Self {
        Self {
            edge_variant,
            canny,
            raw_path,
            live_texture: None,
        }
    }

    /// Texture the capture source streams into, with the transform it reports
    pub fn with_live_texture(mut self, texture: TextureId, transform: TextureTransform) -> Self {
        self.live_texture = Some((texture, transform));
        self
    }

    /// Processing state entered for a frame in `mode`
    pub fn state_for(mode: PipelineMode) -> PipelineState {
        match mode {
            PipelineMode::Raw => PipelineState::PassRaw,
            PipelineMode::Grayscale => PipelineState::ProcessGray,
            PipelineMode::Edges => PipelineState::ProcessEdges,
        }
    }

    /// Turn one frame into a display packet; never touches shared state
    pub fn run(&self, frame: &RawFrame, mode: PipelineMode) -> Result<DisplayPacket, FrameError> {
        let frame_id = frame.frame_id;

        let buffer = match mode {
            PipelineMode::Raw => match (self.raw_path, self.live_texture) {
                (RawPath::ZeroCopy, Some((texture, transform))) => {
                    return Ok(DisplayPacket::LiveTexture {
                        texture,
                        transform,
                        frame_id,
                    });
                }
                (RawPath::ZeroCopy, None) => return Err(FrameError::NoLiveTexture),
                (RawPath::Cpu, _) => convert::to_rgba(frame)?,
            },
            PipelineMode::Grayscale => {
                let luma = convert::to_luma(frame)?;
                convert::luma_to_rgba(&luma)
            }
            PipelineMode::Edges => {
                let luma = convert::to_luma(frame)?;
                let edges = filter::detect_edges_or_blank(&luma, self.edge_variant, &self.canny)?;
                convert::edges_to_rgba(&edges)
            }
        };

        Ok(DisplayPacket::Pixels {
            buffer,
            mode,
            frame_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ConvertError;
    use crate::frame::FrameFormat;

    fn step_frame(width: u32, height: u32) -> RawFrame {
        let luma: Vec<u8> = (0..width * height)
            .map(|i| if i % width < width / 2 { 0 } else { 255 })
            .collect();
        RawFrame::from_luma(width, height, FrameFormat::Nv21, &luma).with_frame_id(7)
    }

    fn sobel_dispatcher(raw_path: RawPath) -> Dispatcher {
        Dispatcher::new(EdgeVariant::Sobel, CannyParams::default(), raw_path)
    }

    #[test]
    fn test_raw_zero_copy_passes_texture() {
        let transform = TextureTransform::from_rotation(90, false);
        let dispatcher =
            sobel_dispatcher(RawPath::ZeroCopy).with_live_texture(TextureId(3), transform);

        let packet = dispatcher
            .run(&step_frame(8, 8), PipelineMode::Raw)
            .unwrap();
        assert_eq!(
            packet,
            DisplayPacket::LiveTexture {
                texture: TextureId(3),
                transform,
                frame_id: 7
            }
        );
    }

    #[test]
    fn test_raw_zero_copy_without_texture() {
        let result = sobel_dispatcher(RawPath::ZeroCopy).run(&step_frame(8, 8), PipelineMode::Raw);
        assert_eq!(result, Err(FrameError::NoLiveTexture));
    }

    #[test]
    fn test_raw_cpu_converts() {
        let packet = sobel_dispatcher(RawPath::Cpu)
            .run(&step_frame(8, 8), PipelineMode::Raw)
            .unwrap();
        let DisplayPacket::Pixels { buffer, mode, .. } = packet else {
            panic!("expected pixels");
        };
        assert_eq!(mode, PipelineMode::Raw);
        assert_eq!(buffer.pixel(0, 0), [0, 0, 0, 255]);
        assert_eq!(buffer.pixel(7, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn test_grayscale_is_luma() {
        let packet = sobel_dispatcher(RawPath::Cpu)
            .run(&step_frame(8, 4), PipelineMode::Grayscale)
            .unwrap();
        let DisplayPacket::Pixels { buffer, .. } = packet else {
            panic!("expected pixels");
        };
        assert!(buffer.is_gray());
        assert_eq!(buffer.pixel(3, 2), [0, 0, 0, 255]);
        assert_eq!(buffer.pixel(4, 2), [255, 255, 255, 255]);
    }

    #[test]
    fn test_edges_mark_step() {
        let packet = sobel_dispatcher(RawPath::Cpu)
            .run(&step_frame(8, 4), PipelineMode::Edges)
            .unwrap();
        let DisplayPacket::Pixels { buffer, .. } = packet else {
            panic!("expected pixels");
        };
        assert_eq!(buffer.pixel(3, 1), [255, 255, 255, 255]);
        assert_eq!(buffer.pixel(4, 1), [255, 255, 255, 255]);
        assert_eq!(buffer.pixel(1, 1), [0, 0, 0, 255]);
    }

    #[test]
    fn test_edges_on_tiny_frame_are_blank() {
        let frame = RawFrame::from_luma(2, 2, FrameFormat::I420, &[0, 255, 0, 255]);
        let packet = sobel_dispatcher(RawPath::Cpu)
            .run(&frame, PipelineMode::Edges)
            .unwrap();
        let DisplayPacket::Pixels { buffer, .. } = packet else {
            panic!("expected pixels");
        };
        assert!(buffer.data.chunks_exact(4).all(|px| px == [0, 0, 0, 255]));
    }

    #[test]
    fn test_bad_frame_is_an_error() {
        let mut frame = step_frame(8, 8);
        frame.format = FrameFormat::Unknown;
        let result = sobel_dispatcher(RawPath::Cpu).run(&frame, PipelineMode::Grayscale);
        assert!(matches!(
            result,
            Err(FrameError::Convert(ConvertError::UnsupportedFormat(_)))
        ));
    }
}
