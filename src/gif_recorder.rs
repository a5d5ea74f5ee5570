//! Animated GIF capture (spec §6 "Recording"): quantizes each captured RGBA
//! frame against a palette built once up front, and bounds the encoded
//! stream by both frame count and byte size.
//!
//! Grounded in the teacher's `app/gif_recorder.rs::GifRecorder`. The
//! GPU-buffer readback (`InFlight`, `poll_inflight`, `get_color_image_data`)
//! and the `rfd` file-dialog save are dropped: this crate's rasterizer runs
//! on the CPU, so a frame's bytes are already in hand the moment
//! [`crate::progress::FrameSink::capture_frame`] is called, and `finish`
//! hands the encoded bytes back to the caller instead of opening a dialog
//! (spec §6 scopes the file-save UI out; the orchestrator/CLI decides where
//! bytes land).

use color_quant::NeuQuant;

use crate::error::{ObamifyError, Result};
use crate::progress::FrameSink;

pub const GIF_FRAMERATE: u32 = 8;
pub const GIF_MAX_FRAMES: u32 = 140;
pub const GIF_MIN_FRAMES: u32 = 100;
pub const GIF_MAX_SIZE: usize = 10 * 1024 * 1024;
pub const GIF_SPEED: f32 = 1.5;
pub const GIF_PALETTE_SAMPLEFAC: i32 = 1;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GifStatus {
    None,
    Recording,
    Complete,
}

pub struct GifRecorder {
    pub status: GifStatus,
    encoder: Option<gif::Encoder<Vec<u8>>>,
    palette: Option<NeuQuant>,
    pub frame_count: u32,
    width: u16,
    height: u16,
    should_stop: bool,
}

impl GifRecorder {
    pub fn new() -> Self {
        Self {
            status: GifStatus::None,
            encoder: None,
            palette: None,
            frame_count: 0,
            width: 0,
            height: 0,
            should_stop: false,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.status == GifStatus::Recording
    }

    /// Builds the shared palette from a representative sample of seed
    /// colors and opens the encoder (teacher's `init_encoder`).
    pub fn start(&mut self, width: u16, height: u16, sample_colors: &[(u8, u8, u8)]) -> Result<()> {
        let flat: Vec<u8> = sample_colors
            .iter()
            .flat_map(|&(r, g, b)| [r, g, b, 255])
            .collect();
        let nq = NeuQuant::new(GIF_PALETTE_SAMPLEFAC, 256, &flat);
        let mut encoder = gif::Encoder::new(vec![], width, height, &nq.color_map_rgb())
            .map_err(|e| ObamifyError::Io(std::io::Error::other(e)))?;
        encoder
            .set_repeat(gif::Repeat::Infinite)
            .map_err(|e| ObamifyError::Io(std::io::Error::other(e)))?;

        self.palette = Some(nq);
        self.encoder = Some(encoder);
        self.width = width;
        self.height = height;
        self.frame_count = 0;
        self.should_stop = false;
        self.status = GifStatus::Recording;
        Ok(())
    }

    /// Quantizes one RGBA frame and appends it (teacher's `try_write_frame`,
    /// minus the GPU-buffer polling — the frame is already in hand here).
    pub fn write_frame(&mut self, rgba: &[u8]) -> Result<()> {
        if !self.is_recording() {
            return Ok(());
        }
        let nq = self.palette.as_ref().expect("recording implies a palette");
        let indices: Vec<u8> = rgba.chunks_exact(4).map(|px| nq.index_of(px) as u8).collect();
        let mut frame = gif::Frame::from_indexed_pixels(self.width, self.height, indices, None);
        frame.delay = ((100.0 / GIF_FRAMERATE as f32) / GIF_SPEED) as u16;

        let encoder = self.encoder.as_mut().expect("recording implies an encoder");
        let projected_size = encoder.get_ref().len() + frame.buffer.len() + 32;
        if projected_size > GIF_MAX_SIZE {
            self.should_stop = true;
            return Ok(());
        }

        encoder
            .write_frame(&frame)
            .map_err(|e| ObamifyError::Io(std::io::Error::other(e)))?;
        self.frame_count += 1;
        Ok(())
    }

    /// `false` below [`GIF_MIN_FRAMES`], `true` at/above [`GIF_MAX_FRAMES`],
    /// otherwise whatever [`GifRecorder::write_frame`] decided (teacher's
    /// `should_stop`).
    pub fn should_stop(&self) -> bool {
        if self.frame_count < GIF_MIN_FRAMES {
            false
        } else if self.frame_count >= GIF_MAX_FRAMES {
            true
        } else {
            self.should_stop
        }
    }

    /// Closes the encoder and returns the finished GIF bytes.
    pub fn finish(&mut self) -> Result<Vec<u8>> {
        let encoder = self.encoder.take().ok_or(ObamifyError::Io(std::io::Error::other(
            "no recording in progress",
        )))?;
        let data = encoder
            .into_inner()
            .map_err(|e| ObamifyError::Io(std::io::Error::other(e)))?;
        self.status = GifStatus::Complete;
        Ok(data)
    }

    pub fn stop(&mut self) {
        self.status = GifStatus::None;
        self.encoder = None;
        self.palette = None;
        self.frame_count = 0;
        self.should_stop = false;
    }
}

impl Default for GifRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for GifRecorder {
    fn capture_frame(&mut self, rgba: &[u8], _width: u32, _height: u32) {
        let _ = self.write_frame(rgba);
    }
}
