//! Worker <-> host messaging (spec §6 "Worker protocol"): a small tagged
//! union, emitted in monotonic order, with `Done`/`Cancelled`/`Error` as
//! terminal variants. Grounded in the teacher's `calculate::ProgressMsg`.

use crate::preset::Preset;

#[derive(Debug)]
pub enum ProgressMsg {
    Progress(f32),
    UpdatePreview {
        width: u32,
        height: u32,
        /// Row-major RGB8 bytes, length `width * height * 3`.
        data: Vec<u8>,
    },
    /// Drawing solver only: a new permutation to apply immediately.
    UpdateAssignments(Vec<usize>),
    Done(Preset),
    Error(String),
    Cancelled,
}

impl ProgressMsg {
    pub fn type_name(&self) -> &'static str {
        match self {
            ProgressMsg::Progress(_) => "progress",
            ProgressMsg::UpdatePreview { .. } => "update_preview",
            ProgressMsg::UpdateAssignments(_) => "update_assignments",
            ProgressMsg::Done(_) => "done",
            ProgressMsg::Error(_) => "error",
            ProgressMsg::Cancelled => "cancelled",
        }
    }
}

/// Anything a solver can push progress messages into. Implemented for
/// `mpsc::SyncSender` (the native worker-thread path) and for closures, the
/// same dual-adapter pattern the teacher uses to let WASM workers post
/// messages without a channel.
pub trait ProgressSink {
    fn send(&mut self, msg: ProgressMsg);
}

impl ProgressSink for std::sync::mpsc::SyncSender<ProgressMsg> {
    fn send(&mut self, msg: ProgressMsg) {
        let _ = std::sync::mpsc::SyncSender::send(self, msg);
    }
}

impl<F> ProgressSink for F
where
    F: FnMut(ProgressMsg),
{
    fn send(&mut self, msg: ProgressMsg) {
        self(msg)
    }
}

/// The frame-capture contract (spec §6): the orchestrator calls this once
/// per rendered frame while recording is active. What happens to the bytes
/// is the sink's business — it may accumulate, downsample, or discard.
pub trait FrameSink {
    fn capture_frame(&mut self, rgba: &[u8], width: u32, height: u32);
}

impl ProgressSink for Vec<ProgressMsg> {
    fn send(&mut self, msg: ProgressMsg) {
        self.push(msg);
    }
}

impl FrameSink for Vec<Vec<u8>> {
    fn capture_frame(&mut self, rgba: &[u8], _width: u32, _height: u32) {
        self.push(rgba.to_vec());
    }
}
