//! Top-level session state (spec §4.H): owns the current [`Simulation`],
//! the active preset, the transform/draw mode, and the single
//! cancellation-capable optimizer session that may be running in the
//! background.
//!
//! Grounded in the teacher's `app.rs::ObamifyApp` (`apply_sim_init`,
//! `change_sim`, `canvas_sim`, `init_canvas`, `reset_sim`): the GPU buffer
//! management is gone (there's no GPU here), but the "swap in a fresh
//! simulation, bump the drawing session id, rebuild shared state" shape is
//! unchanged. Concurrency follows spec §5: a worker thread per optimizer
//! run, talking back over `mpsc::sync_channel`, cancelled cooperatively via
//! `Arc<AtomicBool>`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver};
use std::sync::{Arc, RwLock};
use std::thread::JoinHandle;

use crate::drawing::{DrawingSolver, PixelState};
use crate::error::Result;
use crate::image_ops::{self, RgbPixel};
use crate::optimizer;
use crate::preset::{GenerationSettings, Mode, Preset, UnprocessedPreset};
use crate::progress::ProgressMsg;
use crate::simulation::{pixel_center, Simulation};

/// Destination-force ramp applied once an assignment has been computed for
/// a transform (teacher's hardcoded `0.14` in `morph_sim::init_image`).
pub const TRANSFORM_DST_FORCE: f64 = 0.14;

pub struct Orchestrator {
    pub sidelen: u32,
    pub simulation: Simulation,
    pub mode: Mode,
    pub presets: Vec<Preset>,
    pub current_preset: usize,
    palette: Vec<RgbPixel>,

    optimizer_cancel: Option<Arc<AtomicBool>>,
    optimizer_handle: Option<JoinHandle<()>>,

    drawing_solver: DrawingSolver,
    pixel_state: Arc<RwLock<Vec<PixelState>>>,
    live_colors: Arc<RwLock<Vec<RgbPixel>>>,
}

impl Orchestrator {
    pub fn new(sidelen: u32, presets: Vec<Preset>) -> Self {
        let n = (sidelen * sidelen) as usize;
        let positions: Vec<(f64, f64)> = (0..n).map(|i| pixel_center(i, sidelen)).collect();
        Self {
            sidelen,
            simulation: Simulation::new("empty".into(), sidelen as f64, positions),
            mode: Mode::Transform,
            presets,
            current_preset: 0,
            palette: vec![(0, 0, 0); n],
            optimizer_cancel: None,
            optimizer_handle: None,
            drawing_solver: DrawingSolver::new(sidelen as usize),
            pixel_state: Arc::new(RwLock::new(vec![PixelState::default(); n])),
            live_colors: Arc::new(RwLock::new(vec![(0, 0, 0); n])),
        }
    }

    /// Replaces the running simulation with a freshly assigned one (teacher's
    /// `change_sim` + `apply_sim_init`). Cancels any in-flight optimizer
    /// session first since its result would target the old palette.
    pub fn change_preset(&mut self, preset: Preset, index: usize) -> Result<()> {
        self.cancel_optimizer();

        let img: image::RgbImage = image::ImageBuffer::from_vec(
            preset.inner.width,
            preset.inner.height,
            preset.inner.source_img.clone(),
        )
        .ok_or(crate::error::ObamifyError::InvalidImage)?;
        let cropped = image_ops::crop_and_scale(&img, self.sidelen, Default::default());
        self.palette = image_ops::extract_palette(&cropped);

        let n = self.palette.len();
        let positions: Vec<(f64, f64)> = (0..n).map(|i| pixel_center(i, self.sidelen)).collect();
        self.simulation = Simulation::new(preset.inner.name.clone(), self.sidelen as f64, positions);
        self.simulation.set_assignments(&preset.assignments, self.sidelen, TRANSFORM_DST_FORCE);
        self.simulation.prepare_play(false);

        *self.live_colors.write().unwrap() = self.palette.clone();
        *self.pixel_state.write().unwrap() = vec![PixelState::default(); n];

        self.current_preset = index;
        self.mode = Mode::Transform;
        Ok(())
    }

    /// Starts (or restarts) playback in the requested direction (spec §4.E
    /// "preparePlay", teacher's `reset_sim`): replaying the current
    /// direction restarts the morph from its source; requesting the other
    /// direction flips source/destination in place.
    pub fn prepare_play(&mut self, reverse: bool) {
        self.simulation.prepare_play(reverse);
    }

    /// Advances the simulation one frame, returning the RGB8 image it now
    /// renders as (spec §4.H "Render").
    pub fn step_and_render(&mut self) -> image::RgbImage {
        self.simulation.step();
        if self.mode == Mode::Draw {
            for state in self.pixel_state.write().unwrap().iter_mut() {
                state.last_edited = state.last_edited.saturating_add(1);
            }
        }
        self.render()
    }

    /// Renders the moving particles as a still frame via the Voronoi
    /// rasterizer (spec §4.F): every pixel is colored by its nearest cell,
    /// not merely the cell whose own center it rounds to, so gaps between
    /// sparse cells are filled in exactly like the teacher's GPU jump-flood
    /// pass would.
    pub fn render(&self) -> image::RgbImage {
        let sidelen = self.sidelen;
        let seeds: Vec<crate::voronoi::Seed> = self
            .simulation
            .cells
            .iter()
            .map(|c| crate::voronoi::Seed { x: c.pos_x, y: c.pos_y })
            .collect();
        let nearest = crate::voronoi::rasterize_grid(&seeds, sidelen, sidelen);

        let mut img = image::RgbImage::new(sidelen, sidelen);
        for (p, &seed_idx) in nearest.iter().enumerate() {
            let x = (p as u32) % sidelen;
            let y = (p as u32) / sidelen;
            let (r, g, b) = self.palette[seed_idx as usize];
            img.put_pixel(x, y, image::Rgb([r, g, b]));
        }
        img
    }

    /// Starts a background optimizer run, spawning exactly one worker
    /// thread (spec §5 "exactly one optimizer session at a time"):
    /// cancels and joins any prior session before starting the new one.
    pub fn start_optimizer(
        &mut self,
        unprocessed: UnprocessedPreset,
        settings: GenerationSettings,
    ) -> Receiver<ProgressMsg> {
        self.cancel_optimizer();

        let (tx, rx) = sync_channel::<ProgressMsg>(32);
        let cancel = Arc::new(AtomicBool::new(false));
        self.optimizer_cancel = Some(cancel.clone());

        let handle = std::thread::spawn(move || {
            let mut sender = tx;
            if let Err(e) = optimizer::process(unprocessed, settings, &mut sender, cancel) {
                let _ = sender.send(ProgressMsg::Error(e.to_string()));
            }
        });
        self.optimizer_handle = Some(handle);
        rx
    }

    /// Signals cancellation and joins the worker thread if one is running.
    pub fn cancel_optimizer(&mut self) {
        if let Some(cancel) = self.optimizer_cancel.take() {
            cancel.store(true, Ordering::Relaxed);
        }
        if let Some(handle) = self.optimizer_handle.take() {
            let _ = handle.join();
        }
    }

    /// Switches into drawing mode over a `canvas_size x canvas_size` grid
    /// (teacher's `init_canvas`/`canvas_sim`), bumping the drawing session
    /// id so any solver loop from a previous canvas self-cancels.
    pub fn enter_drawing_mode(&mut self, canvas: UnprocessedPreset, canvas_size: u32) -> Result<()> {
        let img: image::RgbImage =
            image::ImageBuffer::from_vec(canvas.width, canvas.height, canvas.source_img.clone())
                .ok_or(crate::error::ObamifyError::InvalidImage)?;
        let cropped = image_ops::crop_and_scale(&img, canvas_size, Default::default());
        self.palette = image_ops::extract_palette(&cropped);

        let n = self.palette.len();
        let positions: Vec<(f64, f64)> = (0..n).map(|i| pixel_center(i, canvas_size)).collect();
        self.sidelen = canvas_size;
        self.simulation = Simulation::new("canvas".into(), canvas_size as f64, positions);
        self.drawing_solver = DrawingSolver::new(canvas_size as usize);

        *self.live_colors.write().unwrap() = self.palette.clone();
        *self.pixel_state.write().unwrap() = vec![PixelState::default(); n];
        self.mode = Mode::Draw;
        self.drawing_solver.next_session();
        Ok(())
    }

    /// Marks a pixel as freshly touched by a brush stroke (teacher's
    /// `draw`): resets its age and records the stroke id so the drawing
    /// solver's `stroke_reward` keeps the stroke contiguous.
    pub fn paint_pixel(&mut self, p: usize, stroke_id: u32) {
        if let Some(state) = self.pixel_state.write().unwrap().get_mut(p) {
            state.last_edited = 0;
            state.stroke_id = stroke_id;
        }
    }

    /// Spawns a continuous drawing-solver session. Returns the session id
    /// so the caller can detect, via [`Orchestrator::is_current_drawing_session`],
    /// when a later stroke has superseded it.
    pub fn start_drawing_session(&mut self, weights: &[i64], w_spatial: f64) -> (u32, Receiver<ProgressMsg>) {
        let my_id = self.drawing_solver.next_session();
        let (tx, rx) = sync_channel::<ProgressMsg>(32);
        let palette = self.palette.clone();
        let colors = self.live_colors.clone();
        let state = self.pixel_state.clone();
        let assignments: Vec<usize> = (0..palette.len()).collect();
        let weights = weights.to_vec();
        let current_id = self.drawing_solver.current_id.clone();
        let canvas_size = self.sidelen as usize;
        let seed = format!("draw-{my_id}");

        std::thread::spawn(move || {
            let solver = DrawingSolver {
                canvas_size,
                current_id,
            };
            let mut sender = tx;
            solver.run(my_id, &palette, colors, state, assignments, &weights, w_spatial, &seed, &mut sender);
        });
        (my_id, rx)
    }

    pub fn is_current_drawing_session(&self, id: u32) -> bool {
        self.drawing_solver.current_id.load(Ordering::SeqCst) == id
    }
}
