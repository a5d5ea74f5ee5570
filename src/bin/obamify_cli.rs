//! Headless driver (spec §6 "CLI"): loads a source image and an optional
//! target, runs the assignment optimizer to completion, drives the
//! transform simulation for a requested number of frames, and writes the
//! resulting preset (source + assignments) plus an optional animated GIF
//! of the morph to disk. No GUI shell — this crate's windowing/rendering
//! layer is out of scope (SPEC_FULL.md Non-goals); this binary exists so
//! the orchestrator and frame-capture contract have a real caller.
//!
//! Grounded in the teacher's `src/main.rs` for the `env_logger::init()` +
//! single-purpose-`main` shape, minus the `eframe`/`egui` window setup this
//! binary has no use for.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use uuid::Uuid;

use obamify::gif_recorder::GifRecorder;
use obamify::preset::{Algorithm, CropScale, GenerationSettings, UnprocessedPreset};
use obamify::progress::{FrameSink, ProgressMsg};
use obamify::{optimizer, presets_io, Orchestrator};

struct Args {
    source: PathBuf,
    target: Option<PathBuf>,
    out_dir: PathBuf,
    sidelen: u32,
    proximity_importance: i64,
    algorithm: Algorithm,
    frames: u32,
    gif_out: Option<PathBuf>,
}

fn parse_args() -> Result<Args, String> {
    let mut source = None;
    let mut target = None;
    let mut out_dir = PathBuf::from("out");
    let mut sidelen = 256u32;
    let mut proximity_importance = 13i64;
    let mut algorithm = Algorithm::Genetic;
    let mut frames = 0u32;
    let mut gif_out = None;

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--source" => source = it.next().map(PathBuf::from),
            "--target" => target = it.next().map(PathBuf::from),
            "--out" => out_dir = it.next().map(PathBuf::from).unwrap_or(out_dir),
            "--sidelen" => {
                sidelen = it
                    .next()
                    .and_then(|v| v.parse().ok())
                    .ok_or("--sidelen requires a number")?
            }
            "--proximity-importance" => {
                proximity_importance = it
                    .next()
                    .and_then(|v| v.parse().ok())
                    .ok_or("--proximity-importance requires a number")?
            }
            "--algorithm" => {
                algorithm = match it.next().as_deref() {
                    Some("greedy") => Algorithm::Optimal,
                    Some("genetic") => Algorithm::Genetic,
                    other => return Err(format!("unknown --algorithm value: {other:?}")),
                }
            }
            "--frames" => {
                frames = it
                    .next()
                    .and_then(|v| v.parse().ok())
                    .ok_or("--frames requires a number")?
            }
            "--gif" => gif_out = it.next().map(PathBuf::from),
            other => return Err(format!("unrecognized argument: {other}")),
        }
    }

    Ok(Args {
        source: source.ok_or("--source <path> is required")?,
        target,
        out_dir,
        sidelen,
        proximity_importance,
        algorithm,
        frames,
        gif_out,
    })
}

fn load_unprocessed(path: &PathBuf) -> obamify::Result<UnprocessedPreset> {
    let img = image::open(path)?.to_rgb8();
    Ok(UnprocessedPreset {
        name: path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("source")
            .to_string(),
        width: img.width(),
        height: img.height(),
        source_img: img.into_raw(),
    })
}

fn run() -> obamify::Result<()> {
    let args = parse_args().map_err(|msg| {
        eprintln!("usage: obamify-cli --source <path> [--target <path>] [--out <dir>] \
                    [--sidelen N] [--proximity-importance N] [--algorithm genetic|greedy] \
                    [--frames N] [--gif <path>]");
        obamify::ObamifyError::MissingPresetFile(msg)
    })?;

    let unprocessed = load_unprocessed(&args.source)?;
    let custom_target = match &args.target {
        Some(path) => Some(obamify::Preset {
            inner: load_unprocessed(path)?,
            assignments: vec![],
        }),
        None => None,
    };

    let mut settings = GenerationSettings::default_with_id(Uuid::new_v4(), unprocessed.name.clone());
    settings.sidelen = args.sidelen;
    settings.proximity_importance = args.proximity_importance;
    settings.algorithm = args.algorithm;
    settings.custom_target = custom_target;
    settings.source_crop_scale = CropScale::default();
    settings.target_crop_scale = CropScale::default();

    log::info!(
        "starting {:?} optimizer for '{}' at sidelen={}",
        settings.algorithm,
        unprocessed.name,
        settings.sidelen
    );

    let mut messages: Vec<ProgressMsg> = Vec::new();
    optimizer::process(unprocessed, settings, &mut messages, Arc::new(AtomicBool::new(false)))?;

    let done = messages.into_iter().find_map(|m| match m {
        ProgressMsg::Done(preset) => Some(preset),
        ProgressMsg::Error(e) => {
            log::error!("optimizer failed: {e}");
            None
        }
        _ => None,
    });

    let preset = done.ok_or_else(|| {
        obamify::ObamifyError::MissingPresetFile("optimizer did not produce a result".into())
    })?;
    presets_io::save_preset_dir(&args.out_dir, &preset)?;
    log::info!("wrote preset to {}", args.out_dir.display());

    if args.frames > 0 {
        drive_simulation(&preset, args.sidelen, args.frames, args.gif_out.as_deref())?;
    }

    Ok(())
}

/// Loads `preset` into an [`Orchestrator`], steps the transform simulation
/// for `frames` frames, and (if `gif_out` is given) captures each rendered
/// frame into an animated GIF via the [`FrameSink`] contract (spec §6
/// "Frame capture contract").
fn drive_simulation(
    preset: &obamify::Preset,
    sidelen: u32,
    frames: u32,
    gif_out: Option<&std::path::Path>,
) -> obamify::Result<()> {
    let mut orchestrator = Orchestrator::new(sidelen, vec![preset.clone()]);
    orchestrator.change_preset(preset.clone(), 0)?;

    let mut recorder = gif_out.map(|_| GifRecorder::new());
    if let Some(recorder) = recorder.as_mut() {
        let sample: Vec<(u8, u8, u8)> = orchestrator.render().pixels().map(|p| (p[0], p[1], p[2])).collect();
        recorder.start(sidelen as u16, sidelen as u16, &sample)?;
    }

    for i in 0..frames {
        let img = orchestrator.step_and_render();
        if let Some(recorder) = recorder.as_mut() {
            let rgba: Vec<u8> = img.pixels().flat_map(|p| [p[0], p[1], p[2], 255]).collect();
            recorder.capture_frame(&rgba, sidelen, sidelen);
            if recorder.should_stop() {
                log::info!("gif recorder reached its frame/size cap at frame {i}");
                break;
            }
        }
    }

    if let (Some(mut recorder), Some(path)) = (recorder, gif_out) {
        let bytes = recorder.finish()?;
        std::fs::write(path, bytes)?;
        log::info!("wrote {} animation frame(s) to {}", recorder.frame_count, path.display());
    }

    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
