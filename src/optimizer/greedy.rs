//! Deterministic nearest-match solver (spec §4.C "Optimal"): for each target
//! slot in row-major order, pick whichever unclaimed source pixel minimizes
//! the heuristic cost against it. O(N^2) and intentionally simple — spec.md
//! documents this as a stand-in for a true assignment solver (the teacher's
//! `calculate::process_optimal` is a full Kuhn-Munkres implementation via
//! `pathfinding`, which this crate no longer depends on; see DESIGN.md).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{ObamifyError, Result};
use crate::image_ops;
use crate::math;
use crate::preset::{GenerationSettings, Preset, UnprocessedPreset};
use crate::progress::{ProgressMsg, ProgressSink};

use super::prepare_images;

pub fn run<S: ProgressSink>(
    unprocessed: UnprocessedPreset,
    settings: GenerationSettings,
    tx: &mut S,
    cancel: Arc<AtomicBool>,
) -> Result<()> {
    let prepared = prepare_images(&unprocessed, &settings)?;
    let sidelen = settings.sidelen;
    let n = prepared.source_pixels.len();
    let w_spatial = settings.proximity_importance as f64;

    let pos_of = |p: usize| -> (f64, f64) { ((p as u32 % sidelen) as f64, (p as u32 / sidelen) as f64) };

    let mut claimed = vec![false; n];
    let mut assignments = vec![usize::MAX; n];
    let mut consumed = 0usize;

    for t in 0..n {
        if cancel.load(Ordering::Relaxed) {
            tx.send(ProgressMsg::Cancelled);
            return Ok(());
        }

        let tpos = pos_of(t);
        let mut best: Option<(usize, f64)> = None;
        for (s, &rgb) in prepared.source_pixels.iter().enumerate() {
            if claimed[s] {
                continue;
            }
            let spos = pos_of(s);
            let h = math::heuristic(spos, tpos, rgb, prepared.target_pixels[t], prepared.weights[t] as f64, w_spatial);
            if best.map_or(true, |(_, bh)| h < bh) {
                best = Some((s, h));
            }
        }

        let (chosen, _) = best.ok_or(ObamifyError::IncompleteAssignment {
            consumed,
            expected: n,
        })?;
        claimed[chosen] = true;
        assignments[t] = chosen;
        consumed += 1;

        if t % 100 == 0 {
            tx.send(ProgressMsg::Progress((t as f32 / n.max(1) as f32).clamp(0.0, 1.0)));
        }
    }

    if consumed != n {
        return Err(ObamifyError::IncompleteAssignment { consumed, expected: n });
    }

    let cropped = image_ops::assignments_to_image(&prepared.source_pixels, &(0..n).collect::<Vec<_>>(), sidelen);
    tx.send(ProgressMsg::Done(Preset {
        inner: UnprocessedPreset {
            name: settings.name.clone(),
            width: sidelen,
            height: sidelen,
            source_img: cropped.into_raw(),
        },
        assignments,
    }));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_ops::RgbPixel;
    use uuid::Uuid;

    fn unprocessed(sidelen: u32, pixels: Vec<RgbPixel>) -> UnprocessedPreset {
        let mut bytes = Vec::with_capacity(pixels.len() * 3);
        for (r, g, b) in pixels {
            bytes.extend_from_slice(&[r, g, b]);
        }
        UnprocessedPreset {
            name: "t".into(),
            width: sidelen,
            height: sidelen,
            source_img: bytes,
        }
    }

    #[test]
    fn identity_input_yields_identity_assignment() {
        let sidelen = 4;
        let pixels: Vec<RgbPixel> = (0..sidelen * sidelen)
            .map(|i| ((i * 11 % 256) as u8, (i * 5 % 256) as u8, (i * 3 % 256) as u8))
            .collect();
        let up = unprocessed(sidelen, pixels);
        let mut settings = GenerationSettings::default_with_id(Uuid::nil(), "t".into());
        settings.sidelen = sidelen;
        settings.algorithm = crate::preset::Algorithm::Optimal;

        let mut msgs: Vec<ProgressMsg> = Vec::new();
        run(up, settings, &mut msgs, Arc::new(AtomicBool::new(false))).unwrap();

        let done = msgs
            .into_iter()
            .find_map(|m| match m {
                ProgressMsg::Done(p) => Some(p),
                _ => None,
            })
            .unwrap();
        assert_eq!(done.assignments, (0..(sidelen * sidelen) as usize).collect::<Vec<_>>());
    }

    #[test]
    fn assignment_is_a_bijection() {
        let sidelen = 6;
        let pixels: Vec<RgbPixel> = (0..sidelen * sidelen)
            .map(|i| ((i * 17 % 256) as u8, (i * 29 % 256) as u8, (i * 7 % 256) as u8))
            .collect();
        let up = unprocessed(sidelen, pixels);
        let mut settings = GenerationSettings::default_with_id(Uuid::nil(), "t".into());
        settings.sidelen = sidelen;
        settings.algorithm = crate::preset::Algorithm::Optimal;

        let mut msgs: Vec<ProgressMsg> = Vec::new();
        run(up, settings, &mut msgs, Arc::new(AtomicBool::new(false))).unwrap();
        let done = msgs
            .into_iter()
            .find_map(|m| match m {
                ProgressMsg::Done(p) => Some(p),
                _ => None,
            })
            .unwrap();

        let mut seen = vec![false; (sidelen * sidelen) as usize];
        for &s in &done.assignments {
            assert!(!seen[s], "source pixel {s} used twice");
            seen[s] = true;
        }
        assert!(seen.iter().all(|&b| b));
    }

    #[test]
    fn cancellation_is_reported_without_a_done_message() {
        let sidelen = 8;
        let pixels: Vec<RgbPixel> = (0..sidelen * sidelen).map(|i| ((i % 256) as u8, 0, 0)).collect();
        let up = unprocessed(sidelen, pixels);
        let mut settings = GenerationSettings::default_with_id(Uuid::nil(), "t".into());
        settings.sidelen = sidelen;
        settings.algorithm = crate::preset::Algorithm::Optimal;

        let mut msgs: Vec<ProgressMsg> = Vec::new();
        run(up, settings, &mut msgs, Arc::new(AtomicBool::new(true))).unwrap();
        assert!(matches!(msgs.last(), Some(ProgressMsg::Cancelled)));
    }
}
