//! On-disk preset loading (spec §6 "Preset directory"): each preset is a
//! directory holding `source.png` and `assignments.json`, the same pair the
//! teacher embeds at compile time via `include_presets!`. This crate has no
//! fixed gallery to embed (presets are user-supplied), so loading happens
//! at runtime from an arbitrary directory instead.

use std::path::Path;

use crate::error::{ObamifyError, Result};
use crate::preset::{Preset, UnprocessedPreset};

/// Loads `dir/source.png` + `dir/assignments.json` into a [`Preset`] named
/// after the directory's final path component.
pub fn load_preset_dir(dir: &Path) -> Result<Preset> {
    let name = dir
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("preset")
        .to_string();

    let source_path = dir.join("source.png");
    if !source_path.exists() {
        return Err(ObamifyError::MissingPresetFile(
            source_path.display().to_string(),
        ));
    }
    let img = image::open(&source_path)?.to_rgb8();

    let assignments_path = dir.join("assignments.json");
    if !assignments_path.exists() {
        return Err(ObamifyError::MissingPresetFile(
            assignments_path.display().to_string(),
        ));
    }
    let assignments_json = std::fs::read_to_string(&assignments_path)?;
    let assignments: Vec<usize> = serde_json::from_str(&assignments_json)?;

    let n = (img.width() * img.height()) as usize;
    if assignments.len() != n {
        return Err(ObamifyError::AssignmentLengthMismatch {
            got: assignments.len(),
            expected: n,
        });
    }
    for &idx in &assignments {
        if idx >= n {
            return Err(ObamifyError::AssignmentIndexOutOfRange { index: idx, n });
        }
    }

    Ok(Preset {
        inner: UnprocessedPreset {
            name,
            width: img.width(),
            height: img.height(),
            source_img: img.into_raw(),
        },
        assignments,
    })
}

/// Reads `root/index.json` (spec §6: "a `presets/index.json` (array of
/// names) is optional") as an ordered list of subdirectory names.
pub fn load_preset_index(root: &Path) -> Result<Option<Vec<String>>> {
    let index_path = root.join("index.json");
    if !index_path.exists() {
        return Ok(None);
    }
    let json = std::fs::read_to_string(&index_path)?;
    let names: Vec<String> = serde_json::from_str(&json)?;
    Ok(Some(names))
}

/// Loads the preset gallery under `root`: if `root/index.json` is present,
/// loads exactly the named subdirectories in that order; otherwise probes
/// every immediate subdirectory (spec §6 "absent, the loader probes a
/// default list"), skipping entries that aren't a valid preset pair rather
/// than failing the whole gallery load.
pub fn load_preset_gallery(root: &Path) -> Result<Vec<Preset>> {
    if let Some(names) = load_preset_index(root)? {
        return Ok(names
            .into_iter()
            .filter_map(|name| load_preset_dir(&root.join(name)).ok())
            .collect());
    }

    let mut presets = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Ok(preset) = load_preset_dir(&entry.path()) {
            presets.push(preset);
        }
    }
    Ok(presets)
}

/// Writes a [`Preset`] back out as `dir/source.png` + `dir/assignments.json`,
/// creating `dir` if needed.
pub fn save_preset_dir(dir: &Path, preset: &Preset) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let img: image::RgbImage = image::ImageBuffer::from_vec(
        preset.inner.width,
        preset.inner.height,
        preset.inner.source_img.clone(),
    )
    .ok_or(ObamifyError::InvalidImage)?;
    img.save(dir.join("source.png"))?;
    let json = serde_json::to_string(&preset.assignments)?;
    std::fs::write(dir.join("assignments.json"), json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_preset_through_a_temp_directory() {
        let dir = std::env::temp_dir().join(format!("obamify-preset-test-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);

        let preset = Preset {
            inner: UnprocessedPreset {
                name: "ignored-on-save".into(),
                width: 2,
                height: 2,
                source_img: vec![1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12],
            },
            assignments: vec![3, 2, 1, 0],
        };

        save_preset_dir(&dir, &preset).unwrap();
        let loaded = load_preset_dir(&dir).unwrap();
        assert_eq!(loaded.inner.width, 2);
        assert_eq!(loaded.inner.height, 2);
        assert_eq!(loaded.assignments, vec![3, 2, 1, 0]);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_source_png_is_an_error() {
        let dir = std::env::temp_dir().join(format!("obamify-preset-missing-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        let err = load_preset_dir(&dir).unwrap_err();
        assert!(matches!(err, ObamifyError::MissingPresetFile(_)));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn assignment_length_mismatch_is_rejected() {
        let dir = std::env::temp_dir().join(format!("obamify-preset-mismatch-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let preset = Preset {
            inner: UnprocessedPreset {
                name: "x".into(),
                width: 2,
                height: 2,
                source_img: vec![0; 12],
            },
            assignments: vec![0, 1, 2, 3],
        };
        save_preset_dir(&dir, &preset).unwrap();
        std::fs::write(dir.join("assignments.json"), "[0,1]").unwrap();
        let err = load_preset_dir(&dir).unwrap_err();
        assert!(matches!(err, ObamifyError::AssignmentLengthMismatch { .. }));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn gallery_honours_index_json_order_when_present() {
        let root = std::env::temp_dir().join(format!("obamify-gallery-index-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root).unwrap();

        let preset = |n: &str| Preset {
            inner: UnprocessedPreset {
                name: n.into(),
                width: 1,
                height: 1,
                source_img: vec![0, 0, 0],
            },
            assignments: vec![0],
        };
        save_preset_dir(&root.join("b"), &preset("b")).unwrap();
        save_preset_dir(&root.join("a"), &preset("a")).unwrap();
        std::fs::write(root.join("index.json"), r#"["b","a"]"#).unwrap();

        let gallery = load_preset_gallery(&root).unwrap();
        assert_eq!(gallery.len(), 2);
        assert_eq!(gallery[0].inner.name, "b");
        assert_eq!(gallery[1].inner.name, "a");

        std::fs::remove_dir_all(&root).unwrap();
    }

    #[test]
    fn gallery_without_index_json_probes_subdirectories() {
        let root = std::env::temp_dir().join(format!("obamify-gallery-probe-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&root);
        std::fs::create_dir_all(&root).unwrap();
        assert!(load_preset_index(&root).unwrap().is_none());
        std::fs::remove_dir_all(&root).unwrap();
    }
}
