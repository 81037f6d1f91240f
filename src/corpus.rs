use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::analysis::{IndexedName, sort_indexed_names};
use crate::model::SlideRecord;
use crate::util::read_json_lenient;

#[derive(Debug, Clone)]
pub struct LectureSlides {
    pub lecture: String,
    pub files: Vec<PathBuf>,
}

pub fn list_lectures(base: &Path) -> Result<Vec<String>> {
    let entries =
        fs::read_dir(base).with_context(|| format!("failed to read {}", base.display()))?;

    let mut lectures = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", base.display()))?;
        let Some(name) = entry.file_name().to_str().map(ToOwned::to_owned) else {
            continue;
        };
        if !name.to_lowercase().starts_with("lecture ") {
            continue;
        }
        if entry
            .file_type()
            .with_context(|| format!("failed to inspect file type: {}", entry.path().display()))?
            .is_dir()
        {
            lectures.push(name);
        }
    }

    sort_indexed_names(&mut lectures);
    Ok(lectures)
}

pub fn list_numbered_files(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to read entry in {}", dir.display()))?;
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| extensions.iter().any(|wanted| ext.eq_ignore_ascii_case(wanted)))
            .unwrap_or(false);
        if matches && path.is_file() {
            files.push(path);
        }
    }

    files.sort_by_cached_key(|path| IndexedName::new(&file_name(path)));
    Ok(files)
}

pub fn scan_by_slide(by_slide_dir: &Path) -> Result<Vec<LectureSlides>> {
    let mut lectures = Vec::new();
    for lecture in list_lectures(by_slide_dir)? {
        let files = list_numbered_files(&by_slide_dir.join(&lecture), &["json"])?;
        lectures.push(LectureSlides { lecture, files });
    }
    Ok(lectures)
}

pub fn load_slide_records(by_slide_dir: &Path) -> Result<Vec<SlideRecord>> {
    let mut records = Vec::new();
    for lecture in scan_by_slide(by_slide_dir)? {
        for path in &lecture.files {
            if let Some(record) = read_json_lenient::<SlideRecord>(path) {
                records.push(record);
            }
        }
        debug!(lecture = %lecture.lecture, slides = lecture.files.len(), "scanned lecture");
    }
    Ok(records)
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(ToOwned::to_owned)
        .unwrap_or_default()
}
