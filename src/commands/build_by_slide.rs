use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use super::StageOutcome;
use crate::analysis::trailing_index;
use crate::config::PipelineConfig;
use crate::corpus::{file_name, list_lectures, list_numbered_files};
use crate::model::{AnnotationPayload, ModelAnnotations, SlidePaths, SlideRecord};
use crate::util::{read_json_lenient, write_json_pretty};

const STAGE: &str = "build-by-slide";
const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

pub fn run(config: &PipelineConfig) -> Result<StageOutcome> {
    if !config.corpus_dir.is_dir() {
        warn!(path = %config.corpus_dir.display(), "corpus directory not found");
        return Ok(StageOutcome::skipped(STAGE));
    }

    let by_slide_dir = config.by_slide_dir();
    info!(path = %by_slide_dir.display(), "building by-slide records");

    let mut outputs = Vec::new();
    for lecture in list_lectures(&config.corpus_dir)? {
        let lecture_dir = config.corpus_dir.join(&lecture);
        let slides = list_slide_numbers(&lecture_dir)?;
        if slides.is_empty() {
            continue;
        }

        info!(lecture = %lecture, slides = slides.len(), "processing lecture");
        for slide in slides {
            let record = build_slide_record(&lecture, &lecture_dir, slide, &config.models)?;
            let out_path = by_slide_dir
                .join(&lecture)
                .join(format!("{}.json", record.slide_id));
            write_json_pretty(&out_path, &record)?;
            outputs.push(out_path);
        }
    }

    info!(slides = outputs.len(), path = %by_slide_dir.display(), "by-slide build completed");
    Ok(StageOutcome::completed(STAGE, outputs.len(), outputs))
}

pub fn list_slide_numbers(lecture_dir: &Path) -> Result<Vec<u32>> {
    let image_dir = lecture_dir.join("Images");
    if !image_dir.is_dir() {
        return Ok(Vec::new());
    }

    let numbers = list_numbered_files(&image_dir, &IMAGE_EXTENSIONS)?
        .iter()
        .map(|path| file_name(path))
        .filter(|name| name.to_lowercase().starts_with("slide"))
        .filter_map(|name| trailing_index(&name))
        .collect::<BTreeSet<u32>>();

    Ok(numbers.into_iter().collect())
}

pub fn build_slide_record(
    lecture: &str,
    lecture_dir: &Path,
    slide: u32,
    models: &[String],
) -> Result<SlideRecord> {
    let slide_id = format!("Slide{slide}");
    let image_path = resolve_image_path(lecture_dir, &slide_id);
    let text_path = lecture_dir.join("Texts").join(format!("{slide_id}.txt"));

    let mut entries = BTreeMap::<String, Value>::new();
    for model in models {
        let model_dir = lecture_dir.join("Outputs").join(model);
        let annotations = ModelAnnotations {
            concepts: load_payload(&model_dir.join("concepts").join(format!("{slide_id}.json")))?,
            triples: load_payload(&model_dir.join("triples").join(format!("{slide_id}.json")))?,
        };
        let entry = serde_json::to_value(&annotations)
            .with_context(|| format!("failed to encode {model} entry for {lecture}/{slide_id}"))?;
        entries.insert(model.clone(), entry);
    }

    Ok(SlideRecord {
        lecture: lecture.to_string(),
        slide_id,
        paths: SlidePaths {
            image: Some(image_path.display().to_string()),
            text: Some(text_path.display().to_string()),
        },
        models: entries,
    })
}

fn resolve_image_path(lecture_dir: &Path, slide_id: &str) -> PathBuf {
    let image_dir = lecture_dir.join("Images");
    let preferred = image_dir.join(format!("{slide_id}.JPG"));
    if preferred.exists() {
        return preferred;
    }

    IMAGE_EXTENSIONS
        .iter()
        .map(|ext| image_dir.join(format!("{slide_id}.{ext}")))
        .find(|candidate| candidate.exists())
        .unwrap_or(preferred)
}

fn load_payload(path: &Path) -> Result<Option<AnnotationPayload>> {
    if !path.exists() {
        return Ok(None);
    }
    let Some(file) = read_json_lenient::<Value>(path) else {
        return Ok(None);
    };

    let raw = serde_json::to_string(&file)
        .with_context(|| format!("failed to re-encode {}", path.display()))?;
    let parsed = file.get("parsed").cloned().unwrap_or(Value::Null);

    Ok(Some(AnnotationPayload {
        source: path.display().to_string(),
        parsed,
        raw,
    }))
}
