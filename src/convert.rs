//! Batch SVG to PNG conversion for video frames
//!
//! Every SVG of a directory becomes a fixed-size PNG: rendered as large as fits without
//! distorting it, centered on a white canvas, and named by its position (`0001.png`, ...).

use crate::error::{ConvertError, TimelineResult};
use image::{Rgb, RgbImage};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// Target frame size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    pub width: u32,
    pub height: u32,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// Outcome of a batch conversion
#[derive(Debug, Default)]
pub struct ConvertReport {
    /// Written PNG files, in input order
    pub written: Vec<PathBuf>,
    /// Inputs that could not be converted
    pub failed: Vec<(PathBuf, ConvertError)>,
}

/// SVG files directly inside `dir`, numerically ordered when every stem is an integer
/// (`2.svg` before `10.svg`), lexicographically otherwise
pub fn ordered_svgs(dir: &Path) -> TimelineResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ConvertError::InputNotFound(dir.display().to_string()).into());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"))
        })
        .collect();

    let numeric: Option<Vec<u64>> = files
        .iter()
        .map(|path| path.file_stem()?.to_str()?.parse().ok())
        .collect();

    match numeric {
        Some(keys) => {
            let mut keyed: Vec<(u64, PathBuf)> = keys.into_iter().zip(files).collect();
            keyed.sort_by_key(|(key, _)| *key);
            files = keyed.into_iter().map(|(_, path)| path).collect();
        }
        None => files.sort_by(|a, b| a.file_name().cmp(&b.file_name())),
    }
    Ok(files)
}

/// Largest size with the SVG's aspect ratio that fits in the frame
fn fit_size(svg_width: f32, svg_height: f32, options: ConvertOptions) -> (u32, u32) {
    let aspect = svg_width / svg_height;
    let target = options.width as f32 / options.height as f32;

    if aspect > target {
        let height = ((options.width as f32 / aspect) as u32).clamp(1, options.height);
        (options.width, height)
    } else {
        let width = ((options.height as f32 * aspect) as u32).clamp(1, options.width);
        (width, options.height)
    }
}

fn render_frame(
    svg: &Path,
    output: &Path,
    fontdb: &Arc<usvg::fontdb::Database>,
    options: ConvertOptions,
) -> Result<(), ConvertError> {
    let file = svg.display().to_string();
    let parse_failed = |reason: String| ConvertError::SvgParse {
        file: file.clone(),
        reason,
    };

    let data = std::fs::read(svg).map_err(|e| parse_failed(e.to_string()))?;
    let opts = usvg::Options {
        resources_dir: svg.parent().map(Path::to_path_buf),
        fontdb: Arc::clone(fontdb),
        ..Default::default()
    };
    let tree = usvg::Tree::from_data(&data, &opts).map_err(|e| parse_failed(e.to_string()))?;

    let size = tree.size();
    let (render_w, render_h) = fit_size(size.width(), size.height(), options);
    let mut pixmap = resvg::tiny_skia::Pixmap::new(render_w, render_h).ok_or(
        ConvertError::InvalidSize {
            width: render_w,
            height: render_h,
        },
    )?;
    let transform = resvg::tiny_skia::Transform::from_scale(
        render_w as f32 / size.width(),
        render_h as f32 / size.height(),
    );
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    let mut canvas = RgbImage::from_pixel(options.width, options.height, Rgb([255, 255, 255]));
    let x_offset = (options.width - render_w) / 2;
    let y_offset = (options.height - render_h) / 2;

    // Pixmap data is premultiplied, so compositing over white is c + (255 - a)
    for (i, px) in pixmap.data().chunks_exact(4).enumerate() {
        let x = i as u32 % render_w;
        let y = i as u32 / render_w;
        let blank = 255 - px[3];
        canvas.put_pixel(
            x + x_offset,
            y + y_offset,
            Rgb([
                px[0].saturating_add(blank),
                px[1].saturating_add(blank),
                px[2].saturating_add(blank),
            ]),
        );
    }

    canvas
        .save_with_format(output, image::ImageFormat::Png)
        .map_err(|e| ConvertError::WriteFailed {
            file: output.display().to_string(),
            reason: e.to_string(),
        })
}

/// Convert every SVG in `input_dir` into `output_dir`. Per-file failures are logged and
/// reported, never fatal.
pub fn convert_svgs(
    input_dir: &Path,
    output_dir: &Path,
    options: ConvertOptions,
) -> TimelineResult<ConvertReport> {
    if options.width == 0 || options.height == 0 {
        return Err(ConvertError::InvalidSize {
            width: options.width,
            height: options.height,
        }
        .into());
    }

    let files = ordered_svgs(input_dir)?;
    std::fs::create_dir_all(output_dir)?;
    tracing::info!(
        "Found {} SVG files in '{}'. Processing...",
        files.len(),
        input_dir.display()
    );

    let mut fontdb = usvg::fontdb::Database::new();
    fontdb.load_system_fonts();
    let fontdb = Arc::new(fontdb);
    let total = files.len();

    let results: Vec<(PathBuf, PathBuf, Result<(), ConvertError>)> = files
        .into_par_iter()
        .enumerate()
        .map(|(index, svg)| {
            let output = output_dir.join(format!("{:04}.png", index + 1));
            let result = render_frame(&svg, &output, &fontdb, options);
            match &result {
                Ok(()) => tracing::info!(
                    "[{}/{}] Saved {} (derived from {})",
                    index + 1,
                    total,
                    output.display(),
                    svg.display()
                ),
                Err(e) => tracing::warn!("Error processing {}: {}", svg.display(), e),
            }
            (svg, output, result)
        })
        .collect();

    let mut report = ConvertReport::default();
    for (svg, output, result) in results {
        match result {
            Ok(()) => report.written.push(output),
            Err(e) => report.failed.push((svg, e)),
        }
    }

    tracing::info!(
        "Processing complete: {} written, {} failed",
        report.written.len(),
        report.failed.len()
    );
    Ok(report)
}
