//! Sheet packing: decode, lay out, compose and write one sheet per group.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, anyhow};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use tokio::task::JoinSet;

use super::layout::{self, Layout, Rect};
use super::scan::scan_groups;
use super::{SpriteError, SpriteGroup, fragment, fragment_file_name, sheet_file_name};
use crate::config::PipelineConfig;
use crate::utils::fs::write_if_changed;
use crate::utils::path::relative_posix;
use crate::utils::plural::plural_count;
use crate::{debug, log};

/// One source image inside a packed sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Source file stem
    pub name: String,
    pub rect: Rect,
}

/// A written sprite sheet and its fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedSheet {
    pub group: String,
    pub width: u32,
    pub height: u32,
    /// Frames in source file order
    pub frames: Vec<Frame>,
    pub image_path: PathBuf,
    pub fragment_path: PathBuf,
}

/// Output locations and layout settings shared by every group.
#[derive(Debug, Clone)]
pub struct PackOptions {
    pub sprite_dest: PathBuf,
    pub fragment_dir: PathBuf,
    /// Directory the compiled CSS lives in; image URLs are relative to it
    pub css_dest: PathBuf,
    pub padding: u32,
}

impl PackOptions {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            sprite_dest: config.paths.sprite_dest.clone(),
            fragment_dir: config.paths.sprite_fragment_dir(),
            css_dest: config.paths.css_dest.clone(),
            padding: config.sprite.padding,
        }
    }

    /// URL of a group's sheet as seen from the compiled CSS.
    pub fn image_url(&self, group: &str) -> String {
        relative_posix(&self.css_dest, &self.sprite_dest.join(sheet_file_name(group)))
    }
}

/// Pack a single group. Returns `None` when the group has no images.
pub fn pack_group(
    group: &SpriteGroup,
    opts: &PackOptions,
) -> Result<Option<PackedSheet>, SpriteError> {
    if group.images.is_empty() {
        return Ok(None);
    }

    let images = group
        .images
        .iter()
        .map(|path| decode(path))
        .collect::<Result<Vec<_>, _>>()?;

    let sizes: Vec<_> = images.iter().map(RgbaImage::dimensions).collect();
    let layout = layout::binary_tree(&sizes, opts.padding);
    let canvas = compose(&images, &layout);
    let png = encode_png(&canvas).map_err(|source| SpriteError::Encode {
        group: group.name.clone(),
        source,
    })?;

    let image_path = opts.sprite_dest.join(sheet_file_name(&group.name));
    write_if_changed(&image_path, &png).map_err(|e| SpriteError::io(&image_path, e))?;

    let frames: Vec<Frame> = group
        .images
        .iter()
        .zip(&layout.rects)
        .map(|(path, rect)| Frame {
            name: frame_name(path),
            rect: *rect,
        })
        .collect();
    warn_duplicate_frames(&group.name, &frames);

    let sheet = PackedSheet {
        group: group.name.clone(),
        width: layout.width,
        height: layout.height,
        frames,
        image_path,
        fragment_path: opts.fragment_dir.join(fragment_file_name(&group.name)),
    };

    let text = fragment::render(&sheet, &opts.image_url(&group.name));
    write_if_changed(&sheet.fragment_path, text.as_bytes())
        .map_err(|e| SpriteError::io(&sheet.fragment_path, e))?;

    Ok(Some(sheet))
}

/// Pack every group under `paths.sprite_src` concurrently.
///
/// Returns after all groups have resolved. Any failed group fails the whole
/// call, with every failure listed in the error.
pub async fn pack_all(config: Arc<PipelineConfig>) -> Result<Vec<PackedSheet>> {
    let src = config.paths.sprite_src.clone();
    let groups = scan_groups(&src);
    if groups.is_empty() {
        debug!("sprite"; "no groups in {}", config.root_relative(&src).display());
        return Ok(Vec::new());
    }

    let opts = Arc::new(PackOptions::from_config(&config));
    let mut set = JoinSet::new();
    for name in groups {
        let opts = Arc::clone(&opts);
        let src = src.clone();
        set.spawn_blocking(move || {
            let result = SpriteGroup::load(&src, &name).and_then(|g| pack_group(&g, &opts));
            (name, result)
        });
    }

    let mut sheets = Vec::new();
    let mut failures = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((_, Ok(Some(sheet)))) => {
                debug!("sprite"; "{}: {}x{}, {}", sheet.group, sheet.width, sheet.height,
                    plural_count(sheet.frames.len(), "frame"));
                sheets.push(sheet);
            }
            Ok((name, Ok(None))) => debug!("sprite"; "`{}` has no images, skipped", name),
            Ok((name, Err(e))) => failures.push(format!("{name}: {:#}", anyhow!(e))),
            Err(e) => failures.push(format!("group task failed: {e}")),
        }
    }

    if !failures.is_empty() {
        return Err(anyhow!(
            "{} failed:\n{}",
            plural_count(failures.len(), "sprite group"),
            failures.join("\n")
        ));
    }

    sheets.sort_by(|a, b| a.group.cmp(&b.group));
    log!("sprite"; "packed {}", plural_count(sheets.len(), "sheet"));
    Ok(sheets)
}

/// Copy every image to its placed rectangle on a transparent canvas.
pub fn compose(images: &[RgbaImage], layout: &Layout) -> RgbaImage {
    let mut canvas = RgbaImage::new(layout.width, layout.height);
    for (img, rect) in images.iter().zip(&layout.rects) {
        image::imageops::replace(&mut canvas, img, i64::from(rect.x), i64::from(rect.y));
    }
    canvas
}

/// Encode to PNG in memory.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, image::ImageError> {
    let mut buf = Vec::new();
    PngEncoder::new(&mut buf).write_image(
        img.as_raw(),
        img.width(),
        img.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(buf)
}

fn decode(path: &Path) -> Result<RgbaImage, SpriteError> {
    image::open(path)
        .map(|img| img.to_rgba8())
        .map_err(|source| SpriteError::Decode {
            path: path.to_path_buf(),
            source,
        })
}

fn frame_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn warn_duplicate_frames(group: &str, frames: &[Frame]) {
    for (i, frame) in frames.iter().enumerate() {
        if frames[..i].iter().any(|f| f.name == frame.name) {
            log!("sprite"; "warning: `{}` has more than one `{}` frame", group, frame.name);
        }
    }
}
