use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use ab_glyph::{Font, FontVec, PxScale};
use fontdb::{Database, Source};
use image::{DynamicImage, Rgb, Rgba};
use imageproc::drawing::draw_text_mut;
use tracing::{debug, warn};

use crate::error::OverlayError;
use crate::overlay::spec::{SpecValue, TextSpec};

/// Face used when the requested font cannot be found anywhere
const DEFAULT_FONT: &[u8] = include_bytes!("../../assets/fonts/DejaVuSans.ttf");

/// Finds a font by path or file name among the system fonts and an optional
/// font directory, falling back to the bundled DejaVu Sans face
pub struct FontResolver {
    fonts_dir: Option<PathBuf>,
    database: OnceLock<Database>,
}

impl Default for FontResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl FontResolver {
    pub fn new() -> Self {
        Self {
            fonts_dir: None,
            database: OnceLock::new(),
        }
    }

    /// Also search `.ttf`, `.otf` and `.ttc` files in `dir`
    pub fn with_fonts_dir<P: Into<PathBuf>>(dir: P) -> Self {
        Self {
            fonts_dir: Some(dir.into()),
            database: OnceLock::new(),
        }
    }

    /// Resolver shared by the free overlay functions
    pub fn shared() -> &'static FontResolver {
        static SHARED: OnceLock<FontResolver> = OnceLock::new();
        SHARED.get_or_init(FontResolver::new)
    }

    fn database(&self) -> &Database {
        self.database.get_or_init(|| {
            let mut db = Database::new();
            db.load_system_fonts();
            if let Some(dir) = &self.fonts_dir {
                load_fonts_from_dir(&mut db, dir);
            }
            debug!("Loaded {} font faces", db.len());
            db
        })
    }

    /// Resolve `requested`: a font file on disk, then a known face with a
    /// matching file name, then the bundled default face
    pub fn resolve(&self, requested: &str) -> Result<FontVec, OverlayError> {
        let path = Path::new(requested);
        if path.is_file() {
            if let Some(font) = std::fs::read(path)
                .ok()
                .and_then(|data| FontVec::try_from_vec_and_index(data, 0).ok())
            {
                return Ok(font);
            }
            warn!("'{}' is not a readable font file", requested);
        }

        let db = self.database();
        if let Some(id) = Self::find_by_file_name(db, requested) {
            if let Some(font) = Self::load_face(db, id) {
                return Ok(font);
            }
        }

        warn!("Font '{}' not found, reverting to the default font", requested);
        Self::default_font().ok_or_else(|| OverlayError::FontUnavailable {
            requested: requested.to_string(),
        })
    }

    /// The bundled DejaVu Sans face
    pub fn default_font() -> Option<FontVec> {
        FontVec::try_from_vec(DEFAULT_FONT.to_vec()).ok()
    }

    fn find_by_file_name(db: &Database, requested: &str) -> Option<fontdb::ID> {
        let wanted = Path::new(requested).file_name()?.to_str()?.to_lowercase();
        let wanted_stem = Path::new(&wanted)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(str::to_string);

        db.faces()
            .find(|face| {
                let path = match &face.source {
                    Source::File(path) => path,
                    Source::SharedFile(path, _) => path,
                    Source::Binary(_) => return false,
                };
                let file_name = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map(str::to_lowercase);
                let stem = path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_lowercase);

                file_name.as_deref() == Some(wanted.as_str()) || (stem.is_some() && stem == wanted_stem)
            })
            .map(|face| face.id)
    }

    fn load_face(db: &Database, id: fontdb::ID) -> Option<FontVec> {
        db.with_face_data(id, |data, index| FontVec::try_from_vec_and_index(data.to_vec(), index).ok())
            .flatten()
    }
}

fn load_fonts_from_dir(db: &mut Database, dir: &Path) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        warn!("Font directory {:?} is not readable", dir);
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if ext != "ttf" && ext != "otf" && ext != "ttc" {
            continue;
        }
        if let Err(e) = db.load_font_file(&path) {
            debug!("Skipping font {:?}: {}", path, e);
        }
    }
}

/// Pixel scale for a font size given as an em height in pixels
fn em_scale(font: &FontVec, size: u32) -> PxScale {
    let units_per_em = font.units_per_em().unwrap_or(1000.0);
    PxScale::from(size as f32 * font.height_unscaled() / units_per_em)
}

/// Draw text onto a copy of `image`; `None` when the parameters are invalid
pub fn add_text_to_image(image: &DynamicImage, specs: &[SpecValue]) -> Option<DynamicImage> {
    try_add_text_to_image(image, specs)
        .map_err(|e| warn!("Text overlay rejected: {}", e))
        .ok()
}

/// Like [`add_text_to_image`] but reports the first violated constraint
pub fn try_add_text_to_image(image: &DynamicImage, specs: &[SpecValue]) -> Result<DynamicImage, OverlayError> {
    draw_text_with(FontResolver::shared(), image, specs)
}

pub(crate) fn draw_text_with(
    fonts: &FontResolver,
    image: &DynamicImage,
    specs: &[SpecValue],
) -> Result<DynamicImage, OverlayError> {
    let spec = TextSpec::from_values(specs)?;
    let font = fonts.resolve(&spec.font)?;
    let scale = em_scale(&font, spec.size);
    let (x, y) = spec.offset;
    let Rgb([r, g, b]) = spec.color;

    let output = if image.color().has_alpha() {
        let mut canvas = image.to_rgba8();
        draw_text_mut(&mut canvas, Rgba([r, g, b, 255]), x, y, scale, &font, &spec.text);
        DynamicImage::ImageRgba8(canvas)
    } else {
        let mut canvas = image.to_rgb8();
        draw_text_mut(&mut canvas, spec.color, x, y, scale, &font, &spec.text);
        DynamicImage::ImageRgb8(canvas)
    };

    Ok(output)
}
