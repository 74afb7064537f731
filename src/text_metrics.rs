use fontdb::{Database, Family, Query, Stretch, Style, Weight};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use ttf_parser::Face;

/// Width used per character when no font face is available.
pub const HEURISTIC_CHAR_WIDTH: f32 = 0.6;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontSpec {
    pub family: String,
    pub weight: u16,
}

impl FontSpec {
    pub fn new(family: &str, weight: u16) -> Self {
        Self {
            family: normalize_family_key(family),
            weight,
        }
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self::new("sans-serif", 400)
    }
}

/// Pixel width of a single line of text.
pub trait TextMetrics {
    fn measure(&self, text: &str, font: &FontSpec, font_size: f32) -> f32;
}

impl<T: TextMetrics + ?Sized> TextMetrics for &T {
    fn measure(&self, text: &str, font: &FontSpec, font_size: f32) -> f32 {
        (**self).measure(text, font, font_size)
    }
}

impl<T: TextMetrics + ?Sized> TextMetrics for Box<T> {
    fn measure(&self, text: &str, font: &FontSpec, font_size: f32) -> f32 {
        (**self).measure(text, font, font_size)
    }
}

/// Fixed advance per character. Deterministic, so layouts measured with it
/// can be compared across machines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicMetrics {
    pub char_width: f32,
}

impl HeuristicMetrics {
    pub fn new(char_width: f32) -> Self {
        Self { char_width }
    }
}

impl Default for HeuristicMetrics {
    fn default() -> Self {
        Self::new(HEURISTIC_CHAR_WIDTH)
    }
}

impl TextMetrics for HeuristicMetrics {
    fn measure(&self, text: &str, _font: &FontSpec, font_size: f32) -> f32 {
        if !valid_size(font_size) {
            return 0.0;
        }
        text.chars().filter(|ch| *ch != '\n').count() as f32 * font_size * self.char_width
    }
}

/// Glyph-advance measurement against system fonts. Families that cannot be
/// resolved fall back to [`HeuristicMetrics`].
pub struct FontMetrics {
    loader: RefCell<FontLoader>,
    fallback: HeuristicMetrics,
}

impl FontMetrics {
    pub fn new() -> Self {
        Self::with_database(Database::new(), true)
    }

    /// Use a prepared font database. `system_fonts` controls whether system
    /// fonts are loaded lazily on the first miss.
    pub fn with_database(db: Database, system_fonts: bool) -> Self {
        Self {
            loader: RefCell::new(FontLoader {
                db,
                loaded_system_fonts: !system_fonts,
                faces: HashMap::new(),
            }),
            fallback: HeuristicMetrics::default(),
        }
    }

    pub fn load_font_file(&self, path: &Path) -> std::io::Result<()> {
        let mut loader = self.loader.borrow_mut();
        loader.db.load_font_file(path)?;
        loader.faces.clear();
        Ok(())
    }

    pub fn has_face(&self, font: &FontSpec) -> bool {
        self.loader.borrow_mut().face(font).is_some()
    }
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl TextMetrics for FontMetrics {
    fn measure(&self, text: &str, font: &FontSpec, font_size: f32) -> f32 {
        if text.is_empty() || !valid_size(font_size) {
            return 0.0;
        }
        let mut loader = self.loader.borrow_mut();
        match loader.face(font) {
            Some(face) => face.measure_width(&text.replace('\t', "    "), font_size),
            None => self.fallback.measure(text, font, font_size),
        }
    }
}

struct FontLoader {
    db: Database,
    loaded_system_fonts: bool,
    faces: HashMap<FontSpec, Option<FontFace>>,
}

impl FontLoader {
    fn face(&mut self, font: &FontSpec) -> Option<&mut FontFace> {
        if !self.faces.contains_key(font) {
            let face = self.load_face(font);
            self.faces.insert(font.clone(), face);
        }
        self.faces.get_mut(font).and_then(|face| face.as_mut())
    }

    fn load_face(&mut self, font: &FontSpec) -> Option<FontFace> {
        if let Some(face) = load_cached_face(font) {
            return Some(face);
        }
        #[derive(Clone, Copy)]
        enum FamilyToken {
            Generic(fontdb::Family<'static>),
            Name(usize),
        }

        let mut names: Vec<String> = Vec::new();
        let mut order: Vec<FamilyToken> = Vec::new();
        for part in font.family.split(',') {
            let raw = part.trim().trim_matches('"').trim_matches('\'');
            if raw.is_empty() {
                continue;
            }
            let lower = raw.to_ascii_lowercase();
            match lower.as_str() {
                "serif" => order.push(FamilyToken::Generic(Family::Serif)),
                "sans-serif" => order.push(FamilyToken::Generic(Family::SansSerif)),
                "monospace" => order.push(FamilyToken::Generic(Family::Monospace)),
                "system-ui" | "-apple-system" | "ui-sans-serif" => {
                    order.push(FamilyToken::Generic(Family::SansSerif))
                }
                "ui-monospace" => order.push(FamilyToken::Generic(Family::Monospace)),
                _ => {
                    let idx = names.len();
                    names.push(raw.to_string());
                    order.push(FamilyToken::Name(idx));
                }
            }
        }
        if order.is_empty() {
            order.push(FamilyToken::Generic(Family::SansSerif));
        }

        let families: Vec<Family<'_>> = order
            .into_iter()
            .map(|token| match token {
                FamilyToken::Generic(family) => family,
                FamilyToken::Name(idx) => Family::Name(names[idx].as_str()),
            })
            .collect();

        if !self.loaded_system_fonts {
            self.db.load_system_fonts();
            self.loaded_system_fonts = true;
        }

        let query = Query {
            families: &families,
            weight: Weight(font.weight),
            stretch: Stretch::Normal,
            style: Style::Normal,
        };
        let id = self.db.query(&query)?;
        let mut loaded: Option<FontFace> = None;
        self.db.with_face_data(id, |data, index| {
            let bytes = data.to_vec();
            if let Some(face) = FontFace::parse(bytes.clone(), index) {
                if let Some((font_path, meta_path)) = cache_paths(font)
                    && !font_path.exists()
                {
                    if let Some(parent) = font_path.parent() {
                        let _ = fs::create_dir_all(parent);
                    }
                    let _ = fs::write(&font_path, &bytes);
                    let _ = fs::write(&meta_path, index.to_string());
                }
                loaded = Some(face);
            }
        });
        if loaded.is_none() {
            tracing::warn!(family = %font.family, weight = font.weight, "font face unreadable");
        }
        loaded
    }
}

struct FontFace {
    data: Vec<u8>,
    index: u32,
    units_per_em: u16,
    ascii_advances: [u16; 128],
    advance_cache: HashMap<char, Option<u16>>,
}

impl FontFace {
    fn parse(data: Vec<u8>, index: u32) -> Option<Self> {
        let face = Face::parse(&data, index).ok()?;
        let units_per_em = face.units_per_em().max(1);
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph_id) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph_id).unwrap_or(0);
            }
        }
        Some(Self {
            data,
            index,
            units_per_em,
            ascii_advances,
            advance_cache: HashMap::new(),
        })
    }

    fn measure_width(&mut self, text: &str, font_size: f32) -> f32 {
        let scale = font_size / self.units_per_em as f32;
        let fallback = font_size * HEURISTIC_CHAR_WIDTH;

        if text.is_ascii() {
            let mut width = 0.0f32;
            for byte in text.as_bytes() {
                if *byte == b'\n' {
                    continue;
                }
                let advance = self.ascii_advances[*byte as usize];
                if advance == 0 {
                    width += fallback;
                } else {
                    width += advance as f32 * scale;
                }
            }
            return width.max(0.0);
        }

        let mut face: Option<Face<'_>> = None;
        let mut width = 0.0f32;
        for ch in text.chars() {
            if ch == '\n' {
                continue;
            }
            let advance = match self.advance_cache.get(&ch) {
                Some(cached) => *cached,
                None => {
                    if face.is_none() {
                        face = Face::parse(&self.data, self.index).ok();
                    }
                    let value = face.as_ref().and_then(|parsed| {
                        let glyph = parsed.glyph_index(ch)?;
                        parsed.glyph_hor_advance(glyph)
                    });
                    self.advance_cache.insert(ch, value);
                    value
                }
            };
            match advance {
                Some(advance) if advance > 0 => width += advance as f32 * scale,
                _ => width += fallback,
            }
        }
        width.max(0.0)
    }
}

#[derive(Default)]
struct FontBucket {
    font: FontSpec,
    size_bits: u32,
    widths: HashMap<String, f32>,
}

/// Memoizes widths by (font family, weight, size, text). Unbounded for the
/// lifetime of the cache; call [`MeasureCache::clear`] after font changes.
///
/// Single-threaded: a multi-threaded host should keep one cache per thread
/// or per layout pass.
pub struct MeasureCache<M> {
    inner: M,
    buckets: RefCell<Vec<FontBucket>>,
}

impl<M: TextMetrics> MeasureCache<M> {
    pub fn new(inner: M) -> Self {
        Self {
            inner,
            buckets: RefCell::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    pub fn len(&self) -> usize {
        self.buckets
            .borrow()
            .iter()
            .map(|bucket| bucket.widths.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.buckets.borrow_mut().clear();
    }
}

impl<M: TextMetrics> TextMetrics for MeasureCache<M> {
    fn measure(&self, text: &str, font: &FontSpec, font_size: f32) -> f32 {
        let size_bits = font_size.to_bits();
        let mut buckets = self.buckets.borrow_mut();
        let idx = match buckets
            .iter()
            .position(|bucket| bucket.size_bits == size_bits && bucket.font == *font)
        {
            Some(idx) => idx,
            None => {
                buckets.push(FontBucket {
                    font: font.clone(),
                    size_bits,
                    widths: HashMap::new(),
                });
                buckets.len() - 1
            }
        };
        let bucket = &mut buckets[idx];
        if let Some(width) = bucket.widths.get(text) {
            return *width;
        }
        let width = self.inner.measure(text, font, font_size);
        bucket.widths.insert(text.to_string(), width);
        width
    }
}

fn valid_size(font_size: f32) -> bool {
    font_size.is_finite() && font_size > 0.0
}

fn normalize_family_key(font_family: &str) -> String {
    let trimmed = font_family.trim();
    if trimmed.is_empty() {
        "sans-serif".to_string()
    } else {
        trimmed.to_string()
    }
}

fn cache_paths(font: &FontSpec) -> Option<(PathBuf, PathBuf)> {
    let base = std::env::var_os("XDG_CACHE_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".cache")))?;
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    font.hash(&mut hasher);
    let hash = hasher.finish();
    let dir = base.join("sclabel").join("font-cache");
    let font_path = dir.join(format!("{hash:x}.font"));
    let meta_path = dir.join(format!("{hash:x}.meta"));
    Some((font_path, meta_path))
}

fn load_cached_face(font: &FontSpec) -> Option<FontFace> {
    let (font_path, meta_path) = cache_paths(font)?;
    if !font_path.exists() || !meta_path.exists() {
        return None;
    }
    let bytes = fs::read(font_path).ok()?;
    let index: u32 = fs::read_to_string(meta_path).ok()?.trim().parse().ok()?;
    FontFace::parse(bytes, index)
}
