//! Classification tables and text heuristics for raw store products

use regex::Regex;
use ::scraper::Html;
use serde_json::Value;
use std::sync::LazyLock;

/// Product types that mark merchandise rather than puzzles (substring match)
pub const SKIP_PRODUCT_TYPES: &[&str] = &[
    "accessories",
    "accessories bundle",
    "apparel - clearance",
    "after sale",
    "beanie",
    "blanket",
    "book",
    "bundle",
    "burr puzzle",
    "christmas",
    "coaching service",
    "competitions",
    "cube cover",
    "display case",
    "display time",
    "diecast model",
    "diy",
    "diy kits",
    "educational toy",
    "flashcards",
    "fidget",
    "fidget cube",
    "hat",
    "hoodie",
    "hardware",
    "hobby tools",
    "jacket",
    "jigsaw puzzle",
    "lanyard",
    "learning",
    "lube",
    "live events",
    "lucky dip",
    "mat",
    "model kit",
    "mug",
    "nanoblock",
    "office",
    "other",
    "pillow",
    "plastic blade",
    "plushie",
    "remote control car",
    "refurbished",
    "syringe",
    "sticker sets",
    "storage bag",
    "storage box",
    "stand",
    "shirt",
    "t-shirt",
    "timer",
    "timer accessories",
    "timer skin",
    "tools & accessories",
    "training courses",
    "toy",
    "water bottle",
    "wooden building block",
    "wooden learning board toy",
    "wooden puzzle",
    "halloween",
    "digital",
    "download",
    "test",
    "options_hidden_product",
    "globo",
    "sliding",
    "snake",
    "pin",
    "badge",
    "mouse",
    "pad",
    "locking",
    "klotski",
    "ball",
    "kreativity",
    "lms",
    "hanayama",
    "jibbitz",
    "keychain",
    "lubricant",
    "game",
    "mod",
    "service",
    "sticker",
    "tetra",
    "lifestyle",
    "freebie",
    "decals",
    "pouch",
    "logo",
    "blindfold",
    "gift",
];

/// Product types that are never legal in official competition (exact match)
pub const ILLEGAL_CUBE_TYPES: &[&str] = &[
    "Smart Cube",
    "Bluetooth Cube",
    "Motorized Cube",
    "Robot Cube",
    "Transparent Cube",
    "Clear Cube",
    "Ice Cube",
    "Mirror Cube",
    "Ghost Cube",
    "Axis Cube",
    "Fisher Cube",
    "Barrel Cube",
    "Cuboid",
    "2×2×3",
    "3×3×2",
    "3×3×4",
    "3×3×5",
    "Bandaged Cube",
    "Mixup Cube",
    "Mastermorphix",
    "Pyramorphix",
    "Master Pyraminx",
    "8×8 Cube",
    "9×9 Cube",
    "10×10 Cube",
    "11×11 Cube",
    "12×12 Cube",
    "13×13 Cube",
    "15×15 Cube",
    "17×17 Cube",
    "18×18 Cube",
    "Kilominx",
    "Gigaminx",
    "Teraminx",
    "Petaminx",
    "Square-2",
    "Cubedron",
    "Ivy Cube",
    "Gear Cube",
    "Helicopter Cube",
    "Redi Cube",
    "Sudokube",
    "Floppy Cube",
    "Infinity Cube",
    "Siamese Cube",
];

/// Tags that disqualify a puzzle from official competition (exact, lowercase)
pub const ILLEGAL_TAGS: &[&str] = &[
    // connectivity
    "smart",
    "bluetooth",
    "wifi",
    "wi-fi",
    "wireless",
    "app",
    "app-enabled",
    "connected",
    "cloud",
    "iot",
    // sensors
    "sensor",
    "sensors",
    "gyroscope",
    "gyro",
    "accelerometer",
    "imu",
    "magnetometer",
    "cpu",
    "chip",
    "pcb",
    // displays and lights
    "display",
    "screen",
    "lcd",
    "oled",
    "led",
    "light",
    "lights",
    "rgb",
    "neon",
    "matrix",
    // power
    "battery",
    "rechargeable",
    "usb",
    "type-c",
    "charging",
    "lithium",
    "li-ion",
    "charger",
    "power",
    // motors
    "motor",
    "motorized",
    "auto",
    "auto-turn",
    "autosolve",
    "self-turning",
    "self-solving",
    "robotic",
    "robot",
    "servo",
    // audio and video
    "camera",
    "microphone",
    "speaker",
    "voice",
    "sound",
    "buzzer",
    // see-through shells
    "transparent",
    "clear",
    "see-through",
    "crystal",
    "acrylic",
    "glass",
    "timer",
    "hud",
    "projector",
    "hologram",
];

/// Tag keyword to surface finish, checked in order
pub const SURFACE_MAP: &[(&str, &str)] = &[
    ("uv", "UV Coated"),
    ("uvcoated", "UV Coated"),
    ("frosted", "Frosted"),
    ("matte", "Matte"),
    ("gloss", "Glossy"),
    ("soft-touch", "Soft Touch"),
];

/// Typical edge length per NxN order, in millimetres
const DEFAULT_SIZE_MM: &[(&str, f64)] = &[
    ("2x2", 50.0),
    ("3x3", 56.0),
    ("4x4", 60.0),
    ("5x5", 62.0),
    ("6x6", 65.0),
    ("7x7", 69.0),
];

pub const FALLBACK_SIZE_MM: f64 = 56.0;

static MM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\d{2}(?:\.\d)?)\s*mm").unwrap());
static NXN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(\d)[x×](\d)\b").unwrap());
static SIZE_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^\d+x\d+").unwrap());
static VERSION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(v\d+|pro|plus|m)$").unwrap());
static PARENTHESISED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\(.*?\)").unwrap());

pub(crate) fn str_field<'a>(product: &'a Value, key: &str) -> &'a str {
    product.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Product tags. Shopify serves them as an array, some themes as one
/// comma-separated string.
pub(crate) fn tags(product: &Value) -> Vec<String> {
    match product.get("tags") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(joined)) => joined
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn variants(product: &Value) -> &[Value] {
    product
        .get("variants")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn variant_titles(product: &Value) -> impl Iterator<Item = &str> {
    variants(product).iter().map(|v| str_field(v, "title"))
}

/// Text content of an HTML fragment with entities decoded
fn html_text(html: &str) -> String {
    Html::parse_fragment(html).root_element().text().collect()
}

pub fn should_skip(product: &Value) -> bool {
    let product_type = str_field(product, "product_type").to_lowercase();
    SKIP_PRODUCT_TYPES
        .iter()
        .any(|skip| product_type.contains(skip))
}

/// Series name of a title: "GAN 12 Maglev 3x3 (UV) - Pro" gives "GAN 12 Maglev".
pub fn extract_series(title: &str) -> String {
    let clean = PARENTHESISED.replace_all(title, "");
    let clean = clean.split(" -").next().unwrap_or("");

    clean
        .split_whitespace()
        .take_while(|word| !SIZE_PATTERN.is_match(word) && !VERSION_PATTERN.is_match(word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Edge length in millimetres.
pub fn detect_size_mm(product: &Value) -> f64 {
    let title = str_field(product, "title");
    let body = product
        .get("body_html")
        .and_then(Value::as_str)
        .map(html_text)
        .unwrap_or_default();

    let mut parts = vec![title.to_string(), body];
    parts.extend(tags(product));
    parts.extend(variant_titles(product).map(str::to_string));
    let text = parts.join(" ").to_lowercase();

    if let Some(size) = MM_PATTERN
        .captures(&text)
        .and_then(|c| c[1].parse::<f64>().ok())
    {
        return size;
    }

    if let Some(caps) = NXN_PATTERN.captures(title) {
        let key = format!("{}x{}", &caps[1], &caps[2]);
        return DEFAULT_SIZE_MM
            .iter()
            .find(|(order, _)| *order == key)
            .map(|(_, mm)| *mm)
            .unwrap_or(FALLBACK_SIZE_MM);
    }

    FALLBACK_SIZE_MM
}

pub fn detect_surface_finish(tags: &[String]) -> Option<&'static str> {
    tags.iter().find_map(|tag| {
        let key = tag.to_lowercase().replace('_', "-").replace(' ', "");
        SURFACE_MAP
            .iter()
            .find(|(keyword, _)| key.contains(keyword))
            .map(|(_, finish)| *finish)
    })
}

pub fn is_stickered(product: &Value) -> bool {
    let mut parts = tags(product);
    parts.extend(variant_titles(product).map(str::to_string));
    let text = parts.join(" ").to_lowercase();

    if text.contains("stickerless") {
        return false;
    }
    text.contains("stickered") || text.contains("black") || text.contains("primary")
}

/// Tags and product type both allow competition use.
pub fn is_wca_legal(lowercase_tags: &[String], product_type: &str) -> bool {
    !lowercase_tags
        .iter()
        .any(|tag| ILLEGAL_TAGS.contains(&tag.as_str()))
        && !ILLEGAL_CUBE_TYPES.contains(&product_type)
}

/// URL slug: lowercase ASCII alphanumerics separated by single dashes.
///
/// Non-ASCII text is transliterated (`é` becomes `e`), quotes introduced by
/// transliteration are dropped, and thousands separators between digits are
/// removed (`1,000` becomes `1000`).
pub fn slugify(text: &str) -> String {
    let quoted = text.replace('\'', "-").replace('×', "x");
    let ascii = deunicode::deunicode(&quoted).to_lowercase().replace('\'', "");
    let chars: Vec<char> = ascii.chars().collect();

    let mut slug = String::with_capacity(chars.len());
    let mut pending_dash = false;
    for (i, &c) in chars.iter().enumerate() {
        let digit_comma = c == ','
            && i > 0
            && chars[i - 1].is_ascii_digit()
            && chars.get(i + 1).is_some_and(char::is_ascii_digit);
        if digit_comma {
            continue;
        }
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}
