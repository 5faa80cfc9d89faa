use super::rules::{
    detect_size_mm, detect_surface_finish, extract_series, is_stickered, is_wca_legal, slugify,
    str_field, tags, variants,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SUBMITTED_BY: &str = "CubeIndex";
pub const PENDING_STATUS: &str = "Pending";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionType {
    Base,
    Trim,
}

/// One `cube_models` record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeRow {
    pub series: String,
    pub model: String,
    pub slug: String,
    pub brand: String,
    #[serde(rename = "type")]
    pub product_type: String,
    pub magnetic: bool,
    pub maglev: bool,
    pub smart: bool,
    pub wca_legal: bool,
    pub image_url: Option<String>,
    pub discontinued: bool,
    pub surface_finish: Option<String>,
    pub stickered: bool,
    pub release_date: String,
    pub size: f64,
    /// Grams, as Shopify reports them
    pub weight: i64,
    pub rating: u32,
    pub notes: String,
    pub status: String,
    pub submitted_by: String,
    pub version_type: VersionType,
    pub version_name: String,
    /// Base slug of a trim row, null on base rows
    pub related_to: Option<String>,
}

fn first_image_src(product: &Value) -> String {
    let src = product
        .get("images")
        .and_then(Value::as_array)
        .and_then(|images| images.first())
        .map(|image| str_field(image, "src"))
        .unwrap_or("");
    src.split('?').next().unwrap_or("").to_string()
}

fn is_available(variant: &Value) -> bool {
    match variant.get("available") {
        None => true,
        Some(value) => value.as_bool().unwrap_or(false),
    }
}

fn grams(variant: &Value) -> i64 {
    match variant.get("grams") {
        Some(value) => value
            .as_i64()
            .or_else(|| value.as_f64().map(|g| g.round() as i64))
            .unwrap_or(0),
        None => 0,
    }
}

/// Turns one raw product into its base row followed by one trim row per variant.
pub fn normalize_product(product: &Value) -> Vec<CubeRow> {
    let title = str_field(product, "title");
    let product_type = str_field(product, "product_type");
    let lowercase_tags: Vec<String> = tags(product).iter().map(|t| t.to_lowercase()).collect();

    let series = extract_series(title);
    let remainder = title.replace(series.as_str(), "");
    let variants = variants(product);
    let release_date: String = str_field(product, "published_at").chars().take(10).collect();

    let base = CubeRow {
        slug: slugify(&format!("{}{}", series, remainder)),
        model: remainder.trim().to_string(),
        series,
        brand: str_field(product, "vendor").to_string(),
        product_type: product_type.to_string(),
        magnetic: lowercase_tags.iter().any(|t| t == "magnetic"),
        maglev: lowercase_tags.iter().any(|t| t.contains("maglev")),
        smart: lowercase_tags.iter().any(|t| t == "bluetooth"),
        wca_legal: is_wca_legal(&lowercase_tags, product_type),
        image_url: Some(first_image_src(product)),
        discontinued: !variants.iter().any(is_available),
        surface_finish: detect_surface_finish(&lowercase_tags).map(str::to_string),
        stickered: is_stickered(product),
        release_date,
        size: detect_size_mm(product),
        weight: 0,
        rating: 0,
        notes: String::new(),
        status: PENDING_STATUS.to_string(),
        submitted_by: SUBMITTED_BY.to_string(),
        version_type: VersionType::Base,
        version_name: String::new(),
        related_to: None,
    };

    let mut rows = Vec::with_capacity(variants.len() + 1);
    for variant in variants {
        let variant_title = str_field(variant, "title");
        let mut trim = base.clone();
        trim.weight = grams(variant);
        trim.related_to = Some(base.slug.clone());
        trim.slug = slugify(&format!("{} {}", base.slug, variant_title));
        trim.version_type = VersionType::Trim;
        trim.version_name = variant_title.to_string();
        if let Some(image) = variant.get("featured_image").filter(|v| !v.is_null()) {
            trim.image_url = image.get("src").and_then(Value::as_str).map(str::to_string);
        }
        rows.push(trim);
    }
    rows.insert(0, base);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "title": "GAN 12 Maglev 3x3 UV",
            "vendor": "GAN",
            "product_type": "3x3",
            "tags": ["Magnetic", "Maglev", "uv_coated"],
            "published_at": "2023-04-01T10:00:00-04:00",
            "body_html": "<p>Size: 55.5mm</p>",
            "images": [{"src": "https://cdn.example.com/gan12.jpg?v=123"}],
            "variants": [
                {"title": "Stickerless", "grams": 64, "available": false},
                {
                    "title": "Black",
                    "grams": 66,
                    "available": true,
                    "featured_image": {"src": "https://cdn.example.com/black.jpg"}
                }
            ]
        })
    }

    #[test]
    fn test_base_row() {
        let rows = normalize_product(&sample());
        assert_eq!(rows.len(), 3);

        let base = &rows[0];
        assert_eq!(base.series, "GAN 12 Maglev");
        assert_eq!(base.model, "3x3 UV");
        assert_eq!(base.slug, "gan-12-maglev-3x3-uv");
        assert_eq!(base.brand, "GAN");
        assert!(base.magnetic);
        assert!(base.maglev);
        assert!(!base.smart);
        assert!(base.wca_legal);
        assert!(!base.discontinued);
        assert_eq!(base.image_url.as_deref(), Some("https://cdn.example.com/gan12.jpg"));
        assert_eq!(base.surface_finish.as_deref(), Some("UV Coated"));
        assert_eq!(base.release_date, "2023-04-01");
        assert_eq!(base.size, 55.5);
        assert_eq!(base.version_type, VersionType::Base);
        assert_eq!(base.related_to, None);
        assert_eq!(base.submitted_by, "CubeIndex");
    }

    #[test]
    fn test_trim_rows() {
        let rows = normalize_product(&sample());

        let stickerless = &rows[1];
        assert_eq!(stickerless.version_type, VersionType::Trim);
        assert_eq!(stickerless.slug, "gan-12-maglev-3x3-uv-stickerless");
        assert_eq!(stickerless.related_to.as_deref(), Some("gan-12-maglev-3x3-uv"));
        assert_eq!(stickerless.weight, 64);
        assert_eq!(stickerless.image_url, rows[0].image_url);

        let black = &rows[2];
        assert_eq!(black.version_name, "Black");
        assert_eq!(black.image_url.as_deref(), Some("https://cdn.example.com/black.jpg"));
    }

    #[test]
    fn test_weight_serializes_as_integer() {
        let product = json!({"title": "RS3M 3x3", "variants": [{"title": "Black", "grams": 64}]});
        let rows = normalize_product(&product);

        let base = serde_json::to_string(&rows[0]).unwrap();
        let trim = serde_json::to_string(&rows[1]).unwrap();
        assert!(base.contains("\"weight\":0,"), "{}", base);
        assert!(trim.contains("\"weight\":64,"), "{}", trim);

        let fractional = json!({"title": "RS3M 3x3", "variants": [{"title": "Black", "grams": 63.6}]});
        assert_eq!(normalize_product(&fractional)[1].weight, 64);
    }

    #[test]
    fn test_discontinued_when_nothing_available() {
        let product = json!({
            "title": "Old Cube",
            "variants": [{"title": "A", "available": false}]
        });
        assert!(normalize_product(&product)[0].discontinued);

        let product = json!({
            "title": "Old Cube",
            "variants": [{"title": "A"}]
        });
        assert!(!normalize_product(&product)[0].discontinued);
    }

    #[test]
    fn test_serializes_type_field() {
        let rows = normalize_product(&json!({"title": "Cube", "product_type": "3x3"}));
        let value = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(value["type"], "3x3");
        assert_eq!(value["version_type"], "Base");
        assert!(value["related_to"].is_null());
    }
}
