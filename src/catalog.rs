// src/catalog.rs
// Built-in style presets, used when the server catalog is unavailable

use crate::api::{StyleCatalog, StylePreset};

const PRESETS: &[(&str, &str, &str, &str)] = &[
    (
        "classic-tuxedo",
        "Classic Tuxedo",
        "Elegant spy archetype in formal evening wear with sophistication",
        "wearing an elegant black tuxedo with white dress shirt and black bow tie, sophisticated spy aesthetic, formal evening wear, sleek and polished appearance",
    ),
    (
        "streetwear",
        "Modern Streetwear",
        "Urban fashion with hoodies, sneakers, and contemporary street style",
        "wearing modern streetwear fashion, oversized hoodie, designer sneakers, urban style, contemporary street fashion, casual cool aesthetic",
    ),
    (
        "techwear",
        "Techwear",
        "Functional futuristic clothing with utility and tech aesthetics",
        "wearing techwear fashion, functional futuristic clothing, utility vest, cargo pants with straps, technical fabrics, dark monochrome palette, cyberpunk influenced",
    ),
    (
        "old-money",
        "Old Money",
        "Refined preppy aesthetic with timeless elegance",
        "wearing old money style clothing, cashmere sweater draped over shoulders, oxford shirt, tailored chinos, loafers, preppy refined aesthetic, understated luxury",
    ),
    (
        "minimalist",
        "Minimalist",
        "Clean, simple, monochrome looks with focus on quality basics",
        "wearing minimalist fashion, clean simple clothing, monochrome palette, quality basics, neutral tones, scandinavian inspired, understated elegance",
    ),
    (
        "cyberpunk",
        "Cyberpunk",
        "Neon-accented futuristic fashion with bold tech elements",
        "wearing cyberpunk fashion, neon accented clothing, futuristic tech accessories, LED elements, dark base with bright accent colors, dystopian future aesthetic",
    ),
    (
        "crypto-bro",
        "Crypto Bro",
        "Tech founder vibes with hoodies, Patagonia vests, and startup energy",
        "wearing tech startup fashion, grey or black hoodie under Patagonia vest, AirPods, casual expensive sneakers, Apple Watch, confident Silicon Valley tech bro aesthetic, venture capital energy",
    ),
];

pub fn fallback_catalog() -> StyleCatalog {
    let styles = PRESETS
        .iter()
        .map(|(id, name, description, prompt)| StylePreset {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            prompt: prompt.to_string(),
            thumbnail: Some(format!("/thumbnails/{}.jpg", id)),
        })
        .collect();

    StyleCatalog::new(styles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_fallback_catalog_is_consistent() {
        let catalog = fallback_catalog();
        assert_eq!(catalog.count, 7);
        assert_eq!(catalog.count, catalog.styles.len());

        let ids: HashSet<_> = catalog.styles.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.len(), catalog.styles.len(), "duplicate style ids");
        assert!(catalog.contains("cyberpunk"));
        assert!(catalog.contains("classic-tuxedo"));
    }

    #[test]
    fn test_presets_have_required_fields() {
        for style in fallback_catalog().styles {
            assert!(!style.name.is_empty());
            assert!(!style.description.is_empty());
            assert!(!style.prompt.is_empty());
            assert!(style.thumbnail.is_some());
        }
    }
}
