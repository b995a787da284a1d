//! Theme and page-setting types consumed by the style resolver

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Style declarations keyed by CSS-like property name (`fontSize`, `color`, ...)
pub type StyleMap = BTreeMap<String, Value>;

/// Named block style a node can opt into via `stylePreset`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStylePreset {
    pub label: String,
    #[serde(default)]
    pub styles: StyleMap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageFormat {
    A4,
    A5,
    Letter,
    Legal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

/// Page margins in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Margins {
    pub fn uniform(value: f64) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSettings {
    pub format: PageFormat,
    pub orientation: Orientation,
    pub margins: Margins,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            format: PageFormat::A4,
            orientation: Orientation::Portrait,
            margins: Margins::uniform(20.0),
            background_color: None,
        }
    }
}

/// Per-document page settings; every unset field falls back to the theme
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSettingsOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<PageFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orientation: Option<Orientation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margins: Option<Margins>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub document_styles: StyleMap,
    #[serde(default)]
    pub page_settings: PageSettings,
    #[serde(default)]
    pub block_style_presets: BTreeMap<String, BlockStylePreset>,
}

impl Default for Theme {
    fn default() -> Self {
        let document_styles = StyleMap::from([
            ("fontFamily".to_string(), json!("Helvetica, Arial, sans-serif")),
            ("fontSize".to_string(), json!("10pt")),
            ("lineHeight".to_string(), json!("1.4")),
            ("color".to_string(), json!("#111827")),
            ("backgroundColor".to_string(), json!("#ffffff")),
        ]);

        let block_style_presets = BTreeMap::from([
            (
                "heading".to_string(),
                BlockStylePreset {
                    label: "Heading".to_string(),
                    styles: StyleMap::from([
                        ("fontSize".to_string(), json!("18pt")),
                        ("fontWeight".to_string(), json!("700")),
                        ("marginBottom".to_string(), json!("0.5em")),
                    ]),
                },
            ),
            (
                "muted".to_string(),
                BlockStylePreset {
                    label: "Muted".to_string(),
                    styles: StyleMap::from([("color".to_string(), json!("#6b7280"))]),
                },
            ),
        ]);

        Self {
            id: "default".to_string(),
            name: "Default".to_string(),
            document_styles,
            page_settings: PageSettings::default(),
            block_style_presets,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_override_omits_unset_fields() {
        let override_ = PageSettingsOverride {
            orientation: Some(Orientation::Landscape),
            ..Default::default()
        };

        let json = serde_json::to_value(&override_).unwrap();
        assert_eq!(json, json!({ "orientation": "landscape" }));
    }

    #[test]
    fn test_theme_deserializes_with_missing_sections() {
        let theme: Theme = serde_json::from_str(r#"{ "id": "t", "name": "Plain" }"#).unwrap();
        assert!(theme.document_styles.is_empty());
        assert_eq!(theme.page_settings, PageSettings::default());
        assert!(theme.block_style_presets.is_empty());
    }
}
