//! # Style Resolver
//!
//! Pure functions computing effective styles. Node styles cascade, lowest
//! priority first:
//!
//! 1. component default styles
//! 2. inheritable document styles (only keys in the registry's set)
//! 3. the node's style preset
//! 4. inline node styles

use blockform_model::{PageSettings, PageSettingsOverride, StyleMap, Theme};
use std::collections::BTreeSet;

/// Theme document styles with the document's override merged on top
pub fn resolve_document_styles(theme_styles: &StyleMap, overrides: Option<&StyleMap>) -> StyleMap {
    let mut resolved = theme_styles.clone();
    if let Some(overrides) = overrides {
        resolved.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    resolved
}

pub fn resolve_node_styles(
    resolved_document: &StyleMap,
    inheritable_keys: &BTreeSet<String>,
    preset: Option<&StyleMap>,
    inline: Option<&StyleMap>,
    defaults: Option<&StyleMap>,
) -> StyleMap {
    let mut resolved = defaults.cloned().unwrap_or_default();

    for (key, value) in resolved_document {
        if inheritable_keys.contains(key) {
            resolved.insert(key.clone(), value.clone());
        }
    }

    for layer in [preset, inline].into_iter().flatten() {
        resolved.extend(layer.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    resolved
}

/// Field-level fallback from the document override to the theme
pub fn resolve_page_settings(theme: &PageSettings, overrides: Option<&PageSettingsOverride>) -> PageSettings {
    let Some(overrides) = overrides else {
        return theme.clone();
    };

    PageSettings {
        format: overrides.format.unwrap_or(theme.format),
        orientation: overrides.orientation.unwrap_or(theme.orientation),
        margins: overrides.margins.unwrap_or(theme.margins),
        background_color: overrides
            .background_color
            .clone()
            .or_else(|| theme.background_color.clone()),
    }
}

pub fn resolve_preset_styles<'a>(theme: &'a Theme, name: Option<&str>) -> Option<&'a StyleMap> {
    theme
        .block_style_presets
        .get(name?)
        .map(|preset| &preset.styles)
}
