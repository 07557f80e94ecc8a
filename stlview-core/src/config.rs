/// Viewer configuration derived from declarative attributes
use std::collections::{BTreeMap, HashMap};

use nalgebra::Vector3;

use crate::error::ConfigurationError;

pub const MODEL_ATTRIBUTE: &str = "model";
pub const COLOR_ATTRIBUTE: &str = "color";
pub const AUTO_ROTATE_ATTRIBUTE: &str = "auto_rotate";
pub const MATERIAL_TYPE_ATTRIBUTE: &str = "materialType";

/// Anything that can answer "what is the value of attribute `name`?"
pub trait AttributeSource {
    fn attribute(&self, name: &str) -> Option<String>;
}

impl AttributeSource for HashMap<String, String> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl AttributeSource for BTreeMap<String, String> {
    fn attribute(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

impl AttributeSource for [(&str, &str)] {
    fn attribute(&self, name: &str) -> Option<String> {
        self.iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    }
}

impl<const N: usize> AttributeSource for [(&str, &str); N] {
    fn attribute(&self, name: &str) -> Option<String> {
        self.as_slice().attribute(name)
    }
}

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(0xff, 0xff, 0xff);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub const fn from_u32(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as u8,
            g: ((hex >> 8) & 0xff) as u8,
            b: (hex & 0xff) as u8,
        }
    }

    pub fn to_u32(self) -> u32 {
        (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    /// Parse `#rrggbb` or `0xrrggbb`. Exactly six hex digits are accepted.
    pub fn from_hex(text: &str) -> Result<Self, ConfigurationError> {
        let trimmed = text.trim();
        let digits = trimmed
            .strip_prefix('#')
            .or_else(|| trimmed.strip_prefix("0x"))
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| ConfigurationError::MalformedColor(text.to_string()))?;

        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ConfigurationError::MalformedColor(text.to_string()));
        }

        u32::from_str_radix(digits, 16)
            .map(Self::from_u32)
            .map_err(|_| ConfigurationError::MalformedColor(text.to_string()))
    }

    /// Channels as floats in `0.0..=1.0`
    pub fn to_channels(self) -> Vector3<f32> {
        Vector3::new(
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        )
    }

    /// Inverse of [`Rgb::to_channels`], clamping out-of-range values
    pub fn from_channels(channels: Vector3<f32>) -> Self {
        let quantize = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(quantize(channels.x), quantize(channels.y), quantize(channels.z))
    }
}

/// How the loaded mesh is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialMode {
    /// Shaded, specular surface
    Solid,
    /// Flat unlit wireframe
    Wireframe,
}

impl MaterialMode {
    /// `"material"` selects [`MaterialMode::Solid`]; anything else, including no value, is wireframe.
    pub fn from_attribute(value: Option<&str>) -> Self {
        match value {
            Some("material") => MaterialMode::Solid,
            _ => MaterialMode::Wireframe,
        }
    }
}

/// Configuration of one mount. Never changes while the mount lives.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewerConfig {
    pub model_source: String,
    pub tint: Rgb,
    pub auto_rotate: bool,
    pub material_mode: MaterialMode,
}

impl ViewerConfig {
    pub fn from_attributes<A: AttributeSource + ?Sized>(
        attributes: &A,
    ) -> Result<Self, ConfigurationError> {
        let model_source = attributes
            .attribute(MODEL_ATTRIBUTE)
            .ok_or(ConfigurationError::MissingAttribute(MODEL_ATTRIBUTE))?;
        let color = attributes
            .attribute(COLOR_ATTRIBUTE)
            .ok_or(ConfigurationError::MissingAttribute(COLOR_ATTRIBUTE))?;
        let tint = Rgb::from_hex(&color)?;
        let auto_rotate = attributes.attribute(AUTO_ROTATE_ATTRIBUTE).as_deref() == Some("true");
        let material_mode =
            MaterialMode::from_attribute(attributes.attribute(MATERIAL_TYPE_ATTRIBUTE).as_deref());

        Ok(Self {
            model_source,
            tint,
            auto_rotate,
            material_mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_0x_prefixes_agree() {
        let hash = Rgb::from_hex("#ff0000").unwrap();
        let prefixed = Rgb::from_hex("0xff0000").unwrap();
        assert_eq!(hash, prefixed);
        assert_eq!(hash, Rgb::new(0xff, 0, 0));
        assert_eq!(Rgb::from_hex("#00FF7f").unwrap().to_u32(), 0x00ff7f);
    }

    #[test]
    fn test_malformed_colors_are_rejected() {
        for bad in ["notahexvalue", "ff0000", "#ff00", "#ff00000", "#gg0000", "", "#"] {
            assert_eq!(
                Rgb::from_hex(bad),
                Err(ConfigurationError::MalformedColor(bad.to_string())),
                "{bad:?} should not parse"
            );
        }
    }

    #[test]
    fn test_missing_model_fails() {
        let attrs = [(COLOR_ATTRIBUTE, "#ffffff")];
        assert_eq!(
            ViewerConfig::from_attributes(&attrs),
            Err(ConfigurationError::MissingAttribute("model"))
        );
    }

    #[test]
    fn test_missing_color_fails() {
        let attrs = [(MODEL_ATTRIBUTE, "cube.stl")];
        assert_eq!(
            ViewerConfig::from_attributes(&attrs),
            Err(ConfigurationError::MissingAttribute("color"))
        );
    }

    #[test]
    fn test_defaults() {
        let attrs = [(MODEL_ATTRIBUTE, "cube.stl"), (COLOR_ATTRIBUTE, "#696969")];
        let config = ViewerConfig::from_attributes(&attrs).unwrap();
        assert_eq!(config.model_source, "cube.stl");
        assert_eq!(config.tint, Rgb::from_u32(0x696969));
        assert!(!config.auto_rotate);
        assert_eq!(config.material_mode, MaterialMode::Wireframe);
    }

    #[test]
    fn test_optional_attributes() {
        let mut attrs = HashMap::new();
        attrs.insert(MODEL_ATTRIBUTE.to_string(), "part.stl".to_string());
        attrs.insert(COLOR_ATTRIBUTE.to_string(), "0x00ff00".to_string());
        attrs.insert(AUTO_ROTATE_ATTRIBUTE.to_string(), "true".to_string());
        attrs.insert(MATERIAL_TYPE_ATTRIBUTE.to_string(), "material".to_string());
        let config = ViewerConfig::from_attributes(&attrs).unwrap();
        assert!(config.auto_rotate);
        assert_eq!(config.material_mode, MaterialMode::Solid);

        attrs.insert(AUTO_ROTATE_ATTRIBUTE.to_string(), "yes".to_string());
        attrs.insert(MATERIAL_TYPE_ATTRIBUTE.to_string(), "Material".to_string());
        let config = ViewerConfig::from_attributes(&attrs).unwrap();
        assert!(!config.auto_rotate);
        assert_eq!(config.material_mode, MaterialMode::Wireframe);
    }

    #[test]
    fn test_channel_conversion_clamps() {
        let rgb = Rgb::from_channels(Vector3::new(2.0, 0.5, -1.0));
        assert_eq!(rgb, Rgb::new(255, 128, 0));
        assert_eq!(Rgb::from_channels(Rgb::WHITE.to_channels()), Rgb::WHITE);
    }
}
