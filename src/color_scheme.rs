//! Named light and dark color schemes.
//!
//! ```text
//! Default
//!
//! LIGHT
//! background: #dcdad7
//! text: #181a1b
//!
//! DARK
//! background: #181a1b
//! text: #e8e6e3
//!
//! ================================
//! ```

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::ColorSchemeError;
use crate::format::{scan_records, Record, RecordLayout, Section};

/// Colors of one scheme variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorSchemeVariant {
    /// `#rgb` or `#rrggbb`, lower-case
    pub background_color: String,
    /// `#rgb` or `#rrggbb`, lower-case
    pub text_color: String,
}

/// All color schemes, keyed by name per variant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ColorSchemeConfig {
    pub light: BTreeMap<String, ColorSchemeVariant>,
    pub dark: BTreeMap<String, ColorSchemeVariant>,
}

impl ColorSchemeConfig {
    /// Parse color scheme text.
    ///
    /// Invalid records are skipped; their errors are returned next to the
    /// schemes that did parse.
    pub fn parse(text: &str) -> (Self, Vec<ColorSchemeError>) {
        let mut config = ColorSchemeConfig::default();
        let mut errors = Vec::new();

        for range in scan_records(text, RecordLayout::Blocks) {
            let record = Record::parse(&text[range]);
            if let Err(e) = config.add_record(&record) {
                log::warn!("Skipping color scheme: {}", e);
                errors.push(e);
            }
        }

        (config, errors)
    }

    /// Number of distinct scheme names.
    pub fn len(&self) -> usize {
        let mut names: Vec<&String> = self.light.keys().chain(self.dark.keys()).collect();
        names.sort();
        names.dedup();
        names.len()
    }

    /// Check if no scheme is defined.
    pub fn is_empty(&self) -> bool {
        self.light.is_empty() && self.dark.is_empty()
    }

    fn add_record(&mut self, record: &Record<'_>) -> Result<(), ColorSchemeError> {
        let name = match record.head.as_slice() {
            [] => return Err(ColorSchemeError::MissingName),
            [name] => name.to_string(),
            [name, extra, ..] => {
                return Err(ColorSchemeError::MalformedLine {
                    scheme: name.to_string(),
                    line: extra.to_string(),
                })
            }
        };

        let mut light = None;
        let mut dark = None;
        for section in &record.sections {
            let slot = match section.command {
                "LIGHT" => &mut light,
                "DARK" => &mut dark,
                other => return Err(ColorSchemeError::UnknownSection(other.to_string())),
            };
            if slot.is_some() {
                return Err(ColorSchemeError::Duplicate(name));
            }
            *slot = Some(parse_variant(&name, section)?);
        }

        if light.is_none() && dark.is_none() {
            return Err(ColorSchemeError::NoVariants(name));
        }
        if (light.is_some() && self.light.contains_key(&name))
            || (dark.is_some() && self.dark.contains_key(&name))
        {
            return Err(ColorSchemeError::Duplicate(name));
        }

        if let Some(variant) = light {
            self.light.insert(name.clone(), variant);
        }
        if let Some(variant) = dark {
            self.dark.insert(name, variant);
        }
        Ok(())
    }
}

fn parse_variant(scheme: &str, section: &Section<'_>) -> Result<ColorSchemeVariant, ColorSchemeError> {
    let mut background = None;
    let mut text = None;

    for line in section.entries() {
        let (key, value) = line
            .split_once(':')
            .ok_or_else(|| ColorSchemeError::MalformedLine {
                scheme: scheme.to_string(),
                line: line.clone(),
            })?;
        let slot = match key.trim() {
            "background" => &mut background,
            "text" => &mut text,
            _ => {
                return Err(ColorSchemeError::MalformedLine {
                    scheme: scheme.to_string(),
                    line: line.clone(),
                })
            }
        };
        *slot = Some(parse_hex_color(scheme, value.trim())?);
    }

    Ok(ColorSchemeVariant {
        background_color: background.ok_or_else(|| ColorSchemeError::MissingColor {
            scheme: scheme.to_string(),
            field: "background",
        })?,
        text_color: text.ok_or_else(|| ColorSchemeError::MissingColor {
            scheme: scheme.to_string(),
            field: "text",
        })?,
    })
}

fn parse_hex_color(scheme: &str, value: &str) -> Result<String, ColorSchemeError> {
    let valid = value
        .strip_prefix('#')
        .is_some_and(|hex| matches!(hex.len(), 3 | 6) && hex.bytes().all(|b| b.is_ascii_hexdigit()));
    if !valid {
        return Err(ColorSchemeError::InvalidColor {
            scheme: scheme.to_string(),
            value: value.to_string(),
        });
    }
    Ok(value.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "\
Default

LIGHT
background: #DCDAD7
text: #181a1b

DARK
background: #181a1b
text: #e8e6e3

================================

Sepia

DARK
background: #2b2118
text: #fed

================================

Broken

DARK
background: #12345
text: #fff
";

    #[test]
    fn test_parse_schemes() {
        let (config, errors) = ColorSchemeConfig::parse(TEXT);

        assert_eq!(config.len(), 2);
        assert_eq!(config.light["Default"].background_color, "#dcdad7");
        assert_eq!(config.dark["Default"].text_color, "#e8e6e3");
        assert_eq!(config.dark["Sepia"].text_color, "#fed");
        assert!(!config.light.contains_key("Sepia"));

        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ColorSchemeError::InvalidColor { .. }));
    }

    #[test]
    fn test_duplicate_name_skipped() {
        let text = "A\n\nDARK\nbackground: #000\ntext: #fff\n===\nA\n\nDARK\nbackground: #111\ntext: #eee\n";
        let (config, errors) = ColorSchemeConfig::parse(text);
        assert_eq!(config.dark["A"].background_color, "#000");
        assert_eq!(errors, vec![ColorSchemeError::Duplicate("A".to_string())]);
    }

    #[test]
    fn test_same_name_in_both_variants_is_fine() {
        let text = "A\n\nDARK\nbackground: #000\ntext: #fff\n===\nA\n\nLIGHT\nbackground: #fff\ntext: #000\n";
        let (config, errors) = ColorSchemeConfig::parse(text);
        assert!(errors.is_empty());
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn test_record_errors() {
        let (_, errors) = ColorSchemeConfig::parse("LIGHT\nbackground: #000\ntext: #fff\n");
        assert_eq!(errors, vec![ColorSchemeError::MissingName]);

        let (_, errors) = ColorSchemeConfig::parse("A\n\nDIM\nbackground: #000\n");
        assert_eq!(errors, vec![ColorSchemeError::UnknownSection("DIM".to_string())]);

        let (_, errors) = ColorSchemeConfig::parse("A\n\nDARK\nbackground: #000\n");
        assert_eq!(
            errors,
            vec![ColorSchemeError::MissingColor {
                scheme: "A".to_string(),
                field: "text"
            }]
        );
    }

    #[test]
    fn test_serialize_camel_case() {
        let (config, _) = ColorSchemeConfig::parse(TEXT);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["dark"]["Sepia"]["backgroundColor"], "#2b2118");
    }
}
