//! `.config` document codec.
//!
//! Persisted shape:
//!
//! ```xml
//! <?xml version="1.0" encoding="utf-8"?>
//! <configuration>
//!   <header>
//!     <parameter name="ConfigurationName" value="assembly"/>
//!     ...
//!   </header>
//!   <translator type="6" mode="0">
//!     <parameter name="TargetExtension" value="PDF"/>
//!     ...
//!   </translator>
//! </configuration>
//! ```
//!
//! The codec moves between this document and a flat [`RawConfig`] of
//! name/value pairs; the typed record layer owns all interpretation. The
//! document is produced from the typed fields on every save, never edited in
//! place, so the two representations cannot drift apart.

use camino::Utf8Path;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};

use super::ConfigError;

/// Uninterpreted contents of one `.config` document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawConfig {
    pub header: Vec<(String, String)>,
    pub translator_type: u8,
    pub translator_mode: u32,
    pub parameters: Vec<(String, String)>,
}

impl RawConfig {
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.header
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    None,
    Header,
    Translator,
}

/// Read and parse a `.config` file. A missing file is [`ConfigError::NotFound`]
/// so callers can distinguish it from a broken document.
pub fn read_config_file(path: &Utf8Path) -> Result<RawConfig, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound(path.to_owned()));
    }
    let text = std::fs::read_to_string(path)?;
    read_config_str(&text)
}

pub fn read_config_str(text: &str) -> Result<RawConfig, ConfigError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut raw = RawConfig::default();
    let mut section = Section::None;
    let mut saw_root = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"configuration" => saw_root = true,
                b"header" => section = Section::Header,
                b"translator" => {
                    section = Section::Translator;
                    read_translator_attributes(&e, &mut raw)?;
                }
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"parameter" => {
                    let (name, value) = read_parameter(&e)?;
                    match section {
                        Section::Header => raw.header.push((name, value)),
                        Section::Translator => raw.parameters.push((name, value)),
                        Section::None => {
                            return Err(ConfigError::Malformed(format!(
                                "parameter '{name}' outside header or translator"
                            )));
                        }
                    }
                }
                b"translator" => read_translator_attributes(&e, &mut raw)?,
                _ => {}
            },
            Event::End(e) => {
                if matches!(e.name().as_ref(), b"header" | b"translator") {
                    section = Section::None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(ConfigError::Malformed(
            "missing <configuration> root element".to_string(),
        ));
    }
    Ok(raw)
}

fn read_translator_attributes(
    element: &BytesStart<'_>,
    raw: &mut RawConfig,
) -> Result<(), ConfigError> {
    let kind = attribute_value(element, b"type")?.ok_or_else(|| {
        ConfigError::Malformed("translator element missing type attribute".to_string())
    })?;
    raw.translator_type = kind
        .parse()
        .map_err(|_| ConfigError::Malformed(format!("invalid translator type '{kind}'")))?;
    if let Some(mode) = attribute_value(element, b"mode")? {
        raw.translator_mode = mode
            .parse()
            .map_err(|_| ConfigError::Malformed(format!("invalid translator mode '{mode}'")))?;
    }
    Ok(())
}

fn read_parameter(element: &BytesStart<'_>) -> Result<(String, String), ConfigError> {
    let name = attribute_value(element, b"name")?.ok_or_else(|| {
        ConfigError::Malformed("parameter element missing name attribute".to_string())
    })?;
    let value = attribute_value(element, b"value")?.unwrap_or_default();
    Ok((name, value))
}

fn attribute_value(
    element: &BytesStart<'_>,
    key: &[u8],
) -> Result<Option<String>, ConfigError> {
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| ConfigError::Malformed(e.to_string()))?;
        if attribute.key.as_ref() == key {
            let value = attribute
                .unescape_value()
                .map_err(|e| ConfigError::Malformed(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

/// Serialise a [`RawConfig`] and write it to `path`.
pub fn write_config_file(path: &Utf8Path, raw: &RawConfig) -> Result<(), ConfigError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("configuration")))?;

    writer.write_event(Event::Start(BytesStart::new("header")))?;
    for (name, value) in &raw.header {
        write_parameter(&mut writer, name, value)?;
    }
    writer.write_event(Event::End(BytesEnd::new("header")))?;

    let kind = raw.translator_type.to_string();
    let mode = raw.translator_mode.to_string();
    let mut translator = BytesStart::new("translator");
    translator.push_attribute(("type", kind.as_str()));
    translator.push_attribute(("mode", mode.as_str()));
    if raw.parameters.is_empty() {
        writer.write_event(Event::Empty(translator))?;
    } else {
        writer.write_event(Event::Start(translator))?;
        for (name, value) in &raw.parameters {
            write_parameter(&mut writer, name, value)?;
        }
        writer.write_event(Event::End(BytesEnd::new("translator")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("configuration")))?;

    std::fs::write(path, writer.into_inner())?;
    Ok(())
}

fn write_parameter(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    value: &str,
) -> Result<(), ConfigError> {
    let mut parameter = BytesStart::new("parameter");
    parameter.push_attribute(("name", name));
    parameter.push_attribute(("value", value));
    writer.write_event(Event::Empty(parameter))?;
    Ok(())
}
