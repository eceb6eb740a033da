//! The XML plugin cache file.
//!
//! ```xml
//! <cache version="...">
//!   <bundle>
//!     <binary static_bin="0" path="..." bundle_path="..." mtime="..." size="..."/>
//!     <!-- a binary that failed to open carries invalid="1" and no plugins -->
//!     <plugin name="..." index="0" api="..." api_version="1" major_version="1" minor_version="0">
//!       <apiproperties>
//!         <property name="OfxPropLabel" type="string" dimension="1">
//!           <value index="0">Blur</value>
//!         </property>
//!       </apiproperties>
//!     </plugin>
//!   </bundle>
//! </cache>
//! ```

use std::str::FromStr;

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use serde::Serialize;
use thiserror::Error;

use ofxhost_core::error::HostError;

use crate::library::FileStamp;
use crate::property::{PropertySnapshot, PropertyType};

/// Problems reading a cache file.
#[derive(Debug, Error)]
pub enum CacheParseError {
    /// Not well-formed XML.
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),

    /// An attribute could not be decoded.
    #[error("malformed attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    /// A required attribute is absent.
    #[error("<{element}> is missing attribute '{attribute}'")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    /// An attribute holds an unusable value.
    #[error("<{element}> attribute '{attribute}' has invalid value '{value}'")]
    InvalidAttribute {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },

    /// An element appears where it is not allowed.
    #[error("unexpected <{0}>")]
    Unexpected(String),

    /// The document has no `<cache>` root.
    #[error("no <cache> element")]
    NoRoot,
}

impl From<CacheParseError> for HostError {
    fn from(err: CacheParseError) -> Self {
        HostError::cache(err.to_string())
    }
}

/// Contents of one cache file.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheDocument {
    /// Version tag the file was written with.
    pub version: String,
    /// One entry per binary.
    pub bundles: Vec<CachedBundle>,
}

/// A binary and its plugins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedBundle {
    /// Where the binary lives.
    pub binary: CachedBinary,
    /// Plugins exported by the binary.
    pub plugins: Vec<CachedPlugin>,
}

/// The `<binary>` element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedBinary {
    /// Linked into the host executable.
    pub is_static: bool,
    /// Path of the shared object.
    pub path: String,
    /// Path of the bundle directory.
    pub bundle_path: String,
    /// Stamp when the cache was written.
    pub stamp: FileStamp,
    /// Could not be opened or lacks an export when the cache was written.
    pub invalid: bool,
}

/// The `<plugin>` element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedPlugin {
    /// Identifier as exported.
    pub identifier: String,
    /// Position in the binary's export table.
    pub index: usize,
    /// API name.
    pub api: String,
    /// API version.
    pub api_version: i32,
    /// Major version.
    pub version_major: u32,
    /// Minor version.
    pub version_minor: u32,
    /// Describe results.
    pub properties: Vec<CachedProperty>,
}

/// One `<property>` element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedProperty {
    /// Property name.
    pub name: String,
    /// Value kind.
    pub kind: PropertyType,
    /// Fixed dimension, or zero.
    pub dimension: usize,
    /// `(index, text)` pairs.
    pub values: Vec<(usize, String)>,
}

impl CachedProperty {
    /// Persistable form of a snapshot; pointers are never written.
    pub fn from_snapshot(snapshot: PropertySnapshot) -> Option<Self> {
        if snapshot.kind == PropertyType::Pointer {
            return None;
        }
        Some(Self {
            name: snapshot.name,
            kind: snapshot.kind,
            dimension: snapshot.dimension,
            values: snapshot.values.into_iter().enumerate().collect(),
        })
    }
}

impl CacheDocument {
    /// An empty document tagged `version`.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            bundles: Vec::new(),
        }
    }

    /// Parse a cache file.
    pub fn parse(text: &str) -> Result<Self, CacheParseError> {
        let mut reader = Reader::from_str(text);
        let mut parser = Parser::default();

        loop {
            match reader.read_event()? {
                Event::Start(e) => parser.open(&e)?,
                Event::Empty(e) => {
                    parser.open(&e)?;
                    parser.close(e.name().as_ref())?;
                }
                Event::End(e) => parser.close(e.name().as_ref())?,
                Event::Text(e) => {
                    if let Some(value) = parser.value.as_mut() {
                        value.1.push_str(&e.unescape()?);
                    }
                }
                Event::CData(e) => {
                    if let Some(value) = parser.value.as_mut() {
                        value.1.push_str(&String::from_utf8_lossy(&e.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        parser.document.ok_or(CacheParseError::NoRoot)
    }

    /// Serialize to XML text.
    pub fn to_xml(&self) -> String {
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str(&format!("<cache version=\"{}\">\n", escape(&self.version)));

        for bundle in &self.bundles {
            let binary = &bundle.binary;
            xml.push_str("  <bundle>\n");
            xml.push_str(&format!(
                "    <binary static_bin=\"{}\" path=\"{}\" bundle_path=\"{}\" mtime=\"{}\" size=\"{}\"{}/>\n",
                u8::from(binary.is_static),
                escape(&binary.path),
                escape(&binary.bundle_path),
                binary.stamp.modified,
                binary.stamp.size,
                if binary.invalid { " invalid=\"1\"" } else { "" }
            ));
            for plugin in &bundle.plugins {
                xml.push_str(&format!(
                    "    <plugin name=\"{}\" index=\"{}\" api=\"{}\" api_version=\"{}\" major_version=\"{}\" minor_version=\"{}\">\n",
                    escape(&plugin.identifier),
                    plugin.index,
                    escape(&plugin.api),
                    plugin.api_version,
                    plugin.version_major,
                    plugin.version_minor
                ));
                xml.push_str("      <apiproperties>\n");
                for property in &plugin.properties {
                    xml.push_str(&format!(
                        "        <property name=\"{}\" type=\"{}\" dimension=\"{}\">\n",
                        escape(&property.name),
                        property.kind,
                        property.dimension
                    ));
                    for (index, text) in &property.values {
                        xml.push_str(&format!(
                            "          <value index=\"{index}\">{}</value>\n",
                            escape(text)
                        ));
                    }
                    xml.push_str("        </property>\n");
                }
                xml.push_str("      </apiproperties>\n");
                xml.push_str("    </plugin>\n");
            }
            xml.push_str("  </bundle>\n");
        }

        xml.push_str("</cache>\n");
        xml
    }
}

#[derive(Default)]
struct Parser {
    document: Option<CacheDocument>,
    binary: Option<CachedBinary>,
    plugins: Vec<CachedPlugin>,
    in_bundle: bool,
    plugin: Option<CachedPlugin>,
    property: Option<CachedProperty>,
    value: Option<(usize, String)>,
}

impl Parser {
    fn open(&mut self, e: &BytesStart<'_>) -> Result<(), CacheParseError> {
        let name = e.name();
        match name.as_ref() {
            b"cache" => {
                let version = attribute(e, "cache", "version")?;
                self.document = Some(CacheDocument::new(version));
            }
            b"bundle" => {
                self.root()?;
                self.in_bundle = true;
                self.binary = None;
                self.plugins.clear();
            }
            b"binary" => {
                if !self.in_bundle {
                    return Err(unexpected("binary"));
                }
                self.binary = Some(CachedBinary {
                    is_static: parse_attribute::<u8>(e, "binary", "static_bin")? != 0,
                    path: attribute(e, "binary", "path")?,
                    bundle_path: attribute(e, "binary", "bundle_path")?,
                    stamp: FileStamp {
                        modified: parse_attribute(e, "binary", "mtime")?,
                        size: parse_attribute(e, "binary", "size")?,
                    },
                    invalid: match optional_attribute(e, "invalid")? {
                        Some(value) => value.trim() != "0",
                        None => false,
                    },
                });
            }
            b"plugin" => {
                if !self.in_bundle || self.binary.is_none() {
                    return Err(unexpected("plugin"));
                }
                self.plugin = Some(CachedPlugin {
                    identifier: attribute(e, "plugin", "name")?,
                    index: parse_attribute(e, "plugin", "index")?,
                    api: attribute(e, "plugin", "api")?,
                    api_version: parse_attribute(e, "plugin", "api_version")?,
                    version_major: parse_attribute(e, "plugin", "major_version")?,
                    version_minor: parse_attribute(e, "plugin", "minor_version")?,
                    properties: Vec::new(),
                });
            }
            b"apiproperties" => {
                if self.plugin.is_none() {
                    return Err(unexpected("apiproperties"));
                }
            }
            b"property" => {
                if self.plugin.is_none() {
                    return Err(unexpected("property"));
                }
                self.property = Some(CachedProperty {
                    name: attribute(e, "property", "name")?,
                    kind: parse_attribute(e, "property", "type")?,
                    dimension: parse_attribute(e, "property", "dimension")?,
                    values: Vec::new(),
                });
            }
            b"value" => {
                if self.property.is_none() {
                    return Err(unexpected("value"));
                }
                self.value = Some((parse_attribute(e, "value", "index")?, String::new()));
            }
            other => return Err(unexpected(&String::from_utf8_lossy(other))),
        }
        Ok(())
    }

    fn close(&mut self, name: &[u8]) -> Result<(), CacheParseError> {
        match name {
            b"value" => {
                if let (Some(value), Some(property)) = (self.value.take(), self.property.as_mut()) {
                    property.values.push(value);
                }
            }
            b"property" => {
                if let (Some(property), Some(plugin)) = (self.property.take(), self.plugin.as_mut()) {
                    plugin.properties.push(property);
                }
            }
            b"plugin" => {
                if let Some(plugin) = self.plugin.take() {
                    self.plugins.push(plugin);
                }
            }
            b"bundle" => {
                self.in_bundle = false;
                let binary = self.binary.take().ok_or(CacheParseError::MissingAttribute {
                    element: "bundle",
                    attribute: "binary",
                })?;
                let plugins = std::mem::take(&mut self.plugins);
                self.root()?.bundles.push(CachedBundle { binary, plugins });
            }
            _ => {}
        }
        Ok(())
    }

    fn root(&mut self) -> Result<&mut CacheDocument, CacheParseError> {
        self.document.as_mut().ok_or(CacheParseError::NoRoot)
    }
}

fn unexpected(name: &str) -> CacheParseError {
    CacheParseError::Unexpected(name.to_string())
}

fn attribute(
    e: &BytesStart<'_>,
    element: &'static str,
    name: &'static str,
) -> Result<String, CacheParseError> {
    optional_attribute(e, name)?.ok_or(CacheParseError::MissingAttribute {
        element,
        attribute: name,
    })
}

fn optional_attribute(
    e: &BytesStart<'_>,
    name: &'static str,
) -> Result<Option<String>, CacheParseError> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == name.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn parse_attribute<T: FromStr>(
    e: &BytesStart<'_>,
    element: &'static str,
    name: &'static str,
) -> Result<T, CacheParseError> {
    let value = attribute(e, element, name)?;
    value
        .trim()
        .parse()
        .map_err(|_| CacheParseError::InvalidAttribute {
            element,
            attribute: name,
            value,
        })
}
