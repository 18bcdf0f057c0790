use thiserror::Error;

/// Errors that can occur while loading an XML document.
#[derive(Debug, Error)]
pub enum XmlError {
  #[error("malformed xml: {0}")]
  Xml(#[from] quick_xml::Error),

  #[error("malformed xml attribute: {0}")]
  Attr(#[from] quick_xml::events::attributes::AttrError),

  #[error("xml is not valid utf-8: {0}")]
  Utf8(#[from] std::str::Utf8Error),

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// The document has no root element.
  #[error("xml document has no root element")]
  Empty,
}
