//! XML property list parser.
//!
//! Handles the subset of XML the property list DTD allows: a prologue,
//! optional DOCTYPE and comments, one `<plist>` root (or a bare value) and the
//! typed elements `dict`, `array`, `key`, `string`, `integer`, `real`,
//! `true`, `false`, `data` and `date`. Text content is entity-decoded and
//! may use CDATA sections.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::base::storeerror::StoreError;
use crate::plist::{Dictionary, Value};

/// Maximum container nesting accepted from the wire.
pub const MAX_DEPTH: usize = 128;

/// Parse an XML property list whose root must be a dictionary.
pub fn from_slice(data: &[u8]) -> Result<Dictionary, StoreError> {
    let text = std::str::from_utf8(data)
        .map_err(|_| StoreError::malformed("document is not valid UTF-8"))?;
    let mut parser = Parser { src: text, pos: 0 };

    let first = parser.next_tag()?;
    let root = if first.name == "plist" && first.kind == TagKind::Open {
        let tag = parser.next_tag()?;
        let value = parser.value_from_tag(tag, 0)?;
        let close = parser.next_tag()?;
        if close.name != "plist" || close.kind != TagKind::Close {
            return Err(StoreError::malformed("expected </plist>"));
        }
        value
    } else {
        parser.value_from_tag(first, 0)?
    };

    parser.skip_misc()?;
    if !parser.rest().is_empty() {
        return Err(StoreError::malformed("trailing content after root element"));
    }

    match root {
        Value::Dictionary(dict) => Ok(dict),
        _ => Err(StoreError::malformed("root element is not a dictionary")),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Open,
    Close,
    Empty,
}

#[derive(Debug, Clone, Copy)]
struct Tag<'a> {
    name: &'a str,
    kind: TagKind,
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    /// Skip whitespace, processing instructions, comments and DOCTYPE.
    fn skip_misc(&mut self) -> Result<(), StoreError> {
        loop {
            let trimmed = self.rest().trim_start();
            self.pos = self.src.len() - trimmed.len();

            if trimmed.starts_with("<?") {
                self.skip_past("?>")?;
            } else if trimmed.starts_with("<!--") {
                self.skip_past("-->")?;
            } else if trimmed.starts_with("<!") && !trimmed.starts_with("<![CDATA[") {
                self.skip_past(">")?;
            } else {
                return Ok(());
            }
        }
    }

    fn skip_past(&mut self, marker: &str) -> Result<(), StoreError> {
        match self.rest().find(marker) {
            Some(idx) => {
                self.pos += idx + marker.len();
                Ok(())
            }
            None => Err(StoreError::malformed(format!(
                "unterminated markup, expected {marker}"
            ))),
        }
    }

    fn next_tag(&mut self) -> Result<Tag<'a>, StoreError> {
        self.skip_misc()?;
        let rest = self.rest();
        if rest.is_empty() {
            return Err(StoreError::malformed("unexpected end of document"));
        }
        if !rest.starts_with('<') {
            return Err(StoreError::malformed("unexpected text between elements"));
        }
        let end = rest
            .find('>')
            .ok_or_else(|| StoreError::malformed("unterminated tag"))?;
        let inner = &rest[1..end];
        self.pos += end + 1;

        let (kind, body) = if let Some(body) = inner.strip_prefix('/') {
            (TagKind::Close, body)
        } else if let Some(body) = inner.strip_suffix('/') {
            (TagKind::Empty, body)
        } else {
            (TagKind::Open, inner)
        };

        let name = body.split_whitespace().next().unwrap_or("");
        if name.is_empty() {
            return Err(StoreError::malformed("empty tag name"));
        }
        Ok(Tag { name, kind })
    }

    /// Read entity-decoded text up to the matching close tag.
    fn read_text(&mut self, name: &str) -> Result<String, StoreError> {
        const CDATA_OPEN: &str = "<![CDATA[";
        let mut out = String::new();

        loop {
            let rest = self.rest();
            if let Some(cdata) = rest.strip_prefix(CDATA_OPEN) {
                let end = cdata
                    .find("]]>")
                    .ok_or_else(|| StoreError::malformed("unterminated CDATA section"))?;
                out.push_str(&cdata[..end]);
                self.pos += CDATA_OPEN.len() + end + 3;
                continue;
            }

            let lt = rest
                .find('<')
                .ok_or_else(|| StoreError::malformed(format!("unterminated <{name}>")))?;
            unescape_into(&mut out, &rest[..lt])?;
            self.pos += lt;

            if !self.rest().starts_with(CDATA_OPEN) {
                break;
            }
        }

        let close = self.next_tag()?;
        if close.kind != TagKind::Close || close.name != name {
            return Err(StoreError::malformed(format!(
                "expected </{name}>, found <{}>",
                close.name
            )));
        }
        Ok(out)
    }

    fn value_from_tag(&mut self, tag: Tag<'a>, depth: usize) -> Result<Value, StoreError> {
        if depth > MAX_DEPTH {
            return Err(StoreError::malformed("nesting too deep"));
        }

        match (tag.name, tag.kind) {
            ("dict", TagKind::Empty) => Ok(Value::Dictionary(Dictionary::new())),
            ("dict", TagKind::Open) => self.read_dictionary(depth).map(Value::Dictionary),
            ("array", TagKind::Empty) => Ok(Value::Array(Vec::new())),
            ("array", TagKind::Open) => self.read_array(depth).map(Value::Array),
            ("string", TagKind::Empty) => Ok(Value::String(String::new())),
            ("string", TagKind::Open) => self.read_text("string").map(Value::String),
            ("data", TagKind::Empty) => Ok(Value::Data(Vec::new())),
            ("data", TagKind::Open) => {
                let text = self.read_text("data")?;
                let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
                STANDARD
                    .decode(compact)
                    .map(Value::Data)
                    .map_err(|_| StoreError::malformed("invalid base64 in <data>"))
            }
            ("integer", TagKind::Open) => {
                let text = self.read_text("integer")?;
                parse_integer(text.trim()).map(Value::Integer)
            }
            ("real", TagKind::Open) => {
                let text = self.read_text("real")?;
                text.trim()
                    .parse::<f64>()
                    .map(Value::Real)
                    .map_err(|_| StoreError::malformed(format!("invalid real: {}", text.trim())))
            }
            ("date", TagKind::Open) => {
                let text = self.read_text("date")?;
                OffsetDateTime::parse(text.trim(), &Rfc3339)
                    .map(Value::Date)
                    .map_err(|_| StoreError::malformed(format!("invalid date: {}", text.trim())))
            }
            ("true", TagKind::Empty) => Ok(Value::Boolean(true)),
            ("false", TagKind::Empty) => Ok(Value::Boolean(false)),
            (name, TagKind::Close) => Err(StoreError::malformed(format!(
                "unexpected closing tag </{name}>"
            ))),
            (name, _) => Err(StoreError::malformed(format!("unknown element <{name}>"))),
        }
    }

    fn read_dictionary(&mut self, depth: usize) -> Result<Dictionary, StoreError> {
        let mut dict = Dictionary::new();
        loop {
            let tag = self.next_tag()?;
            let key = match (tag.name, tag.kind) {
                ("dict", TagKind::Close) => return Ok(dict),
                ("key", TagKind::Open) => self.read_text("key")?,
                ("key", TagKind::Empty) => String::new(),
                (name, _) => {
                    return Err(StoreError::malformed(format!(
                        "expected <key> in dictionary, found <{name}>"
                    )))
                }
            };
            let value_tag = self.next_tag()?;
            let value = self.value_from_tag(value_tag, depth + 1)?;
            dict.insert(key, value);
        }
    }

    fn read_array(&mut self, depth: usize) -> Result<Vec<Value>, StoreError> {
        let mut items = Vec::new();
        loop {
            let tag = self.next_tag()?;
            if tag.name == "array" && tag.kind == TagKind::Close {
                return Ok(items);
            }
            items.push(self.value_from_tag(tag, depth + 1)?);
        }
    }
}

fn parse_integer(text: &str) -> Result<i64, StoreError> {
    let parsed = if let Some(hex) = text.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else {
        // Unsigned values above i64::MAX keep their bit pattern
        text.parse::<i64>()
            .ok()
            .or_else(|| text.parse::<u64>().ok().map(|u| u as i64))
    };
    parsed.ok_or_else(|| StoreError::malformed(format!("invalid integer: {text}")))
}

fn unescape_into(out: &mut String, text: &str) -> Result<(), StoreError> {
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        let semi = after
            .find(';')
            .ok_or_else(|| StoreError::malformed("unterminated entity"))?;
        let entity = &after[..semi];
        let decoded = match entity {
            "amp" => '&',
            "lt" => '<',
            "gt" => '>',
            "quot" => '"',
            "apos" => '\'',
            _ => {
                let code = if let Some(hex) = entity.strip_prefix("#x") {
                    u32::from_str_radix(hex, 16).ok()
                } else if let Some(dec) = entity.strip_prefix('#') {
                    dec.parse::<u32>().ok()
                } else {
                    None
                };
                code.and_then(char::from_u32).ok_or_else(|| {
                    StoreError::malformed(format!("unknown entity &{entity};"))
                })?
            }
        };
        out.push(decoded);
        rest = &after[semi + 1..];
    }
    out.push_str(rest);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plist::to_xml;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
    <!-- download ticket -->
    <key>jingleDocType</key><string>purchaseSuccess</string>
    <key>status</key><integer>0</integer>
    <key>songList</key>
    <array>
        <dict>
            <key>URL</key><string>https://example.com/a.ipa?x=1&amp;y=2</string>
            <key>sinfs</key>
            <array>
                <dict>
                    <key>id</key><integer>0</integer>
                    <key>sinf</key><data>
                    3q2+
                    7w==
                    </data>
                </dict>
            </array>
            <key>metadata</key><dict/>
        </dict>
    </array>
    <key>isFree</key><true/>
    <key>rating</key><real>4.5</real>
    <key>releaseDate</key><date>2021-03-04T05:06:07Z</date>
</dict>
</plist>
"#;

    #[test]
    fn test_parses_backend_document() {
        let dict = from_slice(SAMPLE.as_bytes()).unwrap();
        assert_eq!(dict.get_str("jingleDocType"), Some("purchaseSuccess"));
        assert_eq!(dict.get("status"), Some(&Value::Integer(0)));
        assert_eq!(dict.get("isFree"), Some(&Value::Boolean(true)));
        assert_eq!(dict.get("rating"), Some(&Value::Real(4.5)));
        assert!(matches!(dict.get("releaseDate"), Some(Value::Date(_))));

        let songs = dict.get_array("songList").unwrap();
        let item = songs[0].as_dictionary().unwrap();
        assert_eq!(item.get_str("URL"), Some("https://example.com/a.ipa?x=1&y=2"));
        let sinf = item.get_array("sinfs").unwrap()[0].as_dictionary().unwrap();
        assert_eq!(
            sinf.get("sinf"),
            Some(&Value::Data(vec![0xde, 0xad, 0xbe, 0xef]))
        );
        assert_eq!(item.get_dictionary("metadata"), Some(&Dictionary::new()));
    }

    #[test]
    fn test_roundtrip_nested() {
        let mut inner = Dictionary::new();
        inner.insert("bundleVersion", "1.2.3");
        inner.insert("blob", vec![0_u8, 1, 2, 255]);
        inner.insert("flags", vec![Value::from(true), Value::from(false)]);

        let mut dict = Dictionary::new();
        dict.insert("name", "Tom & Jerry <3");
        dict.insert("count", -42_i64);
        dict.insert("big", i64::MAX);
        dict.insert("metadata", inner);
        dict.insert("list", vec![Value::from("a"), Value::from(1_i64)]);
        dict.insert("empty", "");

        let decoded = from_slice(&to_xml(&dict)).unwrap();
        assert_eq!(decoded, dict);
    }

    #[test]
    fn test_rejects_non_dictionary_root() {
        let doc = r#"<plist version="1.0"><array><string>x</string></array></plist>"#;
        assert!(matches!(
            from_slice(doc.as_bytes()),
            Err(StoreError::MalformedWireFormat(msg)) if msg.contains("not a dictionary")
        ));
    }

    #[test]
    fn test_rejects_empty_and_truncated() {
        assert!(from_slice(b"").is_err());
        assert!(from_slice(b"<plist><dict><key>a</key>").is_err());
        assert!(from_slice(b"<plist><dict><key>a</key><string>b").is_err());
    }

    #[test]
    fn test_rejects_unknown_element() {
        let doc = "<plist><dict><key>a</key><widget/></dict></plist>";
        assert!(matches!(
            from_slice(doc.as_bytes()),
            Err(StoreError::MalformedWireFormat(msg)) if msg.contains("widget")
        ));
    }

    #[test]
    fn test_rejects_bad_scalars() {
        assert!(from_slice(b"<dict><key>a</key><integer>ten</integer></dict>").is_err());
        assert!(from_slice(b"<dict><key>a</key><data>***</data></dict>").is_err());
        assert!(from_slice(b"<dict><key>a</key><string>&bogus;</string></dict>").is_err());
    }

    #[test]
    fn test_bare_root_and_cdata() {
        let doc = "<dict><key>k</key><string><![CDATA[a<b]]></string></dict>";
        let dict = from_slice(doc.as_bytes()).unwrap();
        assert_eq!(dict.get_str("k"), Some("a<b"));
    }

    #[test]
    fn test_numeric_entities() {
        let doc = "<dict><key>k</key><string>&#65;&#x42;</string></dict>";
        assert_eq!(from_slice(doc.as_bytes()).unwrap().get_str("k"), Some("AB"));
    }
}
