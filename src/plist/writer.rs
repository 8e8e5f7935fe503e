//! XML property list serializer.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use time::format_description::well_known::Rfc3339;
use time::UtcOffset;

use crate::plist::{Dictionary, Value};

const PROLOGUE: &str = concat!(
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n",
    "<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" ",
    "\"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n",
    "<plist version=\"1.0\">\n",
);

/// Serialize a dictionary as an XML property list document.
pub fn to_xml(dict: &Dictionary) -> Vec<u8> {
    let mut out = String::with_capacity(256);
    out.push_str(PROLOGUE);
    write_dictionary(&mut out, dict, 0);
    out.push_str("</plist>\n");
    out.into_bytes()
}

/// Emitted for dates whose year RFC 3339 cannot express.
const PLACEHOLDER_DATE: &str = "0001-01-01T00:00:00Z";

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push('\t');
    }
}

fn write_dictionary(out: &mut String, dict: &Dictionary, depth: usize) {
    indent(out, depth);
    if dict.is_empty() {
        out.push_str("<dict/>\n");
        return;
    }
    out.push_str("<dict>\n");
    for (key, value) in dict.iter() {
        indent(out, depth + 1);
        out.push_str("<key>");
        escape_into(out, key);
        out.push_str("</key>\n");
        write_value(out, value, depth + 1);
    }
    indent(out, depth);
    out.push_str("</dict>\n");
}

fn write_value(out: &mut String, value: &Value, depth: usize) {
    match value {
        Value::Dictionary(dict) => write_dictionary(out, dict, depth),
        Value::Array(items) => {
            indent(out, depth);
            if items.is_empty() {
                out.push_str("<array/>\n");
                return;
            }
            out.push_str("<array>\n");
            for item in items {
                write_value(out, item, depth + 1);
            }
            indent(out, depth);
            out.push_str("</array>\n");
        }
        Value::String(s) => {
            indent(out, depth);
            out.push_str("<string>");
            escape_into(out, s);
            out.push_str("</string>\n");
        }
        Value::Integer(i) => {
            indent(out, depth);
            out.push_str(&format!("<integer>{i}</integer>\n"));
        }
        Value::Real(r) => {
            indent(out, depth);
            // Debug formatting keeps a trailing ".0" so the value reads back as a real
            out.push_str(&format!("<real>{r:?}</real>\n"));
        }
        Value::Boolean(b) => {
            indent(out, depth);
            out.push_str(if *b { "<true/>\n" } else { "<false/>\n" });
        }
        Value::Data(bytes) => {
            indent(out, depth);
            out.push_str("<data>");
            out.push_str(&STANDARD.encode(bytes));
            out.push_str("</data>\n");
        }
        Value::Date(date) => {
            indent(out, depth);
            out.push_str("<date>");
            let utc = date.to_offset(UtcOffset::UTC);
            // Rfc3339 formatting only fails for years outside 0..=9999
            match utc.format(&Rfc3339) {
                Ok(text) => out.push_str(&text),
                Err(e) => {
                    tracing::warn!("Writing placeholder for unrepresentable date {}: {}", utc, e);
                    out.push_str(PLACEHOLDER_DATE);
                }
            }
            out.push_str("</date>\n");
        }
    }
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}
