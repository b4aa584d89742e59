//! Decoding of raw radio frames into JSON payloads.
//!
//! Senders on the other end of the link usually transmit a JSON object as
//! text. Anything else is still served, wrapped in an object:
//!
//! | frame                         | payload                              |
//! |-------------------------------|--------------------------------------|
//! | `{"t":21}`                    | `{"t":21}`                           |
//! | `[1,2]` / `42` / `"x"`        | `{"value": <json>}`                  |
//! | `hello`                       | `{"bytes":[104,...],"text":"hello"}` |
//! | `0xff 0x00 0x12`              | `{"bytes":[255,0,18]}`               |

use serde_json::{Map, Value};

use crate::model::Payload;

/// Decode a frame into a payload object. Never fails.
pub fn decode_payload(raw: &[u8]) -> Payload {
    let trimmed = strip_nul_padding(raw);

    let text = std::str::from_utf8(trimmed).ok();

    if let Some(text) = text {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => return map,
            Ok(other) => {
                let mut map = Map::new();
                map.insert("value".to_string(), other);
                return map;
            }
            Err(_) => {}
        }
    }

    let mut map = Map::new();
    map.insert(
        "bytes".to_string(),
        Value::Array(trimmed.iter().map(|b| Value::from(*b)).collect()),
    );
    if let Some(text) = text.filter(|t| !t.is_empty()) {
        map.insert("text".to_string(), Value::String(text.to_string()));
    }
    map
}

/// C-string senders pad frames with trailing NUL bytes.
fn strip_nul_padding(raw: &[u8]) -> &[u8] {
    let end = raw.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
    &raw[..end]
}
