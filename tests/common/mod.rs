#![allow(dead_code)]

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::json;
use std::collections::BTreeMap;

use article_image_set_mapper::queue::Message;

pub const SOURCE_UUID: &str = "512c1f3d-e48c-4618-863c-94bc9d913b9b";
pub const FIRST_SET_UUID: &str = "e3f8c06f-484c-3e33-85b9-142e22448355";
pub const SECOND_SET_UUID: &str = "09f60f01-462a-35d7-98a1-1939a94e544a";

pub const ARTICLE: &str = r#"<doc>
    <story>
        <text>
            <body>
                Somebody
                <image-set id="U22104508221701xCD">
                    <image-small fileref="/FT/Graphics/Online/Z_Undefined/2017/03/timeline-artboards-s.png?uuid=2ae43059-c725-4e6f-95d7-45f04f2e33b6" />
                    <image-medium fileref="/FT/Graphics/Online/Z_Undefined/2017/03/timeline-artboards-m.png?uuid=78ed71df-457f-41a9-95a2-ef69622ccf13" />
                    <image-large fileref="/FT/Graphics/Online/Z_Undefined/2017/03/timeline-artboards-l.png?uuid=4a29a412-d94b-46af-a36f-e7be0dfe20f6" />
                </image-set>
                is
                <image-set id="U33104508221999xAA">
                    <image-small fileref="/FT/Graphics/Online/Z_Undefined/2017/03/timeline-artboards-s.png?uuid=83a927a3-69ff-407d-9ae6-ba9d06fbdc89" />
                    <image-medium fileref="/FT/Graphics/Online/Z_Undefined/2017/03/timeline-artboards-m.png?uuid=0e4116ae-22bb-4eac-8380-26955d5ffc04" />
                    <image-large fileref="/FT/Graphics/Online/Z_Undefined/2017/03/timeline-artboards-l.png?uuid=0912908c-9f0b-4cc1-be0d-3cce248f4183" />
                </image-set>
                reading.
            </body>
        </text>
    </story>
</doc>"#;

pub const ATTRIBUTES: &str = "<ObjectMetadata><OutputChannels><DIFTcom><DIFTcomLastPublication>20170518132425</DIFTcomLastPublication><DIFTcomInitialPublication>20170518132400</DIFTcomInitialPublication></DIFTcom></OutputChannels></ObjectMetadata>";

pub const ORIGIN: &str = "http://cmdb.ft.com/systems/methode-web-pub";
pub const TIMESTAMP: &str = "2017-05-15T15:54:32.166Z";

pub fn envelope_with(kind: &str, body: &str, attributes: &str) -> String {
    json!({
        "uuid": SOURCE_UUID,
        "type": kind,
        "value": STANDARD.encode(body),
        "attributes": attributes,
    })
    .to_string()
}

pub fn envelope(body: &str, attributes: &str) -> String {
    envelope_with("EOM::CompoundStory", body, attributes)
}

/// Inbound queue message; `None` leaves a header out.
pub fn inbound(tid: Option<&str>, origin: Option<&str>, timestamp: Option<&str>, body: String) -> Message {
    let mut headers = BTreeMap::new();
    if let Some(tid) = tid {
        headers.insert("X-Request-Id".to_string(), tid.to_string());
    }
    if let Some(origin) = origin {
        headers.insert("Origin-System-Id".to_string(), origin.to_string());
    }
    if let Some(timestamp) = timestamp {
        headers.insert("Message-Timestamp".to_string(), timestamp.to_string());
    }
    Message::new(headers, body)
}
