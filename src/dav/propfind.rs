//! PROPFIND request body and multistatus parsing

use crate::dav::error::DavResult;
use crate::dav::types::FileMetadata;
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

pub const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<d:propfind xmlns:d="DAV:" xmlns:oc="http://owncloud.org/ns" xmlns:nc="http://nextcloud.org/ns">
  <d:prop>
    <d:getlastmodified/>
    <d:getetag/>
    <d:getcontenttype/>
    <d:getcontentlength/>
    <d:resourcetype/>
    <oc:fileid/>
    <oc:id/>
    <oc:size/>
  </d:prop>
</d:propfind>"#;

/// Properties collected from one `<d:propstat>` block
#[derive(Default)]
struct PropStat {
    status: Option<String>,
    etag: Option<String>,
    content_length: Option<u64>,
    oc_size: Option<u64>,
    content_type: Option<String>,
    last_modified: Option<DateTime<Utc>>,
    file_id: Option<String>,
    oc_id: Option<String>,
    is_collection: bool,
}

impl PropStat {
    /// Properties under a non-200 propstat were not found on the server
    fn is_ok(&self) -> bool {
        self.status
            .as_deref()
            .map(|status| status.split_whitespace().nth(1) == Some("200"))
            .unwrap_or(true)
    }

    fn apply(self, target: &mut FileMetadata) {
        if let Some(size) = self.content_length.or(self.oc_size) {
            target.size = size;
        }
        if self.etag.is_some() {
            target.etag = self.etag;
        }
        if self.content_type.is_some() {
            target.content_type = self.content_type;
        }
        if self.last_modified.is_some() {
            target.last_modified = self.last_modified;
        }
        if self.file_id.is_some() {
            target.file_id = self.file_id;
        }
        if self.oc_id.is_some() {
            target.oc_id = self.oc_id;
        }
        target.is_collection |= self.is_collection;
    }
}

/// Parse a `207 Multi-Status` body into one entry per `<d:response>`.
///
/// Elements are matched by local name so any namespace prefix works.
pub fn parse_multistatus(xml: &str) -> DavResult<Vec<FileMetadata>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut current: Option<FileMetadata> = None;
    let mut propstat = PropStat::default();
    let mut open: Vec<Vec<u8>> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"response" => current = Some(FileMetadata::default()),
                    b"propstat" => propstat = PropStat::default(),
                    b"collection" => propstat.is_collection = true,
                    _ => {}
                }
                open.push(name);
            }
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"collection" {
                    propstat.is_collection = true;
                }
            }
            Event::Text(t) => {
                let text = t.unescape()?.into_owned();
                match open.last().map(Vec::as_slice) {
                    Some(b"href") => {
                        if let Some(entry) = current.as_mut() {
                            entry.href = text;
                        }
                    }
                    Some(b"status") => propstat.status = Some(text),
                    Some(b"getetag") => propstat.etag = Some(text.trim_matches('"').to_string()),
                    Some(b"getcontentlength") => propstat.content_length = text.parse().ok(),
                    Some(b"size") => propstat.oc_size = text.parse().ok(),
                    Some(b"getcontenttype") => propstat.content_type = Some(text),
                    Some(b"getlastmodified") => {
                        propstat.last_modified = DateTime::parse_from_rfc2822(&text)
                            .ok()
                            .map(|date| date.with_timezone(&Utc));
                    }
                    Some(b"fileid") => propstat.file_id = Some(text),
                    Some(b"id") => propstat.oc_id = Some(text),
                    _ => {}
                }
            }
            Event::End(e) => {
                open.pop();
                match e.local_name().as_ref() {
                    b"propstat" => {
                        let finished = std::mem::take(&mut propstat);
                        if finished.is_ok() {
                            if let Some(entry) = current.as_mut() {
                                finished.apply(entry);
                            }
                        }
                    }
                    b"response" => {
                        if let Some(entry) = current.take() {
                            entries.push(entry);
                        }
                    }
                    _ => {}
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}
