//! Attachment names read from the decrypted KDBX XML.
//!
//! The keepass crate drops each entry's `<Binary>` reference while parsing,
//! so the names are collected from the XML document and joined back onto
//! the converted entries by UUID.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;

/// A live entry (`revision == None`) or its n-th history snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntryKey {
    uuid: String,
    revision: Option<usize>,
}

/// An `<Entry>` element still being read.
#[derive(Debug, Default)]
struct Frame {
    uuid: String,
    revision: Option<usize>,
    names: Vec<String>,
    snapshots: usize,
}

/// Attachment filenames per entry revision.
#[derive(Debug, Default)]
pub struct AttachmentIndex {
    names: HashMap<EntryKey, Vec<String>>,
}

impl AttachmentIndex {
    /// Collect `Entry/Binary/Key` values, keyed by the entry's base64 UUID.
    pub fn from_xml(xml: &[u8]) -> Result<Self, quick_xml::Error> {
        let mut reader = Reader::from_reader(xml);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        let mut tags: Vec<String> = Vec::new();
        let mut frames: Vec<Frame> = Vec::new();
        let mut names = HashMap::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    let tag = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    if tag == "Entry" {
                        let revision = match (tags.last(), frames.last_mut()) {
                            (Some(parent), Some(owner)) if parent == "History" => {
                                owner.snapshots += 1;
                                Some(owner.snapshots - 1)
                            }
                            _ => None,
                        };
                        frames.push(Frame {
                            revision,
                            ..Frame::default()
                        });
                    }
                    tags.push(tag);
                }
                Event::End(_) => {
                    if tags.pop().as_deref() == Some("Entry") {
                        if let Some(frame) = frames.pop() {
                            names.insert(
                                EntryKey {
                                    uuid: frame.uuid,
                                    revision: frame.revision,
                                },
                                frame.names,
                            );
                        }
                    }
                }
                Event::Text(ref t) => {
                    let text = t.unescape()?.into_owned();
                    if let Some(frame) = frames.last_mut() {
                        match tags.as_slice() {
                            [.., parent, leaf] if parent == "Entry" && leaf == "UUID" => {
                                frame.uuid = text;
                            }
                            [.., entry, binary, leaf]
                                if entry == "Entry" && binary == "Binary" && leaf == "Key" =>
                            {
                                frame.names.push(text);
                            }
                            _ => {}
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        Ok(Self { names })
    }

    /// Attachment names of an entry, or of its `revision`-th history snapshot.
    pub fn names(&self, uuid: &str, revision: Option<usize>) -> &[String] {
        self.names
            .get(&EntryKey {
                uuid: uuid.to_string(),
                revision,
            })
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.names.values().all(Vec::is_empty)
    }
}
