use crate::node::NodeId;
use crc32fast::Hasher;

/// Generate document ID from document name using CRC32
pub fn get_document_id(name: &str) -> String {
    let mut buff = String::from(name);
    if !name.starts_with("page://") {
        buff = format!("page://{}", buff);
    }

    let mut hasher = Hasher::new();
    hasher.update(buff.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential, type-tagged ID generator for document nodes
///
/// IDs look like `<seed>-<tag>-<n>`. The counter only moves forward, so an
/// id handed out once is never handed out again, even if the batch that
/// requested it was rolled back or later undone.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String, // Document ID (CRC32)
    count: u64,   // Sequential counter
}

impl IdGenerator {
    pub fn new(document_name: &str) -> Self {
        Self {
            seed: get_document_id(document_name),
            count: 0,
        }
    }

    pub fn from_seed(seed: String) -> Self {
        Self { seed, count: 0 }
    }

    /// Generate the next ID for `type_tag`
    pub fn new_id(&mut self, type_tag: &str) -> NodeId {
        self.new_id_avoiding(type_tag, |_| false)
    }

    /// Generate the next ID for `type_tag`, skipping any candidate for
    /// which `taken` returns true
    pub fn new_id_avoiding(&mut self, type_tag: &str, taken: impl Fn(&str) -> bool) -> NodeId {
        let tag = normalize_tag(type_tag);
        loop {
            self.count += 1;
            let candidate = format!("{}-{}-{}", self.seed, tag, self.count);
            if !taken(&candidate) {
                return NodeId::new(candidate);
            }
        }
    }

    /// Move the counter past every id minted with this seed, so that ids
    /// restored from storage are never produced again
    pub fn advance_past<'a>(&mut self, ids: impl IntoIterator<Item = &'a NodeId>) {
        let prefix = format!("{}-", self.seed);
        for id in ids {
            let Some(rest) = id.as_str().strip_prefix(&prefix) else {
                continue;
            };
            if let Some(n) = rest.rsplit('-').next().and_then(|n| n.parse::<u64>().ok()) {
                self.count = self.count.max(n);
            }
        }
    }

    /// Get document ID seed
    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

fn normalize_tag(tag: &str) -> String {
    let normalized: String = tag
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();

    if normalized.is_empty() {
        "node".to_string()
    } else {
        normalized
    }
}
