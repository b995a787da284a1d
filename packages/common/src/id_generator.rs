use crc32fast::Hasher;

/// Derive a short, stable seed from a document key using CRC32
pub fn get_seed(key: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential ID generator for nodes and slots within a document
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String,
    count: u64,
}

impl IdGenerator {
    pub fn new(key: &str) -> Self {
        Self::from_seed(get_seed(key))
    }

    pub fn from_seed(seed: impl Into<String>) -> Self {
        Self::with_counter(seed, 0)
    }

    /// Continue a sequence that already handed out `count` IDs
    pub fn with_counter(seed: impl Into<String>, count: u64) -> Self {
        Self {
            seed: seed.into(),
            count,
        }
    }

    /// Generate next sequential ID
    pub fn new_id(&mut self) -> String {
        self.count += 1;
        format!("{}-{}", self.seed, self.count)
    }

    /// Generate next sequential ID tagged with a readable prefix (`text-…`)
    pub fn new_id_with_prefix(&mut self, prefix: &str) -> String {
        format!("{}-{}", prefix, self.new_id())
    }

    /// Advance the counter past every ID this generator could have produced,
    /// so IDs already present in a loaded document are never reissued.
    pub fn skip_past<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        let marker = format!("{}-", self.seed);
        for id in ids {
            let Some(pos) = id.rfind(&marker) else {
                continue;
            };
            if let Ok(n) = id[pos + marker.len()..].parse::<u64>() {
                self.count = self.count.max(n);
            }
        }
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }

    pub fn count(&self) -> u64 {
        self.count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_is_stable() {
        assert_eq!(get_seed("invoice.json"), get_seed("invoice.json"));
        assert_ne!(get_seed("invoice.json"), get_seed("receipt.json"));
    }

    #[test]
    fn test_sequential_ids() {
        let mut gen = IdGenerator::from_seed("doc");

        assert_eq!(gen.new_id(), "doc-1");
        assert_eq!(gen.new_id(), "doc-2");
        assert_eq!(gen.new_id_with_prefix("text"), "text-doc-3");
        assert_eq!(gen.count(), 3);
    }

    #[test]
    fn test_skip_past_existing_ids() {
        let mut gen = IdGenerator::from_seed("doc");
        gen.skip_past(["text-doc-4", "doc-9", "other-12", "slot-doc-x"]);

        assert_eq!(gen.new_id(), "doc-10");
    }
}
