use std::collections::{HashMap, HashSet};

/// Hands out unique `stem.NNN` names. Each stem remembers the lowest suffix that may be free, so
/// allocating a run of copies does not rescan the suffixes already handed out.
#[derive(Debug, Clone, Default)]
pub(crate) struct NameAllocator {
    taken: HashSet<String>,
    next_suffix: HashMap<String, u32>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.taken.contains(name)
    }

    /// Records `name` exactly as given.
    pub fn insert(&mut self, name: impl Into<String>) {
        self.taken.insert(name.into());
    }

    /// Takes `name` if it is free, otherwise the next free suffixed variant.
    pub fn claim(&mut self, name: &str) -> String {
        if self.contains(name) {
            self.claim_suffixed(name)
        } else {
            self.insert(name);
            name.to_string()
        }
    }

    /// Always returns a suffixed name. A trailing suffix on `base` is stripped first so copies of
    /// `Tree.001` become `Tree.002` rather than `Tree.001.001`.
    pub fn claim_suffixed(&mut self, base: &str) -> String {
        let (stem, _) = split_suffix(base);
        let mut counter = self.next_suffix.get(stem).copied().unwrap_or(1);
        let name = loop {
            let candidate = format!("{stem}.{counter:03}");
            if !self.taken.contains(&candidate) {
                break candidate;
            }
            counter += 1;
        };
        self.next_suffix.insert(stem.to_string(), counter + 1);
        self.taken.insert(name.clone());
        name
    }

    /// Frees `name`. A released suffix becomes the first one tried for its stem.
    pub fn release(&mut self, name: &str) {
        if !self.taken.remove(name) {
            return;
        }
        if let (stem, Some(suffix)) = split_suffix(name) {
            if let Some(next) = self.next_suffix.get_mut(stem) {
                *next = (*next).min(suffix);
            }
        }
    }
}

/// Splits `Tree.012` into `("Tree", Some(12))`. Suffixes are at least three digits.
fn split_suffix(name: &str) -> (&str, Option<u32>) {
    match name.rsplit_once('.') {
        Some((stem, suffix)) if suffix.len() >= 3 && suffix.bytes().all(|b| b.is_ascii_digit()) => {
            match suffix.parse() {
                Ok(value) => (stem, Some(value)),
                Err(_) => (name, None),
            }
        }
        _ => (name, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claim_keeps_free_names_and_suffixes_taken_ones() {
        let mut names = NameAllocator::new();
        assert_eq!(names.claim("Tree"), "Tree");
        assert_eq!(names.claim("Tree"), "Tree.001");
        assert_eq!(names.claim("Tree.001"), "Tree.002");
        assert_eq!(names.claim_suffixed("Rock"), "Rock.001");
    }

    #[test]
    fn suffixes_skip_names_inserted_out_of_band() {
        let mut names = NameAllocator::new();
        names.insert("Bush");
        names.insert("Bush.001");
        names.insert("Bush.003");
        assert_eq!(names.claim_suffixed("Bush"), "Bush.002");
        assert_eq!(names.claim_suffixed("Bush"), "Bush.004");
    }

    #[test]
    fn released_suffixes_are_reused_lowest_first() {
        let mut names = NameAllocator::new();
        names.insert("Tree");
        let copies: Vec<String> = (0..5).map(|_| names.claim_suffixed("Tree")).collect();
        assert_eq!(copies.last().map(String::as_str), Some("Tree.005"));
        names.release("Tree.004");
        names.release("Tree.002");
        assert_eq!(names.claim_suffixed("Tree"), "Tree.002");
        assert_eq!(names.claim_suffixed("Tree"), "Tree.004");
        assert_eq!(names.claim_suffixed("Tree"), "Tree.006");
    }

    #[test]
    fn suffixes_past_999_keep_their_stem() {
        let mut names = NameAllocator::new();
        names.insert("Fern");
        let last = (0..1000).map(|_| names.claim_suffixed("Fern")).last();
        assert_eq!(last.as_deref(), Some("Fern.1000"));
        assert_eq!(names.claim_suffixed("Fern.1000"), "Fern.1001");
    }
}
