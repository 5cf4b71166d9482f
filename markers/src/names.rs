use std::collections::HashMap;
use std::sync::RwLock;

type OverrideKey = (String, Option<String>);

/// Display-name store the resolver consults before predicting.
///
/// Curated overrides always win. Predicted names are written back as
/// temporary entries so an external curation pass can promote them; they are
/// never returned as overrides themselves.
pub trait NameOverrideStore: Send + Sync {
    /// Curated display name for `(category, kind)`, if one exists.
    fn get_override(&self, category: &str, kind: Option<&str>) -> Option<String>;

    /// Records a predicted name under the same key for later curation.
    fn save_temporary(&self, category: &str, kind: Option<&str>, name: &str);
}

/// In-memory override store.
#[derive(Debug, Default)]
pub struct MemoryOverrideStore {
    curated: RwLock<HashMap<OverrideKey, String>>,
    temporary: RwLock<HashMap<OverrideKey, String>>,
}

fn key(category: &str, kind: Option<&str>) -> OverrideKey {
    (category.to_string(), kind.map(str::to_string))
}

impl MemoryOverrideStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a curated override.
    pub fn set_override(&self, category: &str, kind: Option<&str>, name: &str) {
        self.curated
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key(category, kind), name.to_string());
    }

    pub fn temporary_name(&self, category: &str, kind: Option<&str>) -> Option<String> {
        self.temporary
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&key(category, kind))
            .cloned()
    }

    pub fn temporary_len(&self) -> usize {
        self.temporary
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

impl NameOverrideStore for MemoryOverrideStore {
    fn get_override(&self, category: &str, kind: Option<&str>) -> Option<String> {
        self.curated
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&key(category, kind))
            .cloned()
    }

    fn save_temporary(&self, category: &str, kind: Option<&str>, name: &str) {
        self.temporary
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(key(category, kind), name.to_string());
    }
}

/// Resolves the display name for `(category, kind)`.
///
/// A curated override is returned verbatim. Otherwise the name is predicted
/// from `kind` (or `category` when no kind is given) and written back to the
/// store as a temporary entry.
pub fn resolve_name(store: &dyn NameOverrideStore, category: &str, kind: Option<&str>) -> String {
    if let Some(name) = store.get_override(category, kind) {
        return name;
    }

    let prediction = predict_name(kind.unwrap_or(category));
    store.save_temporary(category, kind, &prediction);
    prediction
}

fn predict_name(raw: &str) -> String {
    if let Some(name) = expand_chest_code(raw) {
        return name;
    }

    raw.split('_')
        .map(capitalize_first)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `"sl3"`-style descriptors: category letter, tier letter, tier digit.
fn expand_chest_code(raw: &str) -> Option<String> {
    let chars: Vec<char> = raw.chars().collect();
    let &[first, second, digit] = chars.as_slice() else {
        return None;
    };
    if !is_word_char(first) || !is_word_char(second) || !digit.is_ascii_digit() {
        return None;
    }

    let category = chest_category(first)?;
    let tier = chest_tier(second)?;
    Some(format!("{category} {tier} T{digit}"))
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn chest_category(letter: char) -> Option<&'static str> {
    match letter {
        's' => Some("Supply"),
        'c' => Some("Provisions"),
        'o' => Some("Ancient"),
        'a' => Some("Alchemy"),
        _ => None,
    }
}

fn chest_tier(letter: char) -> Option<&'static str> {
    match letter {
        'e' => Some("Elite Stockpile"),
        'l' => Some("Stockpile"),
        's' => Some("Cache"),
        'm' => Some("Crate"),
        _ => None,
    }
}

fn capitalize_first(token: &str) -> String {
    let mut chars = token.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
