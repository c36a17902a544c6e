//! Words, categories and the in-session deck.

use crate::config::DisplayOrder;
use crate::error::{TrainerError, TrainerResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A picture/word pair to spell. `id` decides whether two words are "the same".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub id: String,
    #[serde(rename = "word")]
    pub text: String,
    #[serde(rename = "image", default)]
    pub image_ref: String,
    #[serde(default, deserialize_with = "category_or_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
}

/// Stored data uses `"none"` for "no category".
fn category_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|id| !id.is_empty() && id != "none"))
}

impl Word {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into().to_lowercase(),
            image_ref: String::new(),
            category_id: None,
            definition: None,
        }
    }

    pub fn with_image(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = image_ref.into();
        self
    }

    pub fn in_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    /// Word supplied when the store has nothing to offer.
    pub fn default_apple() -> Self {
        Word::new("default-apple", "apple").with_image("/apple.svg")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

/// Which words the deck shows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    /// `"all"` (or blank) selects everything; anything else one category.
    pub fn parse(selection: &str) -> Self {
        match selection.trim() {
            "" | "all" => CategoryFilter::All,
            id => CategoryFilter::Only(id.to_string()),
        }
    }

    pub fn admits(&self, word: &Word) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(id) => word.category_id.as_deref() == Some(id.as_str()),
        }
    }
}

/// Source of the word and category lists.
pub trait WordStore: Send + Sync {
    fn list_words(&self) -> TrainerResult<Vec<Word>>;
    fn list_categories(&self) -> TrainerResult<Vec<Category>>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WordFile {
    #[serde(default)]
    words: Vec<Word>,
    #[serde(default)]
    categories: Vec<Category>,
}

/// Words kept in a JSON file: `{ "words": [...], "categories": [...] }`.
#[derive(Debug, Clone)]
pub struct JsonWordStore {
    path: PathBuf,
}

impl JsonWordStore {
    /// Open `path`. A missing file is treated as empty; a malformed one is an error.
    pub fn open(path: impl Into<PathBuf>) -> TrainerResult<Self> {
        let store = Self { path: path.into() };
        let file = store.read()?;
        info!(
            path = %store.path.display(),
            words = file.words.len(),
            categories = file.categories.len(),
            "word store opened"
        );
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> TrainerResult<WordFile> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(WordFile::default()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(WordFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, file: &WordFile) -> TrainerResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(file)?)?;
        Ok(())
    }

    /// Insert `word` at the front, or replace the entry with the same id in place.
    pub fn save_word(&self, word: Word) -> TrainerResult<()> {
        if word.text.trim().is_empty() {
            return Err(TrainerError::Store(format!("word {} has no text", word.id)));
        }
        let mut file = self.read()?;
        match file.words.iter_mut().find(|w| w.id == word.id) {
            Some(existing) => *existing = word,
            None => file.words.insert(0, word),
        }
        self.write(&file)
    }

    /// Remove the word with `id`. Returns whether anything was removed.
    pub fn delete_word(&self, id: &str) -> TrainerResult<bool> {
        let mut file = self.read()?;
        let before = file.words.len();
        file.words.retain(|w| w.id != id);
        let removed = file.words.len() != before;
        if removed {
            self.write(&file)?;
        }
        Ok(removed)
    }
}

impl WordStore for JsonWordStore {
    fn list_words(&self) -> TrainerResult<Vec<Word>> {
        let mut words: Vec<Word> = self
            .read()?
            .words
            .into_iter()
            .filter_map(|mut w| {
                w.text = w.text.trim().to_lowercase();
                if w.text.is_empty() {
                    warn!(id = %w.id, "skipping word without text");
                    return None;
                }
                Some(w)
            })
            .collect();
        if words.is_empty() {
            words.push(Word::default_apple());
        }
        Ok(words)
    }

    fn list_categories(&self) -> TrainerResult<Vec<Category>> {
        Ok(self.read()?.categories)
    }
}

/// Fixed in-memory lists.
#[derive(Debug, Clone, Default)]
pub struct MemoryWordStore {
    words: Vec<Word>,
    categories: Vec<Category>,
}

impl MemoryWordStore {
    pub fn new(words: Vec<Word>, categories: Vec<Category>) -> Self {
        Self { words, categories }
    }
}

impl WordStore for MemoryWordStore {
    fn list_words(&self) -> TrainerResult<Vec<Word>> {
        Ok(self.words.clone())
    }

    fn list_categories(&self) -> TrainerResult<Vec<Category>> {
        Ok(self.categories.clone())
    }
}

/// The ordered, filtered words of a session and the current position.
#[derive(Debug, Clone, Default)]
pub struct WordDeck {
    all: Vec<Word>,
    visible: Vec<Word>,
    filter: CategoryFilter,
    order: DisplayOrder,
    index: usize,
}

impl WordDeck {
    /// Words without text are dropped; there is nothing to spell.
    pub fn new(mut all: Vec<Word>, order: DisplayOrder) -> Self {
        all.retain(|w| !w.text.trim().is_empty());
        let mut deck = Self {
            all,
            order,
            ..Self::default()
        };
        deck.refilter();
        deck
    }

    fn refilter(&mut self) {
        self.visible = self
            .all
            .iter()
            .filter(|w| self.filter.admits(w))
            .cloned()
            .collect();
        if self.order == DisplayOrder::Reversed {
            self.visible.reverse();
        }
        self.index = 0;
    }

    /// Apply a new filter (and order) and go back to the first word.
    pub fn apply(&mut self, filter: CategoryFilter, order: DisplayOrder) {
        self.filter = filter;
        self.order = order;
        self.refilter();
    }

    pub fn filter(&self) -> &CategoryFilter {
        &self.filter
    }

    pub fn current(&self) -> Option<&Word> {
        self.visible.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.visible.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty()
    }

    /// Move forward, wrapping to the first word.
    pub fn next_word(&mut self) -> Option<&Word> {
        if self.visible.is_empty() {
            return None;
        }
        self.index = (self.index + 1) % self.visible.len();
        self.current()
    }

    /// Move back, wrapping to the last word.
    pub fn previous_word(&mut self) -> Option<&Word> {
        if self.visible.is_empty() {
            return None;
        }
        self.index = (self.index + self.visible.len() - 1) % self.visible.len();
        self.current()
    }
}
