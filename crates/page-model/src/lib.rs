use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::num::ParseIntError;
use std::path::{Path, PathBuf};
use std::str::FromStr;

mod request;

pub use request::{join_indexes, TransformRequest};

/// 1-based page number in the source document. Stable identity of a page entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageIndex(pub u32);

impl PageIndex {
    pub fn get(self) -> u32 {
        self.0
    }

    /// 0-based position of this page in the source document.
    pub fn zero_based(self) -> u32 {
        self.0.saturating_sub(1)
    }
}

impl fmt::Display for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParsePageIndexError {
    #[error(transparent)]
    Invalid(#[from] ParseIntError),
    #[error("page numbers start at 1")]
    Zero,
}

impl FromStr for PageIndex {
    type Err = ParsePageIndexError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().parse()? {
            0 => Err(ParsePageIndexError::Zero),
            page => Ok(Self(page)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageModelError {
    #[error("document has no pages")]
    EmptyDocument,
    #[error("page {0} is not part of the document")]
    UnknownPage(PageIndex),
    #[error("invalid rotation {0}; expected 90, 180 or 270 degrees")]
    InvalidRotation(i32),
    #[error("page order is not a permutation of the document's {expected} pages")]
    OrderMismatch { expected: usize },
}

/// Clockwise rotation, always one of 0, 90, 180 or 270 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Rotation(u16);

impl Rotation {
    pub const NONE: Self = Self(0);
    pub const VALID_DELTAS: [i32; 3] = [90, 180, 270];

    pub fn degrees(self) -> u16 {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    pub fn rotated_by(self, delta: i32) -> Result<Self, PageModelError> {
        if !Self::VALID_DELTAS.contains(&delta) {
            return Err(PageModelError::InvalidRotation(delta));
        }

        Ok(Self((self.0 + delta as u16) % 360))
    }
}

impl TryFrom<u16> for Rotation {
    type Error = PageModelError;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 | 90 | 180 | 270 => Ok(Self(degrees)),
            other => Err(PageModelError::InvalidRotation(i32::from(other))),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(value: Rotation) -> Self {
        value.0
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Organize,
    Split,
    Rotate,
}

impl Mode {
    pub const ALL: [Mode; 3] = [Mode::Organize, Mode::Split, Mode::Rotate];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Organize => "organize",
            Self::Split => "split",
            Self::Rotate => "rotate",
        }
    }

    pub fn commit_label(self) -> &'static str {
        match self {
            Self::Organize => "Save Changes",
            Self::Split => "Split PDF",
            Self::Rotate => "Save Rotated PDF",
        }
    }

    pub fn hint(self) -> &'static str {
        match self {
            Self::Organize => "Drag & drop or click pages to reorder. Use 'X' to mark for deletion.",
            Self::Split => "Click pages to select them for extraction.",
            Self::Rotate => "Select pages, choose an angle, and click 'Apply'.",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    original_index: PageIndex,
    image: PathBuf,
    deleted: bool,
    rotation: Rotation,
    selected: bool,
}

impl PageEntry {
    fn new(original_index: PageIndex, image: PathBuf) -> Self {
        Self { original_index, image, deleted: false, rotation: Rotation::NONE, selected: false }
    }

    pub fn original_index(&self) -> PageIndex {
        self.original_index
    }

    pub fn image(&self) -> &Path {
        &self.image
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }
}

/// Pages of the loaded document in display order.
///
/// Deletion is a flag until commit, so `current_order` always covers every page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageModel {
    entries: Vec<PageEntry>,
}

impl PageModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_images<I>(images: I) -> Result<Self, PageModelError>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut model = Self::new();
        model.load(images)?;
        Ok(model)
    }

    /// Replaces the contents with one entry per image; the n-th image becomes page n.
    pub fn load<I>(&mut self, images: I) -> Result<(), PageModelError>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let entries: Vec<PageEntry> = images
            .into_iter()
            .enumerate()
            .map(|(position, image)| PageEntry::new(PageIndex(position as u32 + 1), image))
            .collect();

        if entries.is_empty() {
            return Err(PageModelError::EmptyDocument);
        }

        self.entries = entries;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PageEntry] {
        &self.entries
    }

    pub fn entry(&self, index: PageIndex) -> Option<&PageEntry> {
        self.entries.iter().find(|entry| entry.original_index == index)
    }

    pub fn position_of(&self, index: PageIndex) -> Option<usize> {
        self.entries.iter().position(|entry| entry.original_index == index)
    }

    pub fn contains(&self, index: PageIndex) -> bool {
        self.position_of(index).is_some()
    }

    pub fn toggle_deleted(&mut self, index: PageIndex) -> Result<bool, PageModelError> {
        let entry = self.entry_mut(index)?;
        entry.deleted = !entry.deleted;
        Ok(entry.deleted)
    }

    pub fn apply_rotation(&mut self, index: PageIndex, delta: i32) -> Result<Rotation, PageModelError> {
        let entry = self.entry_mut(index)?;
        entry.rotation = entry.rotation.rotated_by(delta)?;
        Ok(entry.rotation)
    }

    pub fn set_selected(&mut self, index: PageIndex, selected: bool) -> Result<(), PageModelError> {
        self.entry_mut(index)?.selected = selected;
        Ok(())
    }

    pub fn toggle_selected(&mut self, index: PageIndex) -> Result<bool, PageModelError> {
        let entry = self.entry_mut(index)?;
        entry.selected = !entry.selected;
        Ok(entry.selected)
    }

    pub fn clear_selection(&mut self) {
        for entry in &mut self.entries {
            entry.selected = false;
        }
    }

    /// Replaces the display order. `order` must be a permutation of the current pages.
    pub fn reorder(&mut self, order: &[PageIndex]) -> Result<(), PageModelError> {
        let mismatch = PageModelError::OrderMismatch { expected: self.entries.len() };

        if order.len() != self.entries.len() {
            return Err(mismatch);
        }

        let mut seen = BTreeSet::new();
        let mut positions = Vec::with_capacity(order.len());
        for index in order {
            if !seen.insert(*index) {
                return Err(mismatch);
            }
            positions.push(self.position_of(*index).ok_or_else(|| mismatch.clone())?);
        }

        let mut slots: Vec<Option<PageEntry>> =
            std::mem::take(&mut self.entries).into_iter().map(Some).collect();
        self.entries = positions.into_iter().filter_map(|position| slots[position].take()).collect();

        Ok(())
    }

    pub fn current_order(&self) -> Vec<PageIndex> {
        self.entries.iter().map(|entry| entry.original_index).collect()
    }

    pub fn deleted_indexes(&self) -> BTreeSet<PageIndex> {
        self.entries.iter().filter(|entry| entry.deleted).map(|entry| entry.original_index).collect()
    }

    pub fn selected_indexes(&self) -> BTreeSet<PageIndex> {
        self.entries.iter().filter(|entry| entry.selected).map(|entry| entry.original_index).collect()
    }

    /// Non-zero rotations keyed by original index.
    pub fn rotation_map(&self) -> BTreeMap<PageIndex, Rotation> {
        self.entries
            .iter()
            .filter(|entry| !entry.rotation.is_none())
            .map(|entry| (entry.original_index, entry.rotation))
            .collect()
    }

    fn entry_mut(&mut self, index: PageIndex) -> Result<&mut PageEntry, PageModelError> {
        self.entries
            .iter_mut()
            .find(|entry| entry.original_index == index)
            .ok_or(PageModelError::UnknownPage(index))
    }
}
