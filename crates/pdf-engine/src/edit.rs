//! Page tree rewrites
//!
//! Every rewrite flattens the page tree: the kept pages become direct kids of
//! the root `Pages` node, in output order, after copying down the attributes
//! they used to inherit from intermediate nodes.

use crate::PdfEngineError;
use lopdf::{Document, Object, ObjectId};
use page_model::{PageIndex, Rotation};
use std::collections::{BTreeMap, HashSet};

const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Looks `key` up on the page, then on its ancestors.
pub(crate) fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut visited = HashSet::new();
    let mut current = Some(page_id);

    while let Some(node_id) = current {
        if !visited.insert(node_id) {
            return None;
        }
        let node = doc.get_dictionary(node_id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        current = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    None
}

/// Follows one level of indirection.
pub(crate) fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

pub(crate) fn effective_rotation(doc: &Document, page_id: ObjectId) -> i64 {
    inherited(doc, page_id, b"Rotate")
        .and_then(|value| resolve(doc, value))
        .and_then(|value| value.as_i64().ok())
        .unwrap_or(0)
}

fn page_tree_root(doc: &Document) -> Result<ObjectId, PdfEngineError> {
    let catalog_id = doc.trailer.get(b"Root")?.as_reference()?;
    Ok(doc.get_dictionary(catalog_id)?.get(b"Pages")?.as_reference()?)
}

pub(crate) fn check_known(doc: &Document, pages: &[PageIndex]) -> Result<(), PdfEngineError> {
    let known = doc.get_pages();
    let page_count = known.len() as u32;

    match pages.iter().find(|page| !known.contains_key(&page.get())) {
        Some(page) => Err(PdfEngineError::PageOutOfRange { page: page.get(), page_count }),
        None => Ok(()),
    }
}

fn resolve_pages(doc: &Document, wanted: &[PageIndex]) -> Result<Vec<ObjectId>, PdfEngineError> {
    let known = doc.get_pages();
    let page_count = known.len() as u32;
    let mut seen = HashSet::new();

    wanted
        .iter()
        .map(|page| {
            if !seen.insert(*page) {
                return Err(PdfEngineError::Backend(format!("page {page} is listed more than once")));
            }
            known
                .get(&page.get())
                .copied()
                .ok_or(PdfEngineError::PageOutOfRange { page: page.get(), page_count })
        })
        .collect()
}

/// Rebuilds the document so it holds exactly `kept`, in that order.
pub(crate) fn keep_pages(doc: &mut Document, kept: &[PageIndex]) -> Result<(), PdfEngineError> {
    let page_ids = resolve_pages(doc, kept)?;
    if page_ids.is_empty() {
        return Err(PdfEngineError::EmptyResult);
    }

    let root_id = page_tree_root(doc)?;

    for &page_id in &page_ids {
        let carried: Vec<(&[u8], Object)> = INHERITABLE
            .iter()
            .filter_map(|key| inherited(doc, page_id, key).map(|value| (*key, value.clone())))
            .collect();

        let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
        for (key, value) in carried {
            page.set(key, value);
        }
        page.set("Parent", Object::Reference(root_id));
    }

    let root = doc.get_object_mut(root_id)?.as_dict_mut()?;
    root.set("Kids", Object::Array(page_ids.iter().copied().map(Object::Reference).collect()));
    root.set("Count", Object::Integer(page_ids.len() as i64));
    root.remove(b"Parent");

    doc.prune_objects();
    doc.renumber_objects();
    Ok(())
}

/// Flattens the tree, then adds each delta to the page's current `/Rotate`.
pub(crate) fn rotate_pages(
    doc: &mut Document,
    rotations: &BTreeMap<PageIndex, Rotation>,
) -> Result<(), PdfEngineError> {
    let all: Vec<PageIndex> = doc.get_pages().keys().copied().map(PageIndex).collect();
    let pages: Vec<PageIndex> = rotations.keys().copied().collect();
    check_known(doc, &pages)?;
    keep_pages(doc, &all)?;

    let known = doc.get_pages();
    for (page, rotation) in rotations {
        let Some(&page_id) = known.get(&page.get()) else {
            continue;
        };
        let updated = (effective_rotation(doc, page_id) + i64::from(rotation.degrees())).rem_euclid(360);
        doc.get_object_mut(page_id)?.as_dict_mut()?.set("Rotate", Object::Integer(updated));
    }

    Ok(())
}
