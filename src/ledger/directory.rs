//! Paged directories of ledger keys.
//!
//! ## Design
//!
//! A directory lists keys in insertion order across a ring of pages:
//!
//! ```text
//! root (page 0) <-> page 1 <-> page 2 <-> ... <-> last
//!   ^------------------- prev ----------------------'
//! ```
//!
//! - New keys are appended to the last page (time priority)
//! - A full page (32 keys) gets a successor page
//! - The page a key landed on is returned as a hint, so removal is O(page)
//! - Empty non-root pages are unlinked; an empty root without pages is deleted
//!
//! Owner directories list what an account owns. Book directories list the
//! offers of one book at one quality.

use crate::error::EngineError;
use crate::ledger::{peek_directory, read_directory, ApplyView, ReadView};
use crate::types::{keylet, DirectoryNode, Key, LedgerEntry};

/// Keys per directory page.
pub const DIR_NODE_MAX: usize = 32;

/// Append `item` to the directory rooted at `root`, creating it if needed.
///
/// `describe` fills in owner/quality metadata on any page this call creates.
///
/// # Returns
///
/// The page number the item was stored on.
pub fn dir_add<V: ApplyView + ?Sized>(
    view: &mut V,
    root: &Key,
    item: Key,
    describe: impl FnOnce(&mut DirectoryNode),
) -> Result<u64, EngineError> {
    let Some(root_node) = read_directory(view, root)? else {
        let mut node = DirectoryNode::new(*root, 0);
        node.indexes.push(item);
        describe(&mut node);
        view.insert(*root, LedgerEntry::Directory(node))?;
        return Ok(0);
    };

    let last = root_node.prev;
    let last_key = keylet::dir_page(root, last);
    {
        let page = peek_directory(view, &last_key)?;
        if page.indexes.len() < DIR_NODE_MAX {
            page.indexes.push(item);
            return Ok(last);
        }
    }

    let new_page = last + 1;
    peek_directory(view, &last_key)?.next = new_page;
    peek_directory(view, root)?.prev = new_page;

    let mut node = DirectoryNode::new(*root, new_page);
    node.indexes.push(item);
    node.prev = last;
    node.next = 0;
    describe(&mut node);
    view.insert(node.key(), LedgerEntry::Directory(node))?;
    Ok(new_page)
}

/// Remove `item` from page `page` of the directory rooted at `root`.
///
/// A missing page or item means the directory and its objects disagree,
/// which is reported as [`EngineError::DanglingLink`].
pub fn dir_remove<V: ApplyView + ?Sized>(
    view: &mut V,
    root: &Key,
    page: u64,
    item: &Key,
) -> Result<(), EngineError> {
    let dangling = || EngineError::DanglingLink { directory: *root, item: *item };
    let page_key = keylet::dir_page(root, page);
    let node = read_directory(view, &page_key)?.ok_or_else(dangling)?;
    let pos = node.indexes.iter().position(|k| k == item).ok_or_else(dangling)?;

    peek_directory(view, &page_key)?.indexes.remove(pos);

    if page != 0 && node.indexes.len() == 1 {
        peek_directory(view, &keylet::dir_page(root, node.prev))?.next = node.next;
        peek_directory(view, &keylet::dir_page(root, node.next))?.prev = node.prev;
        view.erase(&page_key)?;
    }

    let root_node = read_directory(view, root)?.ok_or(EngineError::MissingEntry(*root))?;
    if root_node.indexes.is_empty() && root_node.next == 0 {
        view.erase(root)?;
    }
    Ok(())
}

/// First key of the directory, skipping empty pages.
pub fn dir_first<V: ReadView + ?Sized>(view: &V, root: &Key) -> Result<Option<Key>, EngineError> {
    dir_nth(view, root, 0)
}

/// The `n`th key of the directory (zero-based), in order.
pub fn dir_nth<V: ReadView + ?Sized>(
    view: &V,
    root: &Key,
    mut n: usize,
) -> Result<Option<Key>, EngineError> {
    let mut page = 0;
    loop {
        let key = keylet::dir_page(root, page);
        let Some(node) = read_directory(view, &key)? else {
            return Ok(None);
        };
        if let Some(found) = node.indexes.get(n) {
            return Ok(Some(*found));
        }
        n -= node.indexes.len();
        if node.next == 0 {
            return Ok(None);
        }
        page = node.next;
    }
}

/// Every key in the directory, in order.
pub fn dir_entries<V: ReadView + ?Sized>(view: &V, root: &Key) -> Result<Vec<Key>, EngineError> {
    let mut out = Vec::new();
    let mut page = 0;
    loop {
        let key = keylet::dir_page(root, page);
        let Some(node) = read_directory(view, &key)? else {
            if page == 0 {
                return Ok(out);
            }
            return Err(EngineError::MissingEntry(key));
        };
        out.extend_from_slice(&node.indexes);
        if node.next == 0 {
            return Ok(out);
        }
        page = node.next;
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
