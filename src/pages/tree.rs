//! Breadcrumbs, navigation and parent validation over a workspace's pages.
//!
//! Everything here works on pages already loaded from one workspace, so it never touches
//! the database.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use super::Page;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crumb {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
}

impl From<&Page> for Crumb {
    fn from(page: &Page) -> Self {
        Self {
            id: page.id,
            title: page.title.clone(),
            slug: page.slug.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NavItem {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub children: Vec<Crumb>,
}

pub struct PageIndex<'a> {
    by_id: HashMap<Uuid, &'a Page>,
}

impl<'a> PageIndex<'a> {
    pub fn new(pages: &'a [Page]) -> Self {
        Self {
            by_id: pages.iter().map(|page| (page.id, page)).collect(),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<&'a Page> {
        self.by_id.get(&id).copied()
    }

    /// Ancestors of `page` from the root down to `page` itself.
    /// Stops at a missing parent or a loop.
    pub fn path(&self, page: &'a Page) -> Vec<Crumb> {
        let mut seen = HashSet::new();
        let mut path = Vec::new();
        let mut current = Some(page);
        while let Some(node) = current {
            if !seen.insert(node.id) {
                break;
            }
            path.push(Crumb::from(node));
            current = node.parent_id.and_then(|parent_id| self.get(parent_id));
        }
        path.reverse();
        path
    }

    pub fn depth(&self, page: &'a Page) -> usize {
        self.path(page).len().saturating_sub(1)
    }

    /// True when `candidate` is `page` or lies beneath it.
    pub fn is_self_or_descendant(&self, page: Uuid, candidate: Uuid) -> bool {
        let mut seen = HashSet::new();
        let mut current = Some(candidate);
        while let Some(id) = current {
            if id == page {
                return true;
            }
            if !seen.insert(id) {
                return false;
            }
            current = self.get(id).and_then(|node| node.parent_id);
        }
        false
    }

    /// `root` and every page below it.
    pub fn subtree(&self, root: Uuid) -> Vec<Uuid> {
        let mut children: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for page in self.by_id.values() {
            if let Some(parent_id) = page.parent_id {
                children.entry(parent_id).or_default().push(page.id);
            }
        }

        let mut seen = HashSet::new();
        let mut stack = vec![root];
        let mut out = Vec::new();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            out.push(id);
            if let Some(kids) = children.get(&id) {
                stack.extend(kids);
            }
        }
        out
    }
}

/// Published children of `parent`, in display order.
pub fn published_children(pages: &[Page], parent: Uuid) -> Vec<&Page> {
    let mut children: Vec<&Page> = pages
        .iter()
        .filter(|page| page.published && page.parent_id == Some(parent))
        .collect();
    children.sort_by_key(|page| page.order_index);
    children
}

/// Published root pages, each with its published children, sorted by order index.
pub fn navigation(pages: &[Page]) -> Vec<NavItem> {
    let mut roots: Vec<&Page> = pages
        .iter()
        .filter(|page| page.published && page.parent_id.is_none())
        .collect();
    roots.sort_by_key(|page| page.order_index);

    roots
        .into_iter()
        .map(|root| NavItem {
            id: root.id,
            title: root.title.clone(),
            slug: root.slug.clone(),
            children: published_children(pages, root.id).into_iter().map(Crumb::from).collect(),
        })
        .collect()
}
