//! Folder forest built from flat parent-pointer records, plus path queries.
//!
//! Traversals use explicit stacks so deep hierarchies never grow the call
//! stack. Sibling order is always the order records were supplied in.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;
use tracing::warn;

use crate::domain::entities::{FolderRecord, PageSummary};
use crate::domain::types::FolderId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FolderNode {
    pub id: String,
    pub name: String,
    pub is_page: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<PageSummary>,
    pub children: Vec<FolderNode>,
}

impl FolderNode {
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            is_page: false,
            page: None,
            children: Vec::new(),
        }
    }

    /// Leaf node for a page; its name is the page slug so routes resolve by URL segment.
    pub fn page(summary: PageSummary) -> Self {
        Self {
            id: summary.id.as_str().to_string(),
            name: summary.slug.clone(),
            is_page: true,
            page: Some(summary),
            children: Vec::new(),
        }
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn count(&self) -> usize {
        let mut total = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            total += 1;
            stack.extend(node.children.iter());
        }
        total
    }
}

/// Total node count of a forest.
pub fn count_nodes(tree: &[FolderNode]) -> usize {
    tree.iter().map(FolderNode::count).sum()
}

/// Build a forest from flat folder records in O(n).
///
/// A record whose parent id is unknown becomes a root. Records that sit on a
/// parent cycle can never be reached from a root and are dropped.
pub fn build_tree(records: &[FolderRecord]) -> Vec<FolderNode> {
    // With duplicate ids the last record owns the id.
    let mut index: HashMap<&str, usize> = HashMap::with_capacity(records.len());
    for (position, record) in records.iter().enumerate() {
        index.insert(record.id.as_str(), position);
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
    let mut roots = Vec::new();
    for (position, record) in records.iter().enumerate() {
        let parent = record
            .parent
            .as_ref()
            .and_then(|parent| index.get(parent.as_str()).copied());
        match parent {
            Some(parent) => children[parent].push(position),
            None => roots.push(position),
        }
    }

    // Parents always precede their children in breadth-first order, so walking
    // it backwards finishes every child before its parent needs it.
    let mut order = Vec::with_capacity(records.len());
    let mut queue: VecDeque<usize> = roots.iter().copied().collect();
    while let Some(position) = queue.pop_front() {
        order.push(position);
        queue.extend(children[position].iter().copied());
    }

    if order.len() < records.len() {
        warn!(
            dropped = records.len() - order.len(),
            "Folder records unreachable from any root were dropped"
        );
    }

    let mut built: Vec<Option<FolderNode>> = (0..records.len()).map(|_| None).collect();
    for &position in order.iter().rev() {
        let record = &records[position];
        let mut node = FolderNode::folder(record.id.as_str(), record.name.as_str());
        node.children = children[position]
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[position] = Some(node);
    }

    roots
        .into_iter()
        .filter_map(|position| built[position].take())
        .collect()
}

/// Folder forest with every page attached under its folder.
pub fn build_page_folder_tree(folders: &[FolderRecord], pages: &[PageSummary]) -> Vec<FolderNode> {
    let mut tree = build_tree(folders);
    for page in pages {
        let folder_id = page.folder_id.clone();
        let node = FolderNode::page(page.clone());
        match folder_id {
            Some(folder_id) => add_page_to_folder_tree(&mut tree, folder_id.as_str(), node),
            None => tree.push(node),
        }
    }
    tree
}

/// Append `page` under the folder with `folder_id`, or at the root when the
/// folder is not in the tree. Pages are never dropped.
pub fn add_page_to_folder_tree(tree: &mut Vec<FolderNode>, folder_id: &str, page: FolderNode) {
    match locate(tree, |node| !node.is_page && node.id == folder_id) {
        Some(path) => {
            if let Some(folder) = node_at_mut(tree, &path) {
                folder.children.push(page);
            }
        }
        None => tree.push(page),
    }
}

/// Resolve `segments` by name, level by level. The first sibling with a
/// matching name wins; there is no backtracking into later namesakes.
pub fn find_node_by_path<'a, S: AsRef<str>>(
    tree: &'a [FolderNode],
    segments: &[S],
) -> Option<&'a FolderNode> {
    let (first, rest) = segments.split_first()?;
    let mut node = tree.iter().find(|node| node.name == first.as_ref())?;
    for segment in rest {
        node = node
            .children
            .iter()
            .find(|child| child.name == segment.as_ref())?;
    }
    Some(node)
}

/// Same traversal as [`find_node_by_path`], returning the names matched so
/// far. An unresolvable path yields its resolvable prefix.
pub fn get_full_path<S: AsRef<str>>(tree: &[FolderNode], segments: &[S]) -> Vec<String> {
    let mut names = Vec::with_capacity(segments.len());
    let mut level = tree;
    for segment in segments {
        let Some(node) = level.iter().find(|node| node.name == segment.as_ref()) else {
            break;
        };
        names.push(node.name.clone());
        level = &node.children;
    }
    names
}

/// Every node from a root down to the node named by `segments`, in descent
/// order. Unlike [`find_node_by_path`] this backtracks across same-named
/// siblings. Returns an empty chain when the path cannot be resolved.
pub fn find_nodes_along_path<'a, S: AsRef<str>>(
    tree: &'a [FolderNode],
    segments: &[S],
) -> Vec<&'a FolderNode> {
    let Some(first) = segments.first() else {
        return Vec::new();
    };

    let mut path: Vec<&FolderNode> = Vec::with_capacity(segments.len());
    let mut stack: Vec<(usize, &FolderNode)> = tree
        .iter()
        .rev()
        .filter(|node| node.name == first.as_ref())
        .map(|node| (0, node))
        .collect();

    while let Some((depth, node)) = stack.pop() {
        path.truncate(depth);
        path.push(node);
        if depth + 1 == segments.len() {
            return path;
        }
        let next = segments[depth + 1].as_ref();
        stack.extend(
            node.children
                .iter()
                .rev()
                .filter(|child| child.name == next)
                .map(|child| (depth + 1, child)),
        );
    }

    Vec::new()
}

/// Ancestor chain ending at the node whose id is `id`, in descent order.
///
/// On a miss the result is whatever branch the search explored last, so a
/// caller must check that the final element carries `id` before trusting it.
pub fn find_nodes_along_path_to_id<'a>(tree: &'a [FolderNode], id: &str) -> Vec<&'a FolderNode> {
    let mut path: Vec<&FolderNode> = Vec::new();
    let mut stack: Vec<(usize, &FolderNode)> = tree.iter().rev().map(|node| (0, node)).collect();

    while let Some((depth, node)) = stack.pop() {
        path.truncate(depth);
        path.push(node);
        if node.id == id {
            return path;
        }
        stack.extend(node.children.iter().rev().map(|child| (depth + 1, child)));
    }

    path
}

/// `/`-joined names from the root to `id`, if `id` is in the tree.
pub fn route_for(tree: &[FolderNode], id: &str) -> Option<String> {
    let chain = find_nodes_along_path_to_id(tree, id);
    if chain.last()?.id != id {
        return None;
    }
    let names: Vec<&str> = chain.iter().map(|node| node.name.as_str()).collect();
    Some(format!("/{}", names.join("/")))
}

/// The node with `id` and all of its descendants, pre-order. Empty on a miss.
pub fn subtree<'a>(tree: &'a [FolderNode], id: &str) -> Vec<&'a FolderNode> {
    let Some(path) = locate(tree, |node| node.id == id) else {
        return Vec::new();
    };
    let Some(root) = node_at(tree, &path) else {
        return Vec::new();
    };

    let mut nodes = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        nodes.push(node);
        stack.extend(node.children.iter().rev());
    }
    nodes
}

/// True if re-parenting `folder` under `new_parent` would close a cycle.
pub fn would_create_cycle(
    records: &[FolderRecord],
    folder: &FolderId,
    new_parent: Option<&FolderId>,
) -> bool {
    let parents: HashMap<&FolderId, Option<&FolderId>> = records
        .iter()
        .map(|record| (&record.id, record.parent.as_ref()))
        .collect();

    let mut visited: HashSet<&FolderId> = HashSet::new();
    let mut cursor = new_parent;
    while let Some(current) = cursor {
        if current == folder {
            return true;
        }
        if !visited.insert(current) {
            // Already cyclic above us; the move itself does not add one.
            return false;
        }
        cursor = parents.get(current).copied().flatten();
    }
    false
}

/// Child-index path to the first node matching `predicate`, depth-first.
fn locate(tree: &[FolderNode], predicate: impl Fn(&FolderNode) -> bool) -> Option<Vec<usize>> {
    let mut path: Vec<usize> = Vec::new();
    let mut stack: Vec<(usize, usize, &FolderNode)> = tree
        .iter()
        .enumerate()
        .rev()
        .map(|(position, node)| (0, position, node))
        .collect();

    while let Some((depth, position, node)) = stack.pop() {
        path.truncate(depth);
        path.push(position);
        if predicate(node) {
            return Some(path);
        }
        stack.extend(
            node.children
                .iter()
                .enumerate()
                .rev()
                .map(|(child, node)| (depth + 1, child, node)),
        );
    }
    None
}

fn node_at<'a>(tree: &'a [FolderNode], path: &[usize]) -> Option<&'a FolderNode> {
    let (first, rest) = path.split_first()?;
    let mut node = tree.get(*first)?;
    for &position in rest {
        node = node.children.get(position)?;
    }
    Some(node)
}

fn node_at_mut<'a>(tree: &'a mut [FolderNode], path: &[usize]) -> Option<&'a mut FolderNode> {
    let (first, rest) = path.split_first()?;
    let mut node = tree.get_mut(*first)?;
    for &position in rest {
        node = node.children.get_mut(position)?;
    }
    Some(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::PageId;
    use time::OffsetDateTime;

    fn folder(id: &str, name: &str, parent: Option<&str>) -> FolderRecord {
        FolderRecord {
            id: FolderId::new(id),
            name: name.to_string(),
            parent: parent.map(FolderId::new),
            created_at: OffsetDateTime::UNIX_EPOCH,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn page(id: &str, slug: &str, folder_id: Option<&str>) -> PageSummary {
        PageSummary {
            id: PageId::new(id),
            slug: slug.to_string(),
            title: slug.to_uppercase(),
            folder_id: folder_id.map(FolderId::new),
            published: true,
            updated_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    fn sample_records() -> Vec<FolderRecord> {
        vec![
            folder("f1", "Blog", None),
            folder("f2", "2024", Some("f1")),
            folder("f3", "Docs", None),
            folder("f4", "Guides", Some("f3")),
            folder("f5", "2023", Some("f1")),
            folder("f6", "Intro", Some("f4")),
        ]
    }

    #[test]
    fn build_tree_nests_single_child() {
        let tree = build_tree(&[folder("f1", "Blog", None), folder("f2", "2024", Some("f1"))]);

        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].name, "Blog");
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].name, "2024");
    }

    #[test]
    fn build_tree_keeps_insertion_order() {
        let tree = build_tree(&sample_records());
        let roots: Vec<&str> = tree.iter().map(|node| node.name.as_str()).collect();
        assert_eq!(roots, ["Blog", "Docs"]);

        let blog: Vec<&str> = tree[0].children.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(blog, ["2024", "2023"]);
    }

    #[test]
    fn duplicate_ids_attach_children_to_the_last_record() {
        let tree = build_tree(&[
            folder("f1", "Old", None),
            folder("f1", "New", None),
            folder("f2", "Child", Some("f1")),
        ]);

        let roots: Vec<&str> = tree.iter().map(|node| node.name.as_str()).collect();
        assert_eq!(roots, ["Old", "New"]);
        assert!(tree[0].children.is_empty());
        assert_eq!(tree[1].children[0].name, "Child");
    }

    #[test]
    fn build_tree_accepts_child_before_parent() {
        let tree = build_tree(&[folder("f2", "2024", Some("f1")), folder("f1", "Blog", None)]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, "f1");
        assert_eq!(tree[0].children[0].id, "f2");
    }

    #[test]
    fn build_tree_treats_unknown_parent_as_root() {
        let tree = build_tree(&[folder("f9", "Orphan", Some("missing"))]);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].id, "f9");
    }

    #[test]
    fn build_tree_drops_cyclic_records() {
        let tree = build_tree(&[
            folder("a", "A", Some("b")),
            folder("b", "B", Some("a")),
            folder("c", "C", None),
        ]);
        assert_eq!(count_nodes(&tree), 1);
        assert_eq!(tree[0].id, "c");
    }

    #[test]
    fn build_tree_preserves_node_count_and_parentage() {
        // Deterministic pseudo-random acyclic forests: each record may only
        // point at an earlier record.
        let mut seed: u64 = 0x5eed;
        for size in [1usize, 7, 40, 250] {
            let mut records = Vec::with_capacity(size);
            for i in 0..size {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                let parent = if i == 0 || seed % 4 == 0 {
                    None
                } else {
                    Some(format!("n{}", (seed >> 33) as usize % i))
                };
                records.push(folder(&format!("n{i}"), &format!("name{i}"), parent.as_deref()));
            }

            let tree = build_tree(&records);
            assert_eq!(count_nodes(&tree), size);

            for record in &records {
                let Some(parent) = record.parent.as_ref() else {
                    continue;
                };
                let parent_nodes = subtree(&tree, parent.as_str());
                let parent_node = parent_nodes.first().expect("parent present");
                assert!(
                    parent_node
                        .children
                        .iter()
                        .any(|child| child.id == record.id.as_str())
                );
            }
        }
    }

    #[test]
    fn add_page_lands_under_folder() {
        let mut tree = build_tree(&sample_records());
        add_page_to_folder_tree(&mut tree, "f6", FolderNode::page(page("p1", "hello", Some("f6"))));

        let intro = find_node_by_path(&tree, &["Docs", "Guides", "Intro"]).expect("intro");
        assert_eq!(intro.children.len(), 1);
        assert!(intro.children[0].is_page);
        assert_eq!(intro.children[0].name, "hello");
    }

    #[test]
    fn add_page_falls_back_to_root() {
        let mut tree = build_tree(&sample_records());
        add_page_to_folder_tree(&mut tree, "gone", FolderNode::page(page("p1", "lost", None)));
        assert_eq!(tree.len(), 3);
        assert_eq!(tree[2].id, "p1");
    }

    #[test]
    fn page_folder_tree_attaches_every_page() {
        let tree = build_page_folder_tree(
            &sample_records(),
            &[
                page("p1", "first", Some("f2")),
                page("p2", "second", None),
                page("p3", "third", Some("missing")),
            ],
        );
        assert_eq!(count_nodes(&tree), 9);
        assert_eq!(route_for(&tree, "p1").as_deref(), Some("/Blog/2024/first"));
        assert_eq!(route_for(&tree, "p2").as_deref(), Some("/second"));
        assert_eq!(route_for(&tree, "p3").as_deref(), Some("/third"));
    }

    #[test]
    fn find_node_by_path_first_match_wins() {
        let tree = build_tree(&[
            folder("a1", "Shared", None),
            folder("a2", "Shared", None),
            folder("b", "Leaf", Some("a2")),
        ]);

        assert!(find_node_by_path(&tree, &["Shared", "Leaf"]).is_none());
        assert_eq!(
            find_node_by_path(&tree, &["Shared"]).map(|n| n.id.as_str()),
            Some("a1")
        );
        let empty: [&str; 0] = [];
        assert!(find_node_by_path(&tree, &empty).is_none());
    }

    #[test]
    fn find_nodes_along_path_backtracks_across_namesakes() {
        let tree = build_tree(&[
            folder("a1", "Shared", None),
            folder("a2", "Shared", None),
            folder("b", "Leaf", Some("a2")),
        ]);

        let chain = find_nodes_along_path(&tree, &["Shared", "Leaf"]);
        let ids: Vec<&str> = chain.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["a2", "b"]);

        assert!(find_nodes_along_path(&tree, &["Shared", "Nope"]).is_empty());
    }

    #[test]
    fn find_nodes_along_path_to_id_returns_ancestors() {
        let tree = build_tree(&sample_records());
        let chain = find_nodes_along_path_to_id(&tree, "f6");
        let ids: Vec<&str> = chain.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["f3", "f4", "f6"]);
    }

    #[test]
    fn find_nodes_along_path_to_id_miss_is_not_a_chain() {
        let tree = build_tree(&sample_records());
        let chain = find_nodes_along_path_to_id(&tree, "nope");
        assert!(chain.last().is_none_or(|node| node.id != "nope"));
        assert!(route_for(&tree, "nope").is_none());
    }

    #[test]
    fn get_full_path_returns_prefix_when_unresolvable() {
        let tree = build_tree(&sample_records());
        assert_eq!(get_full_path(&tree, &["Blog", "2024"]), ["Blog", "2024"]);
        assert_eq!(get_full_path(&tree, &["Blog", "1999", "x"]), ["Blog"]);
        assert!(get_full_path(&tree, &["Nope"]).is_empty());
    }

    #[test]
    fn full_path_round_trips_through_find() {
        let tree = build_tree(&sample_records());
        for segments in [
            vec!["Blog"],
            vec!["Blog", "2023"],
            vec!["Docs", "Guides", "Intro"],
        ] {
            let resolved = get_full_path(&tree, &segments);
            let node = find_node_by_path(&tree, &resolved).expect("resolvable");
            assert_eq!(node.name, *segments.last().expect("non-empty"));
        }
    }

    #[test]
    fn subtree_lists_descendants() {
        let tree = build_tree(&sample_records());
        let ids: Vec<&str> = subtree(&tree, "f3").iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["f3", "f4", "f6"]);
        assert!(subtree(&tree, "nope").is_empty());
    }

    #[test]
    fn cycle_detection_rejects_moves_into_own_subtree() {
        let records = sample_records();
        let docs = FolderId::new("f3");
        assert!(would_create_cycle(&records, &docs, Some(&FolderId::new("f6"))));
        assert!(would_create_cycle(&records, &docs, Some(&docs)));
        assert!(!would_create_cycle(&records, &docs, Some(&FolderId::new("f1"))));
        assert!(!would_create_cycle(&records, &docs, None));
    }
}
