//! StructuralCleanup: Marker unnesting and exclusion stripping
//!
//! The folded pass usually re-tags the span the raw pass already claimed for
//! the same term, and markers arriving with the page may already nest.
//! Unnesting keeps the outermost marker. Stripping removes every marker from
//! a region the caller excluded.

use crate::dom::{ContentTree, NodeId};
use crate::error::Result;

/// Unwrap every marker that sits inside another marker under `region`.
/// Text is preserved verbatim. Returns the number of markers removed.
pub fn unnest_markers(tree: &mut ContentTree, region: NodeId) -> Result<usize> {
    let mut removed = 0;
    loop {
        let mut removed_this_round = 0;
        for outer in tree.markers_in(region) {
            if !tree.is_inclusive_descendant(outer, region) {
                // Unwrapped earlier in this round
                continue;
            }
            let nested = tree.markers_in(outer);
            for inner in nested.into_iter().rev() {
                tree.unwrap(inner)?;
                removed_this_round += 1;
            }
        }
        removed += removed_this_round;
        if removed_this_round == 0 {
            break;
        }
    }
    if removed > 0 {
        log::debug!("unnested {} markers under {}", removed, region);
    }
    Ok(removed)
}

/// Unwrap every marker under `region`. Returns the markers removed so the
/// caller can release anything bound to them.
pub fn strip_markers(tree: &mut ContentTree, region: NodeId) -> Result<Vec<NodeId>> {
    let markers = tree.markers_in(region);
    for &marker in markers.iter().rev() {
        tree.unwrap(marker)?;
    }
    Ok(markers)
}

/// True if no marker under `region` contains another marker
pub fn is_flat(tree: &ContentTree, region: NodeId) -> bool {
    tree.markers_in(region)
        .into_iter()
        .all(|m| tree.markers_in(m).is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `<p>a<M0>b<M1>c<M2>d</M2>e</M1>f</M0>g</p>`
    fn three_levels() -> (ContentTree, NodeId) {
        let mut tree = ContentTree::new();
        let root = tree.root();
        let p = tree.append_element(root, "p");
        tree.append_text(p, "a");
        let m0 = tree.create_marker(0);
        tree.append_child(p, m0);
        tree.append_text(m0, "b");
        let m1 = tree.create_marker(1);
        tree.append_child(m0, m1);
        tree.append_text(m1, "c");
        let m2 = tree.create_marker(2);
        tree.append_child(m1, m2);
        tree.append_text(m2, "d");
        tree.append_text(m1, "e");
        tree.append_text(m0, "f");
        tree.append_text(p, "g");
        (tree, p)
    }

    #[test]
    fn test_unnest_three_levels() {
        let (mut tree, p) = three_levels();
        assert!(!is_flat(&tree, p));

        let removed = unnest_markers(&mut tree, p).unwrap();
        assert_eq!(removed, 2);

        let markers = tree.markers_in(p);
        assert_eq!(markers.len(), 1);
        assert_eq!(tree.marker_term(markers[0]).unwrap().index, 0);
        assert_eq!(tree.parent(markers[0]), Some(p));
        assert!(is_flat(&tree, p));
        assert_eq!(tree.text_content(p), "abcdefg");
        assert_eq!(tree.text_content(markers[0]), "bcdef");
    }

    #[test]
    fn test_unnest_keeps_sibling_markers() {
        let mut tree = ContentTree::parse_html("<p>x y</p>").unwrap();
        let p = tree.first_element("p").unwrap();
        let text = tree.children(p)[0];
        let right = tree.split_text(text, 1).unwrap();
        let m0 = tree.create_marker(0);
        tree.wrap(text, m0).unwrap();
        let m1 = tree.create_marker(1);
        tree.wrap(right, m1).unwrap();

        assert_eq!(unnest_markers(&mut tree, p).unwrap(), 0);
        assert_eq!(tree.markers_in(p), vec![m0, m1]);
    }

    #[test]
    fn test_strip_removes_all_markers() {
        let (mut tree, p) = three_levels();
        let stripped = strip_markers(&mut tree, p).unwrap();

        assert_eq!(stripped.len(), 3);
        assert!(tree.markers_in(p).is_empty());
        assert_eq!(tree.text_content(p), "abcdefg");
        assert_eq!(tree.children(p).len(), 7);
    }

    #[test]
    fn test_strip_leaves_outside_markers_alone() {
        let mut tree = ContentTree::parse_html("<div><p>a</p><aside>b</aside></div>").unwrap();
        let p = tree.first_element("p").unwrap();
        let aside = tree.first_element("aside").unwrap();
        let ta = tree.children(p)[0];
        let tb = tree.children(aside)[0];
        let ma = tree.create_marker(0);
        tree.wrap(ta, ma).unwrap();
        let mb = tree.create_marker(1);
        tree.wrap(tb, mb).unwrap();

        strip_markers(&mut tree, aside).unwrap();
        assert_eq!(tree.markers_in(tree.root()), vec![ma]);
    }
}
