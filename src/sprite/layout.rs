//! Growing binary-tree bin packing.
//!
//! The sheet starts at the size of the first (largest) block and grows to
//! the right or downward whenever the next block does not fit, preferring
//! the direction that keeps the sheet closest to square.
//!
//! Blocks are placed in order of their longest side, descending. The sort is
//! stable, so equally sized blocks keep their input order and the same input
//! always yields the same layout.

/// A placed block, without padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn right(&self) -> u32 {
        self.x + self.width
    }

    pub const fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Whether the two rectangles are at least `gap` pixels apart on one axis.
    pub const fn is_separated(&self, other: &Rect, gap: u32) -> bool {
        self.right() + gap <= other.x
            || other.right() + gap <= self.x
            || self.bottom() + gap <= other.y
            || other.bottom() + gap <= self.y
    }
}

/// Result of a packing run. `rects` is in input order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Layout {
    pub width: u32,
    pub height: u32,
    pub rects: Vec<Rect>,
}

/// Pack blocks of the given `(width, height)` sizes.
///
/// Every block is inflated by `padding` on its right and bottom edge while
/// placing; the reported sheet size is trimmed to the placed rectangles.
pub fn binary_tree(sizes: &[(u32, u32)], padding: u32) -> Layout {
    if sizes.is_empty() {
        return Layout::default();
    }

    let mut order: Vec<usize> = (0..sizes.len()).collect();
    order.sort_by_key(|&i| std::cmp::Reverse(sizes[i].0.max(sizes[i].1)));

    let (w0, h0) = sizes[order[0]];
    let mut tree = Tree::new(w0 + padding, h0 + padding);
    let mut rects = vec![Rect::default(); sizes.len()];

    for i in order {
        let (width, height) = sizes[i];
        let (w, h) = (width + padding, height + padding);
        let (x, y) = match tree.find(tree.root, w, h) {
            Some(node) => tree.split(node, w, h),
            None => tree.grow(w, h),
        };
        rects[i] = Rect {
            x,
            y,
            width,
            height,
        };
    }

    let width = rects.iter().map(Rect::right).max().unwrap_or(0);
    let height = rects.iter().map(Rect::bottom).max().unwrap_or(0);
    Layout {
        width,
        height,
        rects,
    }
}

// ============================================================================
// Tree
// ============================================================================

#[derive(Debug, Clone, Copy)]
struct Node {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    used: bool,
    right: Option<usize>,
    down: Option<usize>,
}

impl Node {
    const fn free(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self {
            x,
            y,
            w,
            h,
            used: false,
            right: None,
            down: None,
        }
    }
}

/// Node arena; `root` changes every time the sheet grows.
struct Tree {
    nodes: Vec<Node>,
    root: usize,
}

impl Tree {
    fn new(w: u32, h: u32) -> Self {
        Self {
            nodes: vec![Node::free(0, 0, w, h)],
            root: 0,
        }
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// First free node (right subtree before down) that can hold `w × h`.
    fn find(&self, idx: usize, w: u32, h: u32) -> Option<usize> {
        let node = self.nodes[idx];
        if node.used {
            node.right
                .and_then(|r| self.find(r, w, h))
                .or_else(|| node.down.and_then(|d| self.find(d, w, h)))
        } else if w <= node.w && h <= node.h {
            Some(idx)
        } else {
            None
        }
    }

    /// Occupy the top-left corner of `idx`, leaving the rest as two children.
    fn split(&mut self, idx: usize, w: u32, h: u32) -> (u32, u32) {
        let node = self.nodes[idx];
        let down = self.push(Node::free(node.x, node.y + h, node.w, node.h - h));
        let right = self.push(Node::free(node.x + w, node.y, node.w - w, h));

        let node = &mut self.nodes[idx];
        node.used = true;
        node.down = Some(down);
        node.right = Some(right);
        (node.x, node.y)
    }

    fn grow(&mut self, w: u32, h: u32) -> (u32, u32) {
        let root = self.nodes[self.root];
        let can_grow_down = w <= root.w;
        let can_grow_right = h <= root.h;

        let should_grow_right = can_grow_right && root.h >= root.w + w;
        let should_grow_down = can_grow_down && root.w >= root.h + h;

        if should_grow_right {
            self.grow_right(w, h)
        } else if should_grow_down {
            self.grow_down(w, h)
        } else if can_grow_right {
            self.grow_right(w, h)
        } else if can_grow_down {
            self.grow_down(w, h)
        } else {
            // Unreachable with longest-side ordering; widen to keep going.
            self.grow_right(w, h)
        }
    }

    fn grow_right(&mut self, w: u32, h: u32) -> (u32, u32) {
        let old = self.nodes[self.root];
        let height = old.h.max(h);
        let right = self.push(Node::free(old.w, 0, w, height));
        let new_root = self.push(Node {
            x: 0,
            y: 0,
            w: old.w + w,
            h: height,
            used: true,
            right: Some(right),
            down: Some(self.root),
        });
        self.root = new_root;
        self.split(right, w, h)
    }

    fn grow_down(&mut self, w: u32, h: u32) -> (u32, u32) {
        let old = self.nodes[self.root];
        let width = old.w.max(w);
        let down = self.push(Node::free(0, old.h, width, h));
        let new_root = self.push(Node {
            x: 0,
            y: 0,
            w: width,
            h: old.h + h,
            used: true,
            right: Some(self.root),
            down: Some(down),
        });
        self.root = new_root;
        self.split(down, w, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_separated(layout: &Layout, padding: u32) {
        for (i, a) in layout.rects.iter().enumerate() {
            for b in &layout.rects[i + 1..] {
                assert!(a.is_separated(b, padding), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(binary_tree(&[], 10), Layout::default());
    }

    #[test]
    fn test_single_block_has_no_trailing_padding() {
        let layout = binary_tree(&[(32, 16)], 10);
        assert_eq!(layout.rects, vec![Rect { x: 0, y: 0, width: 32, height: 16 }]);
        assert_eq!((layout.width, layout.height), (32, 16));
    }

    #[test]
    fn test_two_equal_blocks_grow_once() {
        let layout = binary_tree(&[(20, 20), (20, 20)], 10);
        assert_eq!(layout.rects[0], Rect { x: 0, y: 0, width: 20, height: 20 });
        // Square root: neither direction is preferred, so it grows right.
        assert_eq!(layout.rects[1], Rect { x: 30, y: 0, width: 20, height: 20 });
        assert_eq!((layout.width, layout.height), (50, 20));
    }

    #[test]
    fn test_rects_keep_input_order() {
        let layout = binary_tree(&[(8, 8), (64, 64), (16, 16)], 0);
        assert_eq!(layout.rects[1].width, 64);
        assert_eq!((layout.rects[1].x, layout.rects[1].y), (0, 0));
        assert_eq!(layout.rects[0].width, 8);
        assert_eq!(layout.rects[2].width, 16);
    }

    #[test]
    fn test_no_overlap_with_padding() {
        let sizes = [
            (48, 48),
            (16, 64),
            (64, 16),
            (24, 24),
            (24, 24),
            (10, 30),
            (30, 10),
            (5, 5),
            (100, 8),
            (8, 100),
        ];
        for padding in [0, 1, 10] {
            let layout = binary_tree(&sizes, padding);
            assert_eq!(layout.rects.len(), sizes.len());
            assert_separated(&layout, padding);
            for (rect, (w, h)) in layout.rects.iter().zip(sizes) {
                assert_eq!((rect.width, rect.height), (w, h));
                assert!(rect.right() <= layout.width);
                assert!(rect.bottom() <= layout.height);
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let sizes = [(12, 40), (40, 12), (30, 30), (12, 40)];
        assert_eq!(binary_tree(&sizes, 10), binary_tree(&sizes, 10));
    }

    #[test]
    fn test_stable_for_equal_sides() {
        let layout = binary_tree(&[(10, 10), (10, 10), (10, 10)], 0);
        let first = layout.rects[0];
        assert_eq!((first.x, first.y), (0, 0));
        assert!(layout.rects[1].x > 0 || layout.rects[1].y > 0);
    }
}
