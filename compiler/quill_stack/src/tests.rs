use super::*;

#[test]
fn passes_through_result() {
    let result: Result<u32, &str> = ensure_sufficient_stack(|| Ok(7));
    assert_eq!(result, Ok(7));
}

#[test]
fn survives_deep_recursion() {
    fn nest(depth: u32) -> u32 {
        ensure_sufficient_stack(|| if depth == 0 { 0 } else { nest(depth - 1) + 1 })
    }

    assert_eq!(nest(200_000), 200_000);
}

#[test]
fn recursion_over_boxed_tree() {
    enum Tree {
        Leaf,
        Node(Box<Tree>),
    }

    fn depth(tree: &Tree) -> usize {
        ensure_sufficient_stack(|| match tree {
            Tree::Leaf => 0,
            Tree::Node(child) => depth(child) + 1,
        })
    }

    let mut tree = Tree::Leaf;
    for _ in 0..50_000 {
        tree = Tree::Node(Box::new(tree));
    }
    assert_eq!(depth(&tree), 50_000);

    // Drop iteratively so the test does not depend on recursive drop depth.
    let mut current = tree;
    while let Tree::Node(child) = current {
        current = *child;
    }
}
