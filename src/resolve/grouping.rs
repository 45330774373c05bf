use clap::ValueEnum;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum GroupingMode {
    /// Single pass: a pair joins the first group holding either member
    #[default]
    Greedy,
    /// Full transitive closure over all candidate pairs
    UnionFind,
}

/// Groups of item indices. Members keep insertion order; the first member
/// of each group is the one that survives the merge.
pub fn group_pairs(pairs: &[(usize, usize)], mode: GroupingMode) -> Vec<Vec<usize>> {
    match mode {
        GroupingMode::Greedy => greedy_groups(pairs),
        GroupingMode::UnionFind => union_find_groups(pairs),
    }
}

/// Not transitively closed: an item can end up in two groups when pairs
/// linking separate groups arrive after both groups were started.
pub fn greedy_groups(pairs: &[(usize, usize)]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();

    for &(a, b) in pairs {
        match groups
            .iter_mut()
            .find(|group| group.contains(&a) || group.contains(&b))
        {
            Some(group) => {
                for item in [a, b] {
                    if !group.contains(&item) {
                        group.push(item);
                    }
                }
            }
            None => groups.push(vec![a, b]),
        }
    }

    groups
}

pub fn union_find_groups(pairs: &[(usize, usize)]) -> Vec<Vec<usize>> {
    fn find(parent: &mut BTreeMap<usize, usize>, i: usize) -> usize {
        let p = *parent.entry(i).or_insert(i);
        if p == i {
            return i;
        }
        let root = find(parent, p);
        parent.insert(i, root);
        root
    }

    let mut parent: BTreeMap<usize, usize> = BTreeMap::new();
    // Items in order of first appearance across the pairs.
    let mut order: Vec<usize> = Vec::new();

    for &(a, b) in pairs {
        for item in [a, b] {
            if !parent.contains_key(&item) {
                parent.insert(item, item);
                order.push(item);
            }
        }
        let ra = find(&mut parent, a);
        let rb = find(&mut parent, b);
        if ra != rb {
            parent.insert(rb, ra);
        }
    }

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut group_of_root: BTreeMap<usize, usize> = BTreeMap::new();
    for item in order {
        let root = find(&mut parent, item);
        match group_of_root.get(&root) {
            Some(&g) => groups[g].push(item),
            None => {
                group_of_root.insert(root, groups.len());
                groups.push(vec![item]);
            }
        }
    }

    groups
}
