//! Union-find over roadmap vertices for connected-component queries.

/// Disjoint sets with union by rank and path compression.
#[derive(Debug, Clone, Default)]
pub struct DisjointSets {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new singleton set; returns its element index.
    pub fn make_set(&mut self) -> usize {
        let id = self.parent.len();
        self.parent.push(id);
        self.rank.push(0);
        id
    }

    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut cur = x;
        while self.parent[cur] != root {
            let next = self.parent[cur];
            self.parent[cur] = root;
            cur = next;
        }
        root
    }

    pub fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
    }

    pub fn same_set(&mut self, a: usize, b: usize) -> bool {
        self.find(a) == self.find(b)
    }

    pub fn clear(&mut self) {
        self.parent.clear();
        self.rank.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_find_basic() {
        let mut sets = DisjointSets::new();
        for _ in 0..5 {
            sets.make_set();
        }
        assert!(!sets.same_set(0, 1));
        sets.union(0, 1);
        sets.union(1, 2);
        assert!(sets.same_set(0, 2));
        assert!(!sets.same_set(0, 3));
        sets.union(3, 4);
        assert!(sets.same_set(3, 4));
        assert!(!sets.same_set(2, 4));
        sets.union(0, 4);
        assert!(sets.same_set(2, 3));
    }
}
