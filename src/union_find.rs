//! Label equivalences collected across block faces.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::face::FaceAssignment;

/// Disjoint sets over the offset label space `0..n_labels`.
///
/// The root of every set is its smallest label, so the final mapping only
/// depends on which labels were joined, never on the order of the unions.
/// Only labels that took part in a union are stored.
#[derive(Clone, Debug)]
pub struct LabelUnionFind {
    n_labels: u64,
    parent: HashMap<u64, u64>,
}

impl LabelUnionFind {
    pub fn new(n_labels: u64) -> Self {
        Self {
            n_labels,
            parent: HashMap::new(),
        }
    }

    pub fn n_labels(&self) -> u64 {
        self.n_labels
    }

    fn check(&self, label: u64) -> Result<()> {
        if label >= self.n_labels {
            return Err(Error::InconsistentShape(format!(
                "label {label} exceeds label count {}",
                self.n_labels
            )));
        }
        Ok(())
    }

    /// Representative of `label`'s set.
    pub fn find(&mut self, label: u64) -> Result<u64> {
        self.check(label)?;
        let mut root = label;
        while let Some(&p) = self.parent.get(&root) {
            if p == root {
                break;
            }
            root = p;
        }
        // path compression
        let mut current = label;
        while current != root {
            let next = self.parent.get(&current).copied().unwrap_or(root);
            self.parent.insert(current, root);
            current = next;
        }
        Ok(root)
    }

    /// Join the sets of `a` and `b`.
    pub fn union(&mut self, a: u64, b: u64) -> Result<()> {
        let ra = self.find(a)?;
        let rb = self.find(b)?;
        self.parent.entry(ra).or_insert(ra);
        self.parent.entry(rb).or_insert(rb);
        if ra != rb {
            let (root, child) = (ra.min(rb), ra.max(rb));
            self.parent.insert(child, root);
        }
        Ok(())
    }

    pub fn union_pairs(&mut self, pairs: &[FaceAssignment]) -> Result<()> {
        for &(a, b) in pairs {
            self.union(a, b)?;
        }
        Ok(())
    }

    /// Fold a partial result computed elsewhere into this one.
    pub fn merge(&mut self, mut other: LabelUnionFind) -> Result<()> {
        let mut labels: Vec<u64> = other.parent.keys().copied().collect();
        labels.sort_unstable();
        for label in labels {
            let root = other.find(label)?;
            self.union(label, root)?;
        }
        Ok(())
    }

    /// Final label to representative mapping for every label that took part
    /// in a union. Consumes the structure, so no union can follow.
    pub fn finalize(mut self) -> Equivalences {
        let mut labels: Vec<u64> = self.parent.keys().copied().collect();
        labels.sort_unstable();
        let mut mapping = BTreeMap::new();
        for label in labels {
            // every stored label is in range
            if let Ok(root) = self.find(label) {
                mapping.insert(label, root);
            }
        }
        Equivalences {
            n_labels: self.n_labels,
            mapping,
        }
    }
}

/// Finalized equivalence classes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Equivalences {
    n_labels: u64,
    mapping: BTreeMap<u64, u64>,
}

impl Equivalences {
    pub fn n_labels(&self) -> u64 {
        self.n_labels
    }

    pub fn mapping(&self) -> &BTreeMap<u64, u64> {
        &self.mapping
    }

    /// Representative of `label`; labels never unioned represent themselves.
    pub fn representative(&self, label: u64) -> u64 {
        self.mapping.get(&label).copied().unwrap_or(label)
    }

    /// Representative for every label in `0..n_labels`.
    pub fn lookup_table(&self) -> Vec<u64> {
        (0..self.n_labels).map(|l| self.representative(l)).collect()
    }

    /// Consecutive relabeling: background stays 0, classes are numbered from
    /// 1 in the order of their representatives.
    pub fn consecutive(&self) -> Vec<u64> {
        let mut table = vec![0u64; self.n_labels as usize];
        let mut next = 1u64;
        for label in 1..self.n_labels {
            let rep = self.representative(label);
            table[label as usize] = if rep == 0 {
                0
            } else if rep == label {
                next += 1;
                next - 1
            } else {
                // rep < label, already numbered
                table[rep as usize]
            };
        }
        table
    }
}
