//! Subset enumeration for operator search.

/// All `k`-element subsets of `0..n`, as ascending index vectors, in
/// lexicographic order.
#[derive(Debug, Clone)]
pub struct ChoiceGenerator {
    n: usize,
    k: usize,
    current: Option<Vec<usize>>,
    started: bool,
}

impl ChoiceGenerator {
    pub fn new(n: usize, k: usize) -> Self {
        Self {
            n,
            k,
            current: None,
            started: false,
        }
    }
}

impl Iterator for ChoiceGenerator {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if !self.started {
            self.started = true;
            if self.k > self.n {
                return None;
            }
            self.current = Some((0..self.k).collect());
            return self.current.clone();
        }

        let (n, k) = (self.n, self.k);
        let choice = self.current.as_mut()?;

        // Rightmost slot that can still move right.
        let Some(i) = (0..k).rev().find(|&i| choice[i] < n - k + i) else {
            self.current = None;
            return None;
        };

        choice[i] += 1;
        for j in i + 1..k {
            choice[j] = choice[j - 1] + 1;
        }
        Some(choice.clone())
    }
}

/// All subsets of `0..n` with at most `depth` elements: the empty set
/// first, then singletons, pairs, and so on, each size in lexicographic
/// order.
#[derive(Debug, Clone)]
pub struct DepthChoiceGenerator {
    n: usize,
    max_k: usize,
    k: usize,
    inner: ChoiceGenerator,
}

impl DepthChoiceGenerator {
    pub fn new(n: usize, depth: usize) -> Self {
        Self {
            n,
            max_k: depth.min(n),
            k: 0,
            inner: ChoiceGenerator::new(n, 0),
        }
    }
}

impl Iterator for DepthChoiceGenerator {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        loop {
            if let Some(choice) = self.inner.next() {
                return Some(choice);
            }
            if self.k >= self.max_k {
                return None;
            }
            self.k += 1;
            self.inner = ChoiceGenerator::new(self.n, self.k);
        }
    }
}

/// Pick the items named by `choice`.
pub fn select<T: Clone>(choice: &[usize], items: &[T]) -> Vec<T> {
    choice.iter().map(|&i| items[i].clone()).collect()
}
