//! Open-addressing `u32 -> f64` accumulator used on the coloring hot path.
//!
//! Linear probing over a power-of-two table with Fibonacci hashing. Deletion
//! uses backward shifting, so there are no tombstones and probe chains stay
//! short while the paint registry churns.

const EMPTY: u32 = u32::MAX;
const MIN_CAPACITY: usize = 16;

/// Sparse map from a dense id to accumulated mass.
#[derive(Debug, Clone)]
pub struct PaintMap {
    keys: Vec<u32>,
    values: Vec<f64>,
    len: usize,
}

impl Default for PaintMap {
    fn default() -> Self {
        Self::new()
    }
}

impl PaintMap {
    pub fn new() -> Self {
        Self::with_capacity(MIN_CAPACITY)
    }

    /// Table sized to hold `expected` keys without growing.
    pub fn with_capacity(expected: usize) -> Self {
        let slots = (expected.saturating_mul(4) / 3 + 1)
            .next_power_of_two()
            .max(MIN_CAPACITY);
        Self {
            keys: vec![EMPTY; slots],
            values: vec![0.0; slots],
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn mask(&self) -> usize {
        self.keys.len() - 1
    }

    fn home(&self, key: u32) -> usize {
        let h = (key as u64).wrapping_mul(0x9e37_79b9_7f4a_7c15);
        (h >> 32) as usize & self.mask()
    }

    /// `Ok(slot)` holding `key`, or `Err(slot)` where it would be inserted.
    fn find(&self, key: u32) -> Result<usize, usize> {
        let mask = self.mask();
        let mut slot = self.home(key);
        loop {
            match self.keys[slot] {
                k if k == key => return Ok(slot),
                EMPTY => return Err(slot),
                _ => slot = (slot + 1) & mask,
            }
        }
    }

    fn grow(&mut self) {
        let new_len = self.keys.len() * 2;
        let old_keys = std::mem::replace(&mut self.keys, vec![EMPTY; new_len]);
        let old_values = std::mem::replace(&mut self.values, vec![0.0; new_len]);
        for (k, v) in old_keys.into_iter().zip(old_values) {
            if k != EMPTY {
                if let Err(slot) = self.find(k) {
                    self.keys[slot] = k;
                    self.values[slot] = v;
                }
            }
        }
    }

    /// Add `amount` to the entry for `key`, inserting it if absent.
    /// Returns `true` when the key was newly inserted.
    pub fn add(&mut self, key: u32, amount: f64) -> bool {
        debug_assert_ne!(key, EMPTY, "u32::MAX is reserved");
        match self.find(key) {
            Ok(slot) => {
                self.values[slot] += amount;
                false
            }
            Err(_) => {
                if (self.len + 1) * 4 > self.keys.len() * 3 {
                    self.grow();
                }
                let Err(slot) = self.find(key) else {
                    unreachable!("key absent before growing");
                };
                self.keys[slot] = key;
                self.values[slot] = amount;
                self.len += 1;
                true
            }
        }
    }

    pub fn get(&self, key: u32) -> Option<f64> {
        self.find(key).ok().map(|slot| self.values[slot])
    }

    pub fn contains(&self, key: u32) -> bool {
        self.find(key).is_ok()
    }

    /// Remove `key`, returning its value.
    pub fn remove(&mut self, key: u32) -> Option<f64> {
        let slot = self.find(key).ok()?;
        let value = self.values[slot];
        let mask = self.mask();

        let mut hole = slot;
        let mut probe = slot;
        loop {
            probe = (probe + 1) & mask;
            let k = self.keys[probe];
            if k == EMPTY {
                break;
            }
            let home = self.home(k);
            let stays = if hole <= probe {
                hole < home && home <= probe
            } else {
                hole < home || home <= probe
            };
            if !stays {
                self.keys[hole] = k;
                self.values[hole] = self.values[probe];
                hole = probe;
            }
        }
        self.keys[hole] = EMPTY;
        self.values[hole] = 0.0;
        self.len -= 1;
        Some(value)
    }

    /// Entries in table order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.keys
            .iter()
            .zip(&self.values)
            .filter(|(k, _)| **k != EMPTY)
            .map(|(&k, &v)| (k, v))
    }

    /// Sum of all values.
    pub fn total(&self) -> f64 {
        self.iter().map(|(_, v)| v).sum()
    }

    /// Entries sorted by key.
    pub fn to_sorted_vec(&self) -> Vec<(u32, f64)> {
        let mut out: Vec<(u32, f64)> = self.iter().collect();
        out.sort_unstable_by_key(|&(k, _)| k);
        out
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn add_accumulates() {
        let mut m = PaintMap::new();
        assert!(m.add(3, 0.5));
        assert!(!m.add(3, 0.25));
        assert_eq!(m.get(3), Some(0.75));
        assert_eq!(m.len(), 1);
        assert_eq!(m.get(4), None);
    }

    #[test]
    fn grows_past_initial_capacity() {
        let mut m = PaintMap::new();
        for k in 0..1000u32 {
            m.add(k, k as f64);
        }
        assert_eq!(m.len(), 1000);
        for k in 0..1000u32 {
            assert_eq!(m.get(k), Some(k as f64));
        }
    }

    #[test]
    fn remove_keeps_colliding_keys_reachable() {
        let mut m = PaintMap::with_capacity(4);
        let keys: Vec<u32> = (0..12).map(|i| i * 16).collect();
        for &k in &keys {
            m.add(k, 1.0);
        }
        for &k in keys.iter().step_by(2) {
            assert_eq!(m.remove(k), Some(1.0));
        }
        for (i, &k) in keys.iter().enumerate() {
            assert_eq!(m.contains(k), i % 2 == 1, "key {k}");
        }
        assert_eq!(m.remove(12345), None);
    }

    #[test]
    fn matches_std_hashmap_under_churn() {
        let mut m = PaintMap::new();
        let mut reference: HashMap<u32, f64> = HashMap::new();
        let mut x: u32 = 7;
        for step in 0..5000 {
            x = x.wrapping_mul(1_103_515_245).wrapping_add(12_345) % 257;
            if step % 3 == 0 {
                assert_eq!(m.remove(x), reference.remove(&x));
            } else {
                m.add(x, 1.0);
                *reference.entry(x).or_insert(0.0) += 1.0;
            }
        }
        assert_eq!(m.len(), reference.len());
        for (k, v) in reference {
            assert_eq!(m.get(k), Some(v));
        }
    }

    #[test]
    fn sorted_vec_is_ordered() {
        let mut m = PaintMap::new();
        for k in [9u32, 2, 7, 4] {
            m.add(k, 1.0);
        }
        let keys: Vec<u32> = m.to_sorted_vec().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![2, 4, 7, 9]);
        assert_eq!(m.total(), 4.0);
    }
}
