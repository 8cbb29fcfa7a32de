//! Shaman compatibility: the pairwise element matrix, per-element owner
//! compatibilities, affinity orderings, and the boost vectors derived from
//! them. Everything here is generated fresh per run from the category seed.

use std::collections::HashMap;

use crate::rng::Stream;
use crate::tables::COMBO_OWNER_COUNT;

pub const ELEMENTS: [&str; 6] = ["fire", "water", "wind", "earth", "holy", "dark"];
pub const ELEMENT_COUNT: usize = ELEMENTS.len();

pub const AFFINITIES: [&str; 5] = ["Off", "Def", "Vig", "Wis", "mAP"];
pub const AFFINITY_COUNT: usize = AFFINITIES.len();

/// Six single-element combinations followed by the fifteen unordered pairs.
pub const COMBO_COUNT: usize = 21;

/// Elements of a combination slot, pair members ordered low/high.
pub fn combo_elements(combo: usize) -> (usize, Option<usize>) {
    if combo < ELEMENT_COUNT {
        return (combo, None);
    }
    let mut k = combo - ELEMENT_COUNT;
    for a in 0..ELEMENT_COUNT - 1 {
        let span = ELEMENT_COUNT - 1 - a;
        if k < span {
            return (a, Some(a + 1 + k));
        }
        k -= span;
    }
    unreachable!("combo index {} out of range", combo)
}

/// Inverse of [`combo_elements`]; pair order does not matter.
pub fn combo_index(a: usize, b: Option<usize>) -> usize {
    match b {
        None => a,
        Some(b) => {
            let (lo, hi) = (a.min(b), a.max(b));
            let before: usize = (0..lo).map(|x| ELEMENT_COUNT - 1 - x).sum();
            ELEMENT_COUNT + before + (hi - lo - 1)
        }
    }
}

/// The generated compatibility data for one run.
pub struct ShamanTable {
    /// Symmetric by construction; the diagonal is undefined.
    element_compat: [[Option<f64>; ELEMENT_COUNT]; ELEMENT_COUNT],
    owner_compat: [[f64; COMBO_OWNER_COUNT]; ELEMENT_COUNT],
    /// Permutation of affinity tag indexes per element.
    affinities: [[usize; AFFINITY_COUNT]; ELEMENT_COUNT],
}

impl ShamanTable {
    pub fn generate(rng: &mut Stream) -> ShamanTable {
        let mut table = ShamanTable {
            element_compat: [[None; ELEMENT_COUNT]; ELEMENT_COUNT],
            owner_compat: [[0.0; COMBO_OWNER_COUNT]; ELEMENT_COUNT],
            affinities: [[0; AFFINITY_COUNT]; ELEMENT_COUNT],
        };

        let mut order: Vec<usize> = (0..ELEMENT_COUNT).collect();
        rng.shuffle(&mut order);

        let mut recent_firsts: Vec<usize> = Vec::new();
        for &element in &order {
            for other in 0..ELEMENT_COUNT {
                if other == element {
                    continue;
                }
                // Reuse the mirror value when the pair already drew.
                let value = match table.element_compat[other][element] {
                    Some(v) => v,
                    None => rng.uniform_int(0, 100) as f64 / 100.0,
                };
                table.element_compat[element][other] = Some(value);
            }
            for owner in 0..COMBO_OWNER_COUNT {
                table.owner_compat[element][owner] = rng.uniform_int(0, 100) as f64 / 100.0;
            }

            let mut ordering: Vec<usize> = (0..AFFINITY_COUNT).collect();
            loop {
                rng.shuffle(&mut ordering);
                if recent_firsts.len() >= AFFINITY_COUNT
                    || !recent_firsts.contains(&ordering[0])
                {
                    recent_firsts.push(ordering[0]);
                    break;
                }
            }
            for (slot, &tag) in ordering.iter().enumerate() {
                table.affinities[element][slot] = tag;
            }
        }

        table
    }

    pub fn element_compat(&self, a: usize, b: usize) -> Option<f64> {
        self.element_compat[a][b]
    }

    pub fn owner_compat(&self, element: usize, owner: usize) -> f64 {
        self.owner_compat[element][owner]
    }

    pub fn affinity_order(&self, element: usize) -> &[usize; AFFINITY_COUNT] {
        &self.affinities[element]
    }

    /// Position of an affinity tag in an element's priority ordering.
    fn priority_index(&self, element: usize, tag: usize) -> usize {
        self.affinities[element]
            .iter()
            .position(|&t| t == tag)
            .expect("affinity orderings are permutations")
    }

    /// The owner/element and element/element compatibilities backing one
    /// combination, in the order [a-owner, b-owner, b-a].
    pub fn compatibilities(&self, owner: usize, combo: usize) -> Vec<f64> {
        let (a, b) = combo_elements(combo);
        let mut out = vec![self.owner_compat(a, owner)];
        if let Some(b) = b {
            out.push(self.owner_compat(b, owner));
            out.push(
                self.element_compat(b, a)
                    .expect("off-diagonal pairs are always defined"),
            );
        }
        out
    }
}

/// Per-run memo of derived boost vectors, keyed by (owner, combination).
#[derive(Default)]
pub struct BoostTable {
    cache: HashMap<(usize, usize), [f64; AFFINITY_COUNT]>,
}

impl BoostTable {
    pub fn new() -> BoostTable {
        BoostTable::default()
    }

    /// Derives (or recalls) the boost vector for one (owner, combination)
    /// entry. Components are jittered and normalized to fractions in [0, 1].
    pub fn boosts(
        &mut self,
        table: &ShamanTable,
        owner: usize,
        combo: usize,
        rng: &mut Stream,
    ) -> [f64; AFFINITY_COUNT] {
        if let Some(cached) = self.cache.get(&(owner, combo)) {
            return *cached;
        }
        let raw = derive_raw_boosts(table, owner, combo, rng);
        let mut values = [0.0; AFFINITY_COUNT];
        for (slot, &value) in raw.iter().enumerate() {
            let jittered = rng.jitter_f64(value, 0.0, 100.0);
            values[slot] = (jittered / 100.0 * 1000.0).round() / 1000.0;
        }
        self.cache.insert((owner, combo), values);
        values
    }

    pub fn total(
        &mut self,
        table: &ShamanTable,
        owner: usize,
        combo: usize,
        rng: &mut Stream,
    ) -> f64 {
        self.boosts(table, owner, combo, rng).iter().sum()
    }
}

/// Pure boost formula on a 0..=100 scale, before jitter and normalization.
fn derive_raw_boosts(
    table: &ShamanTable,
    owner: usize,
    combo: usize,
    rng: &mut Stream,
) -> [f64; AFFINITY_COUNT] {
    let (first, second) = combo_elements(combo);
    let mut values = [0.0; AFFINITY_COUNT];

    let Some(second) = second else {
        let comp = table.owner_compat(first, owner);
        for (tag, value) in values.iter_mut().enumerate() {
            let index = table.priority_index(first, tag);
            *value = comp * comp * (50.0 / f64::powi(2.0, index as i32));
        }
        return values;
    };

    // The element the owner gets along with better leads the formula.
    let (mut a, mut b) = (first, second);
    let mut a_comp = table.owner_compat(a, owner);
    let mut b_comp = table.owner_compat(b, owner);
    if b_comp > a_comp {
        std::mem::swap(&mut a, &mut b);
        std::mem::swap(&mut a_comp, &mut b_comp);
    }
    let ab = table
        .element_compat(a, b)
        .expect("paired combos never reference the diagonal");

    let (lower, upper) = (b_comp, a_comp);
    let mut reverse = false;
    let mut unstable = false;
    if lower > 0.5 && ab < 0.5 && ab < rng.triangular(0.0, lower, lower) {
        reverse = true;
    } else if upper < 0.5 && ab > 0.5 && ab > rng.triangular(upper, 1.0, (upper + 1.0) / 2.0) {
        unstable = true;
    }
    let b_comp = b_comp.max(a_comp * ab);

    for (tag, value) in values.iter_mut().enumerate() {
        if unstable {
            let ceiling = rng.uniform_int(50, 100);
            *value = rng.uniform_int(0, ceiling) as f64;
            continue;
        }
        let mut a_index = table.priority_index(a, tag);
        let mut b_index = table.priority_index(b, tag);
        if reverse {
            a_index = AFFINITY_COUNT - 1 - a_index;
            b_index = AFFINITY_COUNT - 1 - b_index;
        }
        let a_val = a_comp * a_comp * (100.0 / f64::powi(2.0, a_index as i32));
        let b_val = b_comp * b_comp * (100.0 / f64::powi(2.0, b_index as i32));
        *value = a_val.max(b_val);
    }
    values
}
