use rand::{Rng, SeedableRng, rngs::StdRng};

/// Seed used when no palette seed is configured.
pub const DEFAULT_PALETTE_SEED: u64 = 0;

/// RGB colours indexed by class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassPalette {
    colors: Vec<[u8; 3]>,
}

impl ClassPalette {
    pub fn new(colors: Vec<[u8; 3]>) -> Self {
        Self { colors }
    }

    /// `n_classes` random colours. The same seed always yields the same
    /// palette, so renders stay comparable between runs.
    pub fn seeded(n_classes: usize, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let colors = (0..n_classes)
            .map(|_| [rng.r#gen(), rng.r#gen(), rng.r#gen()])
            .collect();

        Self { colors }
    }

    pub fn color(&self, class: usize) -> Option<[u8; 3]> {
        self.colors.get(class).copied()
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}
