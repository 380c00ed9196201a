use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::Vibe;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VibeEngineState {
    Idle,
    Round(u32),
    Exhausted,
}

/// Hands out catalog vibes in random order without repeats, for at most
/// `max_rounds` rounds. A `None` from [`VibeEngine::next_vibe`] means the
/// session is over and results should be shown.
pub struct VibeEngine<R = StdRng> {
    catalog: Vec<Vibe>,
    used: HashSet<String>,
    pool: Vec<Vibe>,
    round: u32,
    max_rounds: u32,
    rng: R,
}

impl VibeEngine<StdRng> {
    pub fn new(catalog: Vec<Vibe>, max_rounds: u32) -> Self {
        Self::with_rng(catalog, max_rounds, StdRng::from_entropy())
    }
}

impl<R: Rng> VibeEngine<R> {
    pub fn with_rng(catalog: Vec<Vibe>, max_rounds: u32, rng: R) -> Self {
        Self {
            catalog,
            used: HashSet::new(),
            pool: Vec::new(),
            round: 0,
            max_rounds,
            rng,
        }
    }

    pub fn next_vibe(&mut self) -> Option<Vibe> {
        if self.round >= self.max_rounds {
            debug!(round = self.round, "vibe rounds exhausted");
            return None;
        }

        loop {
            if self.pool.is_empty() {
                self.refill();
                if self.pool.is_empty() {
                    debug!(used = self.used.len(), "vibe catalog exhausted");
                    return None;
                }
            }
            let Some(vibe) = self.pool.pop() else {
                continue;
            };
            // Catalogs with duplicate names still never repeat a name.
            if self.used.insert(vibe.name.clone()) {
                self.round += 1;
                debug!(round = self.round, vibe = %vibe.name, "next vibe");
                return Some(vibe);
            }
        }
    }

    /// Reshuffles only the vibes not handed out yet.
    fn refill(&mut self) {
        self.pool = self
            .catalog
            .iter()
            .filter(|v| !self.used.contains(&v.name))
            .cloned()
            .collect();
        self.pool.shuffle(&mut self.rng);
    }

    pub fn reset(&mut self) {
        self.used.clear();
        self.pool.clear();
        self.round = 0;
    }

    pub fn set_max_rounds(&mut self, max_rounds: u32) {
        self.max_rounds = max_rounds;
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn state(&self) -> VibeEngineState {
        let catalog_left = self.catalog.iter().any(|v| !self.used.contains(&v.name));
        if self.round >= self.max_rounds || (self.round > 0 && !catalog_left) {
            VibeEngineState::Exhausted
        } else if self.round == 0 {
            VibeEngineState::Idle
        } else {
            VibeEngineState::Round(self.round)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vibes::VIBES;

    fn seeded(catalog: Vec<Vibe>, rounds: u32, seed: u64) -> VibeEngine<StdRng> {
        VibeEngine::with_rng(catalog, rounds, StdRng::seed_from_u64(seed))
    }

    #[test]
    fn exhaustion_returns_r_distinct_then_none() {
        for n in 1..=VIBES.len() {
            let catalog: Vec<Vibe> = VIBES[..n].to_vec();
            for r in 1..=n as u32 {
                let mut engine = seeded(catalog.clone(), r, (n as u64) * 31 + r as u64);
                let mut names = HashSet::new();
                for _ in 0..r {
                    let vibe = engine.next_vibe().expect("vibe before exhaustion");
                    assert!(names.insert(vibe.name));
                }
                assert!(engine.next_vibe().is_none(), "n={n} r={r}");
                assert_eq!(engine.round(), r);
                assert_eq!(engine.state(), VibeEngineState::Exhausted);
            }
        }
    }

    #[test]
    fn rounds_beyond_catalog_stop_at_catalog_size() {
        let mut engine = seeded(VIBES[..3].to_vec(), 10, 7);
        let got: Vec<_> = std::iter::from_fn(|| engine.next_vibe()).collect();
        assert_eq!(got.len(), 3);
        assert_eq!(engine.state(), VibeEngineState::Exhausted);
    }

    #[test]
    fn no_repeat_and_round_counting() {
        let mut engine = seeded(VIBES.clone(), 8, 42);
        assert_eq!(engine.state(), VibeEngineState::Idle);
        let first = engine.next_vibe().expect("first");
        assert_eq!(engine.state(), VibeEngineState::Round(1));
        let mut seen = HashSet::from([first.name]);
        while let Some(v) = engine.next_vibe() {
            assert!(seen.insert(v.name), "repeated vibe");
        }
        assert_eq!(seen.len(), 8);
    }

    #[test]
    fn duplicate_names_in_catalog_are_not_repeated() {
        let mut catalog = VIBES[..2].to_vec();
        catalog.push(VIBES[0].clone());
        let mut engine = seeded(catalog, 3, 3);
        let got: Vec<_> = std::iter::from_fn(|| engine.next_vibe()).collect();
        assert_eq!(got.len(), 2);
        assert_eq!(engine.round(), 2);
    }

    #[test]
    fn reset_restarts_the_run() {
        let mut engine = seeded(VIBES.clone(), 2, 1);
        engine.next_vibe();
        engine.next_vibe();
        assert!(engine.next_vibe().is_none());
        engine.reset();
        assert_eq!(engine.round(), 0);
        assert_eq!(engine.state(), VibeEngineState::Idle);
        assert!(engine.next_vibe().is_some());
    }
}
