//! The one and only owner of every live particle.

use std::collections::BTreeMap;

use color_eyre::eyre::{bail, Result};

use crate::particle::{Particle, ParticleId};

/// What to do with a particle after visiting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Visit {
    /// Leave it in the store.
    Keep,
    /// Remove it from the store.
    Remove,
}

/// All the live particles, keyed by their ID.
#[derive(Debug, Default)]
pub struct ParticleStore {
    /// The particles themselves.
    particles: BTreeMap<ParticleId, Particle>,
    /// The most recently issued ID. IDs are never reused, not even after clearing.
    last_id: ParticleId,
}

impl ParticleStore {
    /// Take ownership of a new particle and issue it a fresh ID.
    pub fn insert(&mut self, particle: Particle) -> Result<ParticleId> {
        if !particle.is_valid() {
            bail!("Refusing to store an invalid particle: {particle:?}");
        }

        self.last_id = self.last_id.wrapping_add(1);
        self.particles.insert(self.last_id, particle);
        Ok(self.last_id)
    }

    /// Visit every particle exactly once, allowing it to be mutated or removed. Removing a
    /// particle doesn't affect the visiting of any others. Returns how many were removed.
    ///
    /// The order of visits is not part of the contract.
    pub fn for_each_mut<F>(&mut self, mut visitor: F) -> usize
    where
        F: FnMut(ParticleId, &mut Particle) -> Visit,
    {
        let before = self.particles.len();
        self.particles
            .retain(|id, particle| visitor(*id, particle) == Visit::Keep);
        before - self.particles.len()
    }

    /// Read-only iteration over every particle.
    pub fn iter(&self) -> impl Iterator<Item = (ParticleId, &Particle)> {
        self.particles.iter().map(|(id, particle)| (*id, particle))
    }

    /// Get a single particle.
    #[cfg(test)]
    #[must_use]
    pub fn get(&self, id: ParticleId) -> Option<&Particle> {
        self.particles.get(&id)
    }

    /// Remove every particle at once.
    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// The number of live particles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Whether there are no live particles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}

#[cfg(test)]
#[expect(
    clippy::unwrap_used,
    clippy::float_cmp,
    reason = "Tests aren't so strict"
)]
mod test {
    use std::collections::HashSet;

    use glam::DVec2;

    use super::*;

    fn dot(x: f64) -> Particle {
        Particle::new(DVec2::new(x, 0.0), DVec2::new(0.0, 1.0), 5.0)
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let mut store = ParticleStore::default();
        let first = store.insert(dot(1.0)).unwrap();
        let second = store.insert(dot(2.0)).unwrap();
        assert!(second > first);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn ids_are_not_reused_after_clearing() {
        let mut store = ParticleStore::default();
        let before = store.insert(dot(1.0)).unwrap();
        store.clear();
        assert!(store.is_empty());
        let after = store.insert(dot(1.0)).unwrap();
        assert!(after > before);
    }

    #[test]
    fn rejects_invalid_particles() {
        let mut store = ParticleStore::default();
        let result = store.insert(Particle::new(DVec2::ZERO, DVec2::ZERO, -1.0));
        assert!(result.is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn mutation_in_place() {
        let mut store = ParticleStore::default();
        let id = store.insert(dot(1.0)).unwrap();
        store.for_each_mut(|_, particle| {
            particle.position.y += 10.0;
            Visit::Keep
        });
        assert_eq!(store.get(id).unwrap().position.y, 10.0);
    }

    #[test]
    fn removal_during_traversal_visits_everything_once() {
        let mut store = ParticleStore::default();
        for x in 0..100_u8 {
            store.insert(dot(f64::from(x))).unwrap();
        }

        let mut visited = HashSet::new();
        let removed = store.for_each_mut(|id, particle| {
            assert!(visited.insert(id), "visited {id} twice");
            if particle.position.x % 2.0 == 0.0 {
                Visit::Remove
            } else {
                Visit::Keep
            }
        });

        assert_eq!(visited.len(), 100);
        assert_eq!(removed, 50);
        assert_eq!(store.len(), 50);
        for (_, particle) in store.iter() {
            assert_eq!(particle.position.x % 2.0, 1.0);
        }
    }
}
