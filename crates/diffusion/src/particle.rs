//! In-flight particles, neighbourhood classification, and the particle
//! pool.

use surface_synth_core::{EngineError, HeightField};

/// Bit offset of the upward direction in the neighbour mask.
pub const NEIGH_UP: u8 = 0;
/// Bit offset of the leftward direction.
pub const NEIGH_LEFT: u8 = 1;
/// Bit offset of the rightward direction.
pub const NEIGH_RIGHT: u8 = 2;
/// Bit offset of the downward direction.
pub const NEIGH_DOWN: u8 = 3;
/// Offset added to a direction bit to address its Schwoebel-barrier bit.
pub const NEIGH_SCHWOEBEL: u8 = 4;

/// One mobile particle on the lattice.
///
/// The model permits a mobile particle on top of another; which is which
/// is not tracked and the particle being processed is always assumed to
/// be the top one. This gives such stacks a mobility boost that breaks
/// them up quickly, so no representation of vertical neighbour relations
/// is needed.
#[derive(Debug, Clone)]
pub struct Particle {
    pub col: usize,
    pub row: usize,
    /// Flat index of the particle's site.
    pub k: usize,
    /// Cached flat indices of the four cardinal neighbours, in
    /// up/left/right/down order.
    pub nb: [usize; 4],
    /// Occupancy bits 0..=3, Schwoebel bits 4..=7.
    pub neighbours: u8,
    /// Occupancy popcount, 0..=4.
    pub nneigh: usize,
}

impl Particle {
    /// Creates a particle at `(col, row)` with cached neighbour indices
    /// and an unclassified neighbourhood.
    pub fn at(field: &HeightField, col: usize, row: usize) -> Self {
        let k = row * field.width() + col;
        Self {
            col,
            row,
            k,
            nb: field.neighbour_indices(k),
            neighbours: 0,
            nneigh: 0,
        }
    }

    /// Classifies the particle's neighbourhood against `heights`.
    ///
    /// A direction's occupancy bit is set when the neighbour is at least
    /// as high as the particle's site; `nneigh` counts the set bits. With
    /// `use_schwoebel`, a direction's Schwoebel bit is set when the
    /// neighbour lies more than one unit below the site, marking a
    /// migration path that crosses a step-down barrier. Without it,
    /// Schwoebel bits are never set.
    pub fn update_neighbours(&mut self, heights: &[f64], use_schwoebel: bool) {
        let h = heights[self.k];
        let mut mask = 0_u8;
        let mut count = 0_usize;
        for (dir, &nk) in self.nb.iter().enumerate() {
            if heights[nk] >= h {
                mask |= 1 << dir;
                count += 1;
            }
        }
        if use_schwoebel {
            for (dir, &nk) in self.nb.iter().enumerate() {
                if heights[nk] + 1.0 < h {
                    mask |= 1 << (dir as u8 + NEIGH_SCHWOEBEL);
                }
            }
        }
        self.neighbours = mask;
        self.nneigh = count;
    }

    /// Moves the particle one site in `direction` with periodic wrapping
    /// and refreshes the cached indices. Does not touch any height.
    pub fn advance(&mut self, field: &HeightField, direction: u8) {
        match direction {
            NEIGH_UP => {
                self.row = if self.row > 0 {
                    self.row - 1
                } else {
                    field.height() - 1
                };
            }
            NEIGH_LEFT => {
                self.col = if self.col > 0 {
                    self.col - 1
                } else {
                    field.width() - 1
                };
            }
            NEIGH_RIGHT => {
                self.col = if self.col + 1 < field.width() {
                    self.col + 1
                } else {
                    0
                };
            }
            _ => {
                self.row = if self.row + 1 < field.height() {
                    self.row + 1
                } else {
                    0
                };
            }
        }
        self.k = self.row * field.width() + self.col;
        self.nb = field.neighbour_indices(self.k);
    }
}

/// Contiguous arena of in-flight particles with O(1) removal.
///
/// Removal swaps the last element into the hole and shrinks by one, so
/// order is not preserved and a loop that removes at index `i` must test
/// `i` again before advancing.
#[derive(Debug)]
pub struct ParticlePool {
    particles: Vec<Particle>,
}

impl ParticlePool {
    /// Creates an empty pool with a checked initial reservation.
    pub fn with_capacity(capacity: usize) -> Result<Self, EngineError> {
        let mut particles = Vec::new();
        particles
            .try_reserve(capacity)
            .map_err(|_| EngineError::Allocation { cells: capacity })?;
        Ok(Self { particles })
    }

    /// Number of particles currently in flight.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// True when no particle is in flight.
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Appends a particle.
    pub fn push(&mut self, particle: Particle) {
        self.particles.push(particle);
    }

    /// Removes the particle at `i` by swapping the last one into its slot.
    pub fn swap_remove(&mut self, i: usize) -> Particle {
        self.particles.swap_remove(i)
    }

    /// Shared access to the particle at `i`.
    pub fn get(&self, i: usize) -> &Particle {
        &self.particles[i]
    }

    /// Mutable access to the particle at `i`.
    pub fn get_mut(&mut self, i: usize) -> &mut Particle {
        &mut self.particles[i]
    }

    /// Drops all particles, keeping the allocation.
    pub fn clear(&mut self) {
        self.particles.clear();
    }

    /// Iterates over the in-flight particles in pool order.
    pub fn iter(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_field(w: usize, h: usize) -> HeightField {
        HeightField::new(w, h).unwrap()
    }

    // -- Particle construction --

    #[test]
    fn at_caches_site_and_neighbour_indices() {
        let field = flat_field(5, 4);
        let p = Particle::at(&field, 2, 1);
        assert_eq!(p.k, 7);
        assert_eq!(p.nb, field.neighbour_indices(7));
        assert_eq!(p.nneigh, 0);
        assert_eq!(p.neighbours, 0);
    }

    // -- Classification --

    #[test]
    fn update_neighbours_counts_occupied_directions() {
        let mut field = flat_field(3, 3);
        // Particle at (1, 1) raised to height 1; left and down neighbours
        // raised to 1 and 2.
        field.set(1, 1, 1.0);
        field.set(0, 1, 1.0);
        field.set(1, 2, 2.0);
        let mut p = Particle::at(&field, 1, 1);
        p.update_neighbours(field.data(), false);
        assert_eq!(p.nneigh, 2);
        assert_eq!(
            p.neighbours,
            (1 << NEIGH_LEFT) | (1 << NEIGH_DOWN),
            "only left and down are at least as high"
        );
    }

    #[test]
    fn equal_height_counts_as_occupied() {
        let mut field = flat_field(3, 3);
        field.set(1, 1, 2.0);
        field.set(2, 1, 2.0);
        let mut p = Particle::at(&field, 1, 1);
        p.update_neighbours(field.data(), false);
        assert_eq!(p.nneigh, 1);
        assert_eq!(p.neighbours, 1 << NEIGH_RIGHT);
    }

    #[test]
    fn flat_surface_particle_on_top_has_no_neighbours() {
        let mut field = flat_field(4, 4);
        // A lone deposited particle sits one unit above a flat surface.
        field.set(2, 2, 1.0);
        let mut p = Particle::at(&field, 2, 2);
        p.update_neighbours(field.data(), false);
        assert_eq!(p.nneigh, 0);
        assert_eq!(p.neighbours, 0);
    }

    #[test]
    fn schwoebel_bit_set_for_step_down_of_more_than_one() {
        let mut field = flat_field(3, 3);
        field.set(1, 1, 3.0);
        field.set(2, 1, 1.0); // step-down of 2 to the right
        field.set(0, 1, 2.0); // step-down of exactly 1 to the left
        let mut p = Particle::at(&field, 1, 1);
        p.update_neighbours(field.data(), true);
        assert_ne!(p.neighbours & (1 << (NEIGH_RIGHT + NEIGH_SCHWOEBEL)), 0);
        assert_eq!(
            p.neighbours & (1 << (NEIGH_LEFT + NEIGH_SCHWOEBEL)),
            0,
            "a one-unit step is not a Schwoebel barrier"
        );
        // The step-down sites are below the particle, so not occupied.
        assert_eq!(p.nneigh, 0);
    }

    #[test]
    fn schwoebel_bits_never_set_when_disabled() {
        // Steep steps in every direction; without Schwoebel mode the high
        // nibble must stay clear regardless of lattice contents.
        let mut field = flat_field(3, 3);
        field.set(1, 1, 10.0);
        let mut p = Particle::at(&field, 1, 1);
        p.update_neighbours(field.data(), false);
        assert_eq!(p.neighbours & 0xF0, 0);
        assert_eq!(p.nneigh, 0);
    }

    #[test]
    fn classification_wraps_around_edges() {
        let mut field = flat_field(4, 4);
        field.set(0, 0, 1.0);
        field.set(3, 0, 1.0); // left neighbour of (0, 0) via wraparound
        let mut p = Particle::at(&field, 0, 0);
        p.update_neighbours(field.data(), false);
        assert_eq!(p.nneigh, 1);
        assert_eq!(p.neighbours, 1 << NEIGH_LEFT);
    }

    // -- Movement --

    #[test]
    fn advance_moves_one_site_in_each_direction() {
        let field = flat_field(5, 5);
        let mut p = Particle::at(&field, 2, 2);
        p.advance(&field, NEIGH_UP);
        assert_eq!((p.col, p.row), (2, 1));
        p.advance(&field, NEIGH_LEFT);
        assert_eq!((p.col, p.row), (1, 1));
        p.advance(&field, NEIGH_RIGHT);
        assert_eq!((p.col, p.row), (2, 1));
        p.advance(&field, NEIGH_DOWN);
        assert_eq!((p.col, p.row), (2, 2));
        assert_eq!(p.k, 12);
    }

    #[test]
    fn advance_wraps_on_all_four_edges() {
        let field = flat_field(4, 3);
        let mut p = Particle::at(&field, 3, 1);
        p.advance(&field, NEIGH_RIGHT);
        assert_eq!((p.col, p.row), (0, 1), "rightward wrap to column 0");

        let mut p = Particle::at(&field, 0, 1);
        p.advance(&field, NEIGH_LEFT);
        assert_eq!((p.col, p.row), (3, 1), "leftward wrap to last column");

        let mut p = Particle::at(&field, 1, 0);
        p.advance(&field, NEIGH_UP);
        assert_eq!((p.col, p.row), (1, 2), "upward wrap to last row");

        let mut p = Particle::at(&field, 1, 2);
        p.advance(&field, NEIGH_DOWN);
        assert_eq!((p.col, p.row), (1, 0), "downward wrap to row 0");
    }

    #[test]
    fn advance_refreshes_cached_indices() {
        let field = flat_field(4, 4);
        let mut p = Particle::at(&field, 3, 3);
        p.advance(&field, NEIGH_RIGHT);
        assert_eq!(p.k, 3 * 4);
        assert_eq!(p.nb, field.neighbour_indices(p.k));
    }

    // -- ParticlePool --

    #[test]
    fn pool_push_and_len() {
        let field = flat_field(4, 4);
        let mut pool = ParticlePool::with_capacity(8).unwrap();
        assert!(pool.is_empty());
        pool.push(Particle::at(&field, 0, 0));
        pool.push(Particle::at(&field, 1, 0));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn swap_remove_moves_last_into_hole() {
        let field = flat_field(4, 4);
        let mut pool = ParticlePool::with_capacity(4).unwrap();
        for col in 0..4 {
            pool.push(Particle::at(&field, col, 0));
        }
        let removed = pool.swap_remove(1);
        assert_eq!(removed.col, 1);
        assert_eq!(pool.len(), 3);
        // The former last element now sits at index 1.
        assert_eq!(pool.get(1).col, 3);
        assert_eq!(pool.get(0).col, 0);
        assert_eq!(pool.get(2).col, 2);
    }

    #[test]
    fn removal_loop_discipline_visits_every_particle_once() {
        // Remove even columns while iterating; the index must be retested
        // after a removal or the swapped-in particle is skipped.
        let field = flat_field(8, 1);
        let mut pool = ParticlePool::with_capacity(8).unwrap();
        for col in 0..8 {
            pool.push(Particle::at(&field, col, 0));
        }
        let mut visited = Vec::new();
        let mut i = 0;
        while i < pool.len() {
            let col = pool.get(i).col;
            visited.push(col);
            if col % 2 == 0 {
                pool.swap_remove(i);
            } else {
                i += 1;
            }
        }
        visited.sort_unstable();
        assert_eq!(visited, (0..8).collect::<Vec<_>>());
        let mut remaining: Vec<usize> = pool.iter().map(|p| p.col).collect();
        remaining.sort_unstable();
        assert_eq!(remaining, vec![1, 3, 5, 7]);
    }

    #[test]
    fn clear_empties_the_pool() {
        let field = flat_field(4, 4);
        let mut pool = ParticlePool::with_capacity(4).unwrap();
        pool.push(Particle::at(&field, 0, 0));
        pool.clear();
        assert!(pool.is_empty());
    }
}
