//! Quality scaling under power saving

/// Static inputs of the policy.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PowerPolicy {
    pub base_capacity: usize,
    /// Per-tick spawn chance at full quality.
    pub base_spawn_rate: f32,
    pub normal_interval_ms: u32,
    pub low_power_interval_ms: u32,
    /// First reduction applied to the spawn rate while power saving.
    pub spawn_reduction: f32,
    /// Second reduction, compounded with the first.
    pub extra_spawn_reduction: f32,
    /// Fewest particles updated and drawn while power saving.
    pub min_particle_subset: usize,
    /// Fewest trees drawn while power saving.
    pub min_tree_subset: usize,
}

impl Default for PowerPolicy {
    fn default() -> Self {
        Self {
            base_capacity: 200,
            base_spawn_rate: 0.1,
            normal_interval_ms: 16,
            low_power_interval_ms: 50,
            spawn_reduction: 0.5,
            extra_spawn_reduction: 0.3,
            min_particle_subset: 10,
            min_tree_subset: 1,
        }
    }
}

/// Effective quality for one tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Quality {
    pub power_save: bool,
    pub capacity: usize,
    pub tree_count: usize,
    pub spawn_probability: f32,
    pub frame_interval_ms: u32,
    min_particle_subset: usize,
    min_tree_subset: usize,
}

impl Quality {
    /// How many of `len` particles get updated and drawn.
    pub fn particle_subset(&self, len: usize) -> usize {
        if self.power_save {
            subset_len(len, self.min_particle_subset)
        } else {
            len
        }
    }

    /// How many of `len` trees get drawn.
    pub fn tree_subset(&self, len: usize) -> usize {
        if self.power_save {
            subset_len(len, self.min_tree_subset)
        } else {
            len
        }
    }
}

impl PowerPolicy {
    pub fn evaluate(&self, power_save: bool, adaptive_frame_rate: bool, tree_count: usize) -> Quality {
        let (capacity, tree_count, spawn_probability) = if power_save {
            (
                self.base_capacity / 2,
                (tree_count / 2).max(1),
                self.base_spawn_rate * self.spawn_reduction * self.extra_spawn_reduction,
            )
        } else {
            (self.base_capacity, tree_count, self.base_spawn_rate)
        };

        let frame_interval_ms = if adaptive_frame_rate && power_save {
            self.low_power_interval_ms
        } else {
            self.normal_interval_ms
        };

        Quality {
            power_save,
            capacity,
            tree_count,
            spawn_probability,
            frame_interval_ms,
            min_particle_subset: self.min_particle_subset,
            min_tree_subset: self.min_tree_subset,
        }
    }
}

/// Half of `len`, at least `min`, never more than `len`.
pub fn subset_len(len: usize, min: usize) -> usize {
    (len / 2).max(min).min(len)
}
