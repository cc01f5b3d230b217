use sseweave::engine::services::clustering::DEFAULT_CLUSTER_CUTOFF;

/// Values used when neither the command line nor the config file sets them.
///
/// Everything not listed here falls back to the library defaults.
pub struct DefaultsConfig {
    pub iterations: usize,
    pub max_nc_dist: f64,
    pub min_loop_length: usize,
    pub max_loop_length: usize,
    pub cluster_cutoff: f64,
    pub work_dir_name: &'static str,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            iterations: 3,
            max_nc_dist: 15.0,
            min_loop_length: 3,
            max_loop_length: 20,
            cluster_cutoff: DEFAULT_CLUSTER_CUTOFF,
            work_dir_name: "work",
        }
    }
}
