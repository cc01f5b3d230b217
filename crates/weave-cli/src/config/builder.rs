use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileScreeningConfig, FileToolsConfig};
use super::models::{AppConfig, ToolsConfig};
use crate::cli::AssemblyOverrides;
use crate::error::{CliError, Result};
use crate::utils::parser;
use sseweave::engine::config::{
    self as core_config, AssemblyConfigBuilder, Breadth, CompactnessGate, PruneRule,
};
use sseweave::engine::services::command::ToolCommand;
use std::path::Path;
use std::str::FromStr;

/// Merges the command line, `--set` values, the config file and the defaults, in that
/// order of precedence.
pub fn build_config(overrides: &AssemblyOverrides, output_dir: &Path) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &overrides.config {
        FileConfig::from_file(config_path)?
    } else {
        FileConfig::default()
    };

    let mut file_config = apply_set_values(file_config, &overrides.set_values)?;

    let assembly_file = file_config.assembly.take().unwrap_or_default();
    let iterations = overrides
        .iterations
        .or(assembly_file.iterations)
        .unwrap_or(defaults.iterations);
    let max_nc_dist = overrides
        .max_nc_dist
        .or(assembly_file.max_nc_dist)
        .unwrap_or(defaults.max_nc_dist);

    let (candidate_breadth, seed_group_breadth) = if overrides.explore_all {
        (Breadth::All, Breadth::All)
    } else {
        (
            assembly_file.candidate_breadth.unwrap_or_default(),
            assembly_file.seed_group_breadth.unwrap_or_default(),
        )
    };

    let loops_file = file_config.loops.take().unwrap_or_default();
    let min_loop_length = overrides
        .min_loop_length
        .or(loops_file.min_length)
        .unwrap_or(defaults.min_loop_length);
    let max_loop_length = overrides
        .max_loop_length
        .or(loops_file.max_length)
        .unwrap_or(defaults.max_loop_length);

    let fragment_file = file_config.fragment_search.take().unwrap_or_default();
    let fragment_defaults = core_config::FragmentSearchParams::default();
    let fragment_search = core_config::FragmentSearchParams {
        rmsd_cutoff: fragment_file
            .rmsd_cutoff
            .unwrap_or(fragment_defaults.rmsd_cutoff),
        window: fragment_file.window.unwrap_or(fragment_defaults.window),
        window_rmsd: fragment_file
            .window_rmsd
            .unwrap_or(fragment_defaults.window_rmsd),
        top_n: fragment_file.top.unwrap_or(fragment_defaults.top_n),
        secondary_structure: fragment_file
            .secondary_structure
            .or(fragment_defaults.secondary_structure),
        min_neighbors: fragment_file
            .min_neighbors
            .unwrap_or(fragment_defaults.min_neighbors),
    };

    let loop_defaults = core_config::LoopSearchParams::default();
    let loop_search = core_config::LoopSearchParams {
        rmsd_cutoff: loops_file.rmsd_cutoff.unwrap_or(loop_defaults.rmsd_cutoff),
        top_n: loops_file.top.unwrap_or(loop_defaults.top_n),
    };

    let screening = merge_screening(
        overrides.screen_compactness,
        file_config.screening.take().unwrap_or_default(),
    );

    let mut builder = AssemblyConfigBuilder::new()
        .num_iterations(iterations)
        .max_terminus_distance(max_nc_dist)
        .loop_lengths(min_loop_length, max_loop_length)
        .candidate_breadth(candidate_breadth)
        .seed_group_breadth(seed_group_breadth)
        .prune_rule(assembly_file.prune_rule.unwrap_or_default())
        .fragment_search(fragment_search)
        .loop_search(loop_search)
        .screening(screening);
    if let Some(distance) = assembly_file.adjacency_threshold {
        builder = builder.adjacency_threshold(distance);
    }
    if let Some(distance) = loops_file.overlap_window {
        builder = builder.overlap_window(distance);
    }
    if let Some(fraction) = loops_file.key_residue_fraction {
        builder = builder.key_residue_fraction(fraction);
    }
    if let Some(n) = loops_file.clusters_per_length {
        builder = builder.clusters_per_length(n);
    }
    if let Some(policy) = loops_file.representative {
        builder = builder.representative(policy);
    }
    let core_config = builder
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    let cluster_cutoff = loops_file.cluster_cutoff.unwrap_or(defaults.cluster_cutoff);
    if !(cluster_cutoff > 0.0) {
        return Err(CliError::Config(format!(
            "`loops.cluster-cutoff` must be positive, got {}",
            cluster_cutoff
        )));
    }

    let tools = merge_tools(
        file_config.tools.take().unwrap_or_default(),
        output_dir,
        &defaults,
    )?;

    Ok(AppConfig {
        core_config,
        tools,
        cluster_cutoff,
    })
}

fn merge_screening(
    cli_compactness: bool,
    file_val: FileScreeningConfig,
) -> core_config::ScreeningConfig {
    let defaults = core_config::ScreeningConfig::default();
    let gate_defaults = CompactnessGate::default();
    let compactness = if cli_compactness || file_val.compactness.unwrap_or(false) {
        Some(CompactnessGate {
            pre_loop_min: file_val.pre_loop_min.unwrap_or(gate_defaults.pre_loop_min),
            final_min: file_val.final_min.unwrap_or(gate_defaults.final_min),
        })
    } else {
        None
    };
    core_config::ScreeningConfig {
        clash_distance: file_val.clash_distance.unwrap_or(defaults.clash_distance),
        stitch_min_separation: file_val
            .stitch_min_separation
            .unwrap_or(defaults.stitch_min_separation),
        max_ca_gap: file_val.max_ca_gap.unwrap_or(defaults.max_ca_gap),
        compactness,
    }
}

fn merge_tools(
    file_val: FileToolsConfig,
    output_dir: &Path,
    defaults: &DefaultsConfig,
) -> Result<ToolsConfig> {
    let command = |argv: Option<Vec<String>>, key: &str| -> Result<Option<ToolCommand>> {
        argv.map(|argv| {
            ToolCommand::from_argv(&argv)
                .map_err(|e| CliError::Config(format!("`tools.{}`: {}", key, e)))
        })
        .transpose()
    };
    Ok(ToolsConfig {
        fragment_search: command(file_val.fragment_search, "fragment-search")?,
        loop_search: command(file_val.loop_search, "loop-search")?,
        work_dir: file_val
            .work_dir
            .unwrap_or_else(|| output_dir.join(defaults.work_dir_name)),
    })
}

fn parse_value<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| CliError::Config(format!("Invalid value for {}: '{}' ({})", key, value, e)))
}

fn parse_prune_rule(key: &str, value: &str) -> Result<PruneRule> {
    match value {
        "remaining-budget" => Ok(PruneRule::RemainingBudget),
        "consumed-budget" => Ok(PruneRule::ConsumedBudget),
        _ => Err(CliError::Config(format!(
            "Invalid value for {}: '{}' (expected 'remaining-budget' or 'consumed-budget')",
            key, value
        ))),
    }
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let (key, value) =
            parser::parse_assignment(kv_pair).map_err(|e| CliError::Config(e.to_string()))?;

        match key {
            "assembly.iterations" => {
                config.assembly.get_or_insert_with(Default::default).iterations =
                    Some(parse_value(key, value)?);
            }
            "assembly.max-nc-dist" => {
                config.assembly.get_or_insert_with(Default::default).max_nc_dist =
                    Some(parse_value(key, value)?);
            }
            "assembly.adjacency-threshold" => {
                config
                    .assembly
                    .get_or_insert_with(Default::default)
                    .adjacency_threshold = Some(parse_value(key, value)?);
            }
            "assembly.candidate-breadth" => {
                config
                    .assembly
                    .get_or_insert_with(Default::default)
                    .candidate_breadth = Some(parse_value(key, value)?);
            }
            "assembly.seed-group-breadth" => {
                config
                    .assembly
                    .get_or_insert_with(Default::default)
                    .seed_group_breadth = Some(parse_value(key, value)?);
            }
            "assembly.prune-rule" => {
                config.assembly.get_or_insert_with(Default::default).prune_rule =
                    Some(parse_prune_rule(key, value)?);
            }
            "fragment-search.rmsd-cutoff" => {
                config
                    .fragment_search
                    .get_or_insert_with(Default::default)
                    .rmsd_cutoff = Some(parse_value(key, value)?);
            }
            "fragment-search.window" => {
                config.fragment_search.get_or_insert_with(Default::default).window =
                    Some(parse_value(key, value)?);
            }
            "fragment-search.window-rmsd" => {
                config
                    .fragment_search
                    .get_or_insert_with(Default::default)
                    .window_rmsd = Some(parse_value(key, value)?);
            }
            "fragment-search.top" => {
                config.fragment_search.get_or_insert_with(Default::default).top =
                    Some(parse_value(key, value)?);
            }
            "fragment-search.secondary-structure" => {
                config
                    .fragment_search
                    .get_or_insert_with(Default::default)
                    .secondary_structure = Some(value.to_string());
            }
            "fragment-search.min-neighbors" => {
                config
                    .fragment_search
                    .get_or_insert_with(Default::default)
                    .min_neighbors = Some(parse_value(key, value)?);
            }
            "loops.min-length" => {
                config.loops.get_or_insert_with(Default::default).min_length =
                    Some(parse_value(key, value)?);
            }
            "loops.max-length" => {
                config.loops.get_or_insert_with(Default::default).max_length =
                    Some(parse_value(key, value)?);
            }
            "loops.rmsd-cutoff" => {
                config.loops.get_or_insert_with(Default::default).rmsd_cutoff =
                    Some(parse_value(key, value)?);
            }
            "loops.top" => {
                config.loops.get_or_insert_with(Default::default).top =
                    Some(parse_value(key, value)?);
            }
            "loops.overlap-window" => {
                config.loops.get_or_insert_with(Default::default).overlap_window =
                    Some(parse_value(key, value)?);
            }
            "loops.key-residue-fraction" => {
                config
                    .loops
                    .get_or_insert_with(Default::default)
                    .key_residue_fraction = Some(parse_value(key, value)?);
            }
            "loops.clusters-per-length" => {
                config
                    .loops
                    .get_or_insert_with(Default::default)
                    .clusters_per_length = Some(parse_value(key, value)?);
            }
            "loops.representative" => {
                config.loops.get_or_insert_with(Default::default).representative =
                    Some(parse_value(key, value)?);
            }
            "loops.cluster-cutoff" => {
                config.loops.get_or_insert_with(Default::default).cluster_cutoff =
                    Some(parse_value(key, value)?);
            }
            "screening.clash-distance" => {
                config
                    .screening
                    .get_or_insert_with(Default::default)
                    .clash_distance = Some(parse_value(key, value)?);
            }
            "screening.stitch-min-separation" => {
                config
                    .screening
                    .get_or_insert_with(Default::default)
                    .stitch_min_separation = Some(parse_value(key, value)?);
            }
            "screening.max-ca-gap" => {
                config.screening.get_or_insert_with(Default::default).max_ca_gap =
                    Some(parse_value(key, value)?);
            }
            "screening.compactness" => {
                config.screening.get_or_insert_with(Default::default).compactness =
                    Some(parse_value(key, value)?);
            }
            "screening.pre-loop-min" => {
                config.screening.get_or_insert_with(Default::default).pre_loop_min =
                    Some(parse_value(key, value)?);
            }
            "screening.final-min" => {
                config.screening.get_or_insert_with(Default::default).final_min =
                    Some(parse_value(key, value)?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sseweave::engine::config::RepresentativePolicy;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn overrides() -> AssemblyOverrides {
        AssemblyOverrides::default()
    }

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("weave.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn defaults_apply_without_file_or_flags() {
        let app = build_config(&overrides(), Path::new("out")).unwrap();
        let cfg = app.core_config;
        let defaults = DefaultsConfig::default();

        assert_eq!(cfg.num_iterations, defaults.iterations);
        assert_eq!(cfg.max_terminus_distance, defaults.max_nc_dist);
        assert_eq!(
            cfg.loops.lengths,
            defaults.min_loop_length..=defaults.max_loop_length
        );
        assert_eq!(cfg.candidate_breadth, Breadth::First);
        assert_eq!(cfg.seed_group_breadth, Breadth::First);
        assert_eq!(cfg.adjacency_threshold, 5.0);
        assert_eq!(cfg.fragment_search, core_config::FragmentSearchParams::default());
        assert_eq!(cfg.loops.search.top_n, 200);
        assert!(cfg.screening.compactness.is_none());
        assert_eq!(app.cluster_cutoff, defaults.cluster_cutoff);
        assert!(app.tools.fragment_search.is_none());
        assert_eq!(app.tools.work_dir, PathBuf::from("out").join("work"));
    }

    #[test]
    fn file_values_are_merged() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            r#"
                [assembly]
                iterations = 5
                adjacency-threshold = 6.0
                prune-rule = "consumed-budget"

                [fragment-search]
                top = 25
                secondary-structure = "E"

                [loops]
                min-length = 2
                max-length = 7
                top = 50
                representative = "centroid"
                cluster-cutoff = 0.5

                [screening]
                compactness = true
                final-min = 0.2

                [tools]
                fragment-search = ["search-tool", "{query}"]
                loop-search = ["loop-tool", "{query}", "{length}"]
                work-dir = "/tmp/weave-work"
            "#,
        );
        let mut args = overrides();
        args.config = Some(path);

        let app = build_config(&args, Path::new("out")).unwrap();
        let cfg = app.core_config;
        assert_eq!(cfg.num_iterations, 5);
        assert_eq!(cfg.adjacency_threshold, 6.0);
        assert_eq!(cfg.prune_rule, PruneRule::ConsumedBudget);
        assert_eq!(cfg.fragment_search.top_n, 25);
        assert_eq!(cfg.fragment_search.secondary_structure.as_deref(), Some("E"));
        assert_eq!(cfg.loops.lengths, 2..=7);
        assert_eq!(cfg.loops.search.top_n, 50);
        assert_eq!(cfg.loops.representative, RepresentativePolicy::Centroid);
        assert_eq!(
            cfg.screening.compactness,
            Some(CompactnessGate {
                pre_loop_min: 0.1,
                final_min: 0.2
            })
        );
        assert_eq!(app.cluster_cutoff, 0.5);
        assert_eq!(
            app.tools.fragment_search.as_ref().map(ToolCommand::program),
            Some("search-tool")
        );
        assert_eq!(app.tools.work_dir, PathBuf::from("/tmp/weave-work"));
    }

    #[test]
    fn cli_beats_set_beats_file() {
        let dir = tempdir().unwrap();
        let path = write_config(
            dir.path(),
            "[assembly]\niterations = 5\nmax-nc-dist = 11.0\n[loops]\nmax-length = 9\n",
        );
        let mut args = overrides();
        args.config = Some(path);
        args.iterations = Some(2);
        args.set_values = vec![
            "assembly.iterations=4".to_string(),
            "assembly.max-nc-dist=12.5".to_string(),
        ];

        let cfg = build_config(&args, Path::new("out")).unwrap().core_config;
        assert_eq!(cfg.num_iterations, 2);
        assert_eq!(cfg.max_terminus_distance, 12.5);
        assert_eq!(cfg.loops.lengths, 3..=9);
    }

    #[test]
    fn flags_enable_full_exploration_and_compactness() {
        let mut args = overrides();
        args.explore_all = true;
        args.screen_compactness = true;
        args.set_values = vec!["assembly.candidate-breadth=2".to_string()];

        let cfg = build_config(&args, Path::new("out")).unwrap().core_config;
        assert_eq!(cfg.candidate_breadth, Breadth::All);
        assert_eq!(cfg.seed_group_breadth, Breadth::All);
        assert_eq!(cfg.screening.compactness, Some(CompactnessGate::default()));
    }

    #[test]
    fn set_values_cover_typed_fields() {
        let mut args = overrides();
        args.set_values = vec![
            "assembly.seed-group-breadth=3".to_string(),
            "assembly.prune-rule=consumed-budget".to_string(),
            "loops.representative=lowest-rmsd".to_string(),
            "screening.clash-distance=3.0".to_string(),
            "fragment-search.secondary-structure=HEH".to_string(),
        ];
        let cfg = build_config(&args, Path::new("out")).unwrap().core_config;
        assert_eq!(cfg.seed_group_breadth, Breadth::Top(3));
        assert_eq!(cfg.prune_rule, PruneRule::ConsumedBudget);
        assert_eq!(cfg.loops.representative, RepresentativePolicy::LowestRmsd);
        assert_eq!(cfg.screening.clash_distance, 3.0);
        assert_eq!(
            cfg.fragment_search.secondary_structure.as_deref(),
            Some("HEH")
        );
    }

    #[test]
    fn malformed_set_values_are_rejected() {
        for bad in ["loops.top", "loops.top=many", "nothing.here=1", "assembly.prune-rule=x"] {
            let mut args = overrides();
            args.set_values = vec![bad.to_string()];
            assert!(
                matches!(build_config(&args, Path::new("out")), Err(CliError::Config(_))),
                "accepted {}",
                bad
            );
        }
    }

    #[test]
    fn inconsistent_values_surface_as_config_errors() {
        let mut args = overrides();
        args.min_loop_length = Some(8);
        args.max_loop_length = Some(4);
        assert!(matches!(
            build_config(&args, Path::new("out")),
            Err(CliError::Config(_))
        ));

        let mut args = overrides();
        args.iterations = Some(0);
        assert!(matches!(
            build_config(&args, Path::new("out")),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn empty_tool_command_is_rejected() {
        let dir = tempdir().unwrap();
        let path = write_config(dir.path(), "[tools]\nloop-search = []\n");
        let mut args = overrides();
        args.config = Some(path);
        assert!(matches!(
            build_config(&args, Path::new("out")),
            Err(CliError::Config(_))
        ));
    }
}
