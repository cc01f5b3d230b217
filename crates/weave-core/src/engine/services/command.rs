use crate::core::io::pdb::{PdbError, PdbFile};
use crate::core::io::source::{StructureSource, read_structure};
use crate::core::io::traits::StructureFile;
use crate::core::models::structure::Structure;
use crate::engine::search::{
    FragmentHit, FragmentQuery, FragmentSearch, LoopQuery, LoopSearch, RawLoop, SearchOutcome,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, trace};

/// Name of the optional score file a search tool may write next to its results.
pub const SCORE_FILE: &str = "match.txt";

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool command line is empty")]
    EmptyCommand,
    #[error("Failed to launch '{program}': {source}")]
    Launch {
        program: String,
        source: std::io::Error,
    },
    #[error("'{program}' exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: String,
        stderr: String,
    },
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Structure error for '{path}': {source}")]
    Structure { path: String, source: PdbError },
    #[error("Score file parsing error for '{path}': {source}")]
    Scores { path: String, source: csv::Error },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ToolError + '_ {
    move |source| ToolError::Io {
        path: path.to_string_lossy().to_string(),
        source,
    }
}

fn structure_error(path: &Path) -> impl FnOnce(PdbError) -> ToolError + '_ {
    move |source| ToolError::Structure {
        path: path.to_string_lossy().to_string(),
        source,
    }
}

/// An external program and its argument template.
///
/// Arguments may contain `{name}` placeholders that are replaced per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
}

impl ToolCommand {
    /// Builds a command from an argument vector whose first element is the program.
    pub fn from_argv(argv: &[String]) -> Result<Self, ToolError> {
        let (program, args) = argv.split_first().ok_or(ToolError::EmptyCommand)?;
        if program.trim().is_empty() {
            return Err(ToolError::EmptyCommand);
        }
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// The argument list with every known placeholder substituted.
    pub fn render(&self, vars: &[(&str, String)]) -> Vec<String> {
        self.args.iter().map(|arg| substitute(arg, vars)).collect()
    }

    fn run(&self, vars: &[(&str, String)], workdir: &Path) -> Result<(), ToolError> {
        let args = self.render(vars);
        debug!(program = %self.program, ?args, "Running external tool");
        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(workdir)
            .output()
            .map_err(|source| ToolError::Launch {
                program: self.program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(ToolError::Exit {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        trace!(stdout = %String::from_utf8_lossy(&output.stdout), "Tool finished");
        Ok(())
    }
}

/// Replaces each `{name}` in `template` by its value. Unknown placeholders are kept.
pub fn substitute(template: &str, vars: &[(&str, String)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{}}}", name), value)
    })
}

/// Per-call scratch directories below one root.
#[derive(Debug)]
struct Workspace {
    root: PathBuf,
    calls: usize,
}

impl Workspace {
    fn new(root: PathBuf) -> Self {
        Self { root, calls: 0 }
    }

    fn next_dir(&mut self, prefix: &str) -> Result<PathBuf, ToolError> {
        self.calls += 1;
        let dir = self.root.join(format!("{}_{:04}", prefix, self.calls));
        let out = dir.join("out");
        fs::create_dir_all(&out).map_err(io_error(&out))?;
        Ok(dir)
    }
}

fn write_pdb(path: &Path, structure: &Structure) -> Result<(), ToolError> {
    PdbFile::write_structure_to_path(structure, path).map_err(structure_error(path))
}

/// Result structures written by a tool, ordered by file name.
fn result_files(outdir: &Path) -> Result<Vec<PathBuf>, ToolError> {
    let mut files: Vec<PathBuf> = fs::read_dir(outdir)
        .map_err(io_error(outdir))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(".pdb") || name.ends_with(".pdb.gz"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Scores from the first whitespace-separated column of the score file, one per line.
///
/// A missing file yields no scores; unparsable values become `None`.
pub fn read_scores(path: &Path) -> Result<Vec<Option<f64>>, ToolError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path).map_err(io_error(path))?;
    let normalized: String = content
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .flexible(true)
        .from_reader(normalized.as_bytes());
    let mut scores = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| ToolError::Scores {
            path: path.to_string_lossy().to_string(),
            source,
        })?;
        scores.push(record.get(0).and_then(|value| value.parse::<f64>().ok()));
    }
    Ok(scores)
}

fn label_of(path: &Path) -> String {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("<unnamed>");
    name.trim_end_matches(".gz").trim_end_matches(".pdb").to_string()
}

/// Fragment search backed by an external program.
///
/// Placeholders: `{query}`, `{exclusion}`, `{outdir}`, `{rmsd}`, `{window}`,
/// `{window_rmsd}`, `{top}`, `{min_neighbors}`, `{ss}` and `{first}` (`1` on the
/// first extension of a run, else `0`).
#[derive(Debug)]
pub struct CommandFragmentSearch {
    command: ToolCommand,
    workspace: Workspace,
}

impl CommandFragmentSearch {
    pub fn new(command: ToolCommand, work_root: impl Into<PathBuf>) -> Self {
        Self {
            command,
            workspace: Workspace::new(work_root.into()),
        }
    }

    fn try_search(&mut self, query: &FragmentQuery<'_>) -> Result<Vec<FragmentHit>, ToolError> {
        let dir = self.workspace.next_dir("fragments")?;
        let outdir = dir.join("out");
        let query_path = dir.join("query.pdb");
        let exclusion_path = dir.join("exclusion.pdb");
        write_pdb(&query_path, query.structure)?;
        write_pdb(&exclusion_path, query.exclusion)?;

        let params = query.params;
        let vars = [
            ("query", query_path.to_string_lossy().to_string()),
            ("exclusion", exclusion_path.to_string_lossy().to_string()),
            ("outdir", outdir.to_string_lossy().to_string()),
            ("rmsd", params.rmsd_cutoff.to_string()),
            ("window", params.window.to_string()),
            ("window_rmsd", params.window_rmsd.to_string()),
            ("top", params.top_n.to_string()),
            ("min_neighbors", params.min_neighbors.to_string()),
            ("ss", params.secondary_structure.clone().unwrap_or_default()),
            ("first", if query.first_extension { "1" } else { "0" }.to_string()),
        ];
        self.command.run(&vars, &dir)?;

        let scores = read_scores(&outdir.join(SCORE_FILE))?;
        result_files(&outdir)?
            .into_iter()
            .enumerate()
            .map(|(i, path)| {
                let structure = read_structure(&path).map_err(structure_error(&path))?;
                Ok(FragmentHit {
                    label: label_of(&path),
                    structure,
                    rmsd: scores.get(i).copied().flatten(),
                })
            })
            .collect()
    }
}

impl FragmentSearch for CommandFragmentSearch {
    fn search(&mut self, query: &FragmentQuery<'_>) -> SearchOutcome<FragmentHit> {
        match self.try_search(query) {
            Ok(hits) => SearchOutcome::from_hits(hits),
            Err(e) => SearchOutcome::failed(e),
        }
    }
}

/// Loop search backed by an external program.
///
/// Placeholders: `{query}`, `{outdir}`, `{rmsd}`, `{top}`, `{length}`, `{head}` and
/// `{tail}` (overlap residue counts).
#[derive(Debug)]
pub struct CommandLoopSearch {
    command: ToolCommand,
    workspace: Workspace,
}

impl CommandLoopSearch {
    pub fn new(command: ToolCommand, work_root: impl Into<PathBuf>) -> Self {
        Self {
            command,
            workspace: Workspace::new(work_root.into()),
        }
    }

    fn try_search(&mut self, query: &LoopQuery<'_>) -> Result<Vec<RawLoop>, ToolError> {
        let dir = self.workspace.next_dir(&format!("loops_len{}", query.length))?;
        let outdir = dir.join("out");
        let query_path = dir.join("query.pdb");
        write_pdb(&query_path, query.structure)?;

        let vars = [
            ("query", query_path.to_string_lossy().to_string()),
            ("outdir", outdir.to_string_lossy().to_string()),
            ("rmsd", query.params.rmsd_cutoff.to_string()),
            ("top", query.params.top_n.to_string()),
            ("length", query.length.to_string()),
            ("head", query.overlaps.0.to_string()),
            ("tail", query.overlaps.1.to_string()),
        ];
        self.command.run(&vars, &dir)?;

        let scores = read_scores(&outdir.join(SCORE_FILE))?;
        result_files(&outdir)?
            .into_iter()
            .enumerate()
            .map(|(i, path)| {
                let structure = read_structure(&path).map_err(structure_error(&path))?;
                Ok(RawLoop {
                    sequence: structure.sequence(),
                    source: StructureSource::from(structure),
                    rmsd: scores.get(i).copied().flatten(),
                })
            })
            .collect()
    }
}

impl LoopSearch for CommandLoopSearch {
    fn search(&mut self, query: &LoopQuery<'_>) -> SearchOutcome<RawLoop> {
        match self.try_search(query) {
            Ok(loops) => SearchOutcome::from_hits(loops),
            Err(e) => SearchOutcome::failed(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::pdb::to_pdb_string;
    use crate::engine::config::{FragmentSearchParams, LoopSearchParams};
    use crate::engine::search::EmptyReason;
    use crate::engine::testing::line_segment;
    use tempfile::tempdir;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn placeholders_are_substituted() {
        let command = ToolCommand::from_argv(&argv(&["tool", "--in={query}", "{top}", "{unknown}"]))
            .unwrap();
        let rendered = command.render(&[("query", "q.pdb".to_string()), ("top", "5".to_string())]);
        assert_eq!(rendered, vec!["--in=q.pdb", "5", "{unknown}"]);
        assert_eq!(command.program(), "tool");
    }

    #[test]
    fn empty_command_is_rejected() {
        assert!(matches!(ToolCommand::from_argv(&[]), Err(ToolError::EmptyCommand)));
        assert!(matches!(
            ToolCommand::from_argv(&argv(&["  "])),
            Err(ToolError::EmptyCommand)
        ));
    }

    #[test]
    fn scores_come_from_the_first_column() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(SCORE_FILE);
        fs::write(&path, "  0.512  /db/a.pdb [1,2]\n1.25 /db/b.pdb\n\nn/a c\n").unwrap();
        let scores = read_scores(&path).unwrap();
        assert_eq!(scores, vec![Some(0.512), Some(1.25), None]);
        assert!(read_scores(&dir.path().join("missing.txt")).unwrap().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn fragment_search_collects_sorted_results_with_scores() {
        let dir = tempdir().unwrap();
        // The "tool" copies the query into two result files and writes scores.
        let script = format!(
            "cp {{query}} {{outdir}}/b_hit.pdb && cp {{query}} {{outdir}}/a_hit.pdb && \
             printf '0.4 a\\n0.9 b\\n' > {{outdir}}/{}",
            SCORE_FILE
        );
        let command = ToolCommand::from_argv(&argv(&["sh", "-c", &script])).unwrap();
        let mut search = CommandFragmentSearch::new(command, dir.path());

        let structure = line_segment(0, 3, "ALA");
        let params = FragmentSearchParams::default();
        let query = FragmentQuery {
            structure: &structure,
            exclusion: &structure,
            params: &params,
            first_extension: true,
        };
        let outcome = search.search(&query);
        let hits = outcome.hits();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].label, "a_hit");
        assert_eq!(hits[0].rmsd, Some(0.4));
        assert_eq!(hits[1].label, "b_hit");
        assert_eq!(hits[1].structure.residue_count(), 3);
        assert!(dir.path().join("fragments_0001").join("exclusion.pdb").exists());
    }

    #[cfg(unix)]
    #[test]
    fn failing_tool_is_reported_as_empty() {
        let dir = tempdir().unwrap();
        let command = ToolCommand::from_argv(&argv(&["sh", "-c", "echo broken >&2; exit 3"])).unwrap();
        let mut search = CommandLoopSearch::new(command, dir.path());
        let structure = line_segment(0, 2, "ALA");
        let params = LoopSearchParams::default();
        let query = LoopQuery {
            structure: &structure,
            length: 4,
            overlaps: (1, 1),
            params: &params,
        };
        match search.search(&query) {
            SearchOutcome::Empty(EmptyReason::Failed(message)) => {
                assert!(message.contains("broken"), "{}", message)
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn missing_program_is_reported_as_empty() {
        let dir = tempdir().unwrap();
        let command = ToolCommand::from_argv(&argv(&["definitely-not-a-real-tool-xyz"])).unwrap();
        let mut search = CommandLoopSearch::new(command, dir.path());
        let structure = line_segment(0, 2, "ALA");
        let params = LoopSearchParams::default();
        let query = LoopQuery {
            structure: &structure,
            length: 3,
            overlaps: (1, 1),
            params: &params,
        };
        assert!(matches!(
            search.search(&query),
            SearchOutcome::Empty(EmptyReason::Failed(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn loop_search_reads_gzipped_results_and_sequences() {
        use flate2::Compression;
        use flate2::write::GzEncoder;
        use std::io::Write;

        let dir = tempdir().unwrap();
        let loop_structure = line_segment(0, 4, "GLY");
        let fixture = dir.path().join("fixture.pdb.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(to_pdb_string(&loop_structure).as_bytes()).unwrap();
        fs::write(&fixture, encoder.finish().unwrap()).unwrap();

        let script = format!("cp {} {{outdir}}/loop_{{length}}.pdb.gz", fixture.display());
        let command = ToolCommand::from_argv(&argv(&["sh", "-c", &script])).unwrap();
        let mut search = CommandLoopSearch::new(command, dir.path().join("work"));
        let query_structure = line_segment(0, 2, "ALA");
        let params = LoopSearchParams::default();
        let query = LoopQuery {
            structure: &query_structure,
            length: 2,
            overlaps: (1, 1),
            params: &params,
        };
        let outcome = search.search(&query);
        let loops = outcome.hits();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].sequence, vec!["GLY"; 4]);
        assert_eq!(loops[0].rmsd, None);
        assert_eq!(loops[0].source.load().unwrap().residue_count(), 4);
    }
}
