//! Batch processing: run the decode pipeline over many containers.
//!
//! Each input is handled on its own: a malformed container is recorded as
//! [`Outcome::Failed`] and the batch moves on to the next input.  Nothing is
//! written for a failed input.
//!
//! # Parallelism
//!
//! With the `parallel` feature, inputs are processed concurrently with
//! Rayon.  The registry is shared read-only; every input owns its own
//! source and plaintext buffer.  The report is always in input order.
//!
//! Two inputs that map to the same output directory (same stem under one
//! `output_root`, say) would overwrite each other.  Only the first one is
//! extracted; later ones fail with [`Error::DuplicateOutput`].

use log::warn;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::container::{default_output_dir, Container};
use crate::error::Error;
use crate::registry::ModelRegistry;

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Put each container's directory under this root instead of next to
    /// the input.
    pub output_root: Option<PathBuf>,
    /// Parse, decrypt and slice, but write nothing.
    pub dry_run:     bool,
}

#[derive(Debug)]
pub enum Outcome {
    Extracted { files: Vec<PathBuf> },
    /// Dry run: the container decoded into `parts` subfiles.
    Checked { parts: usize },
    Failed { error: Error },
}

#[derive(Debug)]
pub struct InputReport {
    pub input:      PathBuf,
    pub output_dir: PathBuf,
    pub outcome:    Outcome,
}

impl InputReport {
    pub fn is_success(&self) -> bool {
        !matches!(self.outcome, Outcome::Failed { .. })
    }
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub inputs: Vec<InputReport>,
}

impl BatchReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &InputReport> {
        self.inputs.iter().filter(|r| r.is_success())
    }

    pub fn failed(&self) -> impl Iterator<Item = &InputReport> {
        self.inputs.iter().filter(|r| !r.is_success())
    }

    pub fn all_succeeded(&self) -> bool {
        self.inputs.iter().all(InputReport::is_success)
    }
}

/// Directory a container's parts are written to.
pub fn output_dir_for(input: &Path, opts: &BatchOptions) -> PathBuf {
    let dir = default_output_dir(input);
    match (&opts.output_root, dir.file_name()) {
        (Some(root), Some(name)) => root.join(name),
        _                        => dir,
    }
}

/// Decode every input independently.
pub fn run_batch<P: AsRef<Path>>(
    inputs:   &[P],
    registry: &ModelRegistry,
    opts:     &BatchOptions,
) -> BatchReport {
    let jobs = plan(inputs, opts);

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;

        let inputs = jobs
            .into_par_iter()
            .map(|job| process_one(job, registry, opts))
            .collect();
        BatchReport { inputs }
    }

    #[cfg(not(feature = "parallel"))]
    {
        let inputs = jobs
            .into_iter()
            .map(|job| process_one(job, registry, opts))
            .collect();
        BatchReport { inputs }
    }
}

struct Job<'a> {
    input:      &'a Path,
    output_dir: PathBuf,
    /// An earlier input already claimed `output_dir`.
    duplicate:  bool,
}

/// Resolve output directories up front so that clashes are decided in
/// input order, whatever order the jobs later run in.
fn plan<'a, P: AsRef<Path>>(inputs: &'a [P], opts: &BatchOptions) -> Vec<Job<'a>> {
    let mut claimed = HashSet::new();
    inputs
        .iter()
        .map(|p| {
            let input = p.as_ref();
            let output_dir = output_dir_for(input, opts);
            let duplicate = !opts.dry_run && !claimed.insert(output_dir.clone());
            Job { input, output_dir, duplicate }
        })
        .collect()
}

fn process_one(job: Job<'_>, registry: &ModelRegistry, opts: &BatchOptions) -> InputReport {
    let Job { input, output_dir, duplicate } = job;
    let result = if duplicate {
        Err(Error::DuplicateOutput(output_dir.clone()))
    } else {
        decode_one(input, &output_dir, registry, opts)
    };
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(error) => {
            warn!("{}: {}", input.display(), error);
            Outcome::Failed { error }
        }
    };
    InputReport { input: input.to_owned(), output_dir, outcome }
}

fn decode_one(
    input:      &Path,
    output_dir: &Path,
    registry:   &ModelRegistry,
    opts:       &BatchOptions,
) -> Result<Outcome, Error> {
    let container = Container::open(input, registry)?;
    if opts.dry_run {
        let parts = container.subfiles()?.len();
        return Ok(Outcome::Checked { parts });
    }
    let files = container.extract_all(output_dir)?;
    Ok(Outcome::Extracted { files })
}
