use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use blockwise::{
    init_problem, merge_face_assignments, reduce_problem, run_block_faces, run_subproblems,
    ArtifactStore, BlockFacesConfig, InMemoryVolume, JobDescriptor, SubproblemConfig,
};

/// Block-wise work units for multicut decomposition and label stitching.
#[derive(Parser, Debug)]
#[command(name = "blockwise", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Store the scale 0 problem built from the graph and its edge costs.
    InitProblem {
        #[arg(long)]
        config: PathBuf,
    },
    /// Solve the block sub-problems of one job.
    SolveSubproblems {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        job: PathBuf,
    },
    /// Merge the cut edges of one scale and write the next scale's problem.
    ReduceProblem {
        #[arg(long)]
        tmp_folder: PathBuf,
        #[arg(long)]
        scale: u32,
        #[arg(long)]
        n_jobs: u64,
    },
    /// Match labels across the lower faces of one job's blocks.
    BlockFaces {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        job: PathBuf,
        #[arg(long)]
        volume: PathBuf,
    },
    /// Union all face assignments and write the label mapping as JSON.
    MergeAssignments {
        #[arg(long)]
        tmp_folder: PathBuf,
        #[arg(long)]
        n_jobs: u64,
        #[arg(long)]
        n_labels: u64,
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> blockwise::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match Cli::parse().command {
        Command::InitProblem { config } => {
            init_problem(&SubproblemConfig::load(&config)?)?;
        }
        Command::SolveSubproblems { config, job } => {
            let config = SubproblemConfig::load(&config)?;
            let job = JobDescriptor::load(&job)?;
            run_subproblems(&config, &job)?;
        }
        Command::ReduceProblem {
            tmp_folder,
            scale,
            n_jobs,
        } => {
            let store = ArtifactStore::new(tmp_folder)?;
            let job_ids: Vec<u64> = (0..n_jobs).collect();
            reduce_problem(&store, scale, &job_ids)?;
        }
        Command::BlockFaces {
            config,
            job,
            volume,
        } => {
            let config = BlockFacesConfig::load(&config)?;
            let job = JobDescriptor::load(&job)?;
            let volume = InMemoryVolume::load(&volume)?;
            run_block_faces(&config, &job, &volume)?;
        }
        Command::MergeAssignments {
            tmp_folder,
            n_jobs,
            n_labels,
            output,
        } => {
            let store = ArtifactStore::new(tmp_folder)?;
            let job_ids: Vec<u64> = (0..n_jobs).collect();
            let equivalences = merge_face_assignments(&store, &job_ids, n_labels)?;
            fs::write(output, serde_json::to_string(equivalences.mapping())?)?;
        }
    }
    Ok(())
}
