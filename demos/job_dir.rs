//! Set up a per-run log directory with the bundled configuration.
//!
//! Run with:
//! ```bash
//! cargo run --example job_dir -- 3
//! ```

use joblog::JobOptions;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let verbosity = std::env::args()
        .nth(1)
        .map(|v| v.parse())
        .transpose()?
        .unwrap_or(2);

    let (job_dir, _guard) = joblog::setup_job_dir(JobOptions::new("jobs", verbosity))?;

    tracing::debug!("Only visible on the console at verbosity 3");
    tracing::info!(job = %job_dir.display(), "Job started");
    tracing::warn!("Validation loss went up:\n  epoch 4: 0.31\n  epoch 5: 0.35");
    tracing::error!("Checkpoint upload failed");
    joblog::critical!("Out of disk space");

    println!("Logs written to {}", job_dir.join("info.log").display());
    Ok(())
}
