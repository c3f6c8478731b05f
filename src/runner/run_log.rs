use crate::{browser::BrowserDisplay,
            dom::pretty_html,
            error::AgentResult,
            trajectory::{Trajectory, TrajectoryItem}};
use std::path::Path;

pub const TRAJECTORY_FILE: &str = "traj.txt";
pub const DISPLAY_MARKDOWN_FILE: &str = "display.md";
pub const DISPLAY_HTML_FILE: &str = "display.html";

/// Write the abbreviated trajectory and the last rendered page into `dir`
pub async fn write_run_log(dir: &Path, trajectory: &Trajectory, display: &BrowserDisplay) -> AgentResult<()> {
    tokio::fs::create_dir_all(dir).await?;

    let lines: Vec<String> = trajectory.items().iter().map(TrajectoryItem::abbreviated_text).collect();
    tokio::fs::write(dir.join(TRAJECTORY_FILE), lines.join("\n")).await?;
    tokio::fs::write(dir.join(DISPLAY_MARKDOWN_FILE), &display.text).await?;
    tokio::fs::write(dir.join(DISPLAY_HTML_FILE), pretty_html(&display.html)).await?;

    log::debug!("Wrote run log to {}", dir.display());
    Ok(())
}
