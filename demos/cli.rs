use anyhow::{Result, bail};
use pyload_api::client::{PyLoad, PyLoadBuilder};
use pyload_api::utils::format_free_space;
use std::env;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let pyload: PyLoad = PyLoadBuilder::from_env()?.build()?;
    let command = env::args().nth(1).unwrap_or_else(|| "status".into());

    match command.as_str() {
        "status" => {
            let status = pyload.get_status().await?;
            let free_space = pyload.free_space().await?;
            println!("Status:");
            println!("  - Active downloads: {}", status.active);
            println!("  - Items in queue: {}", status.queue);
            println!("  - Download speed: {} Mbit/s", status.speed_mbit());
            println!("  - Free space: {}", format_free_space(free_space));
            println!(
                "  - Queue: {}",
                if status.pause { "Paused" } else { "Running" }
            );
        }
        "pause" => pyload.pause().await?,
        "resume" => pyload.unpause().await?,
        "toggle" => pyload.toggle_pause().await?,
        "stop-all" => pyload.stop_all_downloads().await?,
        "retry" => pyload.restart_failed().await?,
        "delete-finished" => pyload.delete_finished().await?,
        "toggle-reconnect" => pyload.toggle_reconnect().await?,
        "restart" => pyload.restart().await?,
        "version" => println!("pyLoad {}", pyload.version().await?),
        other => bail!("unknown command: {other}"),
    }

    Ok(())
}
