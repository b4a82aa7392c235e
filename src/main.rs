use std::io;

use clap::Parser;
use log::info;
use simplefs::{cli_interface::SimpleFsCli, shell::Shell, FileDisk};
/// open the disk image named on the command line, creating or resizing it
/// as needed, and read shell commands from stdin until `quit` or EOF.
fn main() -> anyhow::Result<()> {
    env_logger::builder().format_timestamp_nanos().init();
    let args = SimpleFsCli::parse();
    let disk = FileDisk::open(&args.image_file_path, args.blocks)?;
    info!(
        "opened {} with {} blocks",
        args.image_file_path.display(),
        args.blocks
    );
    let mut shell = Shell::new(disk);
    shell.run(io::stdin().lock(), &mut io::stdout())?;
    // unmount and flush the image before exiting
    drop(shell.into_disk()?);
    Ok(())
}
