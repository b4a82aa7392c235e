use std::path::PathBuf;

use clap::Parser;

/// open (or create) a disk image and drive it from an interactive shell
#[derive(Parser, Debug, PartialEq)]
#[command(author, version, about, long_about = None)]
pub struct SimpleFsCli {
    /// the path of the disk image file
    pub image_file_path: PathBuf,
    /// the size of the disk image, in 4 KiB blocks
    pub blocks: u32,
}

/// one line typed at the shell prompt
#[derive(Parser, Debug, PartialEq)]
#[command(no_binary_name = true, disable_help_subcommand = true)]
pub enum ShellCommand {
    /// write a new, empty filesystem to the disk
    Format,
    /// validate the disk and make it usable
    Mount,
    /// release the mounted filesystem
    Unmount,
    /// print the superblock and every live inode
    Debug,
    /// allocate a new inode
    Create,
    /// free an inode and its blocks
    Delete { inumber: u32 },
    /// print the size of an inode
    Getsize { inumber: u32 },
    /// print the contents of an inode
    Cat { inumber: u32 },
    /// copy a host file into an inode
    Copyin { file: PathBuf, inumber: u32 },
    /// copy an inode out to a host file
    Copyout { inumber: u32, file: PathBuf },
    /// list the commands
    Help,
    /// leave the shell
    #[command(alias = "exit")]
    Quit,
}
