//! an interactive shell over one block device
use std::{
    fs::File,
    io::{BufRead, Read, Write},
    path::Path,
};

use anyhow::anyhow;
use byte_unit::Byte;
use clap::Parser;
use log::warn;

use crate::{
    cli_interface::ShellCommand,
    disk::BlockDevice,
    fs::{self, FileSystem, FsError},
    mkfs,
};

/// bytes moved per read or write call by `cat`, `copyin` and `copyout`
const COPY_CHUNK: usize = 16384;

const HELP: &str = "\
Commands are:
    format
    mount
    unmount
    debug
    create
    delete  <inode>
    getsize <inode>
    cat     <inode>
    copyin  <file> <inode>
    copyout <inode> <file>
    help
    quit
    exit";

/// whether the shell should keep reading commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

enum State<D: BlockDevice> {
    Unmounted(D),
    Mounted(FileSystem<D>),
}

/// Holds the device, mounted or not, between commands
pub struct Shell<D: BlockDevice> {
    state: Option<State<D>>,
}

impl<D: BlockDevice> Shell<D> {
    pub fn new(disk: D) -> Self {
        Shell {
            state: Some(State::Unmounted(disk)),
        }
    }

    pub fn is_mounted(&self) -> bool {
        matches!(self.state, Some(State::Mounted(_)))
    }

    /// give the device back, unmounting first if needed
    pub fn into_disk(self) -> anyhow::Result<D> {
        match self.state {
            Some(State::Unmounted(disk)) => Ok(disk),
            Some(State::Mounted(fs)) => Ok(fs.unmount()),
            None => Err(anyhow!("shell lost its device")),
        }
    }

    /// prompt, read and execute commands until `quit` or end of input
    pub fn run<R, W>(&mut self, input: R, out: &mut W) -> anyhow::Result<()>
    where
        R: BufRead,
        W: Write,
    {
        let mut lines = input.lines();
        loop {
            write!(out, " simplefs> ")?;
            out.flush()?;
            let Some(line) = lines.next() else {
                writeln!(out)?;
                return Ok(());
            };
            let line = line?;
            let words: Vec<&str> = line.split_whitespace().collect();
            if words.is_empty() {
                continue;
            }
            let command = match ShellCommand::try_parse_from(words) {
                Ok(command) => command,
                Err(e) => {
                    writeln!(out, "{e}")?;
                    continue;
                }
            };
            if self.execute(command, out)? == Flow::Quit {
                return Ok(());
            }
        }
    }

    /// run one command, reporting failures of the filesystem on `out`
    /// # Return
    /// an error only when `out` or the shell itself breaks
    pub fn execute<W: Write>(&mut self, command: ShellCommand, out: &mut W) -> anyhow::Result<Flow> {
        match command {
            ShellCommand::Format => self.format(out)?,
            ShellCommand::Mount => self.mount(out)?,
            ShellCommand::Unmount => self.unmount(out)?,
            ShellCommand::Debug => match self.debug() {
                Ok(report) => write!(out, "{report}")?,
                Err(e) => writeln!(out, "debug failed: {e}")?,
            },
            ShellCommand::Create => match self.mounted().and_then(|fs| fs.create()) {
                Ok(inumber) => writeln!(out, "created inode {inumber}")?,
                Err(e) => writeln!(out, "create failed: {e}")?,
            },
            ShellCommand::Delete { inumber } => {
                match self.mounted().and_then(|fs| fs.delete(inumber)) {
                    Ok(()) => writeln!(out, "inode {inumber} deleted.")?,
                    Err(e) => writeln!(out, "delete failed: {e}")?,
                }
            }
            ShellCommand::Getsize { inumber } => {
                match self.mounted().and_then(|fs| fs.getsize(inumber)) {
                    Ok(size) => writeln!(out, "inode {inumber} has size {size}")?,
                    Err(e) => writeln!(out, "getsize failed: {e}")?,
                }
            }
            ShellCommand::Cat { inumber } => {
                let mut contents = Vec::new();
                match self.copy_out(inumber, &mut contents) {
                    Ok(_) => {
                        out.write_all(&contents)?;
                        writeln!(out)?;
                    }
                    Err(e) => writeln!(out, "cat failed: {e}")?,
                }
            }
            ShellCommand::Copyin { file, inumber } => match self.copy_in(&file, inumber) {
                Ok(copied) => writeln!(out, "{}", copied_message(copied))?,
                Err(e) => writeln!(out, "copy failed: {e}")?,
            },
            ShellCommand::Copyout { inumber, file } => {
                // check the inode before truncating the host file
                let copied = self
                    .mounted()
                    .and_then(|fs| fs.getsize(inumber))
                    .map_err(anyhow::Error::from)
                    .and_then(|_| Ok(File::create(&file)?))
                    .and_then(|mut host| self.copy_out(inumber, &mut host));
                match copied {
                    Ok(copied) => writeln!(out, "{}", copied_message(copied))?,
                    Err(e) => writeln!(out, "copy failed: {e}")?,
                }
            }
            ShellCommand::Help => writeln!(out, "{HELP}")?,
            ShellCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }
}

/// mount state transitions
impl<D: BlockDevice> Shell<D> {
    fn format<W: Write>(&mut self, out: &mut W) -> anyhow::Result<()> {
        match &mut self.state {
            Some(State::Unmounted(disk)) => match mkfs::format(disk) {
                Ok(_) => writeln!(out, "disk formatted.")?,
                Err(e) => writeln!(out, "format failed: {e}")?,
            },
            Some(State::Mounted(_)) => {
                writeln!(out, "format failed: {}", FsError::AlreadyMounted)?
            }
            None => return Err(anyhow!("shell lost its device")),
        }
        Ok(())
    }

    fn mount<W: Write>(&mut self, out: &mut W) -> anyhow::Result<()> {
        let state = self
            .state
            .take()
            .ok_or_else(|| anyhow!("shell lost its device"))?;
        let state = match state {
            State::Unmounted(disk) => match FileSystem::mount(disk) {
                Ok(fs) => {
                    writeln!(out, "disk mounted.")?;
                    State::Mounted(fs)
                }
                Err(e) => {
                    let (error, disk) = e.into_parts();
                    writeln!(out, "mount failed: {error}")?;
                    State::Unmounted(disk)
                }
            },
            mounted @ State::Mounted(_) => {
                writeln!(out, "mount failed: {}", FsError::AlreadyMounted)?;
                mounted
            }
        };
        self.state = Some(state);
        Ok(())
    }

    fn unmount<W: Write>(&mut self, out: &mut W) -> anyhow::Result<()> {
        let state = self
            .state
            .take()
            .ok_or_else(|| anyhow!("shell lost its device"))?;
        let state = match state {
            State::Mounted(fs) => {
                writeln!(out, "disk unmounted.")?;
                State::Unmounted(fs.unmount())
            }
            unmounted @ State::Unmounted(_) => {
                writeln!(out, "unmount failed: {}", FsError::NotMounted)?;
                unmounted
            }
        };
        self.state = Some(state);
        Ok(())
    }

    fn mounted(&mut self) -> Result<&mut FileSystem<D>, FsError> {
        match &mut self.state {
            Some(State::Mounted(fs)) => Ok(fs),
            _ => Err(FsError::NotMounted),
        }
    }

    fn debug(&mut self) -> Result<fs::DebugReport, FsError> {
        match &mut self.state {
            Some(State::Mounted(fs)) => fs.debug(),
            Some(State::Unmounted(disk)) => fs::debug(disk),
            None => Err(FsError::NotMounted),
        }
    }
}

/// moving whole files between the host and the filesystem
impl<D: BlockDevice> Shell<D> {
    fn copy_in(&mut self, path: &Path, inumber: u32) -> anyhow::Result<u64> {
        let fs = self.mounted()?;
        // fail on a bad inode before touching the host file
        fs.getsize(inumber)?;
        let mut host = File::open(path)?;
        let mut buf = vec![0u8; COPY_CHUNK];
        let mut offset = 0u64;
        loop {
            let n = host.read(&mut buf)?;
            if n == 0 {
                break;
            }
            let written = fs.write(inumber, &buf[..n], offset)?;
            offset += written as u64;
            if written < n {
                warn!("inode {inumber} is full, stopped after {offset} bytes");
                break;
            }
        }
        Ok(offset)
    }

    fn copy_out<W: Write>(&mut self, inumber: u32, host: &mut W) -> anyhow::Result<u64> {
        let fs = self.mounted()?;
        let mut buf = vec![0u8; COPY_CHUNK];
        let mut offset = 0u64;
        loop {
            let n = fs.read(inumber, &mut buf, offset)?;
            if n == 0 {
                break;
            }
            host.write_all(&buf[..n])?;
            offset += n as u64;
        }
        Ok(offset)
    }
}

fn copied_message(copied: u64) -> String {
    format!(
        "{copied} bytes copied ({})",
        Byte::from_bytes(copied as u128).get_appropriate_unit(true)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{disk::MemDisk, utils::init_test_environment::init_test_image};

    fn run(shell: &mut Shell<MemDisk>, script: &str) -> String {
        let mut out = Vec::new();
        shell.run(script.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_format_mount_create() {
        let mut shell = Shell::new(MemDisk::new(20));
        let output = run(&mut shell, "format\nmount\ncreate\ncreate\ngetsize 2\n");
        assert!(output.contains("disk formatted."));
        assert!(output.contains("disk mounted."));
        assert!(output.contains("created inode 1"));
        assert!(output.contains("created inode 2"));
        assert!(output.contains("inode 2 has size 0"));
        assert!(shell.is_mounted());
    }

    #[test]
    fn test_format_while_mounted_changes_nothing() {
        let mut shell = Shell::new(MemDisk::new(20));
        run(&mut shell, "format\nmount\ncreate\n");
        let output = run(&mut shell, "format\nmount\ngetsize 1\n");
        assert!(output.contains("format failed: filesystem is already mounted"));
        assert!(output.contains("mount failed: filesystem is already mounted"));
        assert!(output.contains("inode 1 has size 0"));
        assert!(shell.is_mounted());
    }

    #[test]
    fn test_commands_need_a_mount() {
        let mut shell = Shell::new(MemDisk::new(20));
        let output = run(&mut shell, "create\ndelete 1\ncat 1\nunmount\nmount\n");
        assert!(output.contains("create failed: filesystem is not mounted"));
        assert!(output.contains("delete failed: filesystem is not mounted"));
        assert!(output.contains("cat failed: filesystem is not mounted"));
        assert!(output.contains("unmount failed: filesystem is not mounted"));
        assert!(output.contains("mount failed: invalid magic number"));
        assert!(!shell.is_mounted());
        // the device survives the failed mount
        let output = run(&mut shell, "format\nmount\n");
        assert!(output.contains("disk mounted."));
    }

    #[test]
    fn test_quit_stops_reading() {
        let mut shell = Shell::new(MemDisk::new(20));
        let output = run(&mut shell, "help\nquit\nformat\n");
        assert!(output.contains("copyin  <file> <inode>"));
        assert!(!output.contains("disk formatted."));
    }

    #[test]
    fn test_unknown_command_keeps_going() {
        let mut shell = Shell::new(MemDisk::new(20));
        let output = run(&mut shell, "frobnicate\n\nformat\n");
        assert!(output.contains("frobnicate"));
        assert!(output.contains("disk formatted."));
    }

    #[test]
    fn test_copy_in_and_out() {
        let source = init_test_image("shell_copyin.txt");
        let target = init_test_image("shell_copyout.txt");
        let contents: Vec<u8> = (0..50_000u32).map(|i| (i % 251) as u8).collect();
        std::fs::write(&source, &contents).unwrap();

        let mut shell = Shell::new(MemDisk::new(40));
        let script = format!(
            "format\nmount\ncreate\ncopyin {} 1\ngetsize 1\ncopyout 1 {}\n",
            source.display(),
            target.display()
        );
        let output = run(&mut shell, &script);
        assert!(output.contains("50000 bytes copied"));
        assert!(output.contains("inode 1 has size 50000"));
        assert_eq!(std::fs::read(&target).unwrap(), contents);

        // the data is still there after a remount
        let output = run(&mut shell, "unmount\nmount\ngetsize 1\n");
        assert!(output.contains("inode 1 has size 50000"));

        std::fs::remove_file(&source).unwrap();
        std::fs::remove_file(&target).unwrap();
    }

    #[test]
    fn test_cat_and_debug() {
        let mut shell = Shell::new(MemDisk::new(20));
        run(&mut shell, "format\nmount\ncreate\n");
        let mut out = Vec::new();
        let State::Mounted(fs) = shell.state.as_mut().unwrap() else {
            panic!("shell should be mounted");
        };
        fs.write(1, b"hello shell", 0).unwrap();
        shell
            .execute(ShellCommand::Cat { inumber: 1 }, &mut out)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "hello shell\n");

        let output = run(&mut shell, "debug\nunmount\ndebug\n");
        assert_eq!(output.matches("inode 1:").count(), 2);
        assert_eq!(output.matches("size: 11 bytes").count(), 2);
    }

    #[test]
    fn test_into_disk_unmounts() {
        let mut shell = Shell::new(MemDisk::new(20));
        run(&mut shell, "format\nmount\ncreate\n");
        let disk = shell.into_disk().unwrap();
        let mut fs = FileSystem::mount(disk).unwrap();
        assert_eq!(fs.getsize(1).unwrap(), 0);
    }

    #[test]
    fn test_failed_copyout_keeps_host_file() {
        let target = init_test_image("shell_copyout_kept.txt");
        std::fs::write(&target, b"keep me").unwrap();

        let mut shell = Shell::new(MemDisk::new(20));
        let script = format!("copyout 1 {0}\nformat\nmount\ncopyout 3 {0}\n", target.display());
        let output = run(&mut shell, &script);
        assert!(output.contains("copy failed: filesystem is not mounted"));
        assert!(output.contains("copy failed: inode 3 is not in use"));
        assert_eq!(std::fs::read(&target).unwrap(), b"keep me");

        std::fs::remove_file(&target).unwrap();
    }
}
