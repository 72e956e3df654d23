mod opt;

use crate::opt::Opt;

use std::{
    env::var_os,
    ffi::OsStr,
    fs::{create_dir_all, File},
    io::{stdout, Write},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use clap::{CommandFactory, Parser, ValueEnum};
use clap_complete::{generate, shells::*, Generator};
use dirs::home_dir;
use strum::{Display, EnumString};

#[derive(
    Copy,
    Clone,
    Debug,
    Display,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    EnumString,
    ValueEnum,
)]
#[strum(ascii_case_insensitive)]
#[strum(serialize_all = "lowercase")]
enum Shell {
    Bash,
    Elvish,
    Fish,
    #[allow(clippy::enum_variant_names)]
    PowerShell,
    Zsh,
}

#[derive(Debug, Parser)]
struct ShellSelect {
    /// Shell for which to generate completions
    ///
    /// If omitted, the shell is taken from the `SHELL` environment variable
    #[clap(value_enum)]
    shell: Option<Shell>,
}

fn gen_completion<S: Copy + Generator, W: Write>(shell: S, mut to: W) {
    generate(shell, &mut Opt::command(), "hzz4l", &mut to);
}

fn main() -> Result<()> {
    let shell = ShellSelect::parse()
        .shell
        .map_or_else(get_login_shell, Ok)
        .context("Failed to determine shell")?;
    eprintln!("Generating {shell} completions");
    match shell {
        Shell::Bash => gen_completion(Bash, gen_bash_outfile()?),
        Shell::Elvish => gen_completion(Elvish, &mut stdout()),
        Shell::Fish => gen_completion(Fish, gen_fish_outfile()?),
        Shell::PowerShell => gen_completion(PowerShell, &mut stdout()),
        Shell::Zsh => gen_completion(Zsh, &mut stdout()),
    }
    Ok(())
}

fn get_login_shell() -> Result<Shell> {
    let path = var_os("SHELL")
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("SHELL is not set"))?;
    let shell_name = path
        .file_name()
        .and_then(OsStr::to_str)
        .ok_or_else(|| anyhow!("Invalid shell path {path:?}"))?;
    let shell = shell_name
        .parse()
        .with_context(|| format!("{shell_name} is not a supported shell"))?;
    Ok(shell)
}

fn data_home() -> Result<PathBuf> {
    if let Some(dir) = var_os("XDG_DATA_HOME") {
        return Ok(PathBuf::from(dir));
    }
    let mut dir = home_dir().ok_or_else(|| anyhow!("No home directory found"))?;
    dir.push(".local");
    dir.push("share");
    Ok(dir)
}

fn gen_bash_outfile() -> Result<File> {
    let mut outfile = match var_os("BASH_COMPLETION_USER_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => data_home()?.join("bash-completion"),
    };
    outfile.push("completions");
    outfile.push("hzz4l.bash");
    create_file(outfile)
}

fn gen_fish_outfile() -> Result<File> {
    let mut outfile = data_home()?;
    for part in ["fish", "vendor_completions.d", "hzz4l.fish"] {
        outfile.push(part);
    }
    create_file(outfile)
}

fn create_file<P: AsRef<Path>>(name: P) -> Result<File> {
    let name = name.as_ref();
    if let Some(dir) = name.parent() {
        create_dir_all(dir)
            .with_context(|| format!("Failed to create {dir:?}"))?;
    }
    File::create(name).with_context(|| format!("Failed to create {name:?}"))
}
