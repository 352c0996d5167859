use anyhow::{Context, Result};
use chrono::TimeDelta;
use directories::{ProjectDirs, UserDirs};
use std::io::{BufRead, Write};
use std::path::PathBuf;

use crate::convert::LegacyMode;
use crate::marking::Selector;

pub const DEFAULT_CONVERTER: &str = "soffice";
pub const DEFAULT_WINDOW_HOURS: u32 = 24;
const APP_NAME: &str = "excel-marker";

/// Everything a batch run needs, resolved from the command line.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// A workbook or a directory of workbooks.
    pub input: PathBuf,
    pub selector: Selector,
    pub output_dir: PathBuf,
    /// Where the processed-file log lives.
    pub state_dir: PathBuf,
    pub window: TimeDelta,
    pub legacy: LegacyMode,
    pub converter: PathBuf,
}

impl RunConfig {
    pub fn new(input: impl Into<PathBuf>, selector: Selector, state_dir: PathBuf) -> Self {
        Self {
            input: input.into(),
            selector,
            output_dir: default_output_dir(),
            state_dir,
            window: TimeDelta::hours(i64::from(DEFAULT_WINDOW_HOURS)),
            legacy: LegacyMode::default(),
            converter: PathBuf::from(DEFAULT_CONVERTER),
        }
    }
}

/// `<desktop>/output`, falling back to `~/Desktop/output`.
pub fn default_output_dir() -> PathBuf {
    let desktop = UserDirs::new().and_then(|dirs| {
        dirs.desktop_dir()
            .map(|dir| dir.to_path_buf())
            .or_else(|| Some(dirs.home_dir().join("Desktop")))
    });

    desktop
        .unwrap_or_else(|| PathBuf::from("Desktop"))
        .join("output")
}

pub fn default_state_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", APP_NAME).context("Unable to resolve app data directory")?;
    Ok(dirs.data_local_dir().to_path_buf())
}

/// Asks for a selector until a number from 1 to 6 is entered.
pub fn prompt_selector<R: BufRead, W: Write>(mut input: R, mut output: W) -> Result<Selector> {
    let mut line = String::new();

    loop {
        write!(output, "Enter a number (1-6): ")?;
        output.flush()?;

        line.clear();
        let read = input
            .read_line(&mut line)
            .context("Failed to read selector")?;
        if read == 0 {
            anyhow::bail!("No selector given");
        }

        match line.parse::<Selector>() {
            Ok(selector) => return Ok(selector),
            Err(_) => writeln!(output, "Please enter a number from 1 to 6")?,
        }
    }
}
