use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context};
use log::{debug, info, warn};

use crate::errors::SubtitleError;
use crate::file_utils::FileManager;
use crate::translation::Mode;

// @module: Subtitle cue model and SRT codec

// @const: SRT timing line, timestamps kept verbatim
static TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.*?) --> (.*)$").unwrap()
});

/// Translation state of a single cue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueState {
    Untranslated,
    Translated,
    Fixed,
}

// @struct: Single subtitle entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    // @field: Ordinal from the source file
    pub index: usize,

    // @field: Start timestamp, source format
    pub start: String,

    // @field: End timestamp, source format
    pub end: String,

    // @field: Source text, may span lines
    pub original: String,

    // @field: Result of a translate call
    pub translation: String,

    // @field: Result of a fix call
    pub fixed_text: String,
}

impl Cue {
    /// Creates an untranslated cue
    pub fn new(index: usize, start: impl Into<String>, end: impl Into<String>, original: impl Into<String>) -> Self {
        Cue {
            index,
            start: start.into(),
            end: end.into(),
            original: original.into(),
            translation: String::new(),
            fixed_text: String::new(),
        }
    }

    /// Text written to output: fixed, else translated, else original
    pub fn display_text(&self) -> &str {
        if !self.fixed_text.is_empty() {
            &self.fixed_text
        } else if !self.translation.is_empty() {
            &self.translation
        } else {
            &self.original
        }
    }

    pub fn has_translation(&self) -> bool {
        !self.translation.is_empty() || !self.fixed_text.is_empty()
    }

    pub fn state(&self) -> CueState {
        if !self.fixed_text.is_empty() {
            CueState::Fixed
        } else if !self.translation.is_empty() {
            CueState::Translated
        } else {
            CueState::Untranslated
        }
    }

    /// Replace the translation; any fix of the previous translation is dropped
    pub fn set_translation(&mut self, text: impl Into<String>) {
        self.translation = text.into();
        self.fixed_text.clear();
    }

    pub fn set_fixed_text(&mut self, text: impl Into<String>) {
        self.fixed_text = text.into();
    }

    /// Back to the untranslated state
    pub fn clear_translation(&mut self) {
        self.translation.clear();
        self.fixed_text.clear();
    }

    /// Text sent to the model for the given mode
    pub fn source_text(&self, mode: Mode) -> &str {
        match mode {
            Mode::Translate => &self.original,
            Mode::Fix if !self.translation.is_empty() => &self.translation,
            Mode::Fix => &self.original,
        }
    }
}

impl fmt::Display for Cue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.index)?;
        writeln!(f, "{} --> {}", self.start, self.end)?;
        writeln!(f, "{}", self.display_text())?;
        writeln!(f)
    }
}

/// Summary of a subtitle file on disk
#[derive(Debug, Clone)]
pub struct SubtitleFileInfo {
    pub path: PathBuf,
    pub size: u64,
    pub modified: Option<SystemTime>,
    pub subtitle_count: usize,
    pub translated_count: usize,
}

/// Ordered collection of cues; order is file order and never changes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CueStore {
    /// Source filename
    pub source_file: Option<PathBuf>,

    /// List of cues
    pub cues: Vec<Cue>,
}

impl CueStore {
    pub fn new(cues: Vec<Cue>) -> Self {
        CueStore {
            source_file: None,
            cues,
        }
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Deep copy of the cues for a batch job
    pub fn snapshot(&self) -> Vec<Cue> {
        self.cues.clone()
    }

    pub fn translated_count(&self) -> usize {
        self.cues.iter().filter(|c| c.has_translation()).count()
    }

    /// Load and parse an SRT file; invalid UTF-8 is replaced rather than rejected
    pub fn from_srt_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = fs::read(path)
            .with_context(|| format!("Failed to read subtitle file: {}", path.display()))?;
        let content = String::from_utf8_lossy(&bytes);
        let cues = Self::parse_srt_string(&content);
        info!("Parsed {} cues from {}", cues.len(), path.display());

        Ok(CueStore {
            source_file: Some(path.to_path_buf()),
            cues,
        })
    }

    /// Parse SRT content; blocks that do not form a cue are skipped with a warning
    pub fn parse_srt_string(content: &str) -> Vec<Cue> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut cues = Vec::new();
        let mut block: Vec<&str> = Vec::new();
        let mut block_start = 1;

        for (line_no, raw) in content.lines().enumerate() {
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            if line.trim().is_empty() {
                Self::flush_block(&mut block, block_start, &mut cues);
            } else {
                if block.is_empty() {
                    block_start = line_no + 1;
                }
                block.push(line);
            }
        }
        Self::flush_block(&mut block, block_start, &mut cues);

        cues
    }

    fn flush_block(block: &mut Vec<&str>, line: usize, cues: &mut Vec<Cue>) {
        if block.is_empty() {
            return;
        }
        match Self::parse_block(block, line) {
            Ok(cue) => cues.push(cue),
            Err(e) => warn!("Skipping subtitle block: {}", e),
        }
        block.clear();
    }

    fn parse_block(block: &[&str], line: usize) -> std::result::Result<Cue, SubtitleError> {
        if block.len() < 3 {
            return Err(SubtitleError::MalformedBlock {
                line,
                reason: format!("expected at least 3 lines, found {}", block.len()),
            });
        }

        let index = block[0].trim().parse::<usize>().map_err(|e| SubtitleError::MalformedBlock {
            line,
            reason: format!("invalid index '{}': {}", block[0].trim(), e),
        })?;

        let caps = TIMING_REGEX.captures(block[1]).ok_or_else(|| SubtitleError::MalformedBlock {
            line: line + 1,
            reason: format!("invalid timing line '{}'", block[1]),
        })?;

        Ok(Cue::new(
            index,
            caps[1].trim(),
            caps[2].trim(),
            block[2..].join("\n"),
        ))
    }

    /// Serialize to SRT using each cue's display text
    pub fn to_srt_string(&self) -> String {
        self.cues.iter().map(|cue| cue.to_string()).collect()
    }

    /// Write subtitles to an SRT file
    pub fn write_to_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        FileManager::write_to_file(path, &self.to_srt_string())
            .with_context(|| format!("Failed to write subtitle file: {}", path.display()))?;
        debug!("Wrote {} cues to {}", self.cues.len(), path.display());
        Ok(())
    }

    /// Size, timestamps and cue counts for an SRT file
    pub fn file_info<P: AsRef<Path>>(path: P) -> Result<SubtitleFileInfo> {
        let path = path.as_ref();
        let metadata = fs::metadata(path)
            .with_context(|| format!("Failed to stat file: {}", path.display()))?;
        let store = Self::from_srt_file(path)?;

        Ok(SubtitleFileInfo {
            path: path.to_path_buf(),
            size: metadata.len(),
            modified: metadata.modified().ok(),
            subtitle_count: store.len(),
            translated_count: store.translated_count(),
        })
    }

    /// True for an existing `.srt` file with at least one cue
    pub fn is_valid_srt_file<P: AsRef<Path>>(path: P) -> bool {
        let path = path.as_ref();
        let is_srt = path
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("srt"));
        if !is_srt || !path.is_file() {
            return false;
        }
        Self::from_srt_file(path).map(|s| !s.is_empty()).unwrap_or(false)
    }
}
