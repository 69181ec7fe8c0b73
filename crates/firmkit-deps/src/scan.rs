//! Per-directory dependency extraction.
//!
//! A directory uses a candidate library when the library's path shows up in
//! the directory's dependency listing as a path prefix: preceded by start of
//! line or whitespace and followed by a path separator. This is a textual
//! match on the listing, not include resolution.

use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

use regex::Regex;

use crate::error::Result;
use crate::library::{include_flags, Library};
use crate::lister::DependencyLister;

/// File name of each generated listing.
pub const LISTING_FILE: &str = "dependencies.d";

/// Scans directories for references to a fixed set of candidate libraries.
pub struct DependencyScanner<'a, L: DependencyLister + ?Sized> {
    lister: &'a L,
    candidates: Vec<(Library, Regex)>,
    include_flags: Vec<String>,
    listing_root: PathBuf,
    listings: Vec<PathBuf>,
}

impl<'a, L: DependencyLister + ?Sized> DependencyScanner<'a, L> {
    /// Prepare a scanner over `candidates`. Listings are written beneath
    /// `listing_root`, one subdirectory per scanned directory.
    pub fn new(lister: &'a L, candidates: &[Library], listing_root: impl Into<PathBuf>) -> Result<Self> {
        let patterns = candidates
            .iter()
            .map(|lib| Ok((lib.clone(), library_pattern(lib)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(DependencyScanner {
            lister,
            candidates: patterns,
            include_flags: include_flags(candidates)?,
            listing_root: listing_root.into(),
            listings: Vec::new(),
        })
    }

    /// Candidate libraries, in the order given to [`new`](Self::new).
    pub fn candidates(&self) -> impl Iterator<Item = &Library> {
        self.candidates.iter().map(|(lib, _)| lib)
    }

    /// Include flags covering every candidate.
    pub fn include_flags(&self) -> &[String] {
        &self.include_flags
    }

    /// Every listing file produced so far.
    pub fn listings(&self) -> &[PathBuf] {
        &self.listings
    }

    /// Where the listing for `dir` goes.
    pub fn listing_path(&self, dir: &Path) -> PathBuf {
        let stem = dir.file_name().unwrap_or_else(|| OsStr::new("sources"));
        self.listing_root.join(stem).join(LISTING_FILE)
    }

    /// Candidate libraries referenced from `dir`'s sources, in candidate
    /// order. `dir` itself is never reported.
    pub fn scan(&mut self, dir: &Path) -> Result<Vec<Library>> {
        let output = self.listing_path(dir);
        self.lister.list(dir, &self.include_flags, &output)?;
        self.listings.push(output.clone());

        let mut hits = vec![false; self.candidates.len()];
        let reader = BufReader::new(File::open(&output)?);
        for line in reader.lines() {
            let line = line?;
            for (hit, (lib, pattern)) in hits.iter_mut().zip(&self.candidates) {
                if !*hit && lib.path() != dir && pattern.is_match(&line) {
                    *hit = true;
                }
            }
        }

        let used: Vec<Library> = self
            .candidates
            .iter()
            .zip(hits)
            .filter(|(_, hit)| *hit)
            .map(|((lib, _), _)| lib.clone())
            .collect();
        log::debug!(
            "{} uses [{}]",
            dir.display(),
            used.iter().map(Library::name).collect::<Vec<_>>().join(", ")
        );
        Ok(used)
    }
}

fn library_pattern(lib: &Library) -> Result<Regex> {
    let path = lib.path().to_string_lossy();
    let separator = MAIN_SEPARATOR.to_string();
    Ok(Regex::new(&format!(
        r"(?:^|\s){}{}",
        regex::escape(path.trim_end_matches(MAIN_SEPARATOR)),
        regex::escape(&separator)
    ))?)
}
