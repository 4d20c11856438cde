//! Reference library of subject appearances.
//!
//! Templates are appended in a deterministic order (sorted file paths at
//! startup, then operator additions in the order they happen) and are never
//! removed. The template index doubles as the tie-break rank in matching.

mod discover;

pub use discover::{discover_images, is_supported_image};

use crate::image::io::load_rgb_image;
use crate::template::Template;
use crate::trace::{trace_event, trace_span, trace_warn};
use crate::util::{FollowCamError, FollowCamResult};
use ::image::RgbImage;
use std::path::{Path, PathBuf};

/// A reference file that was found but could not become a template.
#[derive(Debug)]
pub struct SkippedFile {
    /// Path of the rejected file.
    pub path: PathBuf,
    /// Why it was rejected.
    pub error: FollowCamError,
}

/// Outcome of loading a reference directory.
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Files that became templates, in library order.
    pub loaded: Vec<PathBuf>,
    /// Files that were skipped, in discovery order.
    pub skipped: Vec<SkippedFile>,
    /// The root directory did not exist.
    pub missing_root: bool,
}

/// Ordered collection of templates sharing one scale factor.
#[derive(Debug)]
pub struct ReferenceLibrary {
    scale: f32,
    templates: Vec<Template>,
}

impl ReferenceLibrary {
    /// Creates an empty library for the given reduction scale.
    pub fn new(scale: f32) -> FollowCamResult<Self> {
        if !(scale > 0.0 && scale <= 1.0) {
            return Err(FollowCamError::InvalidConfig("scale must be in (0, 1]"));
        }
        Ok(Self {
            scale,
            templates: Vec::new(),
        })
    }

    /// Loads every supported image under `root` (recursively, sorted).
    ///
    /// Undecodable or degenerate files are reported and skipped; a missing
    /// directory produces an empty library.
    pub fn load<P: AsRef<Path>>(root: P, scale: f32) -> FollowCamResult<(Self, LoadReport)> {
        let root = root.as_ref();
        let _span = trace_span!("load_library", root = %root.display()).entered();

        let mut library = Self::new(scale)?;
        let mut report = LoadReport::default();
        if !root.is_dir() {
            report.missing_root = true;
            trace_warn!(root = %root.display(), "reference directory not found");
            return Ok((library, report));
        }

        for path in discover_images(root)? {
            let outcome = load_rgb_image(&path).and_then(|img| library.add(img).map(|_| ()));
            match outcome {
                Ok(()) => {
                    trace_event!("template_loaded", index = library.len() - 1);
                    report.loaded.push(path);
                }
                Err(error) => {
                    trace_warn!(path = %path.display(), %error, "skipping reference image");
                    report.skipped.push(SkippedFile { path, error });
                }
            }
        }

        Ok((library, report))
    }

    /// Builds a template from a full-resolution patch and appends it.
    pub fn add(&mut self, full_res: RgbImage) -> FollowCamResult<&Template> {
        let template = Template::from_rgb(full_res, self.scale)?;
        self.templates.push(template);
        Ok(&self.templates[self.templates.len() - 1])
    }

    /// Returns the templates in library order.
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// Returns the number of templates.
    pub fn len(&self) -> usize {
        self.templates.len()
    }

    /// Returns true when no template is loaded.
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    /// Returns the reduction scale shared by all templates.
    pub fn scale(&self) -> f32 {
        self.scale
    }
}
