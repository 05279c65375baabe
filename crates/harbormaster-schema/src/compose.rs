use crate::SchemaError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File names recognized as compose manifests, in lookup priority order.
pub const MANIFEST_FILE_NAMES: &[&str] = &[
    "compose.yaml",
    "compose.yml",
    "docker-compose.yaml",
    "docker-compose.yml",
];

/// A service name paired with the raw (unsubstituted) image reference it declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceImageBinding {
    pub service_name: String,
    pub raw_image_reference: String,
}

/// Extract `(service, image)` pairs from the top-level `services:` block, in
/// declaration order. Services without an `image:` line (build-only) are skipped.
pub fn scan_manifest(text: &str) -> Vec<ServiceImageBinding> {
    let mut bindings: Vec<ServiceImageBinding> = Vec::new();
    let mut current: Option<&str> = None;
    let mut bound = false;

    for event in ServicesBlock::new(text) {
        match event {
            Event::Service(name) => {
                current = Some(name);
                bound = false;
            }
            Event::Image(value) => {
                let Some(service) = current else { continue };
                if bound || value.is_empty() {
                    continue;
                }
                bindings.push(ServiceImageBinding {
                    service_name: service.to_owned(),
                    raw_image_reference: value.to_owned(),
                });
                bound = true;
            }
        }
    }

    bindings
}

/// Every service key declared in the `services:` block, including build-only ones.
pub fn declared_services(text: &str) -> Vec<String> {
    ServicesBlock::new(text)
        .filter_map(|event| match event {
            Event::Service(name) => Some(name.to_owned()),
            Event::Image(_) => None,
        })
        .collect()
}

pub fn read_manifest(path: &Path) -> Result<String, SchemaError> {
    if !path.is_file() {
        return Err(SchemaError::ComposeNotFound(path.to_path_buf()));
    }
    Ok(fs::read_to_string(path)?)
}

/// First recognized manifest file inside `dir`, if any.
pub fn locate_manifest(dir: &Path) -> Option<PathBuf> {
    MANIFEST_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|candidate| candidate.is_file())
}

pub fn is_manifest_file_name(name: &str) -> bool {
    MANIFEST_FILE_NAMES.contains(&name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event<'a> {
    Service(&'a str),
    Image(&'a str),
}

/// Line-oriented walker over the top-level `services:` block.
///
/// Only indentation is tracked: zero-indent keys open or close the block, two-space
/// keys ending in `:` are service names, and deeper `image:` scalars are reported
/// with quotes and trailing comments removed.
struct ServicesBlock<'a> {
    lines: std::str::Lines<'a>,
    in_services: bool,
}

impl<'a> ServicesBlock<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines(),
            in_services: false,
        }
    }
}

impl<'a> Iterator for ServicesBlock<'a> {
    type Item = Event<'a>;

    fn next(&mut self) -> Option<Event<'a>> {
        for raw in self.lines.by_ref() {
            let line = raw.trim_end();
            let trimmed = line.trim_start_matches(' ');
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let indent = line.len() - trimmed.len();

            if indent == 0 {
                self.in_services = strip_comment(trimmed).trim_end() == "services:";
                continue;
            }
            if !self.in_services {
                continue;
            }

            if indent == 2 {
                let key = strip_comment(trimmed).trim_end();
                if let Some(name) = key.strip_suffix(':') {
                    return Some(Event::Service(unquote(name.trim())));
                }
                continue;
            }

            if let Some(value) = trimmed.strip_prefix("image:") {
                return Some(Event::Image(clean_scalar(value)));
            }
        }
        None
    }
}

/// Remove surrounding quotes, or for plain scalars a trailing ` # comment`.
fn clean_scalar(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\''] {
        if let Some(rest) = value.strip_prefix(quote) {
            return rest.find(quote).map_or(rest, |end| &rest[..end]).trim();
        }
    }
    strip_comment(value).trim()
}

fn strip_comment(value: &str) -> &str {
    if value.starts_with('#') {
        return "";
    }
    let bytes = value.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'#' && i > 0 && bytes[i - 1].is_ascii_whitespace() {
            return &value[..i];
        }
    }
    value
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}
