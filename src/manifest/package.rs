//! Package specifications
//!
//! A `PackageSpec` is one validated manifest entry. Manifest JSON is first
//! read into the loose `RawPackage` shape and converted with `TryFrom`, which
//! is where every field-level invariant is checked.

use crate::error::{DobroError, DobroResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Where a package comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageKind {
    /// Git repository
    Git,
    /// Subversion repository
    Svn,
    /// npm registry
    Registry,
}

impl PackageKind {
    /// Parse the manifest `type` field (absent means registry)
    pub fn from_manifest(value: Option<&str>) -> Option<Self> {
        match value {
            Some("git") => Some(Self::Git),
            Some("svn") => Some(Self::Svn),
            None | Some("npm") | Some("registry") => Some(Self::Registry),
            Some(_) => None,
        }
    }
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Git => "git",
            Self::Svn => "svn",
            Self::Registry => "npm",
        };
        write!(f, "{}", name)
    }
}

/// Kind-specific fetch parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageSource {
    Git {
        repo: String,
        commit: Option<String>,
        dest: Option<PathBuf>,
    },
    Svn {
        url: String,
        revision: String,
        dest: Option<PathBuf>,
    },
    Registry {
        version: String,
    },
}

/// One validated manifest entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    /// Package name, also the directory name it is installed under
    pub name: String,
    /// Source and fetch parameters
    pub source: PackageSource,
    /// Shell command run in the staging directory after fetching
    pub postinstall: Option<String>,
}

impl PackageSpec {
    /// Create a git package
    pub fn git(name: impl Into<String>, repo: impl Into<String>, commit: Option<&str>) -> Self {
        Self {
            name: name.into(),
            source: PackageSource::Git {
                repo: repo.into(),
                commit: commit.map(str::to_string),
                dest: None,
            },
            postinstall: None,
        }
    }

    /// Create an svn package
    pub fn svn(
        name: impl Into<String>,
        url: impl Into<String>,
        revision: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source: PackageSource::Svn {
                url: url.into(),
                revision: revision.into(),
                dest: None,
            },
            postinstall: None,
        }
    }

    /// Create a registry package
    pub fn registry(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source: PackageSource::Registry {
                version: version.into(),
            },
            postinstall: None,
        }
    }

    /// Set the install subdirectory (git and svn only)
    pub fn with_dest(mut self, path: impl Into<PathBuf>) -> Self {
        match &mut self.source {
            PackageSource::Git { dest, .. } | PackageSource::Svn { dest, .. } => {
                *dest = Some(path.into())
            }
            PackageSource::Registry { .. } => {}
        }
        self
    }

    /// Set the postinstall command
    pub fn with_postinstall(mut self, command: impl Into<String>) -> Self {
        self.postinstall = Some(command.into());
        self
    }

    /// The package kind
    pub fn kind(&self) -> PackageKind {
        match self.source {
            PackageSource::Git { .. } => PackageKind::Git,
            PackageSource::Svn { .. } => PackageKind::Svn,
            PackageSource::Registry { .. } => PackageKind::Registry,
        }
    }

    /// Install subdirectory relative to the staging directory
    pub fn dest(&self) -> Option<&Path> {
        match &self.source {
            PackageSource::Git { dest, .. } | PackageSource::Svn { dest, .. } => dest.as_deref(),
            PackageSource::Registry { .. } => None,
        }
    }

    /// Manifest fields of this package as sorted key/value pairs
    pub fn fields(&self) -> BTreeMap<&'static str, String> {
        let mut fields = BTreeMap::new();
        fields.insert("type", self.kind().to_string());
        fields.insert("name", self.name.clone());

        match &self.source {
            PackageSource::Git { repo, commit, dest } => {
                fields.insert("repo", repo.clone());
                if let Some(commit) = commit {
                    fields.insert("commit", commit.clone());
                }
                if let Some(dest) = dest {
                    fields.insert("dest", dest.display().to_string());
                }
            }
            PackageSource::Svn {
                url,
                revision,
                dest,
            } => {
                fields.insert("url", url.clone());
                fields.insert("revision", revision.clone());
                if let Some(dest) = dest {
                    fields.insert("dest", dest.display().to_string());
                }
            }
            PackageSource::Registry { version } => {
                fields.insert("version", version.clone());
            }
        }

        if let Some(ref postinstall) = self.postinstall {
            fields.insert("postinstall", postinstall.clone());
        }

        fields
    }

    /// Check the invariants that `TryFrom<RawPackage>` enforces
    pub fn validate(&self) -> DobroResult<()> {
        validate_name(&self.name, self.kind())?;

        if let Some(dest) = self.dest() {
            validate_dest(&self.name, dest)?;
        }

        match &self.source {
            PackageSource::Git { repo, commit, .. } => {
                require(&self.name, "repo", repo)?;
                if let Some(commit) = commit {
                    validate_pin(&self.name, "commit", commit)?;
                }
            }
            PackageSource::Svn { url, revision, .. } => {
                require(&self.name, "url", url)?;
                validate_pin(&self.name, "revision", revision)?;
            }
            PackageSource::Registry { version } => validate_version(&self.name, version)?,
        }

        Ok(())
    }
}

/// Manifest entry as written in `dobro.json`, before validation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPackage {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postinstall: Option<String>,
}

impl TryFrom<RawPackage> for PackageSpec {
    type Error = DobroError;

    fn try_from(raw: RawPackage) -> DobroResult<Self> {
        let name = raw.name.unwrap_or_default();
        let label = if name.is_empty() { "<unnamed>" } else { &name };

        let kind = PackageKind::from_manifest(raw.kind.as_deref()).ok_or_else(|| {
            DobroError::validation(
                label,
                format!(
                    "unknown package type '{}' (expected git, svn or npm)",
                    raw.kind.as_deref().unwrap_or_default()
                ),
            )
        })?;

        let dest = raw.dest.filter(|d| !d.is_empty()).map(PathBuf::from);

        let source = match kind {
            PackageKind::Git => PackageSource::Git {
                repo: raw
                    .repo
                    .ok_or_else(|| DobroError::validation(label, "git package requires 'repo'"))?,
                commit: raw.commit.filter(|c| !c.is_empty()),
                dest,
            },
            PackageKind::Svn => PackageSource::Svn {
                url: raw
                    .url
                    .ok_or_else(|| DobroError::validation(label, "svn package requires 'url'"))?,
                revision: raw.revision.ok_or_else(|| {
                    DobroError::validation(label, "svn package requires 'revision'")
                })?,
                dest,
            },
            PackageKind::Registry => PackageSource::Registry {
                version: raw.version.ok_or_else(|| {
                    DobroError::validation(label, "npm package requires 'version'")
                })?,
            },
        };

        let spec = PackageSpec {
            name,
            source,
            postinstall: raw.postinstall.filter(|p| !p.trim().is_empty()),
        };
        spec.validate()?;
        Ok(spec)
    }
}

/// Registry versions must be strict: digits and dots only
pub fn validate_version(package: &str, version: &str) -> DobroResult<()> {
    let strict = !version.is_empty() && version.chars().all(|c| c.is_ascii_digit() || c == '.');
    if strict {
        Ok(())
    } else {
        Err(DobroError::validation(
            package,
            format!(
                "wrong package version '{}': use only digits and dots in the version field",
                version
            ),
        ))
    }
}

fn validate_name(name: &str, kind: PackageKind) -> DobroResult<()> {
    if name.trim().is_empty() {
        return Err(DobroError::validation("<unnamed>", "package name is empty"));
    }

    if name.chars().any(|c| c.is_whitespace() || c == '\\') {
        return Err(DobroError::validation(
            name,
            "package name must not contain whitespace or backslashes",
        ));
    }

    // Scoped registry names (`@scope/pkg`) are the only names with a slash
    let components: Vec<&str> = name.split('/').collect();
    let scoped = kind == PackageKind::Registry
        && components.len() == 2
        && components[0].starts_with('@')
        && components[0].len() > 1;

    if components.len() > 1 && !scoped {
        return Err(DobroError::validation(
            name,
            "package name must be a single path component",
        ));
    }

    if components.iter().any(|c| c.is_empty() || *c == "." || *c == "..") {
        return Err(DobroError::validation(name, "package name is not a valid directory name"));
    }

    Ok(())
}

fn validate_dest(package: &str, dest: &Path) -> DobroResult<()> {
    let escapes = dest
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(DobroError::validation(
            package,
            format!("dest '{}' must be a relative path inside the project", dest.display()),
        ));
    }
    Ok(())
}

fn require(package: &str, field: &str, value: &str) -> DobroResult<()> {
    if value.trim().is_empty() {
        return Err(DobroError::validation(package, format!("'{}' is empty", field)));
    }
    Ok(())
}

/// Commits and revisions end up inside cache keys, so they must be plain
/// tokens: no separators, no dot entries, no leading dash.
fn validate_pin(package: &str, field: &str, value: &str) -> DobroResult<()> {
    require(package, field, value)?;

    if value.contains(['/', '\\']) || value == "." || value == ".." {
        return Err(DobroError::validation(
            package,
            format!("'{}' value '{}' must not contain path separators", field, value),
        ));
    }
    if value.starts_with('-') {
        return Err(DobroError::validation(
            package,
            format!("'{}' value '{}' must not start with '-'", field, value),
        ));
    }
    Ok(())
}
