//! Page URLs for entities.

use std::fmt;
use std::str::FromStr;

use stockroom_core::EntityKind;

use crate::error::{FormatError, Result};

/// Page of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlMethod {
    Info,
    Edit,
    New,
    Delete,
    /// Parts belonging to the element.
    List,
}

impl UrlMethod {
    pub const fn as_str(&self) -> &'static str {
        match self {
            UrlMethod::Info => "info",
            UrlMethod::Edit => "edit",
            UrlMethod::New => "new",
            UrlMethod::Delete => "delete",
            UrlMethod::List => "list",
        }
    }
}

impl fmt::Display for UrlMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UrlMethod {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "info" => Ok(UrlMethod::Info),
            "edit" => Ok(UrlMethod::Edit),
            "new" => Ok(UrlMethod::New),
            "delete" => Ok(UrlMethod::Delete),
            "list" | "list_parts" => Ok(UrlMethod::List),
            other => Err(FormatError::UnknownMethod(other.to_string())),
        }
    }
}

/// What a URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UrlTarget {
    Part,
    User,
    Attachment,
    Entity(EntityKind),
}

impl UrlTarget {
    /// Path segment of the target's pages.
    pub const fn segment(&self) -> &'static str {
        match self {
            UrlTarget::Part => "part",
            UrlTarget::User => "user",
            UrlTarget::Attachment => "attachment",
            UrlTarget::Entity(kind) => match kind {
                EntityKind::AttachmentType => "attachment_type",
                EntityKind::Category => "category",
                EntityKind::Device => "device",
                EntityKind::Footprint => "footprint",
                EntityKind::Manufacturer => "manufacturer",
                EntityKind::MeasurementUnit => "measurement_unit",
                EntityKind::Storelocation => "store_location",
                EntityKind::Supplier => "supplier",
                EntityKind::Currency => "currency",
                EntityKind::Group => "group",
            },
        }
    }

    /// Only elements parts can be assigned to have a parts list.
    fn has_part_list(&self) -> bool {
        matches!(
            self,
            UrlTarget::Entity(
                EntityKind::Category
                    | EntityKind::Footprint
                    | EntityKind::Manufacturer
                    | EntityKind::Storelocation
                    | EntityKind::Supplier
            )
        )
    }
}

impl fmt::Display for UrlTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.segment())
    }
}

impl From<EntityKind> for UrlTarget {
    fn from(kind: EntityKind) -> Self {
        UrlTarget::Entity(kind)
    }
}

/// Builds locale-prefixed paths, e.g. `/en/category/3/edit`.
#[derive(Debug, Clone)]
pub struct UrlGenerator {
    locale: String,
}

impl UrlGenerator {
    /// An empty locale produces unprefixed paths.
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into().trim_matches('/').to_string(),
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Prefix `path` with the locale segment.
    pub fn path(&self, path: &str) -> String {
        let path = path.trim_start_matches('/');
        if self.locale.is_empty() {
            format!("/{}", path)
        } else {
            format!("/{}/{}", self.locale, path)
        }
    }

    /// URL of `method` for `target`. Every method but `New` needs an id.
    pub fn url(&self, target: impl Into<UrlTarget>, id: Option<u64>, method: UrlMethod) -> Result<String> {
        let target = target.into();
        let segment = target.segment();

        if method == UrlMethod::New {
            return Ok(self.path(&format!("{}/new", segment)));
        }
        if method == UrlMethod::List && !target.has_part_list() {
            return Err(FormatError::UnsupportedMethod {
                target: target.to_string(),
                method: method.to_string(),
            });
        }
        let id = id.ok_or_else(|| FormatError::MissingId {
            target: target.to_string(),
            method: method.to_string(),
        })?;

        let suffix = match method {
            UrlMethod::Info => "info",
            UrlMethod::Edit => "edit",
            UrlMethod::Delete => "delete",
            UrlMethod::List => "parts",
            UrlMethod::New => "new",
        };
        Ok(self.path(&format!("{}/{}/{}", segment, id, suffix)))
    }

    /// Same as [`url`](Self::url) with the method given by name.
    pub fn url_by_name(&self, target: impl Into<UrlTarget>, id: Option<u64>, method: &str) -> Result<String> {
        self.url(target, id, method.parse()?)
    }

    /// The "all parts" list.
    pub fn parts_list(&self) -> String {
        self.path("parts")
    }

    /// The list of all attachments.
    pub fn attachment_list(&self) -> String {
        self.path("attachment/list")
    }
}

impl Default for UrlGenerator {
    fn default() -> Self {
        Self::new("en")
    }
}

/// Drop the locale segment: `/en/foo/bar` becomes `/foo/bar`.
pub fn login_path(path: &str) -> String {
    let mut parts: Vec<&str> = path.split('/').collect();
    if parts.len() > 1 {
        parts.remove(1);
    }
    parts.join("/")
}

/// Path of a file below `public_dir` relative to it.
///
/// `None` if the file is not inside `public_dir` or the path is relative.
pub fn asset_path(absolute: &str, public_dir: &str) -> Option<String> {
    if !absolute.starts_with('/') {
        return None;
    }
    let rest = absolute.strip_prefix(public_dir.trim_end_matches('/'))?;
    rest.strip_prefix('/').map(str::to_string)
}
