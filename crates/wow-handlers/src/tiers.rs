//! Path sensitivity tiers.
//!
//! One table, used uniformly by every file-touching handler. Classification
//! is purely lexical: the filesystem is never consulted, so the classifier
//! cannot be raced and costs nothing.

/// Tier 1 roots: writes are never allowed, reads are tightly restricted.
const SYSTEM_DIRS: &[&str] = &["/etc", "/bin", "/sbin", "/boot", "/sys", "/proc", "/dev", "/lib"];

/// Tier 2 roots: deny by default, operator may bypass.
const SENSITIVE_DIRS: &[&str] = &[
    "/usr/bin",
    "/usr/sbin",
    "/var/lib",
    "/var/log",
    "/opt",
    "/root",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathTier {
    System,
    Sensitive,
    User,
}

/// Classification result for one path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathClass {
    pub tier: PathTier,
    /// `..` segments survive lexical normalization (or escape the root).
    pub traversal: bool,
    /// The normalized path the tier was judged on.
    pub normalized: String,
    /// The tier-1/2 root that matched, when one did.
    pub matched_root: Option<&'static str>,
}

/// True when `path` lives under `root` on a component boundary, so `/etc`
/// claims `/etc/hosts` but not `/etcetera`.
fn under_root(path: &str, root: &str) -> bool {
    path == root || path.strip_prefix(root).is_some_and(|rest| rest.starts_with('/'))
}

/// Lexically normalize: resolve `.` and `..` without touching the
/// filesystem. Returns the normalized path and whether `..` escaped.
fn normalize(path: &str) -> (String, bool) {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    let mut escaped = false;

    for component in path.split('/') {
        match component {
            "" | "." => {}
            ".." => {
                if parts.pop().is_none() {
                    // Nothing left to pop: the path climbs out of its root.
                    escaped = true;
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    let normalized = if absolute {
        format!("/{joined}")
    } else if joined.is_empty() {
        ".".to_string()
    } else {
        joined
    };
    (normalized, escaped)
}

/// Classify a path against the tier table.
pub fn classify_path(path: &str) -> PathClass {
    let (normalized, escaped) = normalize(path);
    // A relative path that climbs upward is traversal even when the walk
    // stays formally in bounds: the gateway cannot know the anchor.
    let traversal = escaped || (!path.starts_with('/') && path.split('/').any(|c| c == ".."));

    let matched_system = SYSTEM_DIRS
        .iter()
        .find(|root| under_root(&normalized, root));
    if let Some(root) = matched_system {
        return PathClass {
            tier: PathTier::System,
            traversal,
            normalized,
            matched_root: Some(root),
        };
    }

    let matched_sensitive = SENSITIVE_DIRS
        .iter()
        .find(|root| under_root(&normalized, root));
    if let Some(root) = matched_sensitive {
        return PathClass {
            tier: PathTier::Sensitive,
            traversal,
            normalized,
            matched_root: Some(root),
        };
    }

    PathClass {
        tier: PathTier::User,
        traversal,
        normalized,
        matched_root: None,
    }
}
