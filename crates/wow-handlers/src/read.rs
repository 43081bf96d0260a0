//! Read validation.

use wow_core::{Decision, ToolArgs, ToolName, ToolRequest};

use crate::context::GatewayContext;
use crate::handler::ToolHandler;
use crate::tiers::{PathTier, classify_path};

/// Exact auth-material paths that are never readable.
const AUTH_FILES: &[&str] = &["/etc/shadow", "/etc/sudoers", "/etc/gshadow"];

/// Home-relative fragments that mark a path as auth material wherever the
/// home directory lives.
const AUTH_FRAGMENTS: &[&str] = &[
    "/.ssh/id_",
    "/.aws/credentials",
    "/.netrc",
    "/.pgpass",
    "/.gnupg/",
    "/.docker/config.json",
    "/.kube/config",
];

fn is_auth_material(path: &str) -> bool {
    AUTH_FILES.contains(&path)
        || AUTH_FRAGMENTS.iter().any(|fragment| path.contains(fragment))
        || path.ends_with(".pem")
        || path.ends_with("id_rsa")
        || path.ends_with("id_ed25519")
}

pub struct ReadHandler;

impl ReadHandler {
    pub fn new() -> ReadHandler {
        ReadHandler
    }
}

impl Default for ReadHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolHandler for ReadHandler {
    fn tool(&self) -> ToolName {
        ToolName::Read
    }

    fn handle(&self, request: &ToolRequest, _cx: &mut GatewayContext) -> Decision {
        let ToolArgs::Read { file_path } = &request.args else {
            return Decision::allow("not a Read payload");
        };

        let class = classify_path(file_path);
        if class.traversal {
            return Decision::block_absolute(
                "CRITICAL: PATH_TRAVERSAL '..' escapes the working tree; reading is never allowed",
            );
        }

        if is_auth_material(&class.normalized) {
            return Decision::block_absolute(format!(
                "CRITICAL: SYSTEM_FILE {} holds authentication material; reading is never allowed",
                class.normalized
            ));
        }

        // Device nodes are not text; reading them can hang or leak hardware
        // state.
        if class.normalized.starts_with("/dev/") {
            return Decision::block_absolute(
                "CRITICAL: SYSTEM_FILE device nodes are never readable through the gateway",
            );
        }

        match class.tier {
            PathTier::System => {
                let root = class.matched_root.unwrap_or("a system directory");
                Decision::block_bypassable(format!(
                    "SENSITIVE_PATH reading under {root} is blocked; an operator can bypass with `wow-guard bypass enable`"
                ))
            }
            PathTier::Sensitive => {
                let root = class.matched_root.unwrap_or("a sensitive directory");
                Decision::block_bypassable(format!(
                    "SENSITIVE_PATH reading under {root} is blocked; an operator can bypass with `wow-guard bypass enable`"
                ))
            }
            PathTier::User => Decision::allow("read target passed all checks"),
        }
    }
}
