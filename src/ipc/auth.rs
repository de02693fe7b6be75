use anyhow::Result;
use std::path::Path;
use uuid::Uuid;

/// Return the local auth token for this daemon instance.
///
/// Generated on first call (random 32-char hex) and stored at
/// `{data_dir}/auth_token` with owner-only permissions. The desktop UI
/// reads this file and sends it as `daemon.auth` on every connection —
/// it is the only thing keeping other local processes off the RPC port.
pub fn get_or_create_token(data_dir: &Path) -> Result<String> {
    let path = data_dir.join("auth_token");

    if path.exists() {
        let token = std::fs::read_to_string(&path)?.trim().to_string();
        if !token.is_empty() {
            return Ok(token);
        }
    }

    let token = Uuid::new_v4().to_string().replace('-', "");

    std::fs::create_dir_all(data_dir)?;
    std::fs::write(&path, &token)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_is_stable_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let a = get_or_create_token(dir.path()).unwrap();
        let b = get_or_create_token(dir.path()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn empty_token_file_is_regenerated() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("auth_token"), "").unwrap();
        let token = get_or_create_token(dir.path()).unwrap();
        assert!(!token.is_empty());
    }
}
