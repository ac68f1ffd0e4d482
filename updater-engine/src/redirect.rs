//! Repository transfer detection.

use updater_core::{PackageName, RepoCoordinates};

use crate::collaborators::RepositoryProbe;
use crate::error::RedirectCheckError;
use crate::github::parse_github_location;

/// A package whose upstream repository moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectInfo {
    pub old_name: PackageName,
    pub new_name: PackageName,
    pub from: RepoCoordinates,
    pub to: RepoCoordinates,
}

/// Whether `name`'s repository now redirects elsewhere on GitHub.
///
/// Non-GitHub owners and names without `owner/repo` are never probed.
/// A redirect back to the same repository (case change only) is not a
/// transfer.
pub async fn check_redirect(
    probe: &dyn RepositoryProbe,
    name: &PackageName,
) -> Result<Option<RedirectInfo>, RedirectCheckError> {
    let Some(from) = name.repo_coordinates().filter(RepoCoordinates::is_github) else {
        return Ok(None);
    };
    let Some(location) = probe.redirect_location(&from).await? else {
        return Ok(None);
    };
    let to = parse_github_location(&location)
        .ok_or_else(|| RedirectCheckError::UnexpectedLocation(location.clone()))?;
    if to.same_repository(&from) {
        return Ok(None);
    }
    Ok(Some(RedirectInfo {
        old_name: name.clone(),
        new_name: renamed(name, &to),
        from,
        to,
    }))
}

/// `name` with its `owner/repo` prefix replaced; any subpath is kept.
pub fn renamed(name: &PackageName, to: &RepoCoordinates) -> PackageName {
    PackageName::from(format!("{}/{}{}", to.owner, to.repo, name.subpath()))
}
