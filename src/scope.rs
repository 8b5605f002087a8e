use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Permissions that can be requested from the Spotify Accounts Service.
///
/// The set of scopes passed to the authenticator decides which permissions
/// the user is asked to grant. Any other scope string can still be passed as
/// a plain `&str`; it goes to the provider unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Read a user's private playlists.
    PlaylistReadPrivate,
    /// Write access to a user's public playlists.
    PlaylistModifyPublic,
    /// Write access to a user's private playlists.
    PlaylistModifyPrivate,
    /// Access a user's collaborative playlists.
    PlaylistReadCollaborative,
    /// Write/delete access to the artists and users a user follows.
    UserFollowModify,
    /// Read access to the artists and users a user follows.
    UserFollowRead,
    /// Write/delete access to a user's "Your Music" library.
    UserLibraryModify,
    /// Read access to a user's "Your Music" library.
    UserLibraryRead,
    /// Read access to a user's subscription details.
    UserReadPrivate,
    /// Read access to a user's email address.
    UserReadEmail,
    /// Read access to a user's birthdate.
    UserReadBirthdate,
}

impl Scope {
    pub const ALL: [Scope; 11] = [
        Scope::PlaylistReadPrivate,
        Scope::PlaylistModifyPublic,
        Scope::PlaylistModifyPrivate,
        Scope::PlaylistReadCollaborative,
        Scope::UserFollowModify,
        Scope::UserFollowRead,
        Scope::UserLibraryModify,
        Scope::UserLibraryRead,
        Scope::UserReadPrivate,
        Scope::UserReadEmail,
        Scope::UserReadBirthdate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::PlaylistReadPrivate => "playlist-read-private",
            Scope::PlaylistModifyPublic => "playlist-modify-public",
            Scope::PlaylistModifyPrivate => "playlist-modify-private",
            Scope::PlaylistReadCollaborative => "playlist-read-collaborative",
            Scope::UserFollowModify => "user-follow-modify",
            Scope::UserFollowRead => "user-follow-read",
            Scope::UserLibraryModify => "user-library-modify",
            Scope::UserLibraryRead => "user-library-read",
            Scope::UserReadPrivate => "user-read-private",
            Scope::UserReadEmail => "user-read-email",
            Scope::UserReadBirthdate => "user-read-birthdate",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        scope.as_str().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown scope: {0}")]
pub struct UnknownScope(pub String);

impl FromStr for Scope {
    type Err = UnknownScope;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Scope::ALL
            .into_iter()
            .find(|scope| scope.as_str() == value)
            .ok_or_else(|| UnknownScope(value.to_string()))
    }
}
