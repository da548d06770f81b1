//! Screens of the repository-viewer demo.
//!
//! Each module defines one contract and a `build` function wiring its
//! handlers. None of them refer to the others except through navigation
//! payloads and the listener registry.

pub mod home;
pub mod login;
pub mod profile;

use mvikit_core::Controller;

use self::home::Home;
use self::login::Login;
use self::profile::Profile;

/// A live screen on the router's stack.
#[derive(Debug, Clone)]
pub enum ActiveScreen {
    Login(Controller<Login>),
    Home(Controller<Home>),
    Profile(Controller<Profile>),
}

impl ActiveScreen {
    pub fn name(&self) -> &str {
        match self {
            Self::Login(c) => c.name(),
            Self::Home(c) => c.name(),
            Self::Profile(c) => c.name(),
        }
    }

    pub async fn dispose(&self) {
        match self {
            Self::Login(c) => c.dispose().await,
            Self::Home(c) => c.dispose().await,
            Self::Profile(c) => c.dispose().await,
        }
    }

    pub fn as_login(&self) -> Option<&Controller<Login>> {
        match self {
            Self::Login(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_home(&self) -> Option<&Controller<Home>> {
        match self {
            Self::Home(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_profile(&self) -> Option<&Controller<Profile>> {
        match self {
            Self::Profile(c) => Some(c),
            _ => None,
        }
    }
}
