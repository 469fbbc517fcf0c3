//! Activation code generation.
//!
//! Codes are random; system-wide uniqueness is enforced by the repository,
//! which regenerates a code when it collides with a stored one.

use rand::Rng;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Length of every generated activation code.
pub const ACTIVATION_CODE_LENGTH: usize = 8;

// ---------------------------------------------------------------------------
// Code kinds
// ---------------------------------------------------------------------------

/// Who an activation code enrolls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActivationCodeKind {
    /// Study participants. Digits only.
    User,
    /// Study managers. Alphanumeric.
    Manager,
    /// Proxies acting for a participant. Digits only.
    Proxy,
}

impl ActivationCodeKind {
    pub const ALL: [ActivationCodeKind; 3] = [Self::User, Self::Manager, Self::Proxy];

    /// Database column holding codes of this kind.
    pub fn column(self) -> &'static str {
        match self {
            Self::User => "user_activation_code",
            Self::Manager => "manager_activation_code",
            Self::Proxy => "proxy_activation_code",
        }
    }

    /// Generate a random code of this kind.
    pub fn generate(self) -> String {
        generate_code(self, ACTIVATION_CODE_LENGTH)
    }
}

fn generate_code(kind: ActivationCodeKind, length: usize) -> String {
    match kind {
        ActivationCodeKind::User | ActivationCodeKind::Proxy => {
            let mut rng = rand::rng();
            (0..length)
                .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
                .collect()
        }
        ActivationCodeKind::Manager => rand::rng()
            .sample_iter(&rand::distr::Alphanumeric)
            .take(length)
            .map(char::from)
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Code sets
// ---------------------------------------------------------------------------

/// The three activation codes of one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationCodes {
    pub user: String,
    pub manager: String,
    pub proxy: String,
}

impl ActivationCodes {
    pub fn generate() -> Self {
        Self {
            user: ActivationCodeKind::User.generate(),
            manager: ActivationCodeKind::Manager.generate(),
            proxy: ActivationCodeKind::Proxy.generate(),
        }
    }

    pub fn get(&self, kind: ActivationCodeKind) -> &str {
        match kind {
            ActivationCodeKind::User => &self.user,
            ActivationCodeKind::Manager => &self.manager,
            ActivationCodeKind::Proxy => &self.proxy,
        }
    }

    /// Replace the code of one kind with a freshly generated one.
    pub fn regenerate(&mut self, kind: ActivationCodeKind) {
        let code = kind.generate();
        match kind {
            ActivationCodeKind::User => self.user = code,
            ActivationCodeKind::Manager => self.manager = code,
            ActivationCodeKind::Proxy => self.proxy = code,
        }
    }
}
