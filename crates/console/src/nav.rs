#![forbid(unsafe_code)]

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

pub const FALLBACK_TITLE: &str = "CRM Dashboard";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Panel {
    #[default]
    Dashboard,
    Users,
    Emails,
}

impl Panel {
    pub fn as_str(self) -> &'static str {
        match self {
            Panel::Dashboard => "dashboard",
            Panel::Users => "users",
            Panel::Emails => "emails",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Panel::Dashboard => "Dashboard",
            Panel::Users => "User management",
            Panel::Emails => "Email management",
        }
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Panel {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dashboard" => Ok(Panel::Dashboard),
            "users" => Ok(Panel::Users),
            "emails" => Ok(Panel::Emails),
            _ => Err(()),
        }
    }
}

/// Active panel plus the page title shown for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavState {
    pub panel: Panel,
    pub title: &'static str,
}

impl Default for NavState {
    fn default() -> Self {
        Self { panel: Panel::Dashboard, title: Panel::Dashboard.title() }
    }
}

impl NavState {
    /// Switch by name; an unknown name shows the dashboard under the generic title.
    pub fn navigate(&mut self, name: &str) {
        match name.parse::<Panel>() {
            Ok(p) => {
                self.panel = p;
                self.title = p.title();
            }
            Err(()) => {
                self.panel = Panel::Dashboard;
                self.title = FALLBACK_TITLE;
            }
        }
    }
}
