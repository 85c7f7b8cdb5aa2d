//! Launchable application catalog

use std::collections::BTreeMap;
use std::path::Path;

use crate::phrases::capitalize;
use crate::supervisor::LaunchTarget;

/// One launchable application
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppEntry {
    key: String,
    display: String,
    exact: bool,
    candidates: Vec<Vec<String>>,
}

impl AppEntry {
    fn new(key: &str, display: &str, exact: bool, candidates: &[&[&str]]) -> Self {
        Self {
            key: key.to_string(),
            display: display.to_string(),
            exact,
            candidates: candidates
                .iter()
                .map(|c| c.iter().map(|s| (*s).to_string()).collect())
                .collect(),
        }
    }

    /// Spoken name after "open"
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Name used in replies
    #[must_use]
    pub fn display(&self) -> &str {
        &self.display
    }

    /// Whether `utterance` asks to open this app
    ///
    /// Exact entries only match the bare "open <key>" command.
    #[must_use]
    pub fn requested_by(&self, utterance: &str) -> bool {
        let command = format!("open {}", self.key);
        if self.exact {
            utterance == command
        } else {
            utterance.contains(&command)
        }
    }

    /// First candidate whose program exists
    #[must_use]
    pub fn resolve(&self) -> Option<LaunchTarget> {
        self.resolve_with(program_exists)
    }

    fn resolve_with(&self, exists: impl Fn(&str) -> bool) -> Option<LaunchTarget> {
        self.candidates.iter().find_map(|command| {
            let (program, args) = command.split_first()?;
            exists(program).then(|| LaunchTarget::new(program, args.to_vec()))
        })
    }
}

fn program_exists(program: &str) -> bool {
    let path = Path::new(program);
    if path.is_absolute() {
        path.exists()
    } else {
        which::which(program).is_ok()
    }
}

/// Applications the router may open by name
#[derive(Debug, Clone, Default)]
pub struct AppCatalog {
    entries: Vec<AppEntry>,
}

impl AppCatalog {
    /// Platform defaults overlaid with configured commands
    ///
    /// An override for a default key replaces its candidates; other keys
    /// add new entries.
    #[must_use]
    pub fn new(os: &str, overrides: &BTreeMap<String, Vec<String>>) -> Self {
        let mut entries = defaults(os);

        for (key, command) in overrides {
            if command.is_empty() {
                continue;
            }
            let key = key.trim().to_lowercase();
            match entries.iter_mut().find(|e| e.key == key) {
                Some(entry) => entry.candidates = vec![command.clone()],
                None => entries.push(AppEntry {
                    display: capitalize(&key),
                    key,
                    exact: false,
                    candidates: vec![command.clone()],
                }),
            }
        }

        Self { entries }
    }

    /// Entry requested by `utterance`, if any
    ///
    /// The bare command "open cmd" is an alias for the command prompt.
    #[must_use]
    pub fn find(&self, utterance: &str) -> Option<&AppEntry> {
        if utterance == "open cmd" {
            return self.entries.iter().find(|e| e.key == "command prompt");
        }
        self.entries.iter().find(|e| e.requested_by(utterance))
    }
}

fn defaults(os: &str) -> Vec<AppEntry> {
    match os {
        "windows" => vec![
            AppEntry::new("notepad", "Notepad", false, &[&["notepad.exe"]]),
            AppEntry::new("calculator", "Calculator", false, &[&["calc.exe"]]),
            AppEntry::new(
                "command prompt",
                "Command Prompt",
                false,
                &[&["cmd", "/C", "start", "cmd.exe"]],
            ),
            AppEntry::new(
                "chrome",
                "Google Chrome",
                true,
                &[&["cmd", "/C", "start", "", "chrome"]],
            ),
        ],
        "macos" => vec![
            AppEntry::new("notepad", "Notepad", false, &[&["open", "-a", "TextEdit"]]),
            AppEntry::new("calculator", "Calculator", false, &[&["open", "-a", "Calculator"]]),
            AppEntry::new(
                "command prompt",
                "Command Prompt",
                false,
                &[&["open", "-a", "Terminal"]],
            ),
            AppEntry::new("chrome", "Google Chrome", true, &[&["open", "-a", "Google Chrome"]]),
        ],
        _ => vec![
            AppEntry::new(
                "notepad",
                "Notepad",
                false,
                &[&["gnome-text-editor"], &["gedit"], &["kate"], &["mousepad"], &["xed"]],
            ),
            AppEntry::new(
                "calculator",
                "Calculator",
                false,
                &[&["gnome-calculator"], &["kcalc"], &["galculator"], &["qalculate-gtk"]],
            ),
            AppEntry::new(
                "command prompt",
                "Command Prompt",
                false,
                &[&["x-terminal-emulator"], &["gnome-terminal"], &["konsole"], &["xterm"]],
            ),
            AppEntry::new(
                "chrome",
                "Google Chrome",
                true,
                &[
                    &["google-chrome"],
                    &["google-chrome-stable"],
                    &["chromium"],
                    &["chromium-browser"],
                ],
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_default_apps() {
        let catalog = AppCatalog::new("linux", &BTreeMap::new());
        assert_eq!(
            catalog.find("please open notepad").map(AppEntry::display),
            Some("Notepad")
        );
        assert_eq!(
            catalog.find("open cmd").map(AppEntry::key),
            Some("command prompt")
        );
        assert!(catalog.find("open cmd now").is_none());
    }

    #[test]
    fn chrome_requires_exact_command() {
        let catalog = AppCatalog::new("linux", &BTreeMap::new());
        assert_eq!(
            catalog.find("open chrome").map(AppEntry::display),
            Some("Google Chrome")
        );
        assert!(catalog.find("open chrome tabs").is_none());
    }

    #[test]
    fn overrides_replace_and_extend() {
        let mut overrides = BTreeMap::new();
        overrides.insert("notepad".to_string(), vec!["code".to_string()]);
        overrides.insert("Music Player".to_string(), vec!["rhythmbox".to_string()]);
        let catalog = AppCatalog::new("linux", &overrides);

        let notepad = catalog.find("open notepad").unwrap();
        let target = notepad.resolve_with(|p| p == "code").unwrap();
        assert_eq!(target.program().to_str(), Some("code"));

        let player = catalog.find("open music player").unwrap();
        assert_eq!(player.display(), "Music Player");
    }

    #[test]
    fn resolve_picks_first_installed_candidate() {
        let catalog = AppCatalog::new("linux", &BTreeMap::new());
        let calculator = catalog.find("open calculator").unwrap();
        let target = calculator.resolve_with(|p| p == "kcalc").unwrap();
        assert_eq!(target.program().to_str(), Some("kcalc"));
        assert!(calculator.resolve_with(|_| false).is_none());
    }
}
