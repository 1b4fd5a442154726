//! Portfolio content: who this is and where to find them.

use crate::types::MenuEntry;

/// Rendered with the name style inside the about paragraph.
pub const NAME: &str = "Kaustubh Patange";

/// About paragraph, split around [`NAME`].
///
/// The first line is `ABOUT_GREETING`, the name, then `ABOUT_GREETING_END`.
pub const ABOUT_GREETING: &str = "Hi I'm ";
pub const ABOUT_GREETING_END: &str = ",";

/// Lines following the greeting. Empty strings are paragraph breaks.
pub const ABOUT_BODY: &[&str] = &[
    "",
    "A self taught developer specialized in many software domains",
    "including Mobile Apps, Web, Backend, Gen AI.",
    "",
    "I'm currently working at an AI startup as a FullStack",
    "Engineer.",
    "",
    "I'm fluent in Python, Go, Typescript, Javascript, Kotlin.",
];

pub const RESUME_URL: &str =
    "https://drive.google.com/file/d/1azKao3idMCDqJdCHtCTlvc4U3ABYTtJ7/view?usp=sharing";
pub const GITHUB_URL: &str = "https://github.com/KaustubhPatange";
pub const LINKEDIN_URL: &str = "https://www.linkedin.com/in/kaustubhpatange/";
pub const TWITTER_URL: &str = "https://twitter.com/KP206";

/// The menu every session starts with.
pub static MENU: [MenuEntry; 4] = [
    MenuEntry::link("Resume / CV", RESUME_URL),
    MenuEntry::link("GitHub", GITHUB_URL),
    MenuEntry::link("Linkedin", LINKEDIN_URL),
    MenuEntry::link("Twitter", TWITTER_URL),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_order_is_resume_github_linkedin_twitter() {
        let labels: Vec<_> = MENU.iter().map(|e| e.label).collect();
        assert_eq!(labels, ["Resume / CV", "GitHub", "Linkedin", "Twitter"]);
    }

    #[test]
    fn every_default_entry_is_a_link() {
        assert!(MENU.iter().all(|e| e.url().is_some()));
        assert_eq!(MENU[2].url(), Some(LINKEDIN_URL));
    }
}
