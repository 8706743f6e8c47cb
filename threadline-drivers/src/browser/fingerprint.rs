use rand::prelude::SliceRandom;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Desktop client identity presented to target sites.
pub struct UserAgentProfile {
    pub user_agent: String,
    pub viewport: (u32, u32),
    pub languages: Vec<String>,
}

#[derive(Debug, Clone)]
/// Small pool of plausible desktop identities; one is picked per launched browser.
pub struct UserAgentPool {
    profiles: Vec<UserAgentProfile>,
}

impl Default for UserAgentPool {
    fn default() -> Self {
        Self::new()
    }
}

impl UserAgentPool {
    /// Pool with the built-in Chrome desktop profiles.
    pub fn new() -> Self {
        let languages = vec!["en-US".to_string(), "en".to_string()];
        Self {
            profiles: vec![
                UserAgentProfile {
                    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
                    viewport: (1920, 1080),
                    languages: languages.clone(),
                },
                UserAgentProfile {
                    user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
                    viewport: (1440, 900),
                    languages: languages.clone(),
                },
                UserAgentProfile {
                    user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36".to_string(),
                    viewport: (1366, 768),
                    languages,
                },
            ],
        }
    }

    /// Pick a profile at random.
    pub fn pick(&self) -> UserAgentProfile {
        let mut rng = rand::thread_rng();
        self.profiles
            .choose(&mut rng)
            .cloned()
            .unwrap_or_else(|| Self::new().profiles[0].clone())
    }
}
